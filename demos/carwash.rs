//! A carwash with a limited number of washing machines.
//!
//! Cars arrive every 2 time units and washing takes 5, so a queue builds up
//! in front of the two machines.

use corosim::resource::Resource;
use corosim::simulation::{Scheduler, Simulation};

const NUM_MACHINES: u64 = 2;
const WASH_TIME: f64 = 5.0;
const ARRIVAL_INTERVAL: f64 = 2.0;

async fn car(scheduler: Scheduler, carwash: Resource, id: u32) {
    println!("[{}] car {} arrives", scheduler.now(), id);

    carwash.request().await;
    println!("[{}] car {} enters a machine", scheduler.now(), id);

    scheduler.timeout(WASH_TIME).unwrap().await;
    carwash.release();
    println!("[{}] car {} leaves", scheduler.now(), id);
}

async fn car_source(scheduler: Scheduler, carwash: Resource) {
    for id in 0.. {
        scheduler.spawn(car(scheduler.clone(), carwash.clone(), id));
        scheduler.timeout(ARRIVAL_INTERVAL).unwrap().await;
    }
}

fn main() {
    let mut sim = Simulation::new();
    let carwash = Resource::new(sim.scheduler(), NUM_MACHINES);

    sim.spawn(car_source(sim.scheduler(), carwash));

    sim.run_until(20.0).unwrap();
}
