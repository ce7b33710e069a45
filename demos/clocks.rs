//! Two clocks ticking at different periods on the same timeline.

use corosim::simulation::{Scheduler, Simulation};

async fn clock(scheduler: Scheduler, name: &'static str, period: f64) {
    loop {
        println!("[{}] {}", scheduler.now(), name);
        scheduler.timeout(period).unwrap().await;
    }
}

fn main() {
    let mut sim = Simulation::new();

    sim.spawn(clock(sim.scheduler(), "slow", 2.0));
    sim.spawn(clock(sim.scheduler(), "fast", 1.0));

    sim.run_until(5.0).unwrap();
}
