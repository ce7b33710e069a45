//! FIFO resource semantics.

use std::cell::RefCell;
use std::rc::Rc;

use corosim::resource::Resource;
use corosim::simulation::{Scheduler, Simulation};
use corosim::time::SimTime;

#[test]
fn requests_are_granted_in_fifo_order() {
    let mut sim = Simulation::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    async fn worker(
        scheduler: Scheduler,
        resource: Resource,
        id: usize,
        log: Rc<RefCell<Vec<(usize, SimTime)>>>,
    ) {
        resource.request().await;
        log.borrow_mut().push((id, scheduler.now()));
        scheduler.timeout(10.0).unwrap().await;
        resource.release();
    }

    let resource = Resource::new(sim.scheduler(), 1);
    for id in 0..3 {
        sim.spawn(worker(sim.scheduler(), resource.clone(), id, log.clone()));
    }
    sim.run();

    let expected = vec![
        (0, SimTime::new(0.0)),
        (1, SimTime::new(10.0)),
        (2, SimTime::new(20.0)),
    ];
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn aborted_requests_are_skipped() {
    let mut sim = Simulation::new();

    let resource = Resource::new(sim.scheduler(), 1);
    let first = resource.request();
    let second = resource.request();
    let third = resource.request();
    second.abort();

    sim.run();
    assert!(first.is_processed());
    assert!(third.is_pending());

    resource.release();
    sim.run();

    assert!(second.is_aborted());
    assert!(third.is_processed());
}

#[test]
fn units_are_counted() {
    let mut sim = Simulation::new();

    let resource = Resource::new(sim.scheduler(), 2);
    assert_eq!(resource.available(), 2);

    resource.request();
    assert_eq!(resource.available(), 1);
    resource.request();
    assert_eq!(resource.available(), 0);

    let queued = resource.request();
    assert!(queued.is_pending());

    resource.release();
    assert!(queued.is_triggered());
    assert_eq!(resource.available(), 0);

    sim.run();
    assert!(queued.is_processed());
}
