//! Actor spawning, completion and cancellation.

use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use corosim::simulation::{Scheduler, Simulation};
use corosim::time::SimTime;

#[test]
fn spawning_does_not_enter_the_body_synchronously() {
    let mut sim = Simulation::new();
    let started = Rc::new(Cell::new(false));

    let flag = started.clone();
    sim.spawn(async move {
        flag.set(true);
    });
    assert!(!started.get());

    sim.step().unwrap();
    assert!(started.get());
    assert_eq!(sim.now(), SimTime::ZERO);
}

#[test]
fn completion_event_triggers_when_the_body_returns() {
    let mut sim = Simulation::new();
    let scheduler = sim.scheduler();

    let done = sim.spawn(async move {
        scheduler.timeout(3.0).unwrap().await;
    });
    assert!(done.is_pending());

    sim.run();
    assert!(done.is_processed());
    assert_eq!(sim.now(), 3.0);
}

#[test]
fn awaiting_an_actor_awaits_its_completion() {
    let mut sim = Simulation::new();
    let finished_at = Rc::new(RefCell::new(None));

    let scheduler = sim.scheduler();
    let inner = sim.spawn(async move {
        scheduler.timeout(2.0).unwrap().await;
    });

    let scheduler = sim.scheduler();
    let finished = finished_at.clone();
    sim.spawn(async move {
        inner.await;
        *finished.borrow_mut() = Some(scheduler.now());
    });
    sim.run();

    assert_eq!(*finished_at.borrow(), Some(SimTime::new(2.0)));
}

#[test]
fn value_actors_deliver_their_result() {
    let mut sim = Simulation::new();
    let received = Rc::new(Cell::new(0));

    let scheduler = sim.scheduler();
    let answer = sim.spawn_value(async move {
        scheduler.timeout(1.0).unwrap().await;
        42
    });

    {
        let answer = answer.clone();
        let received = received.clone();
        sim.spawn(async move {
            received.set(answer.await);
        });
    }
    sim.run();

    assert_eq!(received.get(), 42);
    assert_eq!(answer.value(), 42);
}

#[test]
fn scheduled_value_events_deliver_their_payload() {
    let mut sim = Simulation::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let ev = sim.timeout_value(1.0, 42).unwrap();
    let scheduler = sim.scheduler();
    {
        let log = log.clone();
        sim.spawn(async move {
            let value = ev.await;
            log.borrow_mut().push((scheduler.now(), value));
        });
    }
    sim.run();

    assert_eq!(*log.borrow(), vec![(SimTime::new(1.0), 42)]);
}

#[test]
fn aborting_the_completion_event_cancels_the_actor() {
    let mut sim = Simulation::new();
    let resumed = Rc::new(Cell::new(false));

    let scheduler = sim.scheduler();
    let flag = resumed.clone();
    let handle = sim.spawn(async move {
        scheduler.timeout(10.0).unwrap().await;
        flag.set(true);
    });

    sim.run_until(5.0).unwrap();
    handle.abort();
    sim.run();

    assert!(handle.is_aborted());
    assert!(!resumed.get());
    assert_eq!(sim.now(), 10.0);
}

#[test]
fn aborting_an_event_destroys_its_awaiters() {
    let mut sim = Simulation::new();
    let resumed = Rc::new(Cell::new(false));

    let ev = sim.event();
    let done = {
        let ev = ev.clone();
        let flag = resumed.clone();
        sim.spawn(async move {
            ev.await;
            flag.set(true);
        })
    };

    // Let the actor start and suspend on the event.
    sim.run();
    ev.abort();
    sim.run();

    assert!(!resumed.get());
    assert!(done.is_pending());
}

#[test]
fn awaiting_an_already_aborted_event_cancels_the_actor() {
    let mut sim = Simulation::new();
    let reached = Rc::new(Cell::new(false));

    let ev = sim.event();
    ev.abort();

    let done = {
        let ev = ev.clone();
        let flag = reached.clone();
        sim.spawn(async move {
            ev.await;
            flag.set(true);
        })
    };
    sim.run();

    assert!(!reached.get());
    assert!(done.is_pending());
}

#[test]
fn a_panicking_actor_propagates_out_of_the_run_loop() {
    let mut sim = Simulation::new();

    let done = sim.spawn(async move {
        panic!("actor failure");
    });

    let result = catch_unwind(AssertUnwindSafe(|| sim.run()));
    assert!(result.is_err());
    assert!(done.is_pending());
}

#[test]
fn actors_spawned_from_actors_run() {
    let mut sim = Simulation::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    async fn child(scheduler: Scheduler, log: Rc<RefCell<Vec<SimTime>>>) {
        scheduler.timeout(1.0).unwrap().await;
        log.borrow_mut().push(scheduler.now());
    }

    let scheduler = sim.scheduler();
    {
        let log = log.clone();
        sim.spawn(async move {
            scheduler.spawn(child(scheduler.clone(), log));
        });
    }
    sim.run();

    assert_eq!(*log.borrow(), vec![SimTime::new(1.0)]);
}

#[test]
fn interleaved_clocks_tick_deterministically() {
    let mut sim = Simulation::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    async fn clock(
        scheduler: Scheduler,
        name: &'static str,
        period: f64,
        log: Rc<RefCell<Vec<(SimTime, &'static str)>>>,
    ) {
        loop {
            log.borrow_mut().push((scheduler.now(), name));
            scheduler.timeout(period).unwrap().await;
        }
    }

    sim.spawn(clock(sim.scheduler(), "slow", 2.0, log.clone()));
    sim.spawn(clock(sim.scheduler(), "fast", 1.0, log.clone()));
    sim.run_until(5.0).unwrap();

    let expected: Vec<(SimTime, &str)> = [
        (0.0, "slow"),
        (0.0, "fast"),
        (1.0, "fast"),
        (2.0, "slow"),
        (2.0, "fast"),
        (3.0, "fast"),
        (4.0, "slow"),
        (4.0, "fast"),
    ]
    .into_iter()
    .map(|(time, name)| (SimTime::new(time), name))
    .collect();
    assert_eq!(*log.borrow(), expected);
}
