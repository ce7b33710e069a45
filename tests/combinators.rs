//! Derived events: any_of, all_of and their operators.

use std::cell::Cell;
use std::rc::Rc;

use corosim::simulation::Simulation;
use corosim::time::SimTime;

#[test]
fn any_of_fires_when_the_earliest_input_processes() {
    let mut sim = Simulation::new();

    let slow = sim.timeout(10.0).unwrap();
    let fast = sim.timeout(5.0).unwrap();
    let race = sim.any_of(&[slow.clone(), fast.clone()]);

    sim.run_until(6.0).unwrap();
    assert!(race.is_processed());
    assert!(fast.is_processed());
    assert!(slow.is_pending());
}

#[test]
fn the_or_operator_is_an_any_of_race() {
    let mut sim = Simulation::new();
    let fired_at = Rc::new(Cell::new(None));

    let ev = sim.timeout(10.0).unwrap();
    let deadline = sim.timeout(5.0).unwrap();
    let race = &ev | &deadline;

    let scheduler = sim.scheduler();
    {
        let fired_at = fired_at.clone();
        race.add_callback(move |_| fired_at.set(Some(scheduler.now())));
    }
    sim.run();

    assert_eq!(fired_at.get(), Some(SimTime::new(5.0)));
}

#[test]
fn any_of_with_an_empty_input_fires_immediately() {
    let mut sim = Simulation::new();
    let out = sim.any_of(&[]);

    assert!(!out.is_processed());
    sim.run();

    assert!(out.is_processed());
    assert_eq!(sim.now(), SimTime::ZERO);
}

#[test]
fn any_of_with_a_processed_input_fires_immediately() {
    let mut sim = Simulation::new();
    let ev = sim.timeout(1.0).unwrap();
    sim.run();

    let out = sim.any_of(&[ev]);
    sim.run();

    assert!(out.is_processed());
    assert_eq!(sim.now(), 1.0);
}

#[test]
fn any_of_ignores_aborted_inputs() {
    let mut sim = Simulation::new();

    let a = sim.event();
    let b = sim.event();
    a.abort();
    let out = sim.any_of(&[a, b.clone()]);

    sim.run();
    assert!(out.is_pending());

    b.trigger();
    sim.run();
    assert!(out.is_processed());
}

#[test]
fn simultaneous_inputs_fire_any_of_once() {
    let mut sim = Simulation::new();
    let count = Rc::new(Cell::new(0));

    let a = sim.timeout(1.0).unwrap();
    let b = sim.timeout(1.0).unwrap();
    let out = sim.any_of(&[a, b]);
    {
        let count = count.clone();
        out.add_callback(move |_| count.set(count.get() + 1));
    }
    sim.run();

    assert_eq!(count.get(), 1);
}

#[test]
fn all_of_fires_when_the_latest_input_processes() {
    let mut sim = Simulation::new();
    let fired_at = Rc::new(Cell::new(None));

    let a = sim.timeout(1.0).unwrap();
    let b = sim.timeout(2.0).unwrap();
    let both = &a & &b;

    let scheduler = sim.scheduler();
    {
        let fired_at = fired_at.clone();
        both.add_callback(move |_| fired_at.set(Some(scheduler.now())));
    }
    sim.run();

    assert_eq!(fired_at.get(), Some(SimTime::new(2.0)));
}

#[test]
fn all_of_never_fires_if_an_input_never_processes() {
    let mut sim = Simulation::new();

    let a = sim.timeout(1.0).unwrap();
    let never = sim.event();
    let both = sim.all_of(&[a, never]);

    sim.run();
    assert!(both.is_pending());
}

#[test]
fn all_of_never_fires_if_an_input_is_aborted() {
    let mut sim = Simulation::new();

    let a = sim.timeout(1.0).unwrap();
    let b = sim.event();
    let both = sim.all_of(&[a.clone(), b.clone()]);
    b.abort();

    sim.run();
    assert!(a.is_processed());
    assert!(both.is_pending());
}

#[test]
fn all_of_with_no_pending_inputs_fires_immediately() {
    let mut sim = Simulation::new();

    let empty = sim.all_of(&[]);
    let ev = sim.timeout(1.0).unwrap();
    sim.run();
    assert!(empty.is_processed());

    let done = sim.all_of(&[ev]);
    sim.run();
    assert!(done.is_processed());
}

#[test]
fn value_races_carry_the_first_payload() {
    let mut sim = Simulation::new();

    let a = sim.timeout_value(1.0, "a").unwrap();
    let b = sim.timeout_value(2.0, "b").unwrap();
    let winner = &a | &b;

    sim.run();

    assert!(winner.is_processed());
    assert_eq!(winner.value(), "a");
}

#[test]
fn value_races_resolve_for_awaiting_actors() {
    let mut sim = Simulation::new();
    let observed = Rc::new(Cell::new(None));

    let a = sim.timeout_value(2.0, 20).unwrap();
    let b = sim.timeout_value(1.0, 10).unwrap();
    let winner = sim.any_of_values(&[a, b]);

    {
        let observed = observed.clone();
        sim.spawn(async move {
            observed.set(Some(winner.await));
        });
    }
    sim.run();

    assert_eq!(observed.get(), Some(10));
}
