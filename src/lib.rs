//! A coroutine-based discrete-event simulation kernel.
//!
//! `corosim` lets you express simulated actors as ordinary `async` functions.
//! Simulated time advances in jumps from one scheduled event to the next;
//! between jumps, any number of actors may observe the same instant. The
//! kernel is strictly single-threaded and deterministic: events scheduled
//! for the same time are processed in the order they were scheduled.
//!
//! # Events
//!
//! An [`Event`](event::Event) is a shared synchronization object with a
//! four-state lifecycle. It is created *pending*, becomes *triggered* when
//! [`trigger`](event::Event::trigger) is called, and is *processed* when the
//! run loop delivers it, resuming every awaiting actor and then running
//! every callback, each in registration order. A pending event may instead
//! be *aborted*, which destroys its suspended observers.
//! [`ValueEvent`](event::ValueEvent) additionally carries a typed payload
//! delivered to awaiters.
//!
//! # Actors
//!
//! An actor is any `async` block or function spawned on the simulation with
//! [`spawn`](simulation::Simulation::spawn). Spawning returns an
//! [`Event`](event::Event) that is triggered when the actor body returns, so
//! actors compose with events everywhere: awaiting an actor is awaiting its
//! completion event. Value-returning actors are spawned with
//! [`spawn_value`](simulation::Simulation::spawn_value) and yield their
//! result to awaiters.
//!
//! Actors are started through the event queue rather than synchronously, so
//! a spawn call never reenters the actor body.
//!
//! # Running a simulation
//!
//! ```
//! use corosim::simulation::Simulation;
//!
//! let mut sim = Simulation::new();
//! let scheduler = sim.scheduler();
//!
//! let arrival = sim.spawn(async move {
//!     scheduler.timeout(10.0).unwrap().await;
//! });
//!
//! sim.run();
//!
//! assert!(arrival.is_processed());
//! assert_eq!(sim.now(), 10.0);
//! ```
//!
//! The run loop is explicit: [`step`](simulation::Simulation::step) delivers
//! the next event, [`run`](simulation::Simulation::run) drains the queue and
//! [`run_until`](simulation::Simulation::run_until) stops in front of a
//! target time. An event scheduled exactly at the target is not delivered by
//! `run_until`; the next call picks it up.
//!
//! # Composition
//!
//! [`any_of`](simulation::Scheduler::any_of) and
//! [`all_of`](simulation::Scheduler::all_of) derive an event from a set of
//! input events, with `|` and `&` as pair-wise shorthands:
//!
//! ```
//! use corosim::simulation::Simulation;
//!
//! let mut sim = Simulation::new();
//! let request = sim.event();
//! let deadline = sim.timeout(5.0).unwrap();
//! let outcome = &request | &deadline;
//!
//! sim.run();
//!
//! assert!(outcome.is_processed());
//! assert_eq!(sim.now(), 5.0);
//! assert!(request.is_pending());
//! ```
//!
//! Cancellation is an event operation as well:
//! [`abort`](event::Event::abort) cancels a pending event and destroys every
//! actor suspended on it. Aborting the completion event of an actor cancels
//! the actor itself.
//!
//! # Shared helpers
//!
//! The [`resource`] and [`store`] modules provide the two classic
//! coordination helpers built over events: a counted resource with FIFO
//! request semantics and a bounded hand-off queue with backpressure.

#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod event;
pub mod resource;
pub mod simulation;
pub mod store;
pub mod time;
