//! Simulation management: the run loop, event scheduling and actor spawning.
//!
//! This module contains the [`Simulation`] environment, the cloneable
//! [`Scheduler`] handle through which actors reach the simulation they run
//! on, and the [`SchedulingError`] type returned by the fallible scheduling
//! operations.
//!
//! # Simulation lifecycle
//!
//! A simulation typically goes through the following stages:
//!
//! 1. creation of a [`Simulation`] with [`Simulation::new`],
//! 2. creation of events and spawning of the initial actors, either directly
//!    on the simulation or through [`Scheduler`] handles,
//! 3. execution with [`step`](Simulation::step), [`run`](Simulation::run) or
//!    [`run_until`](Simulation::run_until), possibly interleaved with more
//!    spawning and scheduling.
//!
//! Execution is strictly single-threaded and deterministic. Processing an
//! event runs every observer to its next suspension point before the next
//! event is considered: resumed actors run first, in the order they
//! suspended, then callbacks, in the order they were registered. Events
//! scheduled for the same time are processed in scheduling order.
//!
//! Dropping the [`Simulation`] cancels every actor that is still suspended,
//! releasing its frame.

mod queue;

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures_task::noop_waker_ref;
use slab::Slab;

use crate::event::{Event, EventShared, ValueEvent};
use crate::time::SimTime;

use queue::EventQueue;

/// Error returned when a scheduling or run-loop operation is invalid.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SchedulingError {
    /// The requested delay is negative.
    InvalidDelay,
    /// The target time lies in the past of the current simulation time.
    InvalidTargetTime,
    /// There is no scheduled event to process.
    EmptyQueue,
}

impl fmt::Display for SchedulingError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDelay => {
                write!(fmt, "the delay before processing an event cannot be negative")
            }
            Self::InvalidTargetTime => write!(
                fmt,
                "the target time should not lie in the past of the current simulation time"
            ),
            Self::EmptyQueue => write!(fmt, "no events are scheduled for processing"),
        }
    }
}

impl Error for SchedulingError {}

/// A live actor task.
struct TaskEntry {
    /// Actor frame; taken out while the task is being polled.
    future: Option<Pin<Box<dyn Future<Output = ()>>>>,
    /// Backing of the actor's completion event, checked for cancellation
    /// before each resume.
    completion: Rc<EventShared>,
}

/// Shared state of a simulation.
pub(crate) struct SimState {
    /// Current simulation time.
    now: Cell<SimTime>,
    /// Scheduled events.
    queue: RefCell<EventQueue>,
    /// Frames of all live actor tasks.
    tasks: RefCell<Slab<TaskEntry>>,
    /// Task currently being polled, if any.
    current: Cell<Option<usize>>,
    /// Set when the running task must be destroyed instead of suspended.
    cancel_current: Cell<bool>,
}

impl SimState {
    fn new() -> Self {
        Self {
            now: Cell::new(SimTime::ZERO),
            queue: RefCell::new(EventQueue::new()),
            tasks: RefCell::new(Slab::new()),
            current: Cell::new(None),
            cancel_current: Cell::new(false),
        }
    }

    pub(crate) fn now(&self) -> SimTime {
        self.now.get()
    }

    pub(crate) fn current_task(&self) -> Option<usize> {
        self.current.get()
    }

    pub(crate) fn cancel_current_task(&self) {
        self.cancel_current.set(true);
    }

    /// Queues an event for processing at the current time.
    pub(crate) fn enqueue_now(&self, event: Rc<EventShared>) {
        self.queue.borrow_mut().insert(self.now.get(), event);
    }

    /// Queues an event for processing after a non-negative delay.
    pub(crate) fn enqueue_in(&self, delay: SimTime, event: Rc<EventShared>) {
        self.queue.borrow_mut().insert(self.now.get() + delay, event);
    }

    /// Validates the delay and queues the event.
    fn schedule(&self, event: Rc<EventShared>, delay: SimTime) -> Result<(), SchedulingError> {
        if delay.is_negative() {
            return Err(SchedulingError::InvalidDelay);
        }
        self.enqueue_in(delay, event);

        Ok(())
    }

    /// Destroys the frames of the given tasks.
    pub(crate) fn destroy_tasks(&self, ids: Vec<usize>) {
        let mut doomed = Vec::with_capacity(ids.len());
        {
            let mut tasks = self.tasks.borrow_mut();
            for id in ids {
                if let Some(entry) = tasks.try_remove(id) {
                    doomed.push(entry);
                }
            }
        }

        // Frames are dropped outside the borrow: a frame destructor may
        // reenter the simulation, e.g. by triggering an event from a guard
        // object.
        drop(doomed);
    }

    /// Resumes a suspended task.
    ///
    /// If the task's completion event was aborted since it suspended, its
    /// frame is destroyed instead of being resumed. Missing tasks are
    /// ignored.
    pub(crate) fn resume_task(&self, id: usize) {
        let mut future = {
            let mut tasks = self.tasks.borrow_mut();
            let Some(entry) = tasks.get_mut(id) else {
                return;
            };
            if entry.completion.is_aborted() {
                let entry = tasks.remove(id);
                drop(tasks);
                drop(entry);
                return;
            }
            match entry.future.take() {
                Some(future) => future,
                None => return,
            }
        };

        // The frame is polled while taken out of the arena so that the task
        // can reach the arena without re-borrowing its own entry.
        let previous = self.current.replace(Some(id));
        self.cancel_current.set(false);
        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = future.as_mut().poll(&mut cx);
        self.current.set(previous);

        match poll {
            Poll::Ready(()) => {
                let entry = self.tasks.borrow_mut().try_remove(id);
                drop(entry);
            }
            Poll::Pending => {
                if self.cancel_current.replace(false) {
                    // The task awaited an aborted event: destroy the frame.
                    let entry = self.tasks.borrow_mut().try_remove(id);
                    drop(entry);
                    drop(future);
                } else if let Some(entry) = self.tasks.borrow_mut().get_mut(id) {
                    entry.future = Some(future);
                }
            }
        }
    }
}

/// Handle to a simulation.
///
/// A `Scheduler` is cheap to clone and is how actor bodies reach the
/// simulation they run on: it creates events, schedules them and spawns
/// further actors. The [`Simulation`] exposes the same operations and hands
/// out handles with [`Simulation::scheduler`].
///
/// A handle does not keep the simulation alive. Once the [`Simulation`] is
/// dropped, event state transitions through a stale handle become no-ops
/// and the methods that need live simulation state panic.
#[derive(Clone)]
pub struct Scheduler {
    sim: Weak<SimState>,
}

impl Scheduler {
    pub(crate) fn from_weak(sim: Weak<SimState>) -> Self {
        Self { sim }
    }

    fn state(&self) -> Rc<SimState> {
        self.sim.upgrade().expect("the simulation no longer exists")
    }

    /// Returns the current simulation time.
    pub fn now(&self) -> SimTime {
        self.state().now()
    }

    /// Creates a new pending event bound to this simulation.
    pub fn event(&self) -> Event {
        Event::from_shared(EventShared::new(self.sim.clone()))
    }

    /// Creates a new pending value event bound to this simulation.
    pub fn value_event<V>(&self) -> ValueEvent<V> {
        ValueEvent::new(self.sim.clone())
    }

    /// Creates a pending event already scheduled to be processed after the
    /// given delay.
    pub fn timeout(&self, delay: impl Into<SimTime>) -> Result<Event, SchedulingError> {
        let state = self.state();
        let event = self.event();
        state.schedule(event.shared.clone(), delay.into())?;

        Ok(event)
    }

    /// Creates a pending value event with its payload pre-set, scheduled to
    /// be processed after the given delay.
    pub fn timeout_value<V>(
        &self,
        delay: impl Into<SimTime>,
        value: V,
    ) -> Result<ValueEvent<V>, SchedulingError> {
        let state = self.state();
        let event = self.value_event();
        event.set_value(value);
        state.schedule(event.shared.clone(), delay.into())?;

        Ok(event)
    }

    /// Queues an event for processing after the given delay, without
    /// changing its state.
    ///
    /// An event may be queued several times; it is processed at its earliest
    /// entry and the later entries are then no-ops.
    pub fn schedule(
        &self,
        event: &Event,
        delay: impl Into<SimTime>,
    ) -> Result<(), SchedulingError> {
        self.state().schedule(event.shared.clone(), delay.into())
    }

    /// Spawns an actor and returns the event representing its completion.
    ///
    /// The returned event is triggered when the actor body returns, so
    /// awaiting the actor is awaiting its completion. Aborting the returned
    /// event cancels the actor: its frame is destroyed at the next point it
    /// would have been resumed from.
    ///
    /// The body is not entered synchronously; its first poll is driven by
    /// the event queue at the current simulation time.
    pub fn spawn<F>(&self, future: F) -> Event
    where
        F: Future<Output = ()> + 'static,
    {
        let completion = self.event();
        let shared = completion.shared.clone();
        let body = async move {
            future.await;
            EventShared::trigger(&shared);
        };

        #[cfg(feature = "tracing")]
        let body = {
            let span =
                tracing::span!(target: env!("CARGO_PKG_NAME"), tracing::Level::INFO, "actor");
            tracing::Instrument::instrument(body, span)
        };

        self.spawn_task(Box::pin(body), completion.shared.clone());

        completion
    }

    /// Spawns a value-returning actor.
    ///
    /// Behaves as [`spawn`](Scheduler::spawn), except that the value
    /// produced by the body becomes the payload of the returned event, so
    /// awaiting the actor yields that value.
    pub fn spawn_value<V, F>(&self, future: F) -> ValueEvent<V>
    where
        V: 'static,
        F: Future<Output = V> + 'static,
    {
        let completion = self.value_event();
        let handle = completion.clone();
        let body = async move {
            let value = future.await;
            handle.trigger(value);
        };

        #[cfg(feature = "tracing")]
        let body = {
            let span =
                tracing::span!(target: env!("CARGO_PKG_NAME"), tracing::Level::INFO, "actor");
            tracing::Instrument::instrument(body, span)
        };

        self.spawn_task(Box::pin(body), completion.shared.clone());

        completion
    }

    fn spawn_task(&self, future: Pin<Box<dyn Future<Output = ()>>>, completion: Rc<EventShared>) {
        let state = self.state();

        let id = state.tasks.borrow_mut().insert(TaskEntry {
            future: Some(future),
            completion,
        });

        // The first poll goes through the event queue so that spawning never
        // reenters the actor body synchronously.
        let start = EventShared::new(self.sim.clone());
        start.add_waiter(id);
        EventShared::trigger(&start);
    }

    /// Returns a pending event that is processed as soon as any of the given
    /// events is processed.
    ///
    /// If one of the inputs is already processed, or if the input list is
    /// empty, the returned event is queued immediately. Aborted inputs
    /// contribute nothing: the returned event stays pending until another
    /// input is processed.
    pub fn any_of(&self, events: &[Event]) -> Event {
        let output = self.event();

        if events.is_empty() {
            output.trigger();
            return output;
        }

        for event in events {
            if event.is_processed() {
                // Triggering is idempotent, so several processed inputs are
                // fine.
                output.trigger();
            } else {
                let output = output.clone();
                event.add_callback(move |_| output.trigger());
            }
        }

        output
    }

    /// Returns a pending event that is processed once every one of the given
    /// events has been processed.
    ///
    /// If all inputs are already processed, or if the input list is empty,
    /// the returned event is queued immediately. If any input is aborted,
    /// the returned event never completes.
    pub fn all_of(&self, events: &[Event]) -> Event {
        let output = self.event();
        let remaining = Rc::new(Cell::new(0usize));

        for event in events {
            if event.is_processed() {
                continue;
            }
            remaining.set(remaining.get() + 1);

            let output = output.clone();
            let remaining = remaining.clone();
            event.add_callback(move |_| {
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    output.trigger();
                }
            });
        }

        if remaining.get() == 0 {
            output.trigger();
        }

        output
    }

    /// Returns a pending value event carrying the payload of whichever of
    /// the given events is processed first.
    ///
    /// # Panics
    ///
    /// Panics if the input list is empty, since the race would then have no
    /// payload to deliver.
    pub fn any_of_values<V>(&self, events: &[ValueEvent<V>]) -> ValueEvent<V>
    where
        V: Clone + 'static,
    {
        assert!(
            !events.is_empty(),
            "a value race requires at least one input event"
        );

        let output = self.value_event();

        for event in events {
            if event.is_processed() {
                output.trigger(event.value());
            } else {
                // Capturing the payload slot rather than the input event
                // keeps the input's callback list from owning the input.
                let output = output.clone();
                let payload = event.payload();
                event.add_callback(move |_| {
                    let value = payload
                        .borrow()
                        .clone()
                        .expect("no payload has been set on this value event");
                    output.trigger(value);
                });
            }
        }

        output
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Scheduler");
        if let Some(state) = self.sim.upgrade() {
            debug.field("now", &state.now());
        }
        debug.finish_non_exhaustive()
    }
}

/// Simulation environment.
///
/// A `Simulation` owns the simulation state: the virtual clock, the queue of
/// scheduled events and the frames of all live actors. It is advanced
/// explicitly:
///
/// 1. [`step()`](Simulation::step) pulls the earliest scheduled event, moves
///    the clock to its timestamp and processes it;
/// 2. [`run()`](Simulation::run) steps until no scheduled events remain;
/// 3. [`run_until()`](Simulation::run_until) steps while the next event lies
///    strictly before a target time, then moves the clock to the target.
///
/// The clock never moves backwards. When the `Simulation` is dropped, every
/// actor that is still suspended is cancelled and its frame released.
pub struct Simulation {
    state: Rc<SimState>,
    scheduler: Scheduler,
}

impl Simulation {
    /// Creates a new simulation with the clock at [`SimTime::ZERO`].
    pub fn new() -> Self {
        let state = Rc::new(SimState::new());
        let scheduler = Scheduler::from_weak(Rc::downgrade(&state));

        Self { state, scheduler }
    }

    /// Returns a handle to this simulation, to be passed to actor bodies.
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    /// Returns the current simulation time.
    pub fn now(&self) -> SimTime {
        self.state.now()
    }

    /// Creates a new pending event; see [`Scheduler::event`].
    pub fn event(&self) -> Event {
        self.scheduler.event()
    }

    /// Creates a new pending value event; see [`Scheduler::value_event`].
    pub fn value_event<V>(&self) -> ValueEvent<V> {
        self.scheduler.value_event()
    }

    /// Creates an event scheduled after a delay; see [`Scheduler::timeout`].
    pub fn timeout(&self, delay: impl Into<SimTime>) -> Result<Event, SchedulingError> {
        self.scheduler.timeout(delay)
    }

    /// Creates a scheduled value event; see [`Scheduler::timeout_value`].
    pub fn timeout_value<V>(
        &self,
        delay: impl Into<SimTime>,
        value: V,
    ) -> Result<ValueEvent<V>, SchedulingError> {
        self.scheduler.timeout_value(delay, value)
    }

    /// Queues an event after a delay; see [`Scheduler::schedule`].
    pub fn schedule(
        &self,
        event: &Event,
        delay: impl Into<SimTime>,
    ) -> Result<(), SchedulingError> {
        self.scheduler.schedule(event, delay)
    }

    /// Spawns an actor; see [`Scheduler::spawn`].
    pub fn spawn<F>(&self, future: F) -> Event
    where
        F: Future<Output = ()> + 'static,
    {
        self.scheduler.spawn(future)
    }

    /// Spawns a value-returning actor; see [`Scheduler::spawn_value`].
    pub fn spawn_value<V, F>(&self, future: F) -> ValueEvent<V>
    where
        V: 'static,
        F: Future<Output = V> + 'static,
    {
        self.scheduler.spawn_value(future)
    }

    /// Derives an event from a set of events; see [`Scheduler::any_of`].
    pub fn any_of(&self, events: &[Event]) -> Event {
        self.scheduler.any_of(events)
    }

    /// Derives an event from a set of events; see [`Scheduler::all_of`].
    pub fn all_of(&self, events: &[Event]) -> Event {
        self.scheduler.all_of(events)
    }

    /// Derives a typed race; see [`Scheduler::any_of_values`].
    pub fn any_of_values<V>(&self, events: &[ValueEvent<V>]) -> ValueEvent<V>
    where
        V: Clone + 'static,
    {
        self.scheduler.any_of_values(events)
    }

    /// Processes the next scheduled event, advancing the clock to its
    /// timestamp.
    ///
    /// Returns the new simulation time, or
    /// [`SchedulingError::EmptyQueue`] if no event is scheduled.
    pub fn step(&mut self) -> Result<SimTime, SchedulingError> {
        let (time, event) = self
            .state
            .queue
            .borrow_mut()
            .pull()
            .ok_or(SchedulingError::EmptyQueue)?;
        self.state.now.set(time);

        #[cfg(feature = "tracing")]
        tracing::trace!(target: env!("CARGO_PKG_NAME"), time = %time, "processing event");

        EventShared::process(&event, &self.state);

        Ok(time)
    }

    /// Steps until no scheduled events remain.
    pub fn run(&mut self) {
        while self.step().is_ok() {}
    }

    /// Steps while the next scheduled event lies strictly before the target
    /// time, then moves the clock to the target.
    ///
    /// An event scheduled exactly at the target is not processed by this
    /// call; the next call or [`step`](Simulation::step) picks it up.
    /// Returns [`SchedulingError::InvalidTargetTime`] if the target lies in
    /// the past of the current simulation time.
    pub fn run_until(&mut self, target: impl Into<SimTime>) -> Result<(), SchedulingError> {
        let target = target.into();
        if target < self.state.now() {
            return Err(SchedulingError::InvalidTargetTime);
        }

        loop {
            let next = self.state.queue.borrow().next_time();
            match next {
                Some(time) if time < target => {
                    self.step()?;
                }
                _ => break,
            }
        }
        self.state.now.set(target);

        Ok(())
    }

    /// Whether no events are scheduled.
    pub fn is_empty(&self) -> bool {
        self.state.queue.borrow().is_empty()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}
