//! Events and their lifecycle.
//!
//! An [`Event`] is the synchronization primitive of the simulation. It is
//! created pending, can be [`trigger`](Event::trigger)ed to queue its
//! processing at the current time, and is *processed* when the run loop
//! delivers it: every actor suspended on the event is resumed in suspension
//! order, then every callback runs in registration order. A pending event
//! may instead be [`abort`](Event::abort)ed, which destroys its suspended
//! observers.
//!
//! Events are cheap-clone handles over shared backing; all clones observe
//! and mutate the same state. [`ValueEvent`] extends the lifecycle with a
//! typed payload handed to awaiters.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::{Future, IntoFuture};
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr};
use std::pin::Pin;
use std::ptr;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use crate::simulation::{Scheduler, SchedulingError, SimState};
use crate::time::SimTime;

mod value;

pub use value::{ValueEvent, ValueEventFuture};

/// Lifecycle state of an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EventState {
    /// Not yet triggered or aborted.
    Pending,
    /// Queued for processing at the current simulation time.
    Triggered,
    /// Delivered to all observers.
    Processed,
    /// Cancelled while pending.
    Aborted,
}

/// Shared backing of an event.
///
/// All clones of an [`Event`] handle, the scheduler queue entries and the
/// awaiting tasks refer to one `EventShared`; it is released when the last
/// holder drops it.
pub(crate) struct EventShared {
    /// Current lifecycle state.
    state: Cell<EventState>,
    /// Tasks suspended on this event, in suspension order.
    waiters: RefCell<Vec<usize>>,
    /// Callbacks to run on processing, in registration order.
    callbacks: RefCell<Vec<Box<dyn FnOnce(&Event)>>>,
    /// Owning simulation state.
    sim: Weak<SimState>,
}

impl EventShared {
    pub(crate) fn new(sim: Weak<SimState>) -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(EventState::Pending),
            waiters: RefCell::new(Vec::new()),
            callbacks: RefCell::new(Vec::new()),
            sim,
        })
    }

    pub(crate) fn sim(&self) -> Weak<SimState> {
        self.sim.clone()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.state.get() == EventState::Pending
    }

    pub(crate) fn is_triggered(&self) -> bool {
        matches!(
            self.state.get(),
            EventState::Triggered | EventState::Processed
        )
    }

    pub(crate) fn is_processed(&self) -> bool {
        self.state.get() == EventState::Processed
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.state.get() == EventState::Aborted
    }

    /// Moves a pending event to the triggered state and queues it for
    /// processing at the current time.
    pub(crate) fn trigger(this: &Rc<Self>) {
        if this.state.get() != EventState::Pending {
            return;
        }
        this.state.set(EventState::Triggered);

        if let Some(sim) = this.sim.upgrade() {
            sim.enqueue_now(this.clone());
        }
    }

    /// Cancels a pending event, dropping its callbacks and destroying every
    /// suspended observer.
    pub(crate) fn abort(&self) {
        if self.state.get() != EventState::Pending {
            return;
        }
        self.state.set(EventState::Aborted);

        self.callbacks.take();
        let waiters = self.waiters.take();
        if let Some(sim) = self.sim.upgrade() {
            sim.destroy_tasks(waiters);
        }
    }

    pub(crate) fn add_callback(&self, cb: Box<dyn FnOnce(&Event)>) {
        match self.state.get() {
            // Terminal states never fire callbacks registered after the
            // transition.
            EventState::Processed | EventState::Aborted => {}
            EventState::Pending | EventState::Triggered => {
                self.callbacks.borrow_mut().push(cb);
            }
        }
    }

    pub(crate) fn add_waiter(&self, task: usize) {
        self.waiters.borrow_mut().push(task);
    }

    /// Delivers the event.
    ///
    /// Resumes the awaiting tasks in suspension order, then runs the
    /// callbacks in registration order. No-op on terminal states, so an
    /// event that was queued several times is delivered only once.
    pub(crate) fn process(this: &Rc<Self>, sim: &SimState) {
        match this.state.get() {
            EventState::Processed | EventState::Aborted => return,
            EventState::Pending | EventState::Triggered => {}
        }
        this.state.set(EventState::Processed);

        let waiters = this.waiters.take();
        for task in waiters {
            sim.resume_task(task);
        }

        let callbacks = this.callbacks.take();
        if !callbacks.is_empty() {
            let event = Event::from_shared(this.clone());
            for cb in callbacks {
                cb(&event);
            }
        }
    }

    /// Await machinery shared by the typed and untyped event futures.
    ///
    /// Readiness is the processed state. Awaiting an aborted event flags the
    /// running task for destruction; the run loop drops its frame once this
    /// poll returns.
    pub(crate) fn poll_wait(&self, registered: &mut bool) -> Poll<()> {
        match self.state.get() {
            EventState::Processed => Poll::Ready(()),
            EventState::Aborted => {
                if let Some(sim) = self.sim.upgrade() {
                    sim.cancel_current_task();
                }

                Poll::Pending
            }
            EventState::Pending | EventState::Triggered => {
                if !*registered {
                    let task = self
                        .sim
                        .upgrade()
                        .and_then(|sim| sim.current_task())
                        .expect(
                            "events can only be awaited from an actor spawned on the simulation",
                        );
                    self.add_waiter(task);
                    *registered = true;
                }

                Poll::Pending
            }
        }
    }
}

/// A shared event that can be awaited, triggered and aborted.
///
/// `Event` is a handle: clones are cheap and refer to the same underlying
/// state, so an event can simultaneously sit in the scheduler queue, be
/// awaited by several actors and be retained by user code.
///
/// Events are created with [`Scheduler::event`], [`Scheduler::timeout`] or
/// by [`spawn`](Scheduler::spawn)ing an actor, whose completion they then
/// represent.
#[derive(Clone)]
pub struct Event {
    pub(crate) shared: Rc<EventShared>,
}

impl Event {
    pub(crate) fn from_shared(shared: Rc<EventShared>) -> Self {
        Self { shared }
    }

    /// Triggers the event, queueing its processing at the current
    /// simulation time.
    ///
    /// No-op if the event is not pending.
    pub fn trigger(&self) {
        EventShared::trigger(&self.shared);
    }

    /// Queues the event for processing after the given delay.
    ///
    /// Unlike [`trigger`](Event::trigger), the event stays pending until the
    /// queue entry is delivered, so it can still be aborted in the meantime.
    /// No-op if the event is not pending.
    pub fn trigger_delayed(&self, delay: impl Into<SimTime>) -> Result<(), SchedulingError> {
        let delay = delay.into();
        if delay.is_negative() {
            return Err(SchedulingError::InvalidDelay);
        }
        if !self.is_pending() {
            return Ok(());
        }

        if let Some(sim) = self.shared.sim.upgrade() {
            sim.enqueue_in(delay, self.shared.clone());
        }

        Ok(())
    }

    /// Aborts the event.
    ///
    /// Every actor suspended on the event is destroyed and the registered
    /// callbacks are dropped. No-op if the event is not pending.
    pub fn abort(&self) {
        self.shared.abort();
    }

    /// Registers a callback to run when the event is processed.
    ///
    /// Callbacks run after all suspended actors have been resumed, in
    /// registration order. Registering on an already processed or aborted
    /// event discards the callback.
    pub fn add_callback(&self, cb: impl FnOnce(&Event) + 'static) {
        self.shared.add_callback(Box::new(cb));
    }

    /// Whether the event was neither triggered nor aborted yet.
    pub fn is_pending(&self) -> bool {
        self.shared.is_pending()
    }

    /// Whether the event was triggered, including if it was processed since.
    pub fn is_triggered(&self) -> bool {
        self.shared.is_triggered()
    }

    /// Whether the event was processed.
    pub fn is_processed(&self) -> bool {
        self.shared.is_processed()
    }

    /// Whether the event was aborted.
    pub fn is_aborted(&self) -> bool {
        self.shared.is_aborted()
    }
}

impl PartialEq for Event {
    /// Implements equality by identity: two handles are equal when they
    /// refer to the same underlying event.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        ptr::hash(Rc::as_ptr(&self.shared), state)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("state", &self.shared.state.get())
            .finish_non_exhaustive()
    }
}

impl BitOr for &Event {
    type Output = Event;

    /// Pair-wise shorthand for [`Scheduler::any_of`].
    fn bitor(self, other: &Event) -> Event {
        Scheduler::from_weak(self.shared.sim()).any_of(&[self.clone(), other.clone()])
    }
}

impl BitOr for Event {
    type Output = Event;

    fn bitor(self, other: Event) -> Event {
        &self | &other
    }
}

impl BitAnd for &Event {
    type Output = Event;

    /// Pair-wise shorthand for [`Scheduler::all_of`].
    fn bitand(self, other: &Event) -> Event {
        Scheduler::from_weak(self.shared.sim()).all_of(&[self.clone(), other.clone()])
    }
}

impl BitAnd for Event {
    type Output = Event;

    fn bitand(self, other: Event) -> Event {
        &self & &other
    }
}

/// Future returned when awaiting an [`Event`].
///
/// Resolves when the event is processed. If the event is already processed
/// the awaiting actor does not suspend at all; if the event is or becomes
/// aborted, the awaiting actor is destroyed and never resumes.
pub struct EventFuture {
    shared: Rc<EventShared>,
    registered: bool,
}

impl Future for EventFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        this.shared.poll_wait(&mut this.registered)
    }
}

impl fmt::Debug for EventFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFuture").finish_non_exhaustive()
    }
}

impl IntoFuture for Event {
    type Output = ();
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        EventFuture {
            shared: self.shared,
            registered: false,
        }
    }
}

impl IntoFuture for &Event {
    type Output = ();
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        self.clone().into_future()
    }
}
