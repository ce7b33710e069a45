//! Events carrying a typed payload.

use std::cell::RefCell;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::ops::{BitAnd, BitOr};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use super::{Event, EventShared};
use crate::simulation::{Scheduler, SimState};

/// An event carrying a typed payload delivered to awaiters.
///
/// The payload must be set no later than the moment the event is triggered;
/// [`trigger`](ValueEvent::trigger) does both at once and
/// [`Scheduler::timeout_value`] pre-loads the payload when scheduling. All
/// clones of the handle share the same payload slot.
///
/// Since several actors may await the same event, the payload is handed out
/// by cloning, which is why awaiting and [`value`](ValueEvent::value)
/// require `V: Clone`.
pub struct ValueEvent<V> {
    pub(crate) shared: Rc<EventShared>,
    value: Rc<RefCell<Option<V>>>,
}

impl<V> ValueEvent<V> {
    pub(crate) fn new(sim: Weak<SimState>) -> Self {
        Self {
            shared: EventShared::new(sim),
            value: Rc::new(RefCell::new(None)),
        }
    }

    /// Sets the payload, then triggers the event.
    ///
    /// No-op if the event is not pending.
    pub fn trigger(&self, value: V) {
        if !self.shared.is_pending() {
            return;
        }
        self.set_value(value);
        EventShared::trigger(&self.shared);
    }

    pub(crate) fn set_value(&self, value: V) {
        *self.value.borrow_mut() = Some(value);
    }

    /// Returns the shared payload slot.
    pub(crate) fn payload(&self) -> Rc<RefCell<Option<V>>> {
        self.value.clone()
    }

    /// Aborts the event, as [`Event::abort`] does.
    pub fn abort(&self) {
        self.shared.abort();
    }

    /// Registers a callback to run when the event is processed.
    ///
    /// The callback receives the untyped view of this event; use
    /// [`value`](ValueEvent::value) on a retained handle to read the
    /// payload.
    pub fn add_callback(&self, cb: impl FnOnce(&Event) + 'static) {
        self.shared.add_callback(Box::new(cb));
    }

    /// Returns the untyped view of this event, sharing the same backing.
    pub fn as_event(&self) -> Event {
        Event::from_shared(self.shared.clone())
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

impl<V: Clone> ValueEvent<V> {
    /// Returns a copy of the payload.
    ///
    /// The payload exists once the event was triggered with a value or was
    /// created by [`Scheduler::timeout_value`].
    ///
    /// # Panics
    ///
    /// Panics if no payload has been set.
    pub fn value(&self) -> V {
        self.value
            .borrow()
            .clone()
            .expect("no payload has been set on this value event")
    }
}

impl<V> Clone for ValueEvent<V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            value: self.value.clone(),
        }
    }
}

impl<V> PartialEq for ValueEvent<V> {
    /// Implements equality by identity: two handles are equal when they
    /// refer to the same underlying event.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<V> Eq for ValueEvent<V> {}

impl<V> fmt::Debug for ValueEvent<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueEvent")
            .field("has_value", &self.value.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl<V> From<ValueEvent<V>> for Event {
    fn from(event: ValueEvent<V>) -> Self {
        Event::from_shared(event.shared)
    }
}

impl<V> From<&ValueEvent<V>> for Event {
    fn from(event: &ValueEvent<V>) -> Self {
        event.as_event()
    }
}

impl<V: Clone + 'static> BitOr for &ValueEvent<V> {
    type Output = ValueEvent<V>;

    /// Pair-wise shorthand for [`Scheduler::any_of_values`].
    fn bitor(self, other: &ValueEvent<V>) -> ValueEvent<V> {
        Scheduler::from_weak(self.shared.sim()).any_of_values(&[self.clone(), other.clone()])
    }
}

impl<V: Clone + 'static> BitOr for ValueEvent<V> {
    type Output = ValueEvent<V>;

    fn bitor(self, other: ValueEvent<V>) -> ValueEvent<V> {
        &self | &other
    }
}

impl<V> BitAnd for &ValueEvent<V> {
    type Output = Event;

    /// Pair-wise shorthand for [`Scheduler::all_of`], dropping the payload
    /// typing.
    fn bitand(self, other: &ValueEvent<V>) -> Event {
        Scheduler::from_weak(self.shared.sim()).all_of(&[self.as_event(), other.as_event()])
    }
}

impl<V> BitAnd for ValueEvent<V> {
    type Output = Event;

    fn bitand(self, other: ValueEvent<V>) -> Event {
        &self & &other
    }
}

/// Future returned when awaiting a [`ValueEvent`].
///
/// Resolves to the payload when the event is processed, with the same
/// fast-path and abort behavior as [`EventFuture`](super::EventFuture).
pub struct ValueEventFuture<V> {
    event: ValueEvent<V>,
    registered: bool,
}

impl<V: Clone> Future for ValueEventFuture<V> {
    type Output = V;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<V> {
        let this = self.get_mut();

        match this.event.shared.poll_wait(&mut this.registered) {
            Poll::Ready(()) => Poll::Ready(this.event.value()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<V> fmt::Debug for ValueEventFuture<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueEventFuture").finish_non_exhaustive()
    }
}

impl<V: Clone> IntoFuture for ValueEvent<V> {
    type Output = V;
    type IntoFuture = ValueEventFuture<V>;

    fn into_future(self) -> ValueEventFuture<V> {
        ValueEventFuture {
            event: self,
            registered: false,
        }
    }
}

impl<V: Clone> IntoFuture for &ValueEvent<V> {
    type Output = V;
    type IntoFuture = ValueEventFuture<V>;

    fn into_future(self) -> ValueEventFuture<V> {
        self.clone().into_future()
    }
}
