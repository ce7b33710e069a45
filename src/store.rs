//! Bounded hand-off queue shared between actors.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::event::{Event, ValueEvent};
use crate::simulation::Scheduler;

/// A shared store holding values of type `T`, with backpressure.
///
/// Producers add values with [`put`](Store::put), consumers take them out
/// with [`get`](Store::get); both return events so that either side waits
/// when it must. A put waits while the store is at capacity and a get waits
/// while the store is empty. Pending puts and gets complete in arrival
/// order; aborting a returned event withdraws the operation.
///
/// The handle is cheap to clone so that several actors can share one store.
///
/// # Examples
///
/// ```
/// use corosim::simulation::Simulation;
/// use corosim::store::Store;
///
/// let mut sim = Simulation::new();
/// let store = Store::with_capacity(sim.scheduler(), 1);
///
/// store.put(100);
/// let first = store.get();
/// sim.run();
///
/// assert_eq!(first.value(), 100);
/// ```
pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

struct StoreInner<T> {
    scheduler: Scheduler,
    /// Maximum number of stored values.
    capacity: usize,
    /// Values currently in the store.
    values: RefCell<VecDeque<T>>,
    /// Pending get events, in arrival order.
    gets: RefCell<VecDeque<ValueEvent<T>>>,
    /// Pending put events with the values to be stored, in arrival order.
    puts: RefCell<VecDeque<(Event, T)>>,
}

impl<T: 'static> Store<T> {
    /// Creates a store with unlimited capacity.
    pub fn new(scheduler: Scheduler) -> Self {
        Self::with_capacity(scheduler, usize::MAX)
    }

    /// Creates a store holding at most `capacity` values.
    pub fn with_capacity(scheduler: Scheduler, capacity: usize) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                scheduler,
                capacity,
                values: RefCell::new(VecDeque::new()),
                gets: RefCell::new(VecDeque::new()),
                puts: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Takes the next value out of the store.
    ///
    /// The returned event is triggered with the value once one is
    /// available, which may be immediately. Aborting the event withdraws
    /// the get.
    pub fn get(&self) -> ValueEvent<T> {
        let event = self.inner.scheduler.value_event();

        // A completed get frees capacity, so pending puts are re-examined
        // once it is processed.
        let store = Rc::downgrade(&self.inner);
        event.add_callback(move |_| {
            if let Some(store) = store.upgrade() {
                store.admit_puts();
            }
        });

        self.inner.gets.borrow_mut().push_back(event.clone());
        self.inner.serve_gets();

        event
    }

    /// Adds a value to the store.
    ///
    /// The returned event is triggered once the store has capacity for the
    /// value, which may be immediately. Aborting the event withdraws the
    /// put and drops the value.
    pub fn put(&self, value: T) -> Event {
        let event = self.inner.scheduler.event();

        // A completed put makes a value available, so pending gets are
        // re-examined once it is processed.
        let store = Rc::downgrade(&self.inner);
        event.add_callback(move |_| {
            if let Some(store) = store.upgrade() {
                store.serve_gets();
            }
        });

        self.inner.puts.borrow_mut().push_back((event.clone(), value));
        self.inner.admit_puts();

        event
    }

    /// Returns the number of values currently in the store.
    pub fn len(&self) -> usize {
        self.inner.values.borrow().len()
    }

    /// Whether the store currently holds no value.
    pub fn is_empty(&self) -> bool {
        self.inner.values.borrow().is_empty()
    }
}

impl<T: 'static> StoreInner<T> {
    /// Hands stored values to pending gets in arrival order, skipping
    /// aborted gets.
    fn serve_gets(&self) {
        loop {
            if self.values.borrow().is_empty() {
                break;
            }
            let event = match self.gets.borrow_mut().pop_front() {
                Some(event) => event,
                None => break,
            };
            if event.is_aborted() {
                continue;
            }

            let Some(value) = self.values.borrow_mut().pop_front() else {
                break;
            };
            event.trigger(value);
        }
    }

    /// Moves pending puts into the store in arrival order while capacity
    /// remains, skipping aborted puts.
    fn admit_puts(&self) {
        loop {
            if self.values.borrow().len() >= self.capacity {
                break;
            }
            let (event, value) = match self.puts.borrow_mut().pop_front() {
                Some(put) => put,
                None => break,
            };
            if event.is_aborted() {
                continue;
            }

            self.values.borrow_mut().push_back(value);
            event.trigger();
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("stored", &self.inner.values.borrow().len())
            .field("capacity", &self.inner.capacity)
            .field("pending_gets", &self.inner.gets.borrow().len())
            .field("pending_puts", &self.inner.puts.borrow().len())
            .finish_non_exhaustive()
    }
}
