//! Counted resource shared between actors.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::event::Event;
use crate::simulation::Scheduler;

/// A counted resource with FIFO request semantics.
///
/// A `Resource` holds a number of interchangeable units. Actors acquire a
/// unit by awaiting the event returned by [`request`](Resource::request) and
/// give it back with [`release`](Resource::release). Requests are granted in
/// arrival order as units become available; a queued request is withdrawn by
/// aborting its event.
///
/// The handle is cheap to clone so that several actors can share one
/// resource.
///
/// # Examples
///
/// ```
/// use corosim::resource::Resource;
/// use corosim::simulation::{Scheduler, Simulation};
///
/// async fn worker(scheduler: Scheduler, machine: Resource) {
///     machine.request().await;
///     scheduler.timeout(10.0).unwrap().await;
///     machine.release();
/// }
///
/// let mut sim = Simulation::new();
/// let machine = Resource::new(sim.scheduler(), 1);
/// sim.spawn(worker(sim.scheduler(), machine.clone()));
/// sim.spawn(worker(sim.scheduler(), machine.clone()));
/// sim.run();
///
/// // The second worker waited for the first to release.
/// assert_eq!(sim.now(), 20.0);
/// ```
#[derive(Clone)]
pub struct Resource {
    inner: Rc<ResourceInner>,
}

struct ResourceInner {
    scheduler: Scheduler,
    available: Cell<u64>,
    requests: RefCell<VecDeque<Event>>,
}

impl Resource {
    /// Creates a resource with the given number of available units.
    pub fn new(scheduler: Scheduler, available: u64) -> Self {
        Self {
            inner: Rc::new(ResourceInner {
                scheduler,
                available: Cell::new(available),
                requests: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Requests one unit of the resource.
    ///
    /// The returned event is triggered once a unit is granted, which may be
    /// immediately. Aborting the event withdraws the request.
    pub fn request(&self) -> Event {
        let event = self.inner.scheduler.event();
        self.inner.requests.borrow_mut().push_back(event.clone());
        self.inner.grant_pending();

        event
    }

    /// Returns one unit to the resource, granting it to the next queued
    /// request if any.
    pub fn release(&self) {
        self.inner.available.set(self.inner.available.get() + 1);
        self.inner.grant_pending();
    }

    /// Returns the number of currently available units.
    pub fn available(&self) -> u64 {
        self.inner.available.get()
    }
}

impl ResourceInner {
    /// Grants queued requests in FIFO order while units remain, skipping
    /// aborted requests.
    fn grant_pending(&self) {
        loop {
            if self.available.get() == 0 {
                break;
            }
            let event = match self.requests.borrow_mut().pop_front() {
                Some(event) => event,
                None => break,
            };
            if event.is_aborted() {
                continue;
            }

            self.available.set(self.available.get() - 1);
            event.trigger();
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("available", &self.inner.available.get())
            .field("queued", &self.inner.requests.borrow().len())
            .finish_non_exhaustive()
    }
}
