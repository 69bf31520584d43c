//! Typed publish/subscribe with immediate and deferred delivery.
//!
//! Subscribers are held weakly, dropping the last strong reference of a
//! receiver unsubscribes it implicitly. Delivery is a plain nested call: a
//! receiver that panics aborts the delivery to every receiver after it.
//!
//! Emitting from inside a callback is allowed. A receiver that is still inside
//! one of its own callbacks gets the nested event right after that callback
//! returns, every other receiver gets it immediately.

use std::any::{self, Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use super::component::Component;
use super::entity::{ComponentHandle, Entity};
use crate::registry::Lifecycle;

/// A receiver of events of type `E`.
pub trait Receiver<E> {
    fn receive(&mut self, event: &E);
}

struct Subscriber<E> {
    key: *const (),
    receiver: Weak<RefCell<dyn Receiver<E>>>,
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        Subscriber {
            key: self.key,
            receiver: self.receiver.clone(),
        }
    }
}

struct Channel<E> {
    subscribers: Vec<Subscriber<E>>,
}

type Deferred = Box<dyn FnOnce(&EventManager)>;
type Pending = Box<dyn FnOnce()>;

/// A typed event bus.
#[derive(Default)]
pub struct EventManager {
    channels: RefCell<HashMap<TypeId, Box<dyn Any>>>,
    queue: RefCell<Vec<Deferred>>,
    // Deliveries to receivers that were inside a callback, keyed by receiver.
    backlogs: RefCell<HashMap<*const (), VecDeque<Pending>>>,
}

impl EventManager {
    /// Creates a new `EventManager` without any subscriber.
    pub fn new() -> Self {
        EventManager::default()
    }

    /// Subscribes `receiver` to events of type `E`. Returns false if it has
    /// been subscribed already.
    pub fn subscribe<E, R>(&self, receiver: &Rc<RefCell<R>>) -> bool
    where
        E: 'static,
        R: Receiver<E> + 'static,
    {
        let key = Rc::as_ptr(receiver) as *const ();
        let strong: Rc<RefCell<dyn Receiver<E>>> = receiver.clone();

        let mut channels = self.channels.borrow_mut();
        let channel = channels
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Channel::<E> { subscribers: Vec::new() }) as Box<dyn Any>)
            .downcast_mut::<Channel<E>>();

        match channel {
            Some(channel) => {
                if channel.subscribers.iter().any(|v| v.key == key) {
                    return false;
                }

                channel.subscribers.push(Subscriber {
                    key,
                    receiver: Rc::downgrade(&strong),
                });

                debug!(
                    "[EventManager] subscribes {} to {}.",
                    any::type_name::<R>(),
                    any::type_name::<E>()
                );

                true
            }
            None => unreachable!("channel of {} has a mismatched type", any::type_name::<E>()),
        }
    }

    /// Unsubscribes `receiver` from events of type `E`. Returns false if it was
    /// not subscribed.
    pub fn unsubscribe<E, R>(&self, receiver: &Rc<RefCell<R>>) -> bool
    where
        E: 'static,
        R: Receiver<E> + 'static,
    {
        let key = Rc::as_ptr(receiver) as *const ();
        let mut channels = self.channels.borrow_mut();

        if let Some(channel) = Self::channel_mut::<E>(&mut channels) {
            let len = channel.subscribers.len();
            channel.subscribers.retain(|v| v.key != key);

            if channel.subscribers.len() != len {
                debug!(
                    "[EventManager] unsubscribes {} from {}.",
                    any::type_name::<R>(),
                    any::type_name::<E>()
                );

                return true;
            }
        }

        false
    }

    /// Returns the number of alive receivers of events of type `E`.
    pub fn subscribers<E: 'static>(&self) -> usize {
        let channels = self.channels.borrow();
        channels
            .get(&TypeId::of::<E>())
            .and_then(|v| v.downcast_ref::<Channel<E>>())
            .map_or(0, |v| {
                v.subscribers
                    .iter()
                    .filter(|s| s.receiver.strong_count() > 0)
                    .count()
            })
    }

    /// Delivers `event` to every current receiver of `E`, in subscription
    /// order, before returning.
    ///
    /// Receivers subscribed or unsubscribed during the delivery take effect
    /// from the next emission. A receiver that is still inside its own
    /// callback receives `event` once that callback returns.
    pub fn emit<E: 'static>(&self, event: E) {
        self.deliver(Rc::new(event));
    }

    /// Records `event` without delivering it, see `update`.
    pub fn enqueue<E: 'static>(&self, event: E) {
        self.queue
            .borrow_mut()
            .push(Box::new(move |events: &EventManager| events.deliver(Rc::new(event))));
    }

    /// Returns the number of enqueued events waiting for `update`.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Delivers every enqueued event in enqueue order, then clears the queue.
    /// Events enqueued during this call are kept for the next one. Returns the
    /// number of delivered events.
    pub fn update(&self) -> usize {
        let queue = ::std::mem::replace(&mut *self.queue.borrow_mut(), Vec::new());
        let len = queue.len();

        for deferred in queue {
            deferred(self);
        }

        len
    }

    fn deliver<E: 'static>(&self, event: Rc<E>) {
        let subscribers = {
            let channels = self.channels.borrow();
            match channels
                .get(&TypeId::of::<E>())
                .and_then(|v| v.downcast_ref::<Channel<E>>())
            {
                Some(channel) => channel.subscribers.clone(),
                None => return,
            }
        };

        let mut dead = false;
        for subscriber in subscribers {
            let receiver = match subscriber.receiver.upgrade() {
                Some(receiver) => receiver,
                None => {
                    dead = true;
                    continue;
                }
            };

            if receiver.try_borrow_mut().is_err() {
                trace!(
                    "[EventManager] defers nested delivery of {}.",
                    any::type_name::<E>()
                );

                let (weak, event) = (subscriber.receiver.clone(), event.clone());
                self.backlogs
                    .borrow_mut()
                    .entry(subscriber.key)
                    .or_insert_with(VecDeque::new)
                    .push_back(Box::new(move || {
                        if let Some(receiver) = weak.upgrade() {
                            receiver.borrow_mut().receive(&event);
                        }
                    }));
                continue;
            }

            self.flush(subscriber.key);
            receiver.borrow_mut().receive(&event);
            self.flush(subscriber.key);
        }

        if dead {
            let mut channels = self.channels.borrow_mut();
            if let Some(channel) = Self::channel_mut::<E>(&mut channels) {
                channel.subscribers.retain(|v| v.receiver.strong_count() > 0);
            }
        }
    }

    // Runs the deliveries deferred while the receiver `key` was busy. Only
    // called once that receiver is known to be free.
    fn flush(&self, key: *const ()) {
        loop {
            let next = {
                let mut backlogs = self.backlogs.borrow_mut();
                let next = backlogs.get_mut(&key).and_then(|v| v.pop_front());
                if next.is_none() {
                    backlogs.remove(&key);
                }
                next
            };

            match next {
                Some(pending) => pending(),
                None => return,
            }
        }
    }

    fn channel_mut<E: 'static>(
        channels: &mut HashMap<TypeId, Box<dyn Any>>,
    ) -> Option<&mut Channel<E>> {
        channels
            .get_mut(&TypeId::of::<E>())
            .and_then(|v| v.downcast_mut::<Channel<E>>())
    }
}

/// Emitted right after a component `C` has been attached to an entity.
///
/// The event lives only for the synchronous delivery that creates it, do not
/// keep the handle beyond the callback.
#[derive(Debug, Clone)]
pub struct ComponentAddedEvent<C: Component> {
    pub entity: Entity,
    pub component: ComponentHandle<C>,
}

/// Emitted right before a component `C` is detached from an entity. The handle
/// is still dereferenceable during the callback, and becomes invalid as soon as
/// the callback returns.
#[derive(Debug, Clone)]
pub struct ComponentRemovedEvent<C: Component> {
    pub entity: Entity,
    pub component: ComponentHandle<C>,
}

/// The component lifecycle notifications produced by `EntityManager`.
pub trait LifecycleEvent: Sized + 'static {
    type Component: Component;

    /// The storage signal that produces this event.
    const LIFECYCLE: Lifecycle;

    #[doc(hidden)]
    fn new(entity: Entity, component: ComponentHandle<Self::Component>) -> Self;
}

impl<C: Component> LifecycleEvent for ComponentAddedEvent<C> {
    type Component = C;
    const LIFECYCLE: Lifecycle = Lifecycle::Construction;

    fn new(entity: Entity, component: ComponentHandle<C>) -> Self {
        ComponentAddedEvent { entity, component }
    }
}

impl<C: Component> LifecycleEvent for ComponentRemovedEvent<C> {
    type Component = C;
    const LIFECYCLE: Lifecycle = Lifecycle::Destruction;

    fn new(entity: Entity, component: ComponentHandle<C>) -> Self {
        ComponentRemovedEvent { entity, component }
    }
}
