//! Construction and destruction callbacks of component pools.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::utils::{EntityId, Family};

/// A callback invoked with the id of the entity whose component changed.
pub type Listener = Rc<dyn Fn(EntityId)>;

/// Identifies a connected listener, used to disconnect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ListenerId ({})", self.0)
    }
}

/// Listeners connected to one component family, in connection order.
#[derive(Default)]
pub struct Signal {
    listeners: Vec<(ListenerId, Listener)>,
    next: u32,
}

impl Signal {
    pub fn connect(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let len = self.listeners.len();
        self.listeners.retain(|(v, _)| *v != id);
        self.listeners.len() != len
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn snapshot(&self) -> Vec<Listener> {
        self.listeners.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// Which side of a component lifetime a sink is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Fired right after a component has been inserted.
    Construction,
    /// Fired right before a component is discarded.
    Destruction,
}

/// The signals of every component family for one lifecycle side.
#[derive(Default)]
pub(crate) struct Signals {
    signals: RefCell<Vec<Signal>>,
}

impl Signals {
    pub fn reserve(&self, family: Family) {
        let mut signals = self.signals.borrow_mut();
        while signals.len() <= family {
            signals.push(Signal::default());
        }
    }

    pub fn connect(&self, family: Family, listener: Listener) -> ListenerId {
        self.reserve(family);
        self.signals.borrow_mut()[family].connect(listener)
    }

    pub fn disconnect(&self, family: Family, id: ListenerId) -> bool {
        match self.signals.borrow_mut().get_mut(family) {
            Some(signal) => signal.disconnect(id),
            None => false,
        }
    }

    pub fn len(&self, family: Family) -> usize {
        self.signals.borrow().get(family).map_or(0, |v| v.len())
    }

    /// Invokes every listener of `family`. The listener list is copied out
    /// first, so listeners are free to connect, disconnect and mutate storage.
    pub fn publish(&self, family: Family, id: EntityId) {
        let listeners = match self.signals.borrow().get(family) {
            Some(signal) if !signal.is_empty() => signal.snapshot(),
            _ => return,
        };

        for listener in listeners {
            listener(id);
        }
    }
}

/// Connects and disconnects listeners of one component family.
pub struct Sink<'a> {
    pub(crate) signals: &'a Signals,
    pub(crate) family: Family,
}

impl<'a> Sink<'a> {
    /// Connects a listener, it is invoked synchronously on every matching mutation.
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(EntityId) + 'static,
    {
        self.signals.connect(self.family, Rc::new(listener))
    }

    /// Disconnects a listener, returns false if it was not connected.
    pub fn disconnect(&self, id: ListenerId) -> bool {
        self.signals.disconnect(self.family, id)
    }

    /// Returns the number of connected listeners.
    pub fn len(&self) -> usize {
        self.signals.len(self.family)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn publish_in_connection_order() {
        let signals = Signals::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let id1 = signals.connect(0, Rc::new(move |id: EntityId| l1.borrow_mut().push((1, id))));
        let l2 = log.clone();
        signals.connect(0, Rc::new(move |id: EntityId| l2.borrow_mut().push((2, id))));

        let e = EntityId::new(7, 1);
        signals.publish(0, e);
        signals.publish(1, e);
        assert_eq!(*log.borrow(), vec![(1, e), (2, e)]);

        assert!(signals.disconnect(0, id1));
        assert!(!signals.disconnect(0, id1));
        assert_eq!(signals.len(0), 1);
    }

    #[test]
    fn disconnect_while_publishing() {
        let signals = Rc::new(Signals::default());
        let hits = Rc::new(Cell::new(0));

        let slot = Rc::new(Cell::new(None));
        let (s, h, sl) = (signals.clone(), hits.clone(), slot.clone());
        let id = signals.connect(
            0,
            Rc::new(move |_| {
                h.set(h.get() + 1);
                if let Some(id) = sl.get() {
                    s.disconnect(0, id);
                }
            }),
        );
        slot.set(Some(id));

        signals.publish(0, EntityId::new(0, 1));
        signals.publish(0, EntityId::new(0, 1));
        assert_eq!(hits.get(), 1);
    }
}
