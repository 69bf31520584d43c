//! Utilities to iterate over the entities matching a component set.

use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use super::component::Component;
use super::entity::{ComponentHandle, Entity};
use crate::registry::{ErasedPool, Registry};

/// A statically-known set of component types, a single component `C` or a
/// tuple `(A, B, ...)` of up to eight components.
///
/// The arity decides how matching entities are enumerated: a single type walks
/// the packed storage of that component, while a tuple walks the persistent
/// intersection the registry maintains for that set.
pub trait ComponentSet: 'static {
    /// The handles a matched entity is unpacked into.
    type Handles;

    #[doc(hidden)]
    fn source(registry: &Registry) -> Rc<dyn ErasedPool>;

    #[doc(hidden)]
    fn unpack(entity: &Entity) -> Self::Handles;
}

impl<C: Component> ComponentSet for C {
    type Handles = ComponentHandle<C>;

    fn source(registry: &Registry) -> Rc<dyn ErasedPool> {
        registry.enumerate::<C>()
    }

    fn unpack(entity: &Entity) -> Self::Handles {
        entity.component::<C>()
    }
}

macro_rules! impl_component_set {
    ([$($tps: ident), *]) => (
        impl<$($tps: Component, )*> ComponentSet for ( $($tps,)* ) {
            type Handles = ( $(ComponentHandle<$tps>, )* );

            fn source(registry: &Registry) -> Rc<dyn ErasedPool> {
                registry.enumerate_persistent(&[ $(registry.family::<$tps>(), )* ])
            }

            fn unpack(entity: &Entity) -> Self::Handles {
                ( $(entity.component::<$tps>(), )* )
            }
        }
    );
}

impl_component_set!([T1, T2]);
impl_component_set!([T1, T2, T3]);
impl_component_set!([T1, T2, T3, T4]);
impl_component_set!([T1, T2, T3, T4, T5]);
impl_component_set!([T1, T2, T3, T4, T5, T6]);
impl_component_set!([T1, T2, T3, T4, T5, T6, T7]);
impl_component_set!([T1, T2, T3, T4, T5, T6, T7, T8]);

/// A restartable, filtered enumeration of the entities holding every
/// component of `Q`.
///
/// A `View` is cheap to construct, build a new one per use instead of keeping
/// it across mutations. Changing the membership of `Q`'s components while
/// iterating is not supported, mutating the component values or other
/// component types is.
pub struct View<Q: ComponentSet> {
    registry: Weak<Registry>,
    source: Rc<dyn ErasedPool>,
    _marker: PhantomData<Q>,
}

impl<Q: ComponentSet> View<Q> {
    pub(crate) fn new(registry: &Rc<Registry>) -> Self {
        View {
            registry: Rc::downgrade(registry),
            source: Q::source(registry),
            _marker: PhantomData,
        }
    }

    /// Returns a new cursor positioned at the beginning.
    pub fn iter(&self) -> EntityIter<Q> {
        EntityIter {
            registry: self.registry.clone(),
            source: self.source.clone(),
            cursor: self.source.len(),
            _marker: PhantomData,
        }
    }

    /// Returns the number of entities currently matching.
    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `entity` is currently matching.
    pub fn contains(&self, entity: &Entity) -> bool {
        self.iter().any(|v| v == *entity)
    }

    /// Turns this view into one that also yields the handles of `Q` for every
    /// matched entity.
    pub fn with_handles(self) -> ComponentView<Q> {
        ComponentView { view: self }
    }
}

impl<'a, Q: ComponentSet> IntoIterator for &'a View<Q> {
    type Item = Entity;
    type IntoIter = EntityIter<Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<Q: ComponentSet> IntoIterator for View<Q> {
    type Item = Entity;
    type IntoIter = EntityIter<Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The cursor of a `View`.
///
/// It walks the packed set from the back and re-reads its length every step,
/// so removing the entity just yielded does not skip or repeat others.
pub struct EntityIter<Q: ComponentSet> {
    registry: Weak<Registry>,
    source: Rc<dyn ErasedPool>,
    cursor: usize,
    _marker: PhantomData<Q>,
}

impl<Q: ComponentSet> Iterator for EntityIter<Q> {
    type Item = Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let registry = self.registry.upgrade()?;

        loop {
            self.cursor = self.cursor.min(self.source.len());
            if self.cursor == 0 {
                return None;
            }

            self.cursor -= 1;
            if let Some(id) = self.source.id_at(self.cursor) {
                if registry.valid(id) {
                    return Some(Entity::new(id, &registry));
                }
            }
        }
    }
}

/// A `View` that unpacks each matched entity into the handles of `Q`.
pub struct ComponentView<Q: ComponentSet> {
    view: View<Q>,
}

impl<Q: ComponentSet> ComponentView<Q> {
    /// Returns a new cursor positioned at the beginning.
    pub fn iter(&self) -> ComponentIter<Q> {
        ComponentIter {
            iter: self.view.iter(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.view.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}

impl<'a, Q: ComponentSet> IntoIterator for &'a ComponentView<Q> {
    type Item = (Entity, Q::Handles);
    type IntoIter = ComponentIter<Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<Q: ComponentSet> IntoIterator for ComponentView<Q> {
    type Item = (Entity, Q::Handles);
    type IntoIter = ComponentIter<Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The cursor of a `ComponentView`. Handles are resolved again at every step.
pub struct ComponentIter<Q: ComponentSet> {
    iter: EntityIter<Q>,
}

impl<Q: ComponentSet> Iterator for ComponentIter<Q> {
    type Item = (Entity, Q::Handles);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|entity| {
            let handles = Q::unpack(&entity);
            (entity, handles)
        })
    }
}
