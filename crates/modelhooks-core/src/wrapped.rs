//! Uniform single-or-sequence view over caller-owned entities.

use crate::hooks::Entity;

/// One entity or an ordered slice of entities, borrowed from the caller.
///
/// The shape is decided when the wrapper is built and never changes. Hooks
/// mutate the caller's values in place; nothing is copied.
#[derive(Debug)]
pub enum Wrapped<'a, T> {
    /// A single entity.
    Single(&'a mut T),
    /// An ordered sequence of entities of the same type.
    Sequence(&'a mut [T]),
}

impl<'a, T> Wrapped<'a, T> {
    /// Wrap an entity or a slice of entities.
    ///
    /// ```
    /// use modelhooks_core::{Entity, Wrapped};
    ///
    /// struct Friend;
    /// impl Entity for Friend {}
    ///
    /// let mut one = Friend;
    /// assert!(!Wrapped::new(&mut one).is_sequence());
    ///
    /// let mut many = vec![Friend, Friend];
    /// assert_eq!(Wrapped::new(many.as_mut_slice()).len(), 2);
    /// ```
    pub fn new<V>(value: V) -> Self
    where
        V: IntoWrapped<'a, Item = T>,
    {
        value.into_wrapped()
    }

    /// Wrap a single entity.
    pub fn single(item: &'a mut T) -> Self {
        Wrapped::Single(item)
    }

    /// Wrap a slice of entities.
    pub fn sequence(items: &'a mut [T]) -> Self {
        Wrapped::Sequence(items)
    }

    /// Whether this wrapper holds a sequence (possibly empty).
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Wrapped::Sequence(_))
    }

    /// Number of wrapped entities.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Wrapped::Single(_) => 1,
            Wrapped::Sequence(items) => items.len(),
        }
    }

    /// True for an empty sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wrapped entities as a slice; a single entity is a one-element slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Wrapped::Single(item) => std::slice::from_ref(&**item),
            Wrapped::Sequence(items) => items,
        }
    }

    /// Mutable slice view, used to hand the entities to a connection.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Wrapped::Single(item) => std::slice::from_mut(&mut **item),
            Wrapped::Sequence(items) => items,
        }
    }

    /// Iterate the entities in original order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterate the entities mutably in original order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }
}

/// Values [`Wrapped::new`] accepts: `&mut T` for an entity type, or `&mut [T]`.
///
/// Any other shape is rejected by the type checker, before anything is
/// dispatched.
pub trait IntoWrapped<'a> {
    /// The entity type.
    type Item;

    /// Classify and wrap.
    fn into_wrapped(self) -> Wrapped<'a, Self::Item>;
}

impl<'a, T: Entity> IntoWrapped<'a> for &'a mut T {
    type Item = T;

    fn into_wrapped(self) -> Wrapped<'a, T> {
        Wrapped::Single(self)
    }
}

impl<'a, T: Entity> IntoWrapped<'a> for &'a mut [T] {
    type Item = T;

    fn into_wrapped(self) -> Wrapped<'a, T> {
        Wrapped::Sequence(self)
    }
}

impl<'a, T> IntoWrapped<'a> for Wrapped<'a, T> {
    type Item = T;

    fn into_wrapped(self) -> Wrapped<'a, T> {
        self
    }
}
