//! # Fixed-Capacity Storage
//!
//! Bounded, insertion-ordered container used for the task slots of an
//! execution machine and for per-task variable tables.
//!
//! ## Invariants
//! - `len() <= N` at all times.
//! - A push past capacity is rejected with [`CapacityError`] and leaves the
//!   container unchanged; it never reallocates beyond `N`.

use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

/// Returned when a push would exceed the container's capacity. Hands the
/// rejected element back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capacity of {capacity} exceeded")]
pub struct CapacityError<T> {
    pub capacity: usize,
    pub rejected: T,
}

/// Fixed-capacity vector. Storage for `N` elements is reserved up front.
#[derive(Clone, PartialEq, Eq)]
pub struct FixedVec<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> FixedVec<T, N> {
    /// Creates an empty vector with room for `N` elements.
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(N),
        }
    }

    /// Appends `item`, or returns it inside a [`CapacityError`] when full.
    pub fn try_push(&mut self, item: T) -> Result<(), CapacityError<T>> {
        if self.is_full() {
            return Err(CapacityError {
                capacity: N,
                rejected: item,
            });
        }
        self.items.push(item);
        Ok(())
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= N
    }

}

impl<T, const N: usize> Default for FixedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for FixedVec<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.items.fmt(f)
    }
}

impl<T, const N: usize> Deref for FixedVec<T, N> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

// Only slice access is exposed mutably; length changes go through
// `try_push`.
impl<T, const N: usize> DerefMut for FixedVec<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a FixedVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
