// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size context pools.

use core::cell::Cell;
use core::fmt;

/// An error indicating that every slot of a [`Pool`] is in use.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Exhausted;

/// A fixed-size pool of `N` context slots, with `N` at most 32.
///
/// Hardware-facing sinks may only exist a bounded number of times at once;
/// each one holds a [`Slot`] for its lifetime. Acquiring a slot never
/// blocks: once all slots are handed out, [`Pool::acquire()`] fails until
/// one is given back.
///
/// Like [`core::cell::Cell`], a `Pool` is meant to be owned by a single
/// thread of execution, and then lent out by shared reference.
///
/// ```
/// # use suitcase::mem::*;
/// let pool = Pool::<1>::new();
/// let slot = pool.acquire()?;
/// assert!(pool.acquire().is_err());
///
/// slot.release();
/// assert!(pool.acquire().is_ok());
/// # Ok::<(), Exhausted>(())
/// ```
pub struct Pool<const N: usize> {
    // Bit `i` is set while slot `i` is handed out.
    in_use: Cell<u32>,
}

impl<const N: usize> Pool<N> {
    /// Creates a new pool with every slot free.
    pub const fn new() -> Self {
        Self {
            in_use: Cell::new(0),
        }
    }

    /// Returns the number of slots in this pool.
    pub const fn capacity(&self) -> usize {
        if N < 32 {
            N
        } else {
            32
        }
    }

    /// Returns the number of slots currently handed out.
    pub fn in_use(&self) -> usize {
        self.in_use.get().count_ones() as usize
    }

    /// Acquires a free slot, scanning from the lowest index.
    pub fn acquire(&self) -> Result<Slot<'_>, Exhausted> {
        let in_use = self.in_use.get();
        let index = (0..self.capacity())
            .find(|&i| in_use & (1 << i) == 0)
            .ok_or(Exhausted)?;
        self.in_use.set(in_use | (1 << index));
        Ok(Slot {
            in_use: &self.in_use,
            index,
        })
    }
}

impl<const N: usize> Default for Pool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for Pool<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pool({:#b}/{})", self.in_use.get(), self.capacity())
    }
}

/// A handle to one slot of a [`Pool`].
///
/// The slot is returned to its pool when the handle is dropped, or when
/// [`Slot::release()`] is called.
#[must_use = "dropping a `Slot` releases it immediately"]
pub struct Slot<'pool> {
    in_use: &'pool Cell<u32>,
    index: usize,
}

impl Slot<'_> {
    /// Returns the index of this slot within its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns this slot to its pool.
    pub fn release(self) {}
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.in_use.set(self.in_use.get() & !(1 << self.index));
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.index).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exhaustion() {
        let pool = Pool::<2>::new();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(pool.acquire().unwrap_err(), Exhausted);
        assert_eq!(pool.in_use(), 2);

        drop(a);
        let c = pool.acquire().unwrap();
        assert_eq!(c.index(), 0);
        b.release();
        c.release();
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn oversized_pool_is_capped() {
        let pool = Pool::<40>::new();
        let slots = (0..32).map(|_| pool.acquire().unwrap()).collect::<Vec<_>>();
        assert!(pool.acquire().is_err());
        drop(slots);
        assert_eq!(pool.in_use(), 0);
    }
}
