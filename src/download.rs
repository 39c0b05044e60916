// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Download arbitration.
//!
//! At most one update package may be transferred at a time. Transports
//! (and the manifest processor, which may cancel a transfer it no longer
//! needs) share an [`Arbiter`] by reference and use it to claim, release
//! or abandon the right to transfer.
//!
//! The lock only ever guards the state transition itself; no I/O happens
//! while it is held.

use spin::Mutex;

/// Identifies a transfer.
pub type TransferId = u32;

/// A download arbitration error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that another transfer is already active.
    Busy,
    /// Indicates that no transfer is active.
    NotActive,
    /// Indicates that a different transfer is active.
    WrongTransfer,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    Idle,
    Active(TransferId),
}

/// Serializes access to the update transport.
#[derive(Debug)]
pub struct Arbiter {
    state: Mutex<State>,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter {
    /// Creates a new, idle arbiter.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(State::Idle),
        }
    }

    /// Marks transfer `id` as active.
    ///
    /// Fails with [`Error::Busy`] if any transfer, including `id` itself, is
    /// already active.
    pub fn start(&self, id: TransferId) -> Result<(), Error> {
        let mut state = self.state.lock();
        if let State::Active(active) = *state {
            return Err(fail!(
                Error::Busy,
                "transfer {} refused: {} is active",
                id,
                active
            ));
        }
        *state = State::Active(id);
        drop(state);

        info!("transfer {} started", id);
        Ok(())
    }

    /// Abandons transfer `id`.
    pub fn cancel(&self, id: TransferId) -> Result<(), Error> {
        self.finish(id)?;
        warn!("transfer {} cancelled", id);
        Ok(())
    }

    /// Marks transfer `id` as complete.
    pub fn end(&self, id: TransferId) -> Result<(), Error> {
        self.finish(id)?;
        info!("transfer {} ended", id);
        Ok(())
    }

    fn finish(&self, id: TransferId) -> Result<(), Error> {
        let mut state = self.state.lock();
        match *state {
            State::Idle => Err(fail!(Error::NotActive)),
            State::Active(active) if active != id => {
                Err(fail!(Error::WrongTransfer))
            }
            State::Active(_) => {
                *state = State::Idle;
                Ok(())
            }
        }
    }

    /// Returns whether any transfer is active.
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Returns the active transfer, if there is one.
    pub fn active(&self) -> Option<TransferId> {
        match *self.state.lock() {
            State::Idle => None,
            State::Active(id) => Some(id),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lifecycle() {
        let arbiter = Arbiter::new();
        assert!(!arbiter.is_active());
        assert_eq!(arbiter.end(1), Err(Error::NotActive));

        arbiter.start(1).unwrap();
        assert_eq!(arbiter.active(), Some(1));
        assert_eq!(arbiter.start(2), Err(Error::Busy));
        assert_eq!(arbiter.start(1), Err(Error::Busy));
        assert_eq!(arbiter.cancel(2), Err(Error::WrongTransfer));
        assert_eq!(arbiter.active(), Some(1));

        arbiter.cancel(1).unwrap();
        assert!(!arbiter.is_active());
        assert_eq!(arbiter.cancel(1), Err(Error::NotActive));

        arbiter.start(2).unwrap();
        arbiter.end(2).unwrap();
        assert_eq!(arbiter.active(), None);
    }

    #[test]
    fn one_winner() {
        let arbiter = Arc::new(Arbiter::new());
        let handles = (0..8)
            .map(|id| {
                let arbiter = Arc::clone(&arbiter);
                thread::spawn(move || arbiter.start(id).is_ok())
            })
            .collect::<Vec<_>>();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert!(arbiter.is_active());
    }
}
