// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Copy-on-write holder for a shared table.
///
/// Readers take an `Arc` snapshot and never block writers for longer than a
/// pointer swap. Writers are serialized by a single writer lock: each
/// transaction clones the current table, mutates the clone and swaps it in only
/// if the closure succeeds, so a failed transaction leaves no trace and no reader
/// can observe a half-applied change.
///
/// # Example
/// ```
/// use schemaflow::utils::SnapshotCell;
///
/// let cell = SnapshotCell::new(vec![1, 2]);
/// let before = cell.snapshot();
///
/// cell.transact(|table| -> Result<(), ()> {
///     table.push(3);
///     Ok(())
/// }).unwrap();
///
/// assert_eq!(*before, vec![1, 2]);
/// assert_eq!(*cell.snapshot(), vec![1, 2, 3]);
/// ```
pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
    writer: Mutex<()>,
}

impl<T: Clone> SnapshotCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
        }
    }

    /// The current table. Later writes never affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// Apply `f` to a private copy and publish it atomically on success.
    pub fn transact<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let _writer = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let result = f(&mut next)?;
        *self.current.write() = Arc::new(next);
        Ok(result)
    }
}

impl<T: Clone + Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_failed_transaction_is_discarded() {
        let cell = SnapshotCell::new(vec!["a".to_string()]);

        let result: Result<(), &str> = cell.transact(|table| {
            table.push("b".to_string());
            Err("abort")
        });

        assert_eq!(result, Err("abort"));
        assert_eq!(*cell.snapshot(), vec!["a".to_string()]);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let cell = Arc::new(SnapshotCell::new(Vec::<usize>::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for j in 0..50 {
                        cell.transact(|table| -> Result<(), ()> {
                            table.push(i * 100 + j);
                            Ok(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cell.snapshot().len(), 400);
    }
}
