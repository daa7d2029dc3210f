//! Forward-only result cursors.

use crate::error::{StorageError, StorageResult};
use std::collections::VecDeque;

/// A key and the value stored under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The state key.
    pub key: Vec<u8>,
    /// The stored value.
    pub value: Vec<u8>,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A lazy, single-pass cursor over query results.
///
/// Cursors are opened by [`crate::LedgerState::range`] and
/// [`crate::LedgerState::rich_query`]. They must be closed before the
/// invocation that opened them returns; `close` is idempotent and calling
/// `next` after it fails with [`StorageError::IteratorClosed`].
pub trait StateIterator: Send {
    /// Returns `true` if another item is available.
    fn has_next(&self) -> bool;

    /// Returns the next item.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor is closed or exhausted, or if the
    /// underlying read fails.
    fn next(&mut self) -> StorageResult<KeyValue>;

    /// Releases the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release its resources.
    fn close(&mut self) -> StorageResult<()>;

    /// Returns `true` once the cursor has been closed.
    fn is_closed(&self) -> bool;
}

/// A cursor over a materialized snapshot of results.
#[derive(Debug, Default)]
pub struct VecStateIterator {
    items: VecDeque<KeyValue>,
    closed: bool,
}

impl VecStateIterator {
    /// Creates a cursor that yields `items` in order.
    #[must_use]
    pub fn new(items: Vec<KeyValue>) -> Self {
        Self {
            items: items.into(),
            closed: false,
        }
    }

    /// Returns the number of items not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl StateIterator for VecStateIterator {
    fn has_next(&self) -> bool {
        !self.closed && !self.items.is_empty()
    }

    fn next(&mut self) -> StorageResult<KeyValue> {
        if self.closed {
            return Err(StorageError::IteratorClosed);
        }
        self.items.pop_front().ok_or(StorageError::IteratorClosed)
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        self.items.clear();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for VecStateIterator {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_iterator_yields_in_order() {
        let mut iter = VecStateIterator::new(vec![
            KeyValue::new(b"a".to_vec(), b"1".to_vec()),
            KeyValue::new(b"b".to_vec(), b"2".to_vec()),
        ]);

        assert!(iter.has_next());
        assert_eq!(iter.next().unwrap().key, b"a");
        assert_eq!(iter.next().unwrap().value, b"2");
        assert!(!iter.has_next());
        assert!(matches!(iter.next(), Err(StorageError::IteratorClosed)));
    }

    #[test]
    fn vec_iterator_close_is_idempotent() {
        let mut iter = VecStateIterator::new(vec![KeyValue::new(b"a".to_vec(), b"1".to_vec())]);
        iter.close().unwrap();
        iter.close().unwrap();

        assert!(iter.is_closed());
        assert!(!iter.has_next());
        assert_eq!(iter.remaining(), 0);
        assert!(iter.next().is_err());
    }
}
