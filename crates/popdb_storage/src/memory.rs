//! In-memory ledger state.

use crate::backend::LedgerState;
use crate::error::StorageResult;
use crate::iterator::{KeyValue, StateIterator, VecStateIterator};
use crate::selector::RichQuery;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Keys in the order they were first written.
    write_order: Vec<Vec<u8>>,
}

/// An in-memory ledger state.
///
/// Keys are kept in byte order for range scans. Rich queries have no
/// index to drive them, so they walk the documents in first-write order;
/// callers that need another order must sort explicitly.
///
/// # Example
///
/// ```rust
/// use popdb_storage::{InMemoryState, LedgerState};
///
/// let mut state = InMemoryState::new();
/// state.put_state(b"k", b"v").unwrap();
/// assert_eq!(state.get_state(b"k").unwrap(), Some(b"v".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryState {
    inner: RwLock<Inner>,
}

impl InMemoryState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Returns every key in byte order.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.inner.read().entries.keys().cloned().collect()
    }
}

impl LedgerState for InMemoryState {
    fn get_state(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.inner.read().entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut inner = self.inner.write();
        if inner.entries.insert(key.to_vec(), value.to_vec()).is_none() {
            inner.write_order.push(key.to_vec());
        }
        Ok(())
    }

    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StateIterator>> {
        let inner = self.inner.read();
        let items = if start < end {
            inner
                .entries
                .range(start.to_vec()..end.to_vec())
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
                .collect()
        } else {
            Vec::new()
        };
        Ok(Box::new(VecStateIterator::new(items)))
    }

    fn rich_query(&self, query: &str) -> StorageResult<Box<dyn StateIterator>> {
        let query = RichQuery::parse(query)?;
        let inner = self.inner.read();

        let matches = inner.write_order.iter().filter_map(|key| {
            let value = inner.entries.get(key)?;
            let document = serde_json::from_slice(value).ok()?;
            query
                .matches(&document)
                .then(|| KeyValue::new(key.clone(), value.clone()))
        });

        let items = match query.limit() {
            Some(limit) => matches.skip(query.skip()).take(limit).collect(),
            None => matches.skip(query.skip()).collect(),
        };
        Ok(Box::new(VecStateIterator::new(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut iter: Box<dyn StateIterator>) -> Vec<KeyValue> {
        let mut out = Vec::new();
        while iter.has_next() {
            out.push(iter.next().unwrap());
        }
        iter.close().unwrap();
        out
    }

    #[test]
    fn memory_new_is_empty() {
        let state = InMemoryState::new();
        assert!(state.is_empty());
        assert_eq!(state.get_state(b"missing").unwrap(), None);
    }

    #[test]
    fn memory_put_overwrites() {
        let mut state = InMemoryState::new();
        state.put_state(b"k", b"one").unwrap();
        state.put_state(b"k", b"two").unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(state.get_state(b"k").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn memory_range_is_ordered_and_half_open() {
        let mut state = InMemoryState::new();
        for key in ["b", "a", "d", "c"] {
            state.put_state(key.as_bytes(), b"").unwrap();
        }

        let keys: Vec<_> = drain(state.range(b"a", b"d").unwrap())
            .into_iter()
            .map(|kv| kv.key)
            .collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn memory_empty_range() {
        let mut state = InMemoryState::new();
        state.put_state(b"a", b"").unwrap();
        assert!(drain(state.range(b"b", b"a").unwrap()).is_empty());
    }

    #[test]
    fn memory_rich_query_uses_write_order() {
        let mut state = InMemoryState::new();
        state.put_state(b"z", br#"{"docType":"map","id":"z"}"#).unwrap();
        state.put_state(b"a", br#"{"docType":"map","id":"a"}"#).unwrap();
        state.put_state(b"s", br#"{"docType":"segment","id":"s"}"#).unwrap();
        state.put_state(b"raw", b"\x00not json").unwrap();
        // Rewriting a key keeps its original position.
        state.put_state(b"z", br#"{"docType":"map","id":"z"}"#).unwrap();

        let keys: Vec<_> = drain(state.rich_query(r#"{"selector":{"docType":"map"}}"#).unwrap())
            .into_iter()
            .map(|kv| kv.key)
            .collect();
        assert_eq!(keys, vec![b"z".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn memory_rich_query_pagination() {
        let mut state = InMemoryState::new();
        for i in 0..5 {
            let key = format!("k{i}");
            let value = format!(r#"{{"docType":"map","id":"{i}"}}"#);
            state.put_state(key.as_bytes(), value.as_bytes()).unwrap();
        }

        let page = drain(
            state
                .rich_query(r#"{"selector":{"docType":"map"},"limit":2,"skip":1}"#)
                .unwrap(),
        );
        let keys: Vec<_> = page.into_iter().map(|kv| kv.key).collect();
        assert_eq!(keys, vec![b"k1".to_vec(), b"k2".to_vec()]);
    }

    #[test]
    fn memory_rich_query_rejects_bad_query() {
        let state = InMemoryState::new();
        assert!(state.rich_query("{").is_err());
    }
}
