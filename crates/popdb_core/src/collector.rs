//! Result collection.
//!
//! Query results leave the store as one compact JSON array. The collector
//! drains a cursor, runs each row through an `extract` function that
//! returns the JSON text of one element, and joins the elements.
//!
//! The cursor is closed on every exit path. When both the drain and the
//! close fail, the drain error is reported.

use crate::error::CoreResult;
use crate::filter::Pagination;
use popdb_storage::{KeyValue, StateIterator, StorageError, StorageResult};

/// Drains `cursor` into a JSON array, closing it before returning.
///
/// # Errors
///
/// Returns the first cursor or `extract` error, or a close error if
/// draining succeeded.
pub fn collect_json_array<F>(mut cursor: Box<dyn StateIterator>, mut extract: F) -> CoreResult<Vec<u8>>
where
    F: FnMut(&KeyValue) -> CoreResult<Vec<u8>>,
{
    let drained = drain(cursor.as_mut(), &mut extract);
    let closed = cursor.close();
    let out = drained?;
    closed?;
    Ok(out)
}

fn drain<F>(cursor: &mut dyn StateIterator, extract: &mut F) -> CoreResult<Vec<u8>>
where
    F: FnMut(&KeyValue) -> CoreResult<Vec<u8>>,
{
    let mut out = vec![b'['];
    let mut first = true;
    while cursor.has_next() {
        let row = cursor.next()?;
        let item = extract(&row)?;
        if !first {
            out.push(b',');
        }
        out.extend_from_slice(&item);
        first = false;
    }
    out.push(b']');
    Ok(out)
}

/// A cursor that skips `offset` rows and stops after `limit` rows.
///
/// The skip happens eagerly in [`Paginated::new`] so that `has_next`
/// stays a cheap check.
pub struct Paginated {
    inner: Box<dyn StateIterator>,
    remaining: Option<usize>,
}

impl Paginated {
    /// Wraps `inner`, consuming the skipped rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a skipped row cannot be read. `inner` is closed
    /// before the error is returned.
    pub fn new(mut inner: Box<dyn StateIterator>, pagination: Pagination) -> StorageResult<Self> {
        for _ in 0..pagination.offset {
            if !inner.has_next() {
                break;
            }
            if let Err(e) = inner.next() {
                let _ = inner.close();
                return Err(e);
            }
        }
        Ok(Self {
            inner,
            remaining: pagination.max_results(),
        })
    }
}

impl StateIterator for Paginated {
    fn has_next(&self) -> bool {
        self.remaining != Some(0) && self.inner.has_next()
    }

    fn next(&mut self) -> StorageResult<KeyValue> {
        if self.remaining == Some(0) {
            return Err(StorageError::IteratorClosed);
        }
        let row = self.inner.next()?;
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> StorageResult<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
