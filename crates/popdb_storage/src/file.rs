//! File-backed ledger state.

use crate::backend::LedgerState;
use crate::error::{StorageError, StorageResult};
use crate::iterator::StateIterator;
use crate::memory::InMemoryState;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Size of the per-record header: key length and value length.
const HEADER_SIZE: usize = 8;

/// A ledger state persisted to an append-only log.
///
/// Every `put_state` appends one record to the log:
///
/// ```text
/// | key_len (u32 BE) | value_len (u32 BE) | key | value |
/// ```
///
/// Opening the file replays the log into an [`InMemoryState`], so reads,
/// range scans and rich queries behave exactly like the in-memory state.
/// Replaying the log preserves first-write order.
///
/// # Durability
///
/// - writes are buffered
/// - `sync()` flushes the buffer and calls `File::sync_all()`
///
/// # Example
///
/// ```no_run
/// use popdb_storage::{FileState, LedgerState};
/// use std::path::Path;
///
/// let mut state = FileState::open(Path::new("state.log")).unwrap();
/// state.put_state(b"key", b"value").unwrap();
/// state.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileState {
    path: PathBuf,
    writer: RwLock<BufWriter<File>>,
    state: InMemoryState,
}

impl FileState {
    /// Opens or creates a state log at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, or
    /// [`StorageError::Corrupted`] if the log ends in a partial record.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        let state = replay(&contents)?;
        file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: RwLock::new(BufWriter::new(file)),
            state,
        })
    }

    /// Opens or creates a state log, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the log cannot
    /// be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

fn replay(contents: &[u8]) -> StorageResult<InMemoryState> {
    let mut state = InMemoryState::new();
    let mut pos = 0;

    while pos < contents.len() {
        if contents.len() - pos < HEADER_SIZE {
            return Err(StorageError::corrupted(format!(
                "truncated record header at offset {pos}"
            )));
        }
        let key_len = read_u32(&contents[pos..pos + 4]) as usize;
        let value_len = read_u32(&contents[pos + 4..pos + 8]) as usize;
        pos += HEADER_SIZE;

        let end = pos
            .checked_add(key_len)
            .and_then(|n| n.checked_add(value_len))
            .filter(|&end| end <= contents.len())
            .ok_or_else(|| {
                StorageError::corrupted(format!("truncated record body at offset {pos}"))
            })?;

        let key = &contents[pos..pos + key_len];
        let value = &contents[pos + key_len..end];
        state.put_state(key, value)?;
        pos = end;
    }

    Ok(state)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn encode_len(len: usize) -> StorageResult<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| StorageError::corrupted(format!("record field too large: {len} bytes")))
}

impl LedgerState for FileState {
    fn get_state(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.state.get_state(key)
    }

    fn put_state(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let key_len = encode_len(key.len())?;
        let value_len = encode_len(value.len())?;

        {
            let mut writer = self.writer.write();
            writer.write_all(&key_len)?;
            writer.write_all(&value_len)?;
            writer.write_all(key)?;
            writer.write_all(value)?;
        }

        self.state.put_state(key, value)
    }

    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StateIterator>> {
        self.state.range(start, end)
    }

    fn rich_query(&self, query: &str) -> StorageResult<Box<dyn StateIterator>> {
        self.state.rich_query(query)
    }

    fn sync(&mut self) -> StorageResult<()> {
        let mut writer = self.writer.write();
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

impl Drop for FileState {
    fn drop(&mut self) {
        let _ = self.writer.write().flush();
    }
}
