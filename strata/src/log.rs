//! The append-only page log.
//!
//! The buffer pool appends a before/after record for every page it flushes
//! at commit time; transactions append commit and abort markers. The log is
//! opaque to the rest of the engine and is never read back here; replaying
//! it is a recovery concern outside this crate's scope.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::page::PageId;
use crate::transaction::TransactionId;

/// A single log record. Serialized with bincode and framed by a length and
/// a CRC32 of the payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum LogRecord {
    /// Before and after images of one flushed page.
    PageWrite {
        tid: u64,
        table_id: u32,
        page_no: u32,
        before: Vec<u8>,
        after: Vec<u8>,
    },
    Commit { tid: u64 },
    Abort { tid: u64 },
}

/// Frame header: payload length then payload CRC32, both big-endian u32.
const FRAME_HEADER_BYTES: u64 = 8;

pub struct LogManager {
    file: File,
    next_offset: u64,
}

impl LogManager {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<LogManager> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let next_offset = file.metadata()?.len();
        Ok(LogManager { file, next_offset })
    }

    /// Appends the before/after images of a page being flushed for `tid`.
    /// Returns the record's offset in the log.
    pub fn log_write(
        &mut self,
        tid: TransactionId,
        pid: PageId,
        before: &[u8],
        after: &[u8],
    ) -> io::Result<u64> {
        self.append(&LogRecord::PageWrite {
            tid: tid.value(),
            table_id: pid.table_id,
            page_no: pid.page_no,
            before: before.to_vec(),
            after: after.to_vec(),
        })
    }

    pub fn log_commit(&mut self, tid: TransactionId) -> io::Result<u64> {
        self.append(&LogRecord::Commit { tid: tid.value() })
    }

    pub fn log_abort(&mut self, tid: TransactionId) -> io::Result<u64> {
        self.append(&LogRecord::Abort { tid: tid.value() })
    }

    fn append(&mut self, record: &LogRecord) -> io::Result<u64> {
        let payload = bincode::serialize(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let offset = self.next_offset;
        self.file.write_all(&(payload.len() as u32).to_be_bytes())?;
        self.file.write_all(&crc.to_be_bytes())?;
        self.file.write_all(&payload)?;
        self.file.sync_all()?;

        self.next_offset = offset + FRAME_HEADER_BYTES + payload.len() as u64;
        crate::strata_debug_log!("[LogManager] appended record at offset {offset}");
        Ok(offset)
    }

    /// Total bytes appended so far.
    pub fn size(&self) -> u64 {
        self.next_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_advance_offsets_and_file_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.log");
        let mut log = LogManager::open(&path).unwrap();

        let tid = TransactionId::new();
        let pid = PageId {
            table_id: 3,
            page_no: 0,
        };
        let first = log.log_write(tid, pid, &[0u8; 16], &[1u8; 16]).unwrap();
        let second = log.log_commit(tid).unwrap();

        assert_eq!(first, 0);
        assert!(second > first);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), log.size());
    }

    #[test]
    fn reopen_appends_after_existing_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.log");
        let tid = TransactionId::new();

        let end = {
            let mut log = LogManager::open(&path).unwrap();
            log.log_abort(tid).unwrap();
            log.size()
        };

        let mut log = LogManager::open(&path).unwrap();
        let offset = log.log_commit(tid).unwrap();
        assert_eq!(offset, end);
    }
}
