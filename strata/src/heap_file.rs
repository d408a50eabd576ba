//! Paged on-disk tables.
//!
//! A heap file is a flat sequence of fixed-size pages with no file header;
//! page k lives at byte offset k * PAGE_SIZE. Tuples are stored in no
//! particular order. All page access on behalf of a transaction goes
//! through the buffer pool so that the right lock is held first; the raw
//! `read_page`/`write_page` below are the pool's miss and flush paths.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buffer_pool::{BufferPool, PageRef, Permissions};
use crate::error::{Error, Result};
use crate::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::PAGE_SIZE;

/// FNV-1a over the absolute path. The table id must be the same every time
/// the same file is opened, so the std randomized hasher is not usable here.
fn table_id_for(path: &Path) -> u32 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in path.as_os_str().as_encoded_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash ^ (hash >> 32)) as u32
}

pub struct HeapFile {
    path: PathBuf,
    desc: Arc<TupleDesc>,
    id: u32,
}

impl HeapFile {
    /// Opens (creating if absent) the backing file. A length that is not a
    /// whole number of pages means the file was torn mid-write by something
    /// outside this engine and is rejected outright.
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>) -> Result<HeapFile> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(Error::PartialPage(len));
        }

        let path = std::fs::canonicalize(path.as_ref())?;
        let id = table_id_for(&path);
        crate::strata_debug_log!("[HeapFile::open] {path:?} -> table id {id}");
        Ok(HeapFile { path, desc, id })
    }

    /// The stable table id derived from the absolute path.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> Result<usize> {
        let len = std::fs::metadata(&self.path)?.len();
        Ok((len / PAGE_SIZE as u64) as usize)
    }

    /// Reads one page straight from disk. Only the buffer pool should call
    /// this on behalf of a transaction.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        let offset = pid.page_no as u64 * PAGE_SIZE as u64;
        let mut file = File::open(&self.path)?;
        if offset + PAGE_SIZE as u64 > file.metadata()?.len() {
            return Err(Error::InvalidPage {
                table_id: pid.table_id,
                page_no: pid.page_no,
            });
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; PAGE_SIZE];
        file.read_exact(&mut data)?;
        HeapPage::new(pid, &data, self.desc.clone())
    }

    /// Writes one page back to its offset and clears its dirty tag.
    pub fn write_page(&self, page: &mut HeapPage) -> Result<()> {
        let offset = page.id().page_no as u64 * PAGE_SIZE as u64;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.page_data())?;
        file.sync_all()?;
        page.mark_dirty(None);
        crate::strata_debug_log!("[HeapFile::write_page] wrote {:?}", page.id());
        Ok(())
    }

    fn append_empty_page(&self) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.sync_all()?;
        Ok(())
    }

    /// Places the tuple on the first page with a free slot, appending a new
    /// empty page when every existing page is full. Every page is acquired
    /// through the buffer pool with exclusive intent. Returns the pages the
    /// operation mutated.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<PageRef>> {
        for page_no in 0..self.num_pages()? {
            let pid = PageId {
                table_id: self.id,
                page_no: page_no as u32,
            };
            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            let mut guard = page.write().unwrap();
            if guard.unused_slots() == 0 {
                continue;
            }
            guard.insert_tuple(tuple)?;
            drop(guard);
            return Ok(vec![page]);
        }

        self.append_empty_page()?;
        let pid = PageId {
            table_id: self.id,
            page_no: (self.num_pages()? - 1) as u32,
        };
        let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        page.write().unwrap().insert_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Deletes the tuple from the page its record id names, acquired
    /// exclusively. Returns the mutated page.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        let page = pool.get_page(tid, rid.page_id, Permissions::ReadWrite)?;
        page.write().unwrap().delete_tuple(tuple)?;
        Ok(vec![page])
    }

    /// A lazy, restartable scan over every tuple in page-number order. Pages
    /// are acquired read-only through the buffer pool; the iterator never
    /// releases locks itself (two-phase locking leaves that to commit or
    /// abort).
    pub fn iter(self: &Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator {
            file: Arc::clone(self),
            pool,
            tid,
            page_no: 0,
            current: Vec::new(),
            pos: 0,
            opened: false,
        }
    }
}

/// Cursor over a heap file. One page's occupied slots are snapshotted at a
/// time so that no page lock guard is held between calls.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    page_no: usize,
    current: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl HeapFileIterator {
    pub fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.page_no = 0;
        self.pos = 0;
        self.current = if self.file.num_pages()? == 0 {
            Vec::new()
        } else {
            self.page_tuples(0)?
        };
        Ok(())
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.current = Vec::new();
        self.pos = 0;
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn page_tuples(&self, page_no: usize) -> Result<Vec<Tuple>> {
        let pid = PageId {
            table_id: self.file.id(),
            page_no: page_no as u32,
        };
        let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let tuples = page.read().unwrap().tuples();
        Ok(tuples)
    }

    pub fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Ok(false);
        }
        while self.pos >= self.current.len() {
            if self.page_no + 1 >= self.file.num_pages()? {
                return Ok(false);
            }
            self.page_no += 1;
            self.current = self.page_tuples(self.page_no)?;
            self.pos = 0;
        }
        Ok(true)
    }

    /// The next tuple, or `None` once the scan is exhausted or closed.
    pub fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let tuple = self.current[self.pos].clone();
        self.pos += 1;
        Ok(Some(tuple))
    }
}
