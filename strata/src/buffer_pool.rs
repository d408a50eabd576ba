//! The bounded page cache.
//!
//! Every page access on behalf of a transaction comes through `get_page`,
//! which takes the page lock in the requested mode before touching the
//! cache. Replacement is LRU over an arena-backed doubly linked list, with
//! one hard rule: a dirty page is never evicted (NO-STEAL), so uncommitted
//! work never reaches disk. Commit flushes a transaction's dirty pages
//! through the log and the heap file; abort discards them from the cache so
//! the next access re-reads the pre-transaction state from disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::lock_manager::{LockManager, LockMode};
use crate::log::LogManager;
use crate::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::DEFAULT_POOL_PAGES;

/// Access mode a caller requests on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// A cached page. The pool owns the cache entry; callers briefly lock the
/// `RwLock` to read or mutate and must not hold the guard across calls back
/// into the pool.
pub type PageRef = Arc<RwLock<HeapPage>>;

struct Node {
    pid: PageId,
    page: PageRef,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU list as an arena of nodes linked by index, head = most recently
/// used. Indices of vacated slots are recycled through a free list.
struct LruCache {
    capacity: usize,
    map: HashMap<PageId, usize>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruCache {
    fn new(capacity: usize) -> LruCache {
        assert!(capacity > 0, "a buffer pool needs at least one page");
        LruCache {
            capacity,
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn node(&self, index: usize) -> &Node {
        self.nodes[index].as_ref().expect("linked index is occupied")
    }

    fn node_mut(&mut self, index: usize) -> &mut Node {
        self.nodes[index].as_mut().expect("linked index is occupied")
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let node = self.node(index);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(index);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.node_mut(h).prev = Some(index);
        }
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
    }

    /// Looks a page up and promotes it to most recently used.
    fn get(&mut self, pid: PageId) -> Option<PageRef> {
        let index = *self.map.get(&pid)?;
        self.unlink(index);
        self.push_front(index);
        Some(self.node(index).page.clone())
    }

    /// Inserts or replaces an entry at the MRU position, evicting the least
    /// recently used clean page when the pool is full.
    fn insert(&mut self, pid: PageId, page: PageRef) -> Result<()> {
        if let Some(&index) = self.map.get(&pid) {
            self.node_mut(index).page = page;
            self.unlink(index);
            self.push_front(index);
            return Ok(());
        }

        if self.map.len() == self.capacity {
            self.evict_clean()?;
        }

        let node = Node {
            pid,
            page,
            prev: None,
            next: None,
        };
        let index = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.map.insert(pid, index);
        self.push_front(index);
        Ok(())
    }

    /// Walks from the LRU end toward the head and removes the first clean
    /// page. Failing to find one is the NO-STEAL error: the caller cannot
    /// make room without writing uncommitted data.
    fn evict_clean(&mut self) -> Result<()> {
        let mut cursor = self.tail;
        while let Some(index) = cursor {
            let node = self.node(index);
            if node.page.read().unwrap().dirtier().is_none() {
                let pid = node.pid;
                crate::strata_debug_log!("[BufferPool] evicting clean page {pid:?}");
                self.remove(pid);
                return Ok(());
            }
            cursor = node.prev;
        }
        Err(Error::NoCleanPage)
    }

    fn remove(&mut self, pid: PageId) {
        if let Some(index) = self.map.remove(&pid) {
            self.unlink(index);
            self.nodes[index] = None;
            self.free.push(index);
        }
    }

    fn entries(&self) -> Vec<(PageId, PageRef)> {
        self.map
            .iter()
            .map(|(pid, &index)| (*pid, self.node(index).page.clone()))
            .collect()
    }
}

/// The buffer pool: a bounded LRU page cache plus the lock manager that
/// guards page access. One per database process.
pub struct BufferPool {
    catalog: Arc<Catalog>,
    log: Arc<Mutex<LogManager>>,
    lock_manager: LockManager,
    cache: Mutex<LruCache>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, log: Arc<Mutex<LogManager>>) -> BufferPool {
        BufferPool::with_capacity(DEFAULT_POOL_PAGES, catalog, log)
    }

    pub fn with_capacity(
        capacity: usize,
        catalog: Arc<Catalog>,
        log: Arc<Mutex<LogManager>>,
    ) -> BufferPool {
        BufferPool {
            catalog,
            log,
            lock_manager: LockManager::new(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of pages currently cached. Never exceeds the capacity.
    pub fn cached_pages(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Fetches a page on behalf of `tid`, taking a shared lock for
    /// read-only access or an exclusive lock for read-write. Blocks in
    /// bounded lock retries; exhaustion aborts the transaction. On a cache
    /// miss the page is read through the table's heap file, which may evict
    /// the least recently used clean page.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<PageRef> {
        let mode = match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        };
        if !self.lock_manager.acquire_lock(pid, tid, mode) {
            return Err(Error::TransactionAborted(tid));
        }

        let mut cache = self.cache.lock().unwrap();
        if let Some(page) = cache.get(pid) {
            return Ok(page);
        }

        let file = self.catalog.database_file(pid.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        cache.insert(pid, page.clone())?;
        Ok(page)
    }

    /// Adds a tuple to the table, marking every mutated page dirty with
    /// `tid` and re-caching it so later reads see the write.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: u32, tuple: Tuple) -> Result<()> {
        let file = self.catalog.database_file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.update_cache(pages, tid)
    }

    /// Removes a tuple from the table its record id names.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let table_id = tuple
            .record_id()
            .ok_or(Error::MissingRecordId)?
            .page_id
            .table_id;
        let file = self.catalog.database_file(table_id)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.update_cache(pages, tid)
    }

    fn update_cache(&self, pages: Vec<PageRef>, tid: TransactionId) -> Result<()> {
        let mut cache = self.cache.lock().unwrap();
        for page in pages {
            let pid = {
                let mut guard = page.write().unwrap();
                guard.mark_dirty(Some(tid));
                guard.id()
            };
            cache.insert(pid, page)?;
        }
        Ok(())
    }

    /// Ends a transaction. Commit flushes its dirty pages (logging a
    /// before/after record for each) and refreshes their before-images;
    /// abort discards its dirty pages so the next access re-reads the
    /// on-disk state. Either way every lock the transaction holds is
    /// released afterwards.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tid)?;
        } else {
            self.discard_pages(tid);
        }
        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Writes every page dirtied by `tid` through to disk and re-captures
    /// its before-image for the next transaction.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let entries = self.cache.lock().unwrap().entries();
        for (pid, page) in entries {
            if page.read().unwrap().dirtier() == Some(tid) {
                self.flush_page(pid, &page)?;
                page.write().unwrap().set_before_image();
            }
        }
        Ok(())
    }

    /// Flushes every dirty page regardless of owner. A startup/shutdown
    /// helper: calling this while transactions are in flight writes
    /// uncommitted data and breaks the NO-STEAL discipline.
    pub fn flush_all_pages(&self) -> Result<()> {
        let entries = self.cache.lock().unwrap().entries();
        for (pid, page) in entries {
            self.flush_page(pid, &page)?;
        }
        Ok(())
    }

    fn flush_page(&self, pid: PageId, page: &PageRef) -> Result<()> {
        let mut guard = page.write().unwrap();
        let Some(tid) = guard.dirtier() else {
            return Ok(());
        };
        let before = guard.before_image_data().to_vec();
        let after = guard.page_data();
        self.log
            .lock()
            .unwrap()
            .log_write(tid, pid, &before, &after)?;
        let file = self.catalog.database_file(pid.table_id)?;
        file.write_page(&mut guard)?;
        Ok(())
    }

    fn discard_pages(&self, tid: TransactionId) {
        let mut cache = self.cache.lock().unwrap();
        let dirtied: Vec<PageId> = cache
            .entries()
            .into_iter()
            .filter(|(_, page)| page.read().unwrap().dirtier() == Some(tid))
            .map(|(pid, _)| pid)
            .collect();
        for pid in dirtied {
            crate::strata_debug_log!("[BufferPool] discarding {pid:?} on abort");
            cache.remove(pid);
        }
    }

    /// Releases one page lock early. Two-phase locking normally releases
    /// only at commit or abort; callers that use this give up that
    /// guarantee for the page.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release_page(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }
}
