use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::heap_file::HeapFile;
use crate::log::LogManager;
use crate::DEFAULT_POOL_PAGES;

/// The process-wide context: catalog, buffer pool and page log, wired
/// together once at startup and passed explicitly to whoever needs them.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
    log: Arc<Mutex<LogManager>>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Database> {
        Database::with_pool_capacity(log_path, DEFAULT_POOL_PAGES)
    }

    pub fn with_pool_capacity<P: AsRef<Path>>(
        log_path: P,
        pool_pages: usize,
    ) -> Result<Database> {
        let catalog = Arc::new(Catalog::new());
        let log = Arc::new(Mutex::new(LogManager::open(log_path)?));
        let buffer_pool = Arc::new(BufferPool::with_capacity(
            pool_pages,
            Arc::clone(&catalog),
            Arc::clone(&log),
        ));
        Ok(Database {
            catalog,
            buffer_pool,
            log,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    pub fn log(&self) -> &Arc<Mutex<LogManager>> {
        &self.log
    }

    /// Registers a table with the catalog.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, pkey: &str) {
        self.catalog.add_table(file, name, pkey);
    }
}
