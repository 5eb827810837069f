//! The shared page cache. Every page access funnels through
//! [`BufferPool::get_page`], which takes the page lock, serves the page
//! from cache or disk, and tracks access recency for eviction.
//!
//! Eviction is NO-STEAL: a dirty page never leaves the cache (and never
//! reaches disk) before its transaction completes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::catalog::Catalog;
use crate::error::StorageError;
use crate::lock_manager::{LockManager, LockMode};
use crate::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

/// Default number of pages a buffer pool caches.
pub const DEFAULT_PAGES: usize = 50;

/// The access a caller wants on a page. Maps onto the lock modes: reads
/// take a shared lock, writes an exclusive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

/// A cached page, shared between the pool and its callers. The page lock
/// discipline makes in-place mutation safe: only an exclusive holder may
/// write.
pub type SharedPage = Arc<RwLock<HeapPage>>;

/// Cache map and access-order index, always updated together.
#[derive(Debug, Default)]
struct PageCache {
    pages: HashMap<PageId, SharedPage>,
    /// Access order, least recently used first.
    order: Vec<PageId>,
}

impl PageCache {
    fn touch(&mut self, pid: PageId) {
        self.order.retain(|p| *p != pid);
        self.order.push(pid);
    }

    fn remove(&mut self, pid: PageId) -> Option<SharedPage> {
        self.order.retain(|p| *p != pid);
        self.pages.remove(&pid)
    }
}

pub struct BufferPool {
    max_pages: usize,
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    cache: Mutex<PageCache>,
}

impl BufferPool {
    pub fn new(max_pages: usize, catalog: Arc<Catalog>, lock_manager: Arc<LockManager>) -> Self {
        assert!(max_pages > 0, "buffer pool needs at least one page");
        BufferPool {
            max_pages,
            catalog,
            lock_manager,
            cache: Mutex::new(PageCache::default()),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Retrieves a page on behalf of `tid`, blocking until the matching
    /// lock is granted. A cached page is returned as-is; otherwise the
    /// page is read from its heap file, or materialized fresh when the
    /// page number lies one past the end of the file (the insert path).
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> Result<SharedPage, StorageError> {
        let mode = match perm {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        };
        self.lock_manager.acquire(tid, pid, mode)?;

        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(page) = cache.pages.get(&pid).cloned() {
                cache.touch(pid);
                return Ok(page);
            }
        }

        // Miss: do the disk read outside the cache mutex.
        let file = self.catalog.file(pid.table_id)?;
        let page = if pid.page_no < file.num_pages()? {
            file.read_page(pid)?
        } else {
            crate::strata_debug_log!("[BufferPool] materializing fresh page {:?}", pid);
            HeapPage::new(pid, &HeapPage::empty_page_data(), file.tuple_desc().clone())?
        };
        let page = Arc::new(RwLock::new(page));

        let mut cache = self.cache.lock().unwrap();
        if let Some(existing) = cache.pages.get(&pid).cloned() {
            // Another thread loaded the page while we were reading.
            cache.touch(pid);
            return Ok(existing);
        }
        if cache.pages.len() >= self.max_pages {
            Self::evict_locked(&mut cache)?;
        }
        cache.pages.insert(pid, Arc::clone(&page));
        cache.touch(pid);
        Ok(page)
    }

    /// Removes the least recently used clean page. Dirty pages stay
    /// resident until their transaction completes.
    fn evict_locked(cache: &mut PageCache) -> Result<(), StorageError> {
        let victim = cache
            .order
            .iter()
            .copied()
            .find(|pid| cache.pages[pid].read().unwrap().dirtier().is_none());
        match victim {
            Some(pid) => {
                crate::strata_debug_log!("[BufferPool] evicting clean page {:?}", pid);
                cache.remove(pid);
                Ok(())
            }
            None => Err(StorageError::NoCleanVictim),
        }
    }

    /// Inserts a tuple into the named table, marking every dirtied page
    /// and keeping it cached.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: u32,
        tuple: &mut Tuple,
    ) -> Result<(), StorageError> {
        let file = self.catalog.file(table_id)?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.remember_dirty(tid, dirtied)
    }

    /// Deletes a tuple from the table named by its record id.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<(), StorageError> {
        let rid = tuple.record_id().ok_or(StorageError::NotOnThisPage)?;
        let file = self.catalog.file(rid.page_id.table_id)?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.remember_dirty(tid, dirtied)
    }

    /// Marks freshly written pages dirty and puts them (back) in the
    /// cache so later requests see the new version.
    fn remember_dirty(
        &self,
        tid: TransactionId,
        pages: Vec<SharedPage>,
    ) -> Result<(), StorageError> {
        for page in pages {
            let pid = {
                let mut page = page.write().unwrap();
                page.mark_dirty(Some(tid));
                page.id()
            };
            let mut cache = self.cache.lock().unwrap();
            if !cache.pages.contains_key(&pid) {
                if cache.pages.len() >= self.max_pages {
                    Self::evict_locked(&mut cache)?;
                }
                cache.pages.insert(pid, Arc::clone(&page));
            }
            cache.touch(pid);
        }
        Ok(())
    }

    /// Commits or aborts `tid`: flushes (commit) or discards (abort) every
    /// page the lock manager records for it, then releases its locks.
    pub fn transaction_complete(
        &self,
        tid: TransactionId,
        commit: bool,
    ) -> Result<(), StorageError> {
        crate::strata_debug_log!(
            "[BufferPool] completing tx {} ({})",
            tid,
            if commit { "commit" } else { "abort" }
        );
        if let Some(pids) = self.lock_manager.pages_held(tid) {
            for pid in pids {
                if commit {
                    self.flush_page(pid)?;
                } else {
                    self.discard_page(pid);
                }
            }
        }
        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Writes a cached dirty page to its heap file and clears the dirty
    /// flag. A no-op for uncached or clean pages.
    pub fn flush_page(&self, pid: PageId) -> Result<(), StorageError> {
        let page = { self.cache.lock().unwrap().pages.get(&pid).cloned() };
        let Some(page) = page else {
            return Ok(());
        };
        let mut page = page.write().unwrap();
        if page.dirtier().is_none() {
            return Ok(());
        }
        let file = self.catalog.file(pid.table_id)?;
        file.write_page(&page)?;
        page.mark_dirty(None);
        Ok(())
    }

    /// Flushes every cached page. Breaks NO-STEAL if dirty transactions
    /// are still in flight; callers own that risk.
    pub fn flush_all_pages(&self) -> Result<(), StorageError> {
        let pids: Vec<PageId> = {
            let cache = self.cache.lock().unwrap();
            cache.pages.keys().copied().collect()
        };
        for pid in pids {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().unwrap().remove(pid);
    }

    /// Releases a single lock before transaction completion. The
    /// resulting schedule may violate two-phase locking; callers own that
    /// risk.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid, true);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.lock().unwrap().pages.len()
    }

    /// Whether the page is currently resident in the cache.
    pub fn is_cached(&self, pid: PageId) -> bool {
        self.cache.lock().unwrap().pages.contains_key(&pid)
    }
}
