//! On-disk heap files: an unordered collection of tuples stored as a flat
//! sequence of fixed-size pages. The file layer owns raw page I/O; every
//! tuple-level operation goes through the buffer pool so locks and caching
//! stay consistent.

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::buffer_pool::{BufferPool, Permission, SharedPage};
use crate::error::StorageError;
use crate::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// A heap file backed by a single on-disk file whose length is always a
/// whole number of pages. Page `p` occupies bytes
/// `[p * page_size, (p + 1) * page_size)`.
#[derive(Debug)]
pub struct HeapFile {
    path: PathBuf,
    file: Mutex<File>,
    table_id: u32,
    desc: TupleDesc,
    /// Serializes the allocate-new-page-past-end path so two inserts never
    /// claim the same page number.
    alloc: Mutex<()>,
}

impl HeapFile {
    /// Opens (or creates) the backing file. The table id is a stable hash
    /// of the canonicalized path, so reopening the same file yields the
    /// same id for the rest of the process.
    pub fn open(path: impl AsRef<Path>, desc: TupleDesc) -> Result<HeapFile, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let table_id = stable_table_id(&path);
        crate::strata_debug_log!("[HeapFile] opened {:?} as table id {}", path, table_id);
        Ok(HeapFile {
            path,
            file: Mutex::new(file),
            table_id,
            desc,
            alloc: Mutex::new(()),
        })
    }

    pub fn id(&self) -> u32 {
        self.table_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Number of pages in the file, rounding a partial trailing page up.
    pub fn num_pages(&self) -> Result<u32, StorageError> {
        let len = self.file.lock().unwrap().metadata()?.len();
        let page_size = crate::page_size() as u64;
        Ok(len.div_ceil(page_size) as u32)
    }

    /// Reads and decodes one page straight from disk.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage, StorageError> {
        if pid.table_id != self.table_id {
            return Err(StorageError::WrongTable);
        }
        let num_pages = self.num_pages()?;
        if pid.page_no >= num_pages {
            return Err(StorageError::PageOutOfBounds {
                page_no: pid.page_no,
                num_pages,
            });
        }

        let page_size = crate::page_size();
        let mut data = vec![0u8; page_size];
        {
            let mut file = self.file.lock().unwrap();
            file.seek(SeekFrom::Start(pid.page_no as u64 * page_size as u64))?;
            // The trailing page may be short on disk; the remainder stays
            // zeroed.
            let mut filled = 0;
            while filled < page_size {
                match file.read(&mut data[filled..])? {
                    0 => break,
                    n => filled += n,
                }
            }
        }
        HeapPage::new(pid, &data, self.desc.clone())
    }

    /// Writes one page at its offset, extending the file if the page is
    /// one past the current end.
    pub fn write_page(&self, page: &HeapPage) -> Result<(), StorageError> {
        let pid = page.id();
        if pid.table_id != self.table_id {
            return Err(StorageError::WrongTable);
        }
        let data = page.serialize();
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(
            pid.page_no as u64 * crate::page_size() as u64,
        ))?;
        file.write_all(&data)?;
        file.sync_all()?;
        crate::strata_debug_log!("[HeapFile] wrote page {:?}", pid);
        Ok(())
    }

    /// Inserts a tuple on the first page with an empty slot, scanning in
    /// ascending page order under READ_WRITE. When every page is full, a
    /// fresh page is allocated at the end of the file and the tuple lands
    /// there. Returns the pages dirtied by the insert.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<SharedPage>, StorageError> {
        if *tuple.tuple_desc() != self.desc {
            return Err(StorageError::SchemaMismatch);
        }

        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_no);
            let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
            let inserted = {
                let mut page = page.write().unwrap();
                if page.empty_slot_count() > 0 {
                    page.insert_tuple(tuple)?;
                    true
                } else {
                    false
                }
            };
            if inserted {
                return Ok(vec![page]);
            }
        }

        // Every existing page is full: extend the file by one empty page,
        // then insert through the buffer pool so the lock discipline holds.
        let pid = {
            let _alloc = self.alloc.lock().unwrap();
            let pid = PageId::new(self.table_id, self.num_pages()?);
            let fresh = HeapPage::new(pid, &HeapPage::empty_page_data(), self.desc.clone())?;
            self.write_page(&fresh)?;
            pid
        };
        crate::strata_debug_log!("[HeapFile] extended table {} with page {:?}", self.table_id, pid);

        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        page.write().unwrap().insert_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Deletes the tuple named by its record id. Returns the dirtied page.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<SharedPage>, StorageError> {
        let rid = tuple.record_id().ok_or(StorageError::NotOnThisPage)?;
        if rid.page_id.table_id != self.table_id {
            return Err(StorageError::WrongTable);
        }
        let num_pages = self.num_pages()?;
        if rid.page_id.page_no >= num_pages {
            return Err(StorageError::PageOutOfBounds {
                page_no: rid.page_id.page_no,
                num_pages,
            });
        }

        let page = pool.get_page(tid, rid.page_id, Permission::ReadWrite)?;
        page.write().unwrap().delete_tuple(tuple)?;
        Ok(vec![page])
    }

    /// A rewindable iterator over every tuple in the file, in page order
    /// then slot order, fetching each page under READ_ONLY.
    pub fn iter(self: &Arc<Self>, pool: &Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator {
            file: Arc::clone(self),
            pool: Arc::clone(pool),
            tid,
            page_no: 0,
            buffered: Vec::new().into_iter(),
            opened: false,
        }
    }
}

/// Derives a process-stable table id from the file path.
fn stable_table_id(path: &Path) -> u32 {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish() as u32
}

/// Lazy tuple cursor over a heap file. Buffers one page's tuples at a
/// time; `rewind` resets to page zero.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    page_no: u32,
    buffered: std::vec::IntoIter<Tuple>,
    opened: bool,
}

impl HeapFileIterator {
    pub fn open(&mut self) -> Result<(), StorageError> {
        self.page_no = 0;
        self.buffered = Vec::new().into_iter();
        if self.file.num_pages()? > 0 {
            self.load_page(0)?;
        }
        self.opened = true;
        Ok(())
    }

    fn load_page(&mut self, page_no: u32) -> Result<(), StorageError> {
        let pid = PageId::new(self.file.id(), page_no);
        let page = self.pool.get_page(self.tid, pid, Permission::ReadOnly)?;
        let tuples: Vec<Tuple> = page.read().unwrap().iter().cloned().collect();
        self.page_no = page_no;
        self.buffered = tuples.into_iter();
        Ok(())
    }

    /// The next tuple, or `None` once the file is exhausted (or the
    /// iterator was never opened).
    pub fn next(&mut self) -> Result<Option<Tuple>, StorageError> {
        if !self.opened {
            return Ok(None);
        }
        loop {
            if let Some(tuple) = self.buffered.next() {
                return Ok(Some(tuple));
            }
            if self.page_no + 1 >= self.file.num_pages()? {
                return Ok(None);
            }
            let next_page = self.page_no + 1;
            self.load_page(next_page)?;
        }
    }

    pub fn rewind(&mut self) -> Result<(), StorageError> {
        self.open()
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.buffered = Vec::new().into_iter();
        self.page_no = 0;
    }
}
