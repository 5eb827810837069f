//! Page-level locks for two-phase transactions.
//!
//! Every page access runs through [`LockManager::acquire`], the one place
//! in the engine where a thread may suspend. Bookkeeping lives under a
//! single mutex; waiters park on one condvar and recheck their own grant
//! condition on every release broadcast.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Condvar, Mutex};

use crate::page::PageId;
use crate::transaction::TransactionId;

/// Lock modes: readers share, writers exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockMode {
    #[default]
    Shared,
    Exclusive,
}

#[derive(Debug)]
pub enum LockError {
    /// Granting the request would close a cycle in the wait-for graph.
    /// The caller is expected to abort the transaction; the lock manager
    /// never aborts on its own.
    Deadlock,
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Deadlock => write!(f, "deadlock detected"),
        }
    }
}

impl std::error::Error for LockError {}

/// Book-keeping for one page's lock. A lock record is created on the first
/// request for its page and lives for the rest of the process.
#[derive(Debug, Default)]
struct LockRecord {
    mode: LockMode,
    holders: HashSet<TransactionId>,
    readers: usize,
    writers: usize,
    waiters: HashMap<TransactionId, LockMode>,
}

#[derive(Debug, Default)]
struct LockState {
    page_locks: HashMap<PageId, LockRecord>,
    trans_pages: HashMap<TransactionId, HashSet<PageId>>,
    /// Edges from a blocked transaction to the holders it waits on.
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

#[derive(Debug, Default)]
pub struct LockManager {
    state: Mutex<LockState>,
    cvar: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `tid` holds the requested lock on `pid`, or fails with
    /// [`LockError::Deadlock`]. Requests already satisfied by a held lock
    /// return immediately; a shared holder requesting exclusive upgrades.
    pub fn acquire(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> Result<(), LockError> {
        match mode {
            LockMode::Shared => self.acquire_shared(tid, pid),
            LockMode::Exclusive => self.acquire_exclusive(tid, pid),
        }
    }

    fn acquire_shared(&self, tid: TransactionId, pid: PageId) -> Result<(), LockError> {
        let mut state = self.state.lock().unwrap();

        let record = state.page_locks.entry(pid).or_default();
        if record.holders.contains(&tid) {
            // Shared or exclusive, either already satisfies a read.
            return Ok(());
        }
        record.waiters.insert(tid, LockMode::Shared);

        loop {
            let blocked = state
                .page_locks
                .get(&pid)
                .map_or(false, |record| record.writers > 0);
            if !blocked {
                break;
            }
            self.block_or_deadlock(&mut state, tid, pid)?;
            state = self.cvar.wait(state).unwrap();
        }

        let record = state.page_locks.get_mut(&pid).unwrap();
        record.mode = LockMode::Shared;
        record.readers += 1;
        record.holders.insert(tid);
        record.waiters.remove(&tid);
        state.wait_for.remove(&tid);
        state.trans_pages.entry(tid).or_default().insert(pid);
        crate::strata_debug_log!("[LockManager] tx {} granted SHARED on {:?}", tid, pid);
        Ok(())
    }

    fn acquire_exclusive(&self, tid: TransactionId, pid: PageId) -> Result<(), LockError> {
        let mut state = self.state.lock().unwrap();

        let already_shared;
        {
            let record = state.page_locks.entry(pid).or_default();
            if record.holders.contains(&tid) && record.mode == LockMode::Exclusive {
                return Ok(());
            }
            already_shared = record.holders.contains(&tid);
            record.waiters.insert(tid, LockMode::Exclusive);
        }

        if already_shared {
            // Upgrade: wait until this transaction is the last reader, then
            // give up the shared slot before claiming the exclusive one.
            loop {
                let last_reader = state
                    .page_locks
                    .get(&pid)
                    .map_or(true, |record| record.readers <= 1);
                if last_reader {
                    break;
                }
                self.block_or_deadlock(&mut state, tid, pid)?;
                state = self.cvar.wait(state).unwrap();
            }
            let record = state.page_locks.get_mut(&pid).unwrap();
            if record.holders.remove(&tid) {
                record.readers -= 1;
            }
        }

        loop {
            let free = state
                .page_locks
                .get(&pid)
                .map_or(true, |record| record.readers == 0 && record.writers == 0);
            if free {
                break;
            }
            self.block_or_deadlock(&mut state, tid, pid)?;
            state = self.cvar.wait(state).unwrap();
        }

        let record = state.page_locks.get_mut(&pid).unwrap();
        record.mode = LockMode::Exclusive;
        record.writers += 1;
        record.holders.insert(tid);
        record.waiters.remove(&tid);
        state.wait_for.remove(&tid);
        state.trans_pages.entry(tid).or_default().insert(pid);
        crate::strata_debug_log!("[LockManager] tx {} granted EXCLUSIVE on {:?}", tid, pid);
        Ok(())
    }

    /// Re-points the requester's wait-for edges at the page's current
    /// holders and checks for a cycle. On deadlock the edges and the
    /// waiter entry are retracted before the error is returned.
    fn block_or_deadlock(
        &self,
        state: &mut LockState,
        tid: TransactionId,
        pid: PageId,
    ) -> Result<(), LockError> {
        let holders: HashSet<TransactionId> = state
            .page_locks
            .get(&pid)
            .map(|record| {
                record
                    .holders
                    .iter()
                    .copied()
                    .filter(|holder| *holder != tid)
                    .collect()
            })
            .unwrap_or_default();
        state.wait_for.insert(tid, holders);

        if Self::cycles_back_to(&state.wait_for, tid) {
            state.wait_for.remove(&tid);
            if let Some(record) = state.page_locks.get_mut(&pid) {
                record.waiters.remove(&tid);
            }
            self.cvar.notify_all();
            crate::strata_debug_log!("[LockManager] tx {} aborted: deadlock on {:?}", tid, pid);
            return Err(LockError::Deadlock);
        }
        Ok(())
    }

    /// Breadth-first walk of the wait-for graph from `start`; a path that
    /// returns to `start` is a deadlock. Self-edges carry no information
    /// and are skipped.
    fn cycles_back_to(
        wait_for: &HashMap<TransactionId, HashSet<TransactionId>>,
        start: TransactionId,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let Some(targets) = wait_for.get(&current) else {
                continue;
            };
            for &next in targets {
                if next == current {
                    continue;
                }
                if next == start {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Releases `tid`'s lock on `pid` and wakes every waiter. With
    /// `remove_from_index` the page is also dropped from the transaction's
    /// held-page set immediately (the early-release path).
    pub fn release(&self, tid: TransactionId, pid: PageId, remove_from_index: bool) {
        let mut state = self.state.lock().unwrap();
        Self::release_locked(&mut state, tid, pid, remove_from_index);
        self.cvar.notify_all();
    }

    fn release_locked(
        state: &mut LockState,
        tid: TransactionId,
        pid: PageId,
        remove_from_index: bool,
    ) {
        if let Some(record) = state.page_locks.get_mut(&pid) {
            if record.holders.remove(&tid) {
                match record.mode {
                    LockMode::Shared => record.readers -= 1,
                    LockMode::Exclusive => record.writers -= 1,
                }
            }
        }
        if remove_from_index {
            if let Some(pages) = state.trans_pages.get_mut(&tid) {
                pages.remove(&pid);
            }
        }
    }

    /// Releases every lock `tid` holds, drops its held-page set, and
    /// removes it from the wait-for graph.
    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        if let Some(pids) = state.trans_pages.remove(&tid) {
            for pid in pids {
                Self::release_locked(&mut state, tid, pid, false);
            }
        }
        state.wait_for.remove(&tid);
        for targets in state.wait_for.values_mut() {
            targets.remove(&tid);
        }
        self.cvar.notify_all();
        crate::strata_debug_log!("[LockManager] tx {} released all locks", tid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.state
            .lock()
            .unwrap()
            .trans_pages
            .get(&tid)
            .map_or(false, |pages| pages.contains(&pid))
    }

    /// The pages `tid` currently holds locks on, or `None` for a
    /// transaction with no locks.
    pub fn pages_held(&self, tid: TransactionId) -> Option<HashSet<PageId>> {
        self.state.lock().unwrap().trans_pages.get(&tid).cloned()
    }

    /// The transactions currently parked on `pid` and the modes they want.
    pub fn waiting_transactions(&self, pid: PageId) -> Vec<(TransactionId, LockMode)> {
        self.state
            .lock()
            .unwrap()
            .page_locks
            .get(&pid)
            .map(|record| record.waiters.iter().map(|(t, m)| (*t, *m)).collect())
            .unwrap_or_default()
    }
}
