//! Page-granularity two-phase locking.
//!
//! Per (page, transaction) the states are Unlocked -> S -> X -> Unlocked;
//! the S -> X upgrade is granted only while the requester is the sole
//! holder. Conflicts wait a bounded interval on a condvar and retry; when
//! the retries run out the acquisition fails and the caller aborts its
//! transaction. That retry exhaustion is the only deadlock response.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::page::PageId;
use crate::transaction::TransactionId;

/// Bounded waits before an acquisition gives up.
const MAX_RETRIES: u32 = 3;
/// Length of one bounded wait.
const RETRY_SLEEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// The lock table: page -> holders and their modes. Mutated only under its
/// own mutex; waiters block on the paired condvar.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<HashMap<PageId, HashMap<TransactionId, LockMode>>>,
    cvar: Condvar,
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager::default()
    }

    /// Acquires `mode` on `pid` for `tid`, waiting up to `MAX_RETRIES`
    /// bounded intervals. Returns false on exhaustion; the caller must then
    /// abort its transaction.
    pub fn acquire_lock(&self, pid: PageId, tid: TransactionId, mode: LockMode) -> bool {
        let mut table = self.table.lock().unwrap();
        let mut retries = 0;
        loop {
            if Self::try_grant(&mut table, pid, tid, mode) {
                return true;
            }
            if retries == MAX_RETRIES {
                crate::strata_debug_log!(
                    "[LockManager] tx {} gave up on {:?} lock for {:?}",
                    tid,
                    mode,
                    pid
                );
                return false;
            }
            let (guard, _) = self.cvar.wait_timeout(table, RETRY_SLEEP).unwrap();
            table = guard;
            retries += 1;
        }
    }

    fn try_grant(
        table: &mut HashMap<PageId, HashMap<TransactionId, LockMode>>,
        pid: PageId,
        tid: TransactionId,
        mode: LockMode,
    ) -> bool {
        let holders = table.entry(pid).or_default();
        if holders.is_empty() {
            holders.insert(tid, mode);
            return true;
        }

        match holders.get(&tid).copied() {
            Some(own) => match mode {
                // Re-requesting S always succeeds, and an X holder asking
                // for S is downgraded.
                LockMode::Shared => {
                    holders.insert(tid, LockMode::Shared);
                    true
                }
                LockMode::Exclusive => {
                    if own == LockMode::Exclusive {
                        true
                    } else if holders.len() == 1 {
                        holders.insert(tid, LockMode::Exclusive);
                        true
                    } else {
                        false
                    }
                }
            },
            None => match mode {
                LockMode::Exclusive => false,
                LockMode::Shared => {
                    if holders.values().all(|m| *m == LockMode::Shared) {
                        holders.insert(tid, LockMode::Shared);
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }

    /// Drops `tid`'s lock on one page and wakes waiters.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock().unwrap();
        if let Some(holders) = table.get_mut(&pid) {
            holders.remove(&tid);
            if holders.is_empty() {
                table.remove(&pid);
            }
            self.cvar.notify_all();
        }
    }

    /// Drops every lock `tid` holds and wakes waiters.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock().unwrap();
        table.retain(|_, holders| {
            holders.remove(&tid);
            !holders.is_empty()
        });
        self.cvar.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.table
            .lock()
            .unwrap()
            .get(&pid)
            .is_some_and(|holders| holders.contains_key(&tid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn pid(page_no: u32) -> PageId {
        PageId {
            table_id: 7,
            page_no,
        }
    }

    #[test]
    fn shared_locks_coexist() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Shared));
        assert!(lm.acquire_lock(pid(0), t2, LockMode::Shared));
        assert!(lm.holds_lock(t1, pid(0)));
        assert!(lm.holds_lock(t2, pid(0)));
    }

    #[test]
    fn sole_holder_upgrades_immediately() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Shared));
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Exclusive));
        // The upgraded lock now blocks readers.
        assert!(!lm.acquire_lock(pid(0), t2, LockMode::Shared));
    }

    #[test]
    fn upgrade_fails_while_another_reader_holds() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Shared));
        assert!(lm.acquire_lock(pid(0), t2, LockMode::Shared));
        assert!(!lm.acquire_lock(pid(0), t1, LockMode::Exclusive));
    }

    #[test]
    fn exclusive_excludes_everyone_else() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Exclusive));
        assert!(!lm.acquire_lock(pid(0), t2, LockMode::Shared));
        assert!(!lm.acquire_lock(pid(0), t2, LockMode::Exclusive));
        // The holder itself may re-request either mode.
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Shared));
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Exclusive));
    }

    #[test]
    fn release_wakes_a_waiter_within_its_retries() {
        let lm = Arc::new(LockManager::new());
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        assert!(lm.acquire_lock(pid(0), t1, LockMode::Exclusive));

        let lm2 = Arc::clone(&lm);
        let waiter = thread::spawn(move || lm2.acquire_lock(pid(0), t2, LockMode::Exclusive));

        thread::sleep(Duration::from_millis(5));
        lm.release_page(t1, pid(0));
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn release_all_clears_every_page() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        for page_no in 0..4 {
            assert!(lm.acquire_lock(pid(page_no), t1, LockMode::Shared));
        }
        lm.release_all(t1);
        for page_no in 0..4 {
            assert!(!lm.holds_lock(t1, pid(page_no)));
        }
    }
}
