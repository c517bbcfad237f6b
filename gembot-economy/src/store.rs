//! Player record persistence seam.
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::player::PlayerRecord;

/// Why a store call failed. "Record absent" is not an error: `read` returns
/// `Ok(None)` for that.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),
    #[error(
        "revision mismatch for {user_id}: expected {}, found {}",
        revision_label(.expected),
        revision_label(.actual)
    )]
    Conflict {
        user_id: String,
        /// `None` means the writer expected no record at all.
        expected: Option<u64>,
        actual: Option<u64>,
    },
    #[error("stored record for {user_id} is unreadable: {reason}")]
    Corrupt { user_id: String, reason: String },
}

fn revision_label(revision: &Option<u64>) -> String {
    revision.map_or_else(|| "no record".to_string(), |revision| format!("revision {revision}"))
}

/// Key-value persistence keyed by user identifier.
///
/// Host crates provide the concrete backend.
pub trait PlayerStore {
    /// Fetch a record.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` or `Corrupt`; a missing record is `Ok(None)`.
    fn read(&self, user_id: &str) -> Result<Option<PlayerRecord>, StoreError>;

    /// Conditionally persist `record`.
    ///
    /// With `expected_revision == None` the write only lands if no record is
    /// stored. With `Some(n)` a record must be stored at exactly revision `n`.
    /// Legacy documents carry revision 0, so "absent" and "revision 0" are
    /// different preconditions.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when another writer got there first, or
    /// `Unavailable` when the backend cannot accept writes.
    fn write(
        &self,
        user_id: &str,
        record: &PlayerRecord,
        expected_revision: Option<u64>,
    ) -> Result<(), StoreError>;

    /// Every stored record, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` or `Corrupt`.
    fn list(&self) -> Result<Vec<(String, PlayerRecord)>, StoreError>;
}

/// In-process store, with switches to simulate outages.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, PlayerRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the revision check.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the lock is poisoned.
    pub fn insert(&self, user_id: &str, record: PlayerRecord) -> Result<(), StoreError> {
        self.lock()?.insert(user_id.to_string(), record);
        Ok(())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PlayerRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl PlayerStore for MemoryStore {
    fn read(&self, user_id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn write(
        &self,
        user_id: &str,
        record: &PlayerRecord,
        expected_revision: Option<u64>,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut records = self.lock()?;
        let actual = records.get(user_id).map(|stored| stored.revision);
        if actual != expected_revision {
            return Err(StoreError::Conflict {
                user_id: user_id.to_string(),
                expected: expected_revision,
                actual,
            });
        }
        records.insert(user_id.to_string(), record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, PlayerRecord)>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self
            .lock()?
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(balance: u64, revision: u64) -> PlayerRecord {
        PlayerRecord {
            balance,
            revision,
            ..PlayerRecord::default()
        }
    }

    #[test]
    fn absent_record_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.read("nobody").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn write_requires_matching_revision() {
        let store = MemoryStore::new();
        store.write("u1", &record(10, 1), None).unwrap();
        assert_eq!(store.read("u1").unwrap(), Some(record(10, 1)));

        let err = store.write("u1", &record(99, 1), None).unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                user_id: "u1".into(),
                expected: None,
                actual: Some(1)
            }
        );
        assert_eq!(
            err.to_string(),
            "revision mismatch for u1: expected no record, found revision 1"
        );
        store.write("u1", &record(20, 2), Some(1)).unwrap();
        assert_eq!(store.read("u1").unwrap().unwrap().balance, 20);
    }

    #[test]
    fn revision_zero_record_is_not_treated_as_absent() {
        let store = MemoryStore::new();
        store.insert("legacy", record(900, 0)).unwrap();
        assert!(matches!(
            store.write("legacy", &record(1, 1), None),
            Err(StoreError::Conflict {
                expected: None,
                actual: Some(0),
                ..
            })
        ));
        store.write("legacy", &record(950, 1), Some(0)).unwrap();
        assert!(matches!(
            store.write("ghost", &record(1, 1), Some(0)),
            Err(StoreError::Conflict {
                expected: Some(0),
                actual: None,
                ..
            })
        ));
    }

    #[test]
    fn outage_switches_fail_calls() {
        let store = MemoryStore::new();
        store.insert("u1", record(5, 1)).unwrap();
        store.set_fail_reads(true);
        assert!(matches!(store.read("u1"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.list(), Err(StoreError::Unavailable(_))));
        store.set_fail_reads(false);
        store.set_fail_writes(true);
        assert!(matches!(
            store.write("u1", &record(6, 2), Some(1)),
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
