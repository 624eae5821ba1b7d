//! Transaction log
//!
//! An ordered, append-only map of transaction id to record behind one
//! exclusive lock. Ids are assigned from a counter inside the lock, so they
//! are globally monotonic during a run; the counter is seeded from the
//! highest persisted id so ids never repeat across restarts, even when a
//! previous save was incomplete.

use crate::types::{Amount, CustomerId, TransactionId, TransactionKind, TransactionRecord};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct LogInner {
    entries: BTreeMap<TransactionId, TransactionRecord>,
    next_id: TransactionId,
}

/// Concurrent ordered map of transaction id to record
#[derive(Debug)]
pub struct TransactionLog {
    inner: Mutex<LogInner>,
}

impl TransactionLog {
    /// Create an empty log; the first appended transaction gets id 1
    pub fn new() -> Self {
        TransactionLog {
            inner: Mutex::new(LogInner {
                entries: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Create a log seeded with persisted records
    ///
    /// The next id continues from the highest persisted id, not from the
    /// record count, so a truncated save cannot cause id reuse.
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        let mut entries = BTreeMap::new();
        for record in records {
            entries.entry(record.id).or_insert(record);
        }
        let next_id = entries.keys().next_back().map_or(1, |max| max + 1);
        TransactionLog {
            inner: Mutex::new(LogInner { entries, next_id }),
        }
    }

    /// Append a transaction, returning the id it was assigned
    pub fn append(
        &self,
        datetime: u64,
        amount: Amount,
        kind: TransactionKind,
        customer_id: CustomerId,
    ) -> TransactionId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(
            id,
            TransactionRecord {
                id,
                datetime,
                amount,
                kind,
                customer_id,
            },
        );
        id
    }

    /// Scan records with `id >= start_id` belonging to `customer_id`
    ///
    /// Returns up to `max_count` records in ascending id order.
    pub fn scan(
        &self,
        start_id: TransactionId,
        max_count: usize,
        customer_id: CustomerId,
    ) -> Vec<TransactionRecord> {
        let inner = self.inner.lock();
        inner
            .entries
            .range(start_id..)
            .map(|(_, record)| record)
            .filter(|record| record.customer_id == customer_id)
            .take(max_count)
            .copied()
            .collect()
    }

    /// Number of logged transactions
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the log holds no transactions
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// All records in ascending id order, for persistence
    pub fn snapshot(&self) -> Vec<TransactionRecord> {
        self.inner.lock().entries.values().copied().collect()
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}
