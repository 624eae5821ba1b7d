//! Account store
//!
//! Maintains the map of customer id to account record behind one exclusive
//! lock. Balance mutations happen entirely inside the lock so the
//! check-then-adjust sequence is atomic: a debit can never race another
//! debit past the balance check, and the balance can never go negative.

use crate::types::{AccountRecord, Amount, CustomerId};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Why a balance adjustment was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustError {
    /// No account exists for the customer id
    NotFound,
    /// The debit would overdraw the account
    Insufficient {
        /// Balance at the time of the attempt
        balance: Amount,
        /// Amount the debit asked for
        requested: Amount,
    },
    /// The credit would overflow the balance field
    Overflow,
}

/// Concurrent map of customer id to account record
///
/// All access goes through one mutex; handles are shared between workers by
/// wrapping the owning engine in an `Arc`.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: Mutex<BTreeMap<CustomerId, AccountRecord>>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with persisted records
    ///
    /// Records keep their stored balances; duplicate customer ids keep the
    /// first occurrence.
    pub fn from_records(records: Vec<AccountRecord>) -> Self {
        let mut accounts = BTreeMap::new();
        for record in records {
            accounts.entry(record.customer_id).or_insert(record);
        }
        AccountStore {
            accounts: Mutex::new(accounts),
        }
    }

    /// Whether an account exists for the customer id
    pub fn contains(&self, customer_id: CustomerId) -> bool {
        self.accounts.lock().contains_key(&customer_id)
    }

    /// Current balance, or `None` when no account exists
    pub fn balance(&self, customer_id: CustomerId) -> Option<Amount> {
        self.accounts
            .lock()
            .get(&customer_id)
            .map(|account| account.balance)
    }

    /// Insert a new account; fails when the customer id is already taken
    pub fn insert_unique(&self, record: AccountRecord) -> bool {
        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&record.customer_id) {
            return false;
        }
        accounts.insert(record.customer_id, record);
        true
    }

    /// Credit the account, returning the new balance
    pub fn credit(&self, customer_id: CustomerId, amount: Amount) -> Result<Amount, AdjustError> {
        let mut accounts = self.accounts.lock();
        let account = accounts.get_mut(&customer_id).ok_or(AdjustError::NotFound)?;
        let new_balance = account
            .balance
            .checked_add(amount)
            .ok_or(AdjustError::Overflow)?;
        account.balance = new_balance;
        Ok(new_balance)
    }

    /// Debit the account, returning the new balance
    ///
    /// Refused when the debit would overdraw; the balance is untouched in
    /// that case.
    pub fn debit(&self, customer_id: CustomerId, amount: Amount) -> Result<Amount, AdjustError> {
        let mut accounts = self.accounts.lock();
        let account = accounts.get_mut(&customer_id).ok_or(AdjustError::NotFound)?;
        if amount > account.balance {
            return Err(AdjustError::Insufficient {
                balance: account.balance,
                requested: amount,
            });
        }
        account.balance -= amount;
        Ok(account.balance)
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Whether the store holds no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }

    /// All records in ascending customer-id order, for persistence
    pub fn snapshot(&self) -> Vec<AccountRecord> {
        self.accounts.lock().values().copied().collect()
    }
}
