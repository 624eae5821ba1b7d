//! Transaction records and the enumerations that classify them

use super::{Amount, CustomerId, TransactionId};

/// How a deposit was tendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositKind {
    /// Cash deposit
    Cash,
    /// Check deposit
    Check,
}

impl DepositKind {
    /// Parse the wire value; anything but 1 or 2 is invalid
    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0x01 => Some(DepositKind::Cash),
            0x02 => Some(DepositKind::Check),
            _ => None,
        }
    }

    /// Wire value of this kind
    pub const fn to_wire(self) -> u16 {
        match self {
            DepositKind::Cash => 0x01,
            DepositKind::Check => 0x02,
        }
    }
}

/// Classification of a logged transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Funds credited to the account
    Deposit,
    /// Funds withdrawn from the account
    Withdrawal,
    /// Funds debited for a stamp purchase
    StampPurchase,
}

impl TransactionKind {
    /// Parse the wire value
    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0x01 => Some(TransactionKind::Deposit),
            0x02 => Some(TransactionKind::Withdrawal),
            0x03 => Some(TransactionKind::StampPurchase),
            _ => None,
        }
    }

    /// Wire value of this kind
    pub const fn to_wire(self) -> u16 {
        match self {
            TransactionKind::Deposit => 0x01,
            TransactionKind::Withdrawal => 0x02,
            TransactionKind::StampPurchase => 0x03,
        }
    }
}

/// One logged transaction
///
/// Immutable once inserted. Primary key is `id`; `customer_id` references
/// the account the transaction was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Server-assigned sequential id, strictly increasing
    pub id: TransactionId,

    /// Seconds since the Unix epoch at the time the transaction applied
    pub datetime: u64,

    /// Transaction amount in integer cents
    pub amount: Amount,

    /// Whether this was a deposit, withdrawal, or stamp purchase
    pub kind: TransactionKind,

    /// Account the transaction belongs to
    pub customer_id: CustomerId,
}
