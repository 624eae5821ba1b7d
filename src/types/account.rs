//! Account records
//!
//! An account record is the registration data a customer supplied when the
//! account was created, plus the derived customer id and the running
//! balance. The registration block is kept as a named sub-structure because
//! it is exactly what the create-account request carries and what the
//! persistence layer writes back out.

use super::name::NameCell;
use super::{Amount, CustomerId};

/// Registration data supplied on account creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registration {
    /// Customer's first name; the bytes feed the customer-id derivation
    pub first_name: NameCell,

    /// Customer's last name
    pub last_name: NameCell,

    /// Customer's email address
    pub email: NameCell,

    /// Personal identification number; zero is reserved as invalid
    pub pin: u16,

    /// Social security number, optional (zero when absent)
    pub ssn: u32,

    /// Driver's license number, optional (zero when absent)
    pub dln: u32,
}

/// One customer account
///
/// Primary key is `customer_id`. The balance only changes through the
/// account store's credit/debit operations and can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRecord {
    /// The registration block supplied at creation time
    pub registration: Registration,

    /// Derived from (first name bytes, PIN); stable across restarts
    pub customer_id: CustomerId,

    /// Current balance in integer cents
    pub balance: Amount,
}

impl AccountRecord {
    /// Create a fresh account with a zero balance
    pub fn new(registration: Registration, customer_id: CustomerId) -> Self {
        AccountRecord {
            registration,
            customer_id,
            balance: 0,
        }
    }
}
