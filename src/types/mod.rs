//! Core types for the CNP bank server
//!
//! This module defines the identifier aliases, protocol result codes,
//! domain records (accounts, transactions, sessions) and the server-side
//! error type shared by every other module.

pub mod account;
pub mod codes;
pub mod error;
pub mod name;
pub mod session;
pub mod transaction;

pub use account::{AccountRecord, Registration};
pub use codes::ResultCode;
pub use error::ServerError;
pub use name::NameCell;
pub use session::{Session, SessionState};
pub use transaction::{DepositKind, TransactionKind, TransactionRecord};

/// Client identifier, assigned by the server on connect
///
/// Valid for the lifetime of one TCP connection.
pub type ClientId = u16;

/// Customer identifier, derived from (first name, PIN)
///
/// Stable across restarts; the primary key of the account table.
pub type CustomerId = u64;

/// Transaction identifier
///
/// Assigned sequentially by the transaction log.
pub type TransactionId = u32;

/// Monetary amount in integer cents
pub type Amount = u32;

/// Reserved client id used for initialization and error checking
pub const INVALID_CLIENT_ID: ClientId = 0xFFFF;

/// Reserved customer id used for initialization and error checking
pub const INVALID_CUSTOMER_ID: CustomerId = 0;

/// Reserved PIN value; a PIN of zero is never a valid credential
pub const INVALID_PIN: u16 = 0;
