//! Business logic components
//!
//! - [`customer_id`] - derivation of the 64-bit account key
//! - [`account_store`] - locked account table with balance operations
//! - [`transaction_log`] - locked append-only transaction table
//! - [`session_table`] - locked table of live connections
//! - [`engine`] - the request handlers tying the stores together

pub mod account_store;
pub mod customer_id;
pub mod engine;
pub mod session_table;
pub mod transaction_log;

pub use account_store::{AccountStore, AdjustError};
pub use engine::{Engine, HandlerOutcome};
pub use session_table::SessionTable;
pub use transaction_log::TransactionLog;
