//! Durable storage of the account and transaction tables

pub mod persistence;

pub use persistence::Storage;
