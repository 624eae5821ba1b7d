//! Runtime session records
//!
//! A session associates a connection's client id with its protocol state
//! and, once logged on, the customer it acts for. Sessions are runtime-only:
//! they are created on connect and destroyed when the connection closes,
//! and are never persisted.

use super::{ClientId, CustomerId, INVALID_CUSTOMER_ID};

/// Protocol state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initialization/error value, never stored for a live session
    Invalid,
    /// Connect succeeded, nothing else has happened yet
    Connected,
    /// An account was created on this session
    AccountCreated,
    /// A customer is logged on
    LoggedOn,
    /// The customer explicitly logged off
    LoggedOff,
    /// The connection is being torn down
    Disconnecting,
}

/// One live session, keyed by client id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Server-assigned id, unique across the session table
    pub client_id: ClientId,

    /// Current protocol state
    pub state: SessionState,

    /// Bound customer, or [`INVALID_CUSTOMER_ID`] when nobody is logged on
    pub customer_id: CustomerId,
}

impl Session {
    /// A freshly connected session with no customer bound
    pub fn connected(client_id: ClientId) -> Self {
        Session {
            client_id,
            state: SessionState::Connected,
            customer_id: INVALID_CUSTOMER_ID,
        }
    }

    /// Whether a customer is currently bound to this session
    pub fn is_logged_on(&self) -> bool {
        self.customer_id != INVALID_CUSTOMER_ID
    }
}
