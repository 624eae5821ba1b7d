//! Session table
//!
//! Maps client ids to live sessions behind one exclusive lock. Client ids
//! are allocated and inserted under a single lock acquisition: highest
//! existing id plus one, starting at 1, never reusing a freed id within the
//! process lifetime and never handing out the reserved 0xFFFF.

use crate::types::{ClientId, CustomerId, Session, SessionState, INVALID_CLIENT_ID};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Concurrent map of client id to session
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Mutex<BTreeMap<ClientId, Session>>,
}

impl SessionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a client id and insert a CONNECTED session for it
    ///
    /// Returns `None` only when the id space is exhausted (the next id
    /// would be the reserved invalid value).
    pub fn connect(&self) -> Option<ClientId> {
        let mut sessions = self.sessions.lock();
        let client_id = match sessions.keys().next_back() {
            Some(&highest) if highest >= INVALID_CLIENT_ID - 1 => return None,
            Some(&highest) => highest + 1,
            None => 1,
        };
        sessions.insert(client_id, Session::connected(client_id));
        Some(client_id)
    }

    /// Look up a session by client id
    pub fn get(&self, client_id: ClientId) -> Option<Session> {
        self.sessions.lock().get(&client_id).copied()
    }

    /// Whether a session exists for the client id
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.sessions.lock().contains_key(&client_id)
    }

    /// Mutate a session in place; returns false when it does not exist
    pub fn update<F>(&self, client_id: ClientId, f: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&client_id) {
            Some(session) => {
                f(session);
                true
            }
            None => false,
        }
    }

    /// Bind a customer to the session and mark it logged on
    pub fn bind_customer(&self, client_id: ClientId, customer_id: CustomerId) -> bool {
        self.update(client_id, |session| {
            session.customer_id = customer_id;
            session.state = SessionState::LoggedOn;
        })
    }

    /// Remove a session; returns false when it does not exist
    pub fn remove(&self, client_id: ClientId) -> bool {
        self.sessions.lock().remove(&client_id).is_some()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether the table holds no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
