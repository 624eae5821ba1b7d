//! Protocol result codes
//!
//! Every response frame carries a 32-bit result code. The high 16 bits name
//! the facility the error belongs to (connection, credentials, functional,
//! account) and the low 16 bits the specific condition. Success is zero and
//! the generic error is all ones.

/// Error facility, carried in the high 16 bits of a result code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    /// Connection validation (key, protocol version)
    Connect,
    /// Logon credentials
    Credentials,
    /// Arguments or client state
    Functional,
    /// Account balances and existence
    Account,
    /// Anything not covered above
    Undefined,
}

/// Result code returned to the client in every response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// Operation completed
    Success,
    /// Connect carried the wrong validation key
    AuthenticationFailed,
    /// Client protocol version is newer than the server's
    UnsupportedProtocol,
    /// No session exists for the client id on the request
    InvalidClientId,
    /// Name empty or PIN zero
    InvalidNamePin,
    /// A request argument is out of range
    InvalidArguments,
    /// The session has no customer bound to it
    ClientNotLoggedOn,
    /// Cash drawer hardware fault
    DrawerBlocked,
    /// A debit would overdraw the account
    InsufficientFunds,
    /// No account exists for the derived customer id
    AccountNotFound,
    /// An account already exists for the derived customer id
    AccountExists,
    /// Generic failure
    Error,
}

impl ResultCode {
    /// Wire value of this code
    pub const fn code(self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::AuthenticationFailed => 0x0001_0001,
            ResultCode::UnsupportedProtocol => 0x0001_0002,
            ResultCode::InvalidClientId => 0x0002_0001,
            ResultCode::InvalidNamePin => 0x0002_0002,
            ResultCode::InvalidArguments => 0x0003_0001,
            ResultCode::ClientNotLoggedOn => 0x0003_0002,
            ResultCode::DrawerBlocked => 0x0003_0003,
            ResultCode::InsufficientFunds => 0x0004_0001,
            ResultCode::AccountNotFound => 0x0004_0002,
            ResultCode::AccountExists => 0x0004_0003,
            ResultCode::Error => 0xFFFF_FFFF,
        }
    }

    /// Parse a wire value; anything unrecognised maps to [`ResultCode::Error`]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ResultCode::Success,
            0x0001_0001 => ResultCode::AuthenticationFailed,
            0x0001_0002 => ResultCode::UnsupportedProtocol,
            0x0002_0001 => ResultCode::InvalidClientId,
            0x0002_0002 => ResultCode::InvalidNamePin,
            0x0003_0001 => ResultCode::InvalidArguments,
            0x0003_0002 => ResultCode::ClientNotLoggedOn,
            0x0003_0003 => ResultCode::DrawerBlocked,
            0x0004_0001 => ResultCode::InsufficientFunds,
            0x0004_0002 => ResultCode::AccountNotFound,
            0x0004_0003 => ResultCode::AccountExists,
            _ => ResultCode::Error,
        }
    }

    /// Facility this code belongs to
    pub fn facility(self) -> Facility {
        match self.code() >> 16 {
            0 if self == ResultCode::Success => Facility::Connect,
            0x0001 => Facility::Connect,
            0x0002 => Facility::Credentials,
            0x0003 => Facility::Functional,
            0x0004 => Facility::Account,
            _ => Facility::Undefined,
        }
    }

    /// Whether this code reports success
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}
