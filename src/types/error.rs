//! Error types for the CNP bank server
//!
//! `ServerError` covers fault-class conditions: socket and file I/O,
//! startup problems, persistence failures, and malformed frames. Protocol
//! outcomes (insufficient funds, bad credentials, and so on) are not errors;
//! they travel back to the client as a [`ResultCode`](super::ResultCode)
//! inside an ordinary response.

use thiserror::Error;

/// Main error type for the server binary and library
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// I/O error on a socket or file
    #[error("I/O error: {message}")]
    Io {
        /// Description of the underlying error
        message: String,
    },

    /// The listening socket could not be created
    #[error("failed to bind port {port}: {message}")]
    Bind {
        /// Requested TCP port
        port: u16,
        /// Description of the underlying error
        message: String,
    },

    /// A persisted table could not be read or written
    #[error("persistence failure on '{path}': {message}")]
    Persistence {
        /// File the failure occurred on
        path: String,
        /// Description of the underlying error
        message: String,
    },

    /// The server could not start (bad port input, signal registration, ...)
    #[error("startup failure: {message}")]
    Startup {
        /// Description of what went wrong
        message: String,
    },

    /// A received frame was malformed; the connection is dropped
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl ServerError {
    /// Create a Persistence error
    pub fn persistence(path: &std::path::Path, message: impl ToString) -> Self {
        ServerError::Persistence {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Startup error
    pub fn startup(message: impl ToString) -> Self {
        ServerError::Startup {
            message: message.to_string(),
        }
    }

    /// Create a Bind error
    pub fn bind(port: u16, message: impl ToString) -> Self {
        ServerError::Bind {
            port,
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(error: std::io::Error) -> Self {
        ServerError::Io {
            message: error.to_string(),
        }
    }
}

/// Reasons a received frame cannot be decoded
///
/// Any of these drops the connection without a response: a peer that frames
/// messages wrong cannot safely be replied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The header's message type is not part of the protocol
    #[error("unknown message type 0x{msg_type:08X}")]
    UnknownMessageType {
        /// The raw 32-bit message type field
        msg_type: u32,
    },

    /// The message type is defined but is not a request
    #[error("message type 0x{msg_type:08X} is not a request")]
    NotARequest {
        /// The raw 32-bit message type field
        msg_type: u32,
    },

    /// The header's data_len disagrees with the type's fixed payload size
    #[error("payload length mismatch for 0x{msg_type:08X}: header says {actual}, type requires {expected}")]
    LengthMismatch {
        /// The raw 32-bit message type field
        msg_type: u32,
        /// Payload size the message type prescribes
        expected: usize,
        /// Payload size the header declared
        actual: usize,
    },

    /// The buffer ended before the field being parsed
    #[error("frame truncated: needed {needed} bytes, had {available}")]
    Truncated {
        /// Bytes the current field required
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// A 32-byte name cell carried no NUL terminator
    #[error("name field missing NUL terminator")]
    UnterminatedName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::io(
        ServerError::Io { message: "connection reset".to_string() },
        "I/O error: connection reset"
    )]
    #[case::bind(
        ServerError::Bind { port: 9000, message: "address in use".to_string() },
        "failed to bind port 9000: address in use"
    )]
    #[case::persistence(
        ServerError::Persistence { path: "Data/AccountDB.Dat".to_string(), message: "permission denied".to_string() },
        "persistence failure on 'Data/AccountDB.Dat': permission denied"
    )]
    #[case::startup(
        ServerError::Startup { message: "invalid port".to_string() },
        "startup failure: invalid port"
    )]
    fn test_error_display(#[case] error: ServerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::unknown(
        FrameError::UnknownMessageType { msg_type: 0x0001_0099 },
        "unknown message type 0x00010099"
    )]
    #[case::mismatch(
        FrameError::LengthMismatch { msg_type: 0x0001_0050, expected: 8, actual: 6 },
        "payload length mismatch for 0x00010050: header says 6, type requires 8"
    )]
    #[case::truncated(
        FrameError::Truncated { needed: 4, available: 2 },
        "frame truncated: needed 4 bytes, had 2"
    )]
    fn test_frame_error_display(#[case] error: FrameError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ServerError = io_error.into();
        assert!(matches!(error, ServerError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_frame_error_conversion() {
        let error: ServerError = FrameError::UnterminatedName.into();
        assert!(matches!(error, ServerError::Frame(_)));
    }
}
