//! Per-connection request loop
//!
//! One dispatcher runs on each worker thread and owns that connection's
//! `TcpStream`. It reads a 16-byte header, derives the payload length from
//! the message type, reads the payload, hands the decoded request to the
//! engine, and writes exactly one response frame.
//!
//! A malformed frame (unknown type, wrong `data_len`, missing terminator,
//! truncated read) drops the connection without a response. The receive
//! path treats would-block, timeout and interrupt as retries so the loop
//! can observe its termination flag between reads.

use crate::core::Engine;
use crate::types::error::FrameError;
use crate::types::{ClientId, ServerError, INVALID_CLIENT_ID};
use crate::wire::{FrameHeader, MsgType, Request, HEADER_LEN};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receive buffer size; comfortably larger than the largest request frame
const RECV_BUF_LEN: usize = 2048;

/// Outcome of filling a buffer from the socket
enum ReadStatus {
    /// The buffer was filled completely
    Full,
    /// The peer closed between frames
    ClosedClean,
    /// The peer closed in the middle of a frame
    ClosedMidFrame,
    /// The termination flag was raised while waiting
    Stopped,
}

/// The per-connection loop state
pub struct Dispatcher {
    stream: TcpStream,
    peer: SocketAddr,
    engine: Arc<Engine>,
    stop: Arc<AtomicBool>,
    buf: [u8; RECV_BUF_LEN],
    client_id: ClientId,
}

impl Dispatcher {
    /// Build a dispatcher for an accepted connection
    ///
    /// The stream should already carry a receive timeout so the loop wakes
    /// to check `stop`.
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        engine: Arc<Engine>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Dispatcher {
            stream,
            peer,
            engine,
            stop,
            buf: [0u8; RECV_BUF_LEN],
            client_id: INVALID_CLIENT_ID,
        }
    }

    /// Run until the peer closes, the flag is raised, or an error occurs
    pub fn run(mut self) {
        loop {
            match self.next_frame() {
                Ok(Some((header, request))) => {
                    if !self.respond(&header, &request) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(peer = %self.peer, %error, "dropping connection");
                    break;
                }
            }
        }
        self.cleanup();
    }

    /// Read one complete frame, or `None` on clean close / termination
    fn next_frame(&mut self) -> Result<Option<(FrameHeader, Request)>, ServerError> {
        match read_full(
            &mut self.stream,
            &self.stop,
            &mut self.buf[..HEADER_LEN],
        )? {
            ReadStatus::Full => {}
            ReadStatus::ClosedClean => {
                debug!(peer = %self.peer, "peer closed connection");
                return Ok(None);
            }
            ReadStatus::Stopped => return Ok(None),
            ReadStatus::ClosedMidFrame => {
                return Err(ServerError::Io {
                    message: "connection closed mid-header".to_string(),
                })
            }
        }

        let header = FrameHeader::decode(&self.buf[..HEADER_LEN])?;
        let msg = MsgType::from_wire(header.msg_type)?;
        let expected = Request::payload_len(msg)?;
        if header.data_len as usize != expected {
            return Err(FrameError::LengthMismatch {
                msg_type: header.msg_type,
                expected,
                actual: header.data_len as usize,
            }
            .into());
        }

        match read_full(&mut self.stream, &self.stop, &mut self.buf[..expected])? {
            ReadStatus::Full => {}
            ReadStatus::Stopped => return Ok(None),
            ReadStatus::ClosedClean | ReadStatus::ClosedMidFrame => {
                return Err(ServerError::Io {
                    message: "connection closed mid-payload".to_string(),
                })
            }
        }

        let request = Request::decode(msg, &self.buf[..expected])?;
        Ok(Some((header, request)))
    }

    /// Handle one request and send the response; false ends the loop
    fn respond(&mut self, header: &FrameHeader, request: &Request) -> bool {
        let outcome = self.engine.handle(header, request);
        if let Some(client_id) = outcome.connected {
            self.client_id = client_id;
        }

        let frame =
            outcome
                .response
                .encode_frame(outcome.header_client_id, header.sequence, header.context);
        match self.stream.write_all(&frame) {
            Ok(()) => true,
            Err(error) => {
                warn!(peer = %self.peer, %error, "failed to send response");
                false
            }
        }
    }

    /// Remove the session, then close the socket
    ///
    /// Removal happens first so the session table never refers to a
    /// connection that is already gone.
    fn cleanup(&mut self) {
        if self.client_id != INVALID_CLIENT_ID {
            self.engine.disconnect(self.client_id);
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        info!(peer = %self.peer, client_id = self.client_id, "connection closed");
    }
}

/// Fill `buf` from the stream, retrying timeouts until the flag is raised
fn read_full(
    stream: &mut TcpStream,
    stop: &AtomicBool,
    buf: &mut [u8],
) -> std::io::Result<ReadStatus> {
    let mut filled = 0;
    while filled < buf.len() {
        if stop.load(Ordering::Relaxed) {
            return Ok(ReadStatus::Stopped);
        }
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    ReadStatus::ClosedClean
                } else {
                    ReadStatus::ClosedMidFrame
                })
            }
            Ok(n) => filled += n,
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(ReadStatus::Full)
}
