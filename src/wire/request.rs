//! Request payload codecs
//!
//! Each request type has a fixed payload size; the dispatcher derives the
//! frame length from the message type and rejects frames whose `data_len`
//! disagrees. Payloads are strictly positional.

use super::header::{FrameHeader, HEADER_LEN};
use super::{ByteReader, MsgType};
use crate::types::error::FrameError;
use crate::types::{Amount, ClientId, NameCell, Registration, TransactionId};

/// Connect request payload (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Client's protocol major version
    pub major: u16,
    /// Client's protocol minor version
    pub minor: u16,
    /// Shared validation key
    pub validation_key: u32,
}

/// Create-account request payload (106 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateAccountRequest {
    /// The registration block exactly as it persists with the account
    pub registration: Registration,
}

/// Logon request payload (34 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogonRequest {
    /// First name as supplied at account creation
    pub first_name: NameCell,
    /// PIN as supplied at account creation
    pub pin: u16,
}

/// Deposit request payload (6 bytes)
///
/// `kind` is kept raw here; the handler decides whether it names a valid
/// tender and answers accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    /// Amount to credit, integer cents
    pub amount: Amount,
    /// Tender: 1 = cash, 2 = check
    pub kind: u16,
}

/// Withdrawal request payload (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalRequest {
    /// Amount to debit, integer cents
    pub amount: Amount,
}

/// Transaction-query request payload (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionQueryRequest {
    /// First transaction id of interest
    pub start_id: TransactionId,
    /// Maximum number of records to return
    pub count: u16,
}

/// Stamp-purchase request payload (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampPurchaseRequest {
    /// Amount to debit, integer cents
    pub amount: Amount,
}

/// A decoded client request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    CreateAccount(CreateAccountRequest),
    Logon(LogonRequest),
    Logoff,
    Deposit(DepositRequest),
    Withdrawal(WithdrawalRequest),
    BalanceQuery,
    TransactionQuery(TransactionQueryRequest),
    PurchaseStamps(StampPurchaseRequest),
}

impl Request {
    /// Fixed payload size of a request message type
    ///
    /// Returns an error for response types: the server never accepts those.
    pub fn payload_len(msg: MsgType) -> Result<usize, FrameError> {
        let len = match msg {
            MsgType::ConnectRequest => 8,
            MsgType::CreateAccountRequest => 106,
            MsgType::LogonRequest => 34,
            MsgType::LogoffRequest => 0,
            MsgType::DepositRequest => 6,
            MsgType::WithdrawalRequest => 4,
            MsgType::BalanceQueryRequest => 0,
            MsgType::TransactionQueryRequest => 6,
            MsgType::PurchaseStampsRequest => 4,
            other => {
                return Err(FrameError::NotARequest {
                    msg_type: other.to_wire(),
                })
            }
        };
        Ok(len)
    }

    /// Decode a request payload for the given message type
    ///
    /// The caller has already matched `payload.len()` against
    /// [`Request::payload_len`].
    pub fn decode(msg: MsgType, payload: &[u8]) -> Result<Self, FrameError> {
        let mut reader = ByteReader::new(payload);
        let request = match msg {
            MsgType::ConnectRequest => Request::Connect(ConnectRequest {
                major: reader.read_u16()?,
                minor: reader.read_u16()?,
                validation_key: reader.read_u32()?,
            }),
            MsgType::CreateAccountRequest => Request::CreateAccount(CreateAccountRequest {
                registration: Registration {
                    first_name: reader.read_name()?,
                    last_name: reader.read_name()?,
                    email: reader.read_name()?,
                    pin: reader.read_u16()?,
                    ssn: reader.read_u32()?,
                    dln: reader.read_u32()?,
                },
            }),
            MsgType::LogonRequest => Request::Logon(LogonRequest {
                first_name: reader.read_name()?,
                pin: reader.read_u16()?,
            }),
            MsgType::LogoffRequest => Request::Logoff,
            MsgType::DepositRequest => Request::Deposit(DepositRequest {
                amount: reader.read_u32()?,
                kind: reader.read_u16()?,
            }),
            MsgType::WithdrawalRequest => Request::Withdrawal(WithdrawalRequest {
                amount: reader.read_u32()?,
            }),
            MsgType::BalanceQueryRequest => Request::BalanceQuery,
            MsgType::TransactionQueryRequest => {
                Request::TransactionQuery(TransactionQueryRequest {
                    start_id: reader.read_u32()?,
                    count: reader.read_u16()?,
                })
            }
            MsgType::PurchaseStampsRequest => Request::PurchaseStamps(StampPurchaseRequest {
                amount: reader.read_u32()?,
            }),
            other => {
                return Err(FrameError::NotARequest {
                    msg_type: other.to_wire(),
                })
            }
        };
        Ok(request)
    }

    /// Message type of this request
    pub fn msg_type(&self) -> MsgType {
        match self {
            Request::Connect(_) => MsgType::ConnectRequest,
            Request::CreateAccount(_) => MsgType::CreateAccountRequest,
            Request::Logon(_) => MsgType::LogonRequest,
            Request::Logoff => MsgType::LogoffRequest,
            Request::Deposit(_) => MsgType::DepositRequest,
            Request::Withdrawal(_) => MsgType::WithdrawalRequest,
            Request::BalanceQuery => MsgType::BalanceQueryRequest,
            Request::TransactionQuery(_) => MsgType::TransactionQueryRequest,
            Request::PurchaseStamps(_) => MsgType::PurchaseStampsRequest,
        }
    }

    /// Append the encoded payload to `out`
    pub fn encode_payload(&self, out: &mut Vec<u8>) {
        match self {
            Request::Connect(req) => {
                out.extend_from_slice(&req.major.to_le_bytes());
                out.extend_from_slice(&req.minor.to_le_bytes());
                out.extend_from_slice(&req.validation_key.to_le_bytes());
            }
            Request::CreateAccount(req) => {
                let reg = &req.registration;
                out.extend_from_slice(reg.first_name.raw());
                out.extend_from_slice(reg.last_name.raw());
                out.extend_from_slice(reg.email.raw());
                out.extend_from_slice(&reg.pin.to_le_bytes());
                out.extend_from_slice(&reg.ssn.to_le_bytes());
                out.extend_from_slice(&reg.dln.to_le_bytes());
            }
            Request::Logon(req) => {
                out.extend_from_slice(req.first_name.raw());
                out.extend_from_slice(&req.pin.to_le_bytes());
            }
            Request::Logoff | Request::BalanceQuery => {}
            Request::Deposit(req) => {
                out.extend_from_slice(&req.amount.to_le_bytes());
                out.extend_from_slice(&req.kind.to_le_bytes());
            }
            Request::Withdrawal(req) => {
                out.extend_from_slice(&req.amount.to_le_bytes());
            }
            Request::TransactionQuery(req) => {
                out.extend_from_slice(&req.start_id.to_le_bytes());
                out.extend_from_slice(&req.count.to_le_bytes());
            }
            Request::PurchaseStamps(req) => {
                out.extend_from_slice(&req.amount.to_le_bytes());
            }
        }
    }

    /// Encode a complete frame: header plus payload
    ///
    /// This is the client side of the codec; the server uses it only in
    /// tests, but the frame layout is one contract and lives in one place.
    pub fn encode_frame(&self, client_id: ClientId, sequence: u32, context: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode_payload(&mut payload);

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        FrameHeader {
            msg_type: self.msg_type().to_wire(),
            data_len: payload.len() as u16,
            client_id,
            sequence,
            context,
        }
        .encode(&mut frame);
        frame.extend_from_slice(&payload);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn round_trip(request: Request) {
        let mut payload = Vec::new();
        request.encode_payload(&mut payload);
        assert_eq!(
            payload.len(),
            Request::payload_len(request.msg_type()).unwrap()
        );
        let decoded = Request::decode(request.msg_type(), &payload).unwrap();
        assert_eq!(decoded, request);
    }

    #[rstest]
    #[case::connect(Request::Connect(ConnectRequest { major: 1, minor: 1, validation_key: 0x00DE_AD01 }))]
    #[case::logoff(Request::Logoff)]
    #[case::balance(Request::BalanceQuery)]
    #[case::deposit(Request::Deposit(DepositRequest { amount: 10_000, kind: 1 }))]
    #[case::withdrawal(Request::Withdrawal(WithdrawalRequest { amount: 15_000 }))]
    #[case::stamps(Request::PurchaseStamps(StampPurchaseRequest { amount: 750 }))]
    #[case::tx_query(Request::TransactionQuery(TransactionQueryRequest { start_id: 0, count: 5 }))]
    fn test_round_trip(#[case] request: Request) {
        round_trip(request);
    }

    #[test]
    fn test_create_account_round_trip() {
        round_trip(Request::CreateAccount(CreateAccountRequest {
            registration: Registration {
                first_name: NameCell::from_str("Alice"),
                last_name: NameCell::from_str("A."),
                email: NameCell::from_str("a@x"),
                pin: 1234,
                ssn: 111_223_333,
                dln: 445_566,
            },
        }));
    }

    #[test]
    fn test_logon_round_trip() {
        round_trip(Request::Logon(LogonRequest {
            first_name: NameCell::from_str("Alice"),
            pin: 1234,
        }));
    }

    #[test]
    fn test_connect_payload_layout() {
        let request = Request::Connect(ConnectRequest {
            major: 1,
            minor: 2,
            validation_key: 0x00DE_AD01,
        });
        let mut payload = Vec::new();
        request.encode_payload(&mut payload);
        assert_eq!(payload, [0x01, 0x00, 0x02, 0x00, 0x01, 0xAD, 0xDE, 0x00]);
    }

    #[test]
    fn test_response_types_are_not_requests() {
        assert!(matches!(
            Request::payload_len(MsgType::ConnectResponse),
            Err(FrameError::NotARequest { .. })
        ));
        assert!(matches!(
            Request::decode(MsgType::DepositResponse, &[]),
            Err(FrameError::NotARequest { .. })
        ));
    }

    #[test]
    fn test_unterminated_name_rejected() {
        let mut payload = vec![b'x'; 34];
        payload[32] = 0x34;
        payload[33] = 0x12;
        assert!(matches!(
            Request::decode(MsgType::LogonRequest, &payload),
            Err(FrameError::UnterminatedName)
        ));
    }

    #[test]
    fn test_encode_frame_populates_header() {
        let frame = Request::Deposit(DepositRequest {
            amount: 500,
            kind: 2,
        })
        .encode_frame(7, 99, 0xAB);

        let header = FrameHeader::decode(&frame[..HEADER_LEN]).unwrap();
        assert_eq!(header.msg_type, MsgType::DepositRequest.to_wire());
        assert_eq!(header.data_len, 6);
        assert_eq!(header.client_id, 7);
        assert_eq!(header.sequence, 99);
        assert_eq!(header.context, 0xAB);
        assert_eq!(frame.len(), HEADER_LEN + 6);
    }
}
