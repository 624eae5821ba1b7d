//! Response payload codecs
//!
//! Every response carries a 32-bit result code first. The transaction-query
//! response is the one variable-length message in the protocol: a 6-byte
//! prefix followed by `count` fixed 22-byte transaction cells.

use super::header::{FrameHeader, HEADER_LEN};
use super::{ByteReader, MsgType};
use crate::types::error::FrameError;
use crate::types::{Amount, ClientId, ResultCode, TransactionId, TransactionRecord};

/// Size of one transaction cell in a query response
///
/// Fields occupy 18 bytes (id, datetime, amount, type); the remaining four
/// bytes are reserved and written as zero.
pub const TRANSACTION_CELL_LEN: usize = 22;

/// One transaction as it appears in a query response
///
/// The customer id never goes on the wire; the query is already scoped to
/// the logged-on customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCell {
    /// Server-assigned transaction id
    pub id: TransactionId,
    /// Seconds since the Unix epoch
    pub datetime: u64,
    /// Amount in integer cents
    pub amount: Amount,
    /// Raw transaction type value
    pub kind: u16,
}

impl From<&TransactionRecord> for TransactionCell {
    fn from(record: &TransactionRecord) -> Self {
        TransactionCell {
            id: record.id,
            datetime: record.datetime,
            amount: record.amount,
            kind: record.kind.to_wire(),
        }
    }
}

/// A server response, one variant per request type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Connect response (10 bytes): result, server version, assigned client id
    Connect {
        result: ResultCode,
        major: u16,
        minor: u16,
        client_id: ClientId,
    },
    /// Create-account response (4 bytes)
    CreateAccount { result: ResultCode },
    /// Logon response (4 bytes)
    Logon { result: ResultCode },
    /// Logoff response (4 bytes)
    Logoff { result: ResultCode },
    /// Deposit response (4 bytes)
    Deposit { result: ResultCode },
    /// Withdrawal response (4 bytes)
    Withdrawal { result: ResultCode },
    /// Balance-query response (8 bytes)
    BalanceQuery { result: ResultCode, balance: Amount },
    /// Transaction-query response (6 + n * 22 bytes)
    TransactionQuery {
        result: ResultCode,
        transactions: Vec<TransactionCell>,
    },
    /// Stamp-purchase response (4 bytes)
    PurchaseStamps { result: ResultCode },
}

impl Response {
    /// Message type of this response
    pub fn msg_type(&self) -> MsgType {
        match self {
            Response::Connect { .. } => MsgType::ConnectResponse,
            Response::CreateAccount { .. } => MsgType::CreateAccountResponse,
            Response::Logon { .. } => MsgType::LogonResponse,
            Response::Logoff { .. } => MsgType::LogoffResponse,
            Response::Deposit { .. } => MsgType::DepositResponse,
            Response::Withdrawal { .. } => MsgType::WithdrawalResponse,
            Response::BalanceQuery { .. } => MsgType::BalanceQueryResponse,
            Response::TransactionQuery { .. } => MsgType::TransactionQueryResponse,
            Response::PurchaseStamps { .. } => MsgType::PurchaseStampsResponse,
        }
    }

    /// The result code carried by this response
    pub fn result(&self) -> ResultCode {
        match self {
            Response::Connect { result, .. }
            | Response::CreateAccount { result }
            | Response::Logon { result }
            | Response::Logoff { result }
            | Response::Deposit { result }
            | Response::Withdrawal { result }
            | Response::BalanceQuery { result, .. }
            | Response::TransactionQuery { result, .. }
            | Response::PurchaseStamps { result } => *result,
        }
    }

    /// Encoded payload size of this response
    pub fn payload_len(&self) -> usize {
        match self {
            Response::Connect { .. } => 10,
            Response::BalanceQuery { .. } => 8,
            Response::TransactionQuery { transactions, .. } => {
                6 + transactions.len() * TRANSACTION_CELL_LEN
            }
            _ => 4,
        }
    }

    /// Append the encoded payload to `out`
    pub fn encode_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.result().code().to_le_bytes());
        match self {
            Response::Connect {
                major,
                minor,
                client_id,
                ..
            } => {
                out.extend_from_slice(&major.to_le_bytes());
                out.extend_from_slice(&minor.to_le_bytes());
                out.extend_from_slice(&client_id.to_le_bytes());
            }
            Response::BalanceQuery { balance, .. } => {
                out.extend_from_slice(&balance.to_le_bytes());
            }
            Response::TransactionQuery { transactions, .. } => {
                out.extend_from_slice(&(transactions.len() as u16).to_le_bytes());
                for cell in transactions {
                    out.extend_from_slice(&cell.id.to_le_bytes());
                    out.extend_from_slice(&cell.datetime.to_le_bytes());
                    out.extend_from_slice(&cell.amount.to_le_bytes());
                    out.extend_from_slice(&cell.kind.to_le_bytes());
                    out.extend_from_slice(&[0u8; 4]);
                }
            }
            _ => {}
        }
    }

    /// Decode a response payload for the given message type
    ///
    /// This is the client side of the codec; the server uses it in tests.
    pub fn decode(msg: MsgType, payload: &[u8]) -> Result<Self, FrameError> {
        let mut reader = ByteReader::new(payload);
        let result = ResultCode::from_code(reader.read_u32()?);
        let response = match msg {
            MsgType::ConnectResponse => Response::Connect {
                result,
                major: reader.read_u16()?,
                minor: reader.read_u16()?,
                client_id: reader.read_u16()?,
            },
            MsgType::CreateAccountResponse => Response::CreateAccount { result },
            MsgType::LogonResponse => Response::Logon { result },
            MsgType::LogoffResponse => Response::Logoff { result },
            MsgType::DepositResponse => Response::Deposit { result },
            MsgType::WithdrawalResponse => Response::Withdrawal { result },
            MsgType::BalanceQueryResponse => Response::BalanceQuery {
                result,
                balance: reader.read_u32()?,
            },
            MsgType::TransactionQueryResponse => {
                let count = reader.read_u16()?;
                let expected = 6 + count as usize * TRANSACTION_CELL_LEN;
                if payload.len() != expected {
                    return Err(FrameError::LengthMismatch {
                        msg_type: msg.to_wire(),
                        expected,
                        actual: payload.len(),
                    });
                }
                let mut transactions = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let cell = TransactionCell {
                        id: reader.read_u32()?,
                        datetime: reader.read_u64()?,
                        amount: reader.read_u32()?,
                        kind: reader.read_u16()?,
                    };
                    reader.skip(4)?;
                    transactions.push(cell);
                }
                Response::TransactionQuery {
                    result,
                    transactions,
                }
            }
            MsgType::PurchaseStampsResponse => Response::PurchaseStamps { result },
            other => {
                return Err(FrameError::UnknownMessageType {
                    msg_type: other.to_wire(),
                })
            }
        };
        Ok(response)
    }

    /// Encode a complete frame: header plus payload
    ///
    /// `client_id` is the session's id; `sequence` and `context` are copied
    /// from the request being answered.
    pub fn encode_frame(&self, client_id: ClientId, sequence: u32, context: u32) -> Vec<u8> {
        let payload_len = self.payload_len();
        let mut frame = Vec::with_capacity(HEADER_LEN + payload_len);
        FrameHeader {
            msg_type: self.msg_type().to_wire(),
            data_len: payload_len as u16,
            client_id,
            sequence,
            context,
        }
        .encode(&mut frame);
        self.encode_payload(&mut frame);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn round_trip(response: Response) {
        let mut payload = Vec::new();
        response.encode_payload(&mut payload);
        assert_eq!(payload.len(), response.payload_len());
        let decoded = Response::decode(response.msg_type(), &payload).unwrap();
        assert_eq!(decoded, response);
    }

    #[rstest]
    #[case::connect(Response::Connect { result: ResultCode::Success, major: 1, minor: 1, client_id: 1 })]
    #[case::connect_failed(Response::Connect { result: ResultCode::AuthenticationFailed, major: 1, minor: 1, client_id: 0xFFFF })]
    #[case::create(Response::CreateAccount { result: ResultCode::AccountExists })]
    #[case::logon(Response::Logon { result: ResultCode::AccountNotFound })]
    #[case::logoff(Response::Logoff { result: ResultCode::Success })]
    #[case::deposit(Response::Deposit { result: ResultCode::Success })]
    #[case::withdrawal(Response::Withdrawal { result: ResultCode::InsufficientFunds })]
    #[case::balance(Response::BalanceQuery { result: ResultCode::Success, balance: 10_000 })]
    #[case::stamps(Response::PurchaseStamps { result: ResultCode::Success })]
    fn test_round_trip(#[case] response: Response) {
        round_trip(response);
    }

    #[test]
    fn test_transaction_query_round_trip() {
        round_trip(Response::TransactionQuery {
            result: ResultCode::Success,
            transactions: vec![
                TransactionCell {
                    id: 1,
                    datetime: 1_700_000_000,
                    amount: 10_000,
                    kind: 1,
                },
                TransactionCell {
                    id: 4,
                    datetime: 1_700_000_060,
                    amount: 2_500,
                    kind: 2,
                },
            ],
        });
    }

    #[test]
    fn test_empty_transaction_query_is_six_bytes() {
        let response = Response::TransactionQuery {
            result: ResultCode::Success,
            transactions: Vec::new(),
        };
        let mut payload = Vec::new();
        response.encode_payload(&mut payload);
        assert_eq!(payload.len(), 6);
    }

    #[test]
    fn test_transaction_cells_are_22_bytes() {
        let response = Response::TransactionQuery {
            result: ResultCode::Success,
            transactions: vec![TransactionCell {
                id: 9,
                datetime: 7,
                amount: 3,
                kind: 1,
            }],
        };
        let mut payload = Vec::new();
        response.encode_payload(&mut payload);
        assert_eq!(payload.len(), 6 + TRANSACTION_CELL_LEN);
        // reserved tail of the cell is zero
        assert_eq!(&payload[6 + 18..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_transaction_query_count_payload_mismatch_rejected() {
        // count says 2 cells but only one is present
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&2u16.to_le_bytes());
        payload.extend_from_slice(&[0u8; TRANSACTION_CELL_LEN]);
        assert!(matches!(
            Response::decode(MsgType::TransactionQueryResponse, &payload),
            Err(FrameError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_connect_response_layout() {
        let response = Response::Connect {
            result: ResultCode::Success,
            major: 1,
            minor: 1,
            client_id: 1,
        };
        let mut payload = Vec::new();
        response.encode_payload(&mut payload);
        assert_eq!(
            payload,
            [0, 0, 0, 0, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_encode_frame_echoes_sequence_and_context() {
        let frame = Response::Deposit {
            result: ResultCode::Success,
        }
        .encode_frame(3, 55, 0xDEAD);

        let header = FrameHeader::decode(&frame[..HEADER_LEN]).unwrap();
        assert_eq!(header.msg_type, MsgType::DepositResponse.to_wire());
        assert_eq!(header.data_len, 4);
        assert_eq!(header.client_id, 3);
        assert_eq!(header.sequence, 55);
        assert_eq!(header.context, 0xDEAD);
    }
}
