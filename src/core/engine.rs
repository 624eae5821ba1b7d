//! Request handlers
//!
//! The engine owns the three stores and implements one handler per request
//! type. Each handler is a precondition chain that produces a result code;
//! the dispatcher turns the outcome into a single response frame.
//!
//! Stores are always touched in the fixed order session, then account, then
//! transaction log, and each handler releases one table's lock before
//! taking the next (session lookups return copies), so no two locks are
//! ever held at once.

use crate::core::account_store::{AccountStore, AdjustError};
use crate::core::customer_id::customer_id;
use crate::core::session_table::SessionTable;
use crate::core::transaction_log::TransactionLog;
use crate::types::{
    AccountRecord, Amount, ClientId, CustomerId, DepositKind, ResultCode, SessionState,
    TransactionKind, INVALID_CLIENT_ID, INVALID_CUSTOMER_ID, INVALID_PIN,
};
use crate::wire::response::TransactionCell;
use crate::wire::{
    ConnectRequest, CreateAccountRequest, DepositRequest, FrameHeader, LogonRequest, Request,
    Response, StampPurchaseRequest, TransactionQueryRequest, WithdrawalRequest,
    PROTOCOL_MAJOR, PROTOCOL_MINOR, TRANSACTION_CELL_LEN, VALIDATION_KEY,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Balance value sent when a balance query fails
const INVALID_BALANCE: Amount = Amount::MAX;

/// Result of handling one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// The response to encode and send
    pub response: Response,

    /// Client id to place in the response header
    pub header_client_id: ClientId,

    /// Set when a connect succeeded: the id the dispatcher should bind to
    pub connected: Option<ClientId>,
}

impl HandlerOutcome {
    fn reply(response: Response, header_client_id: ClientId) -> Self {
        HandlerOutcome {
            response,
            header_client_id,
            connected: None,
        }
    }
}

/// The protocol engine: three stores plus the nine handlers
#[derive(Debug, Default)]
pub struct Engine {
    sessions: SessionTable,
    accounts: AccountStore,
    transactions: TransactionLog,
}

impl Engine {
    /// Create an engine over pre-loaded account and transaction tables
    pub fn new(accounts: AccountStore, transactions: TransactionLog) -> Self {
        Engine {
            sessions: SessionTable::new(),
            accounts,
            transactions,
        }
    }

    /// The session table
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// The account store
    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// The transaction log
    pub fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    /// Dispatch one decoded request to its handler
    pub fn handle(&self, header: &FrameHeader, request: &Request) -> HandlerOutcome {
        debug!(
            client_id = header.client_id,
            msg_type = ?request.msg_type(),
            sequence = header.sequence,
            "handling request"
        );

        let client_id = header.client_id;
        match request {
            Request::Connect(req) => self.connect(req),
            Request::CreateAccount(req) => HandlerOutcome::reply(
                Response::CreateAccount {
                    result: self.create_account(client_id, req),
                },
                client_id,
            ),
            Request::Logon(req) => HandlerOutcome::reply(
                Response::Logon {
                    result: self.logon(client_id, req),
                },
                client_id,
            ),
            Request::Logoff => HandlerOutcome::reply(
                Response::Logoff {
                    result: self.logoff(client_id),
                },
                client_id,
            ),
            Request::Deposit(req) => HandlerOutcome::reply(
                Response::Deposit {
                    result: self.deposit(client_id, req),
                },
                client_id,
            ),
            Request::Withdrawal(req) => HandlerOutcome::reply(
                Response::Withdrawal {
                    result: self.withdrawal(client_id, req),
                },
                client_id,
            ),
            Request::BalanceQuery => {
                HandlerOutcome::reply(self.balance_query(client_id), client_id)
            }
            Request::TransactionQuery(req) => {
                HandlerOutcome::reply(self.transaction_query(client_id, req), client_id)
            }
            Request::PurchaseStamps(req) => HandlerOutcome::reply(
                Response::PurchaseStamps {
                    result: self.purchase_stamps(client_id, req),
                },
                client_id,
            ),
        }
    }

    /// Remove a session when its connection goes away
    pub fn disconnect(&self, client_id: ClientId) -> bool {
        self.sessions
            .update(client_id, |session| session.state = SessionState::Disconnecting);
        let removed = self.sessions.remove(client_id);
        if removed {
            info!(client_id, "session removed");
        }
        removed
    }

    fn connect(&self, req: &ConnectRequest) -> HandlerOutcome {
        if req.validation_key != VALIDATION_KEY {
            return HandlerOutcome::reply(
                Response::Connect {
                    result: ResultCode::AuthenticationFailed,
                    major: PROTOCOL_MAJOR,
                    minor: PROTOCOL_MINOR,
                    client_id: INVALID_CLIENT_ID,
                },
                INVALID_CLIENT_ID,
            );
        }

        if req.major > PROTOCOL_MAJOR || req.minor > PROTOCOL_MINOR {
            return HandlerOutcome::reply(
                Response::Connect {
                    result: ResultCode::UnsupportedProtocol,
                    major: PROTOCOL_MAJOR,
                    minor: PROTOCOL_MINOR,
                    client_id: INVALID_CLIENT_ID,
                },
                INVALID_CLIENT_ID,
            );
        }

        match self.sessions.connect() {
            Some(client_id) => {
                info!(client_id, "session connected");
                HandlerOutcome {
                    response: Response::Connect {
                        result: ResultCode::Success,
                        major: PROTOCOL_MAJOR,
                        minor: PROTOCOL_MINOR,
                        client_id,
                    },
                    header_client_id: client_id,
                    connected: Some(client_id),
                }
            }
            None => HandlerOutcome::reply(
                Response::Connect {
                    result: ResultCode::Error,
                    major: PROTOCOL_MAJOR,
                    minor: PROTOCOL_MINOR,
                    client_id: INVALID_CLIENT_ID,
                },
                INVALID_CLIENT_ID,
            ),
        }
    }

    fn create_account(&self, client_id: ClientId, req: &CreateAccountRequest) -> ResultCode {
        if !self.sessions.contains(client_id) {
            return ResultCode::InvalidClientId;
        }

        let registration = req.registration;
        if registration.first_name.is_empty() || registration.pin == INVALID_PIN {
            return ResultCode::InvalidNamePin;
        }

        let customer = customer_id(registration.first_name.as_bytes(), registration.pin);
        if !self
            .accounts
            .insert_unique(AccountRecord::new(registration, customer))
        {
            return ResultCode::AccountExists;
        }

        self.sessions
            .update(client_id, |session| session.state = SessionState::AccountCreated);
        info!(client_id, customer_id = customer, "account created");
        ResultCode::Success
    }

    fn logon(&self, client_id: ClientId, req: &LogonRequest) -> ResultCode {
        if !self.sessions.contains(client_id) {
            return ResultCode::InvalidClientId;
        }

        if req.first_name.is_empty() || req.pin == INVALID_PIN {
            return ResultCode::InvalidNamePin;
        }

        let customer = customer_id(req.first_name.as_bytes(), req.pin);
        if !self.accounts.contains(customer) {
            return ResultCode::AccountNotFound;
        }

        self.sessions.bind_customer(client_id, customer);
        info!(client_id, customer_id = customer, "customer logged on");
        ResultCode::Success
    }

    fn logoff(&self, client_id: ClientId) -> ResultCode {
        let Some(session) = self.sessions.get(client_id) else {
            return ResultCode::InvalidClientId;
        };

        if !session.is_logged_on() {
            return ResultCode::ClientNotLoggedOn;
        }

        self.sessions.update(client_id, |session| {
            session.customer_id = INVALID_CUSTOMER_ID;
            session.state = SessionState::LoggedOff;
        });
        info!(client_id, "customer logged off");
        ResultCode::Success
    }

    fn deposit(&self, client_id: ClientId, req: &DepositRequest) -> ResultCode {
        let customer = match self.bound_customer(client_id) {
            Ok(customer) => customer,
            Err(code) => return code,
        };

        if DepositKind::from_wire(req.kind).is_none() {
            return ResultCode::InvalidArguments;
        }

        match self.accounts.credit(customer, req.amount) {
            Ok(_) => {
                self.transactions
                    .append(unix_now(), req.amount, TransactionKind::Deposit, customer);
                ResultCode::Success
            }
            Err(error) => Self::adjust_result(error),
        }
    }

    fn withdrawal(&self, client_id: ClientId, req: &WithdrawalRequest) -> ResultCode {
        self.debit_and_log(client_id, req.amount, TransactionKind::Withdrawal)
    }

    fn purchase_stamps(&self, client_id: ClientId, req: &StampPurchaseRequest) -> ResultCode {
        self.debit_and_log(client_id, req.amount, TransactionKind::StampPurchase)
    }

    /// Shared debit path for withdrawals and stamp purchases
    fn debit_and_log(&self, client_id: ClientId, amount: Amount, kind: TransactionKind) -> ResultCode {
        let customer = match self.bound_customer(client_id) {
            Ok(customer) => customer,
            Err(code) => return code,
        };

        match self.accounts.debit(customer, amount) {
            Ok(_) => {
                self.transactions.append(unix_now(), amount, kind, customer);
                ResultCode::Success
            }
            Err(error) => Self::adjust_result(error),
        }
    }

    fn balance_query(&self, client_id: ClientId) -> Response {
        let customer = match self.bound_customer(client_id) {
            Ok(customer) => customer,
            Err(result) => {
                return Response::BalanceQuery {
                    result,
                    balance: INVALID_BALANCE,
                }
            }
        };

        match self.accounts.balance(customer) {
            Some(balance) => Response::BalanceQuery {
                result: ResultCode::Success,
                balance,
            },
            None => Response::BalanceQuery {
                result: ResultCode::AccountNotFound,
                balance: INVALID_BALANCE,
            },
        }
    }

    fn transaction_query(&self, client_id: ClientId, req: &TransactionQueryRequest) -> Response {
        match self.query_transactions(client_id, req) {
            Ok(transactions) => Response::TransactionQuery {
                result: ResultCode::Success,
                transactions,
            },
            Err(result) => Response::TransactionQuery {
                result,
                transactions: Vec::new(),
            },
        }
    }

    fn query_transactions(
        &self,
        client_id: ClientId,
        req: &TransactionQueryRequest,
    ) -> Result<Vec<TransactionCell>, ResultCode> {
        let customer = self.bound_customer(client_id)?;
        if !self.accounts.contains(customer) {
            return Err(ResultCode::AccountNotFound);
        }

        // the 16-bit data_len field bounds how many cells one frame can carry
        let frame_cap = (u16::MAX as usize - 6) / TRANSACTION_CELL_LEN;
        let max_count = (req.count as usize).min(frame_cap);

        Ok(self
            .transactions
            .scan(req.start_id, max_count, customer)
            .iter()
            .map(TransactionCell::from)
            .collect())
    }

    /// Session lookup plus logged-on check shared by the post-logon handlers
    fn bound_customer(&self, client_id: ClientId) -> Result<CustomerId, ResultCode> {
        let session = self
            .sessions
            .get(client_id)
            .ok_or(ResultCode::InvalidClientId)?;
        if !session.is_logged_on() {
            return Err(ResultCode::ClientNotLoggedOn);
        }
        Ok(session.customer_id)
    }

    fn adjust_result(error: AdjustError) -> ResultCode {
        match error {
            AdjustError::NotFound => ResultCode::AccountNotFound,
            AdjustError::Insufficient { .. } => ResultCode::InsufficientFunds,
            AdjustError::Overflow => ResultCode::InvalidArguments,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
