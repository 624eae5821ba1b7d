//! End-to-end protocol tests
//!
//! Each test starts a real server on a loopback socket, drives it with
//! frames built by the wire codec, and checks the exact bytes-level
//! contract: result codes, assigned ids, echoed sequence and context, and
//! connection drops on malformed input.

use cnp_server::core::{AccountStore, Engine, TransactionLog};
use cnp_server::io::Storage;
use cnp_server::net::{Server, ServerConfig};
use cnp_server::types::{NameCell, Registration, ResultCode, INVALID_CLIENT_ID};
use cnp_server::wire::{
    ConnectRequest, CreateAccountRequest, DepositRequest, FrameHeader, LogonRequest, MsgType,
    Request, Response, TransactionQueryRequest, WithdrawalRequest, HEADER_LEN, VALIDATION_KEY,
};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

struct TestServer {
    addr: SocketAddr,
    engine: Arc<Engine>,
    terminate: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), cnp_server::types::ServerError>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(Arc::new(Engine::default()))
    }

    fn start_with(engine: Arc<Engine>) -> Self {
        let server = Server::bind(&ServerConfig {
            port: 0,
            recv_timeout: Duration::from_millis(50),
        })
        .expect("bind loopback listener");
        let addr = server.local_addr().unwrap();

        let terminate = Arc::new(AtomicBool::new(false));
        let handle = {
            let engine = engine.clone();
            let terminate = terminate.clone();
            std::thread::spawn(move || server.serve(engine, terminate))
        };

        TestServer {
            addr,
            engine,
            terminate,
            handle,
        }
    }

    fn client(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).expect("connect to test server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        TestClient {
            stream,
            client_id: INVALID_CLIENT_ID,
            sequence: 0,
        }
    }

    fn shutdown(self) {
        self.terminate.store(true, Ordering::Relaxed);
        self.handle
            .join()
            .expect("server thread join")
            .expect("server exits cleanly");
    }
}

struct TestClient {
    stream: TcpStream,
    client_id: u16,
    sequence: u32,
}

impl TestClient {
    /// Send one request and read the matching response frame
    fn send(&mut self, request: Request) -> (FrameHeader, Response) {
        let sequence = self.sequence;
        self.sequence += 1;
        let context = 0xAB00_0000 | sequence;

        let frame = request.encode_frame(self.client_id, sequence, context);
        self.stream.write_all(&frame).unwrap();

        let mut header_buf = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header_buf).unwrap();
        let header = FrameHeader::decode(&header_buf).unwrap();

        let mut payload = vec![0u8; header.data_len as usize];
        self.stream.read_exact(&mut payload).unwrap();
        let msg = MsgType::from_wire(header.msg_type).unwrap();
        let response = Response::decode(msg, &payload).unwrap();

        // every response echoes the request's sequence and context
        assert_eq!(header.sequence, sequence);
        assert_eq!(header.context, context);
        (header, response)
    }

    /// Connect and adopt the id the server assigns
    fn connect(&mut self) -> u16 {
        let (_, response) = self.send(Request::Connect(ConnectRequest {
            major: 1,
            minor: 1,
            validation_key: VALIDATION_KEY,
        }));
        let Response::Connect {
            result, client_id, ..
        } = response
        else {
            panic!("wrong response shape");
        };
        assert_eq!(result, ResultCode::Success);
        self.client_id = client_id;
        client_id
    }

    /// True once the server has closed this connection
    fn is_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.stream.read(&mut byte), Ok(0))
    }
}

fn alice_registration() -> CreateAccountRequest {
    CreateAccountRequest {
        registration: Registration {
            first_name: NameCell::from_str("Alice"),
            last_name: NameCell::from_str("A."),
            email: NameCell::from_str("a@x"),
            pin: 1234,
            ssn: 0,
            dln: 0,
        },
    }
}

#[test]
fn test_full_banking_scenario() {
    let server = TestServer::start();
    let mut client = server.client();

    // 1. connect
    let (header, response) = client.send(Request::Connect(ConnectRequest {
        major: 1,
        minor: 1,
        validation_key: 0x00DE_AD01,
    }));
    assert_eq!(
        response,
        Response::Connect {
            result: ResultCode::Success,
            major: 1,
            minor: 1,
            client_id: 1
        }
    );
    assert_eq!(header.client_id, 1);
    client.client_id = 1;

    // 2. create account
    let (_, response) = client.send(Request::CreateAccount(alice_registration()));
    assert_eq!(response.result(), ResultCode::Success);

    // 3. logon
    let (_, response) = client.send(Request::Logon(LogonRequest {
        first_name: NameCell::from_str("Alice"),
        pin: 1234,
    }));
    assert_eq!(response.result(), ResultCode::Success);

    // 4. deposit 100.00, check balance
    let (_, response) = client.send(Request::Deposit(DepositRequest {
        amount: 10_000,
        kind: 1,
    }));
    assert_eq!(response.result(), ResultCode::Success);
    let (_, response) = client.send(Request::BalanceQuery);
    assert_eq!(
        response,
        Response::BalanceQuery {
            result: ResultCode::Success,
            balance: 10_000
        }
    );

    // 5. overdraw is refused with the literal insufficient-funds code
    let (_, response) = client.send(Request::Withdrawal(WithdrawalRequest { amount: 15_000 }));
    assert_eq!(response.result().code(), 0x0004_0001);
    let (_, response) = client.send(Request::BalanceQuery);
    assert_eq!(
        response,
        Response::BalanceQuery {
            result: ResultCode::Success,
            balance: 10_000
        }
    );

    // 6. transaction history holds exactly the deposit
    let (_, response) = client.send(Request::TransactionQuery(TransactionQueryRequest {
        start_id: 0,
        count: 5,
    }));
    let Response::TransactionQuery {
        result,
        transactions,
    } = response
    else {
        panic!("wrong response shape");
    };
    assert_eq!(result, ResultCode::Success);
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].id, 1);
    assert_eq!(transactions[0].amount, 10_000);
    assert_eq!(transactions[0].kind, 1);

    server.shutdown();
}

#[test]
fn test_connect_with_wrong_key_is_refused() {
    let server = TestServer::start();
    let mut client = server.client();

    let (header, response) = client.send(Request::Connect(ConnectRequest {
        major: 1,
        minor: 1,
        validation_key: 0xBAD_C0DE,
    }));
    assert_eq!(response.result(), ResultCode::AuthenticationFailed);
    assert_eq!(header.client_id, INVALID_CLIENT_ID);
    assert!(server.engine.sessions().is_empty());

    server.shutdown();
}

#[test]
fn test_connect_with_newer_minor_version_is_refused() {
    let server = TestServer::start();
    let mut client = server.client();

    let (_, response) = client.send(Request::Connect(ConnectRequest {
        major: 1,
        minor: 2,
        validation_key: VALIDATION_KEY,
    }));
    assert_eq!(response.result(), ResultCode::UnsupportedProtocol);

    server.shutdown();
}

#[test]
fn test_request_without_session_keeps_connection_open() {
    let server = TestServer::start();
    let mut client = server.client();

    let (_, response) = client.send(Request::BalanceQuery);
    assert_eq!(response.result(), ResultCode::InvalidClientId);

    // protocol errors are answered; the connection survives
    let (_, response) = client.send(Request::BalanceQuery);
    assert_eq!(response.result(), ResultCode::InvalidClientId);

    server.shutdown();
}

#[test]
fn test_unknown_message_type_drops_connection() {
    let server = TestServer::start();
    let mut client = server.client();
    client.connect();

    let mut frame = Vec::new();
    FrameHeader {
        msg_type: 0x0001_0099,
        data_len: 0,
        client_id: client.client_id,
        sequence: 9,
        context: 0,
    }
    .encode(&mut frame);
    client.stream.write_all(&frame).unwrap();

    assert!(client.is_closed());
    server.shutdown();
}

#[test]
fn test_wrong_data_len_drops_connection() {
    let server = TestServer::start();
    let mut client = server.client();
    client.connect();

    // a deposit frame whose header claims a 4-byte payload (it takes 6)
    let mut frame = Vec::new();
    FrameHeader {
        msg_type: MsgType::DepositRequest.to_wire(),
        data_len: 4,
        client_id: client.client_id,
        sequence: 9,
        context: 0,
    }
    .encode(&mut frame);
    frame.extend_from_slice(&[0u8; 4]);
    client.stream.write_all(&frame).unwrap();

    assert!(client.is_closed());
    server.shutdown();
}

#[test]
fn test_concurrent_clients_get_distinct_ids() {
    let server = TestServer::start();

    let mut first = server.client();
    let mut second = server.client();
    assert_eq!(first.connect(), 1);
    assert_eq!(second.connect(), 2);

    // each session is isolated: only the first creates an account
    let (_, response) = first.send(Request::CreateAccount(alice_registration()));
    assert_eq!(response.result(), ResultCode::Success);
    let (_, response) = second.send(Request::BalanceQuery);
    assert_eq!(response.result(), ResultCode::ClientNotLoggedOn);

    server.shutdown();
}

#[test]
fn test_disconnect_removes_session() {
    let server = TestServer::start();

    let mut client = server.client();
    client.connect();
    assert_eq!(server.engine.sessions().len(), 1);
    drop(client);

    // the worker notices the close within its receive timeout
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !server.engine.sessions().is_empty() {
        assert!(std::time::Instant::now() < deadline, "session not removed");
        std::thread::sleep(Duration::from_millis(20));
    }

    server.shutdown();
}

#[test]
fn test_account_exists_on_second_create() {
    let server = TestServer::start();
    let mut client = server.client();
    client.connect();

    let (_, response) = client.send(Request::CreateAccount(alice_registration()));
    assert_eq!(response.result(), ResultCode::Success);
    let (_, response) = client.send(Request::CreateAccount(alice_registration()));
    assert_eq!(response.result(), ResultCode::AccountExists);

    server.shutdown();
}

#[test]
fn test_state_survives_save_and_reload() {
    let data_dir = tempfile::TempDir::new().unwrap();
    let storage = Storage::new(data_dir.path());

    // first server lifetime: create an account and fund it
    let server = TestServer::start();
    let mut client = server.client();
    client.connect();
    client.send(Request::CreateAccount(alice_registration()));
    client.send(Request::Logon(LogonRequest {
        first_name: NameCell::from_str("Alice"),
        pin: 1234,
    }));
    client.send(Request::Deposit(DepositRequest {
        amount: 7_500,
        kind: 2,
    }));
    drop(client);

    let engine = server.engine.clone();
    server.shutdown();
    storage
        .save_accounts(&engine.accounts().snapshot())
        .unwrap();
    storage
        .save_transactions(&engine.transactions().snapshot())
        .unwrap();

    // second server lifetime: same credentials, same balance, ids continue
    let engine = Arc::new(Engine::new(
        AccountStore::from_records(storage.load_accounts().unwrap()),
        TransactionLog::from_records(storage.load_transactions().unwrap()),
    ));
    let server = TestServer::start_with(engine);
    let mut client = server.client();
    client.connect();

    let (_, response) = client.send(Request::Logon(LogonRequest {
        first_name: NameCell::from_str("Alice"),
        pin: 1234,
    }));
    assert_eq!(response.result(), ResultCode::Success);

    let (_, response) = client.send(Request::BalanceQuery);
    assert_eq!(
        response,
        Response::BalanceQuery {
            result: ResultCode::Success,
            balance: 7_500
        }
    );

    let (_, response) = client.send(Request::Deposit(DepositRequest {
        amount: 100,
        kind: 1,
    }));
    assert_eq!(response.result(), ResultCode::Success);
    let (_, response) = client.send(Request::TransactionQuery(TransactionQueryRequest {
        start_id: 0,
        count: 10,
    }));
    let Response::TransactionQuery { transactions, .. } = response else {
        panic!("wrong response shape");
    };
    let ids: Vec<_> = transactions.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2]);

    server.shutdown();
}
