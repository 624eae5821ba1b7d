//! Flat binary persistence of the account and transaction tables
//!
//! Each table is one file of fixed-size little-endian records, no header,
//! no separator; readers consume records until end of file. The layouts are
//! explicit field tables, deliberately independent of in-memory struct
//! layout:
//!
//! Account record, 118 bytes: first-name[32], last-name[32], email[32],
//! pin:u16, ssn:u32, dln:u32, customer-id:u64, balance:u32.
//!
//! Transaction record, 30 bytes: id:u32, datetime:u64, amount:u32,
//! type:u16, four reserved zero bytes, customer-id:u64. The first 22 bytes
//! are exactly the cell a transaction-query response carries.
//!
//! Loading is forgiving: a missing file yields an empty table and a
//! truncated trailing record is dropped with a warning, so the server can
//! always start. Saving reports every failure to the caller.

use crate::types::{
    AccountRecord, NameCell, Registration, TransactionKind, TransactionRecord, ServerError,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File holding the account table, inside the data directory
pub const ACCOUNT_DB_FILE: &str = "AccountDB.Dat";

/// File holding the transaction table, inside the data directory
pub const TRANSACT_DB_FILE: &str = "TransactDB.Dat";

/// Size of one persisted account record
pub const ACCOUNT_RECORD_LEN: usize = 118;

/// Size of one persisted transaction record
pub const TRANSACTION_RECORD_LEN: usize = 30;

/// Loads and saves both tables relative to a data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a storage handle rooted at `data_dir`
    ///
    /// The directory is created on the first save, not here.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Storage {
            data_dir: data_dir.into(),
        }
    }

    fn account_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNT_DB_FILE)
    }

    fn transaction_path(&self) -> PathBuf {
        self.data_dir.join(TRANSACT_DB_FILE)
    }

    /// Load the account table; a missing file is an empty table
    pub fn load_accounts(&self) -> Result<Vec<AccountRecord>, ServerError> {
        load_records(&self.account_path(), ACCOUNT_RECORD_LEN, decode_account)
    }

    /// Load the transaction table; a missing file is an empty table
    pub fn load_transactions(&self) -> Result<Vec<TransactionRecord>, ServerError> {
        load_records(
            &self.transaction_path(),
            TRANSACTION_RECORD_LEN,
            decode_transaction,
        )
    }

    /// Save the account table, creating the data directory if needed
    pub fn save_accounts(&self, records: &[AccountRecord]) -> Result<usize, ServerError> {
        save_records(
            &self.data_dir,
            &self.account_path(),
            records,
            ACCOUNT_RECORD_LEN,
            encode_account,
        )
    }

    /// Save the transaction table, creating the data directory if needed
    pub fn save_transactions(&self, records: &[TransactionRecord]) -> Result<usize, ServerError> {
        save_records(
            &self.data_dir,
            &self.transaction_path(),
            records,
            TRANSACTION_RECORD_LEN,
            encode_transaction,
        )
    }
}

fn load_records<T>(
    path: &Path,
    record_len: usize,
    decode: fn(&[u8]) -> T,
) -> Result<Vec<T>, ServerError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no persisted table, starting empty");
            return Ok(Vec::new());
        }
        Err(error) => return Err(ServerError::persistence(path, error)),
    };

    let mut chunks = bytes.chunks_exact(record_len);
    let records: Vec<T> = chunks.by_ref().map(decode).collect();
    if !chunks.remainder().is_empty() {
        warn!(
            path = %path.display(),
            extra = chunks.remainder().len(),
            "dropping truncated trailing record"
        );
    }

    info!(path = %path.display(), count = records.len(), "table loaded");
    Ok(records)
}

fn save_records<T>(
    data_dir: &Path,
    path: &Path,
    records: &[T],
    record_len: usize,
    encode: fn(&T, &mut Vec<u8>),
) -> Result<usize, ServerError> {
    fs::create_dir_all(data_dir).map_err(|e| ServerError::persistence(data_dir, e))?;

    let file = File::create(path).map_err(|e| ServerError::persistence(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut cell = Vec::with_capacity(record_len);
    for record in records {
        cell.clear();
        encode(record, &mut cell);
        debug_assert_eq!(cell.len(), record_len);
        writer
            .write_all(&cell)
            .map_err(|e| ServerError::persistence(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| ServerError::persistence(path, e))?;

    info!(path = %path.display(), count = records.len(), "table saved");
    Ok(records.len())
}

fn encode_account(record: &AccountRecord, out: &mut Vec<u8>) {
    let reg = &record.registration;
    out.extend_from_slice(reg.first_name.raw());
    out.extend_from_slice(reg.last_name.raw());
    out.extend_from_slice(reg.email.raw());
    out.extend_from_slice(&reg.pin.to_le_bytes());
    out.extend_from_slice(&reg.ssn.to_le_bytes());
    out.extend_from_slice(&reg.dln.to_le_bytes());
    out.extend_from_slice(&record.customer_id.to_le_bytes());
    out.extend_from_slice(&record.balance.to_le_bytes());
}

fn decode_account(cell: &[u8]) -> AccountRecord {
    let name = |offset: usize| {
        let mut raw = [0u8; NameCell::LEN];
        raw.copy_from_slice(&cell[offset..offset + NameCell::LEN]);
        NameCell::from_raw(raw)
    };
    AccountRecord {
        registration: Registration {
            first_name: name(0),
            last_name: name(32),
            email: name(64),
            pin: u16::from_le_bytes([cell[96], cell[97]]),
            ssn: u32::from_le_bytes([cell[98], cell[99], cell[100], cell[101]]),
            dln: u32::from_le_bytes([cell[102], cell[103], cell[104], cell[105]]),
        },
        customer_id: u64::from_le_bytes([
            cell[106], cell[107], cell[108], cell[109], cell[110], cell[111], cell[112], cell[113],
        ]),
        balance: u32::from_le_bytes([cell[114], cell[115], cell[116], cell[117]]),
    }
}

fn encode_transaction(record: &TransactionRecord, out: &mut Vec<u8>) {
    out.extend_from_slice(&record.id.to_le_bytes());
    out.extend_from_slice(&record.datetime.to_le_bytes());
    out.extend_from_slice(&record.amount.to_le_bytes());
    out.extend_from_slice(&record.kind.to_wire().to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&record.customer_id.to_le_bytes());
}

fn decode_transaction(cell: &[u8]) -> TransactionRecord {
    TransactionRecord {
        id: u32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]]),
        datetime: u64::from_le_bytes([
            cell[4], cell[5], cell[6], cell[7], cell[8], cell[9], cell[10], cell[11],
        ]),
        amount: u32::from_le_bytes([cell[12], cell[13], cell[14], cell[15]]),
        kind: TransactionKind::from_wire(u16::from_le_bytes([cell[16], cell[17]]))
            .unwrap_or(TransactionKind::Deposit),
        customer_id: u64::from_le_bytes([
            cell[22], cell[23], cell[24], cell[25], cell[26], cell[27], cell[28], cell[29],
        ]),
    }
}
