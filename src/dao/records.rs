use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{Gender, LEDGER_HEADERS, MonitoringRecord, RecordTable, TIMESTAMP_FORMAT},
};

/**
 * Byte-order marker prepended to exported files so spreadsheet tools detect UTF-8.
 */
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/**
 * DAO owning the CSV ledger file.
 *
 * Every append reads the whole file and rewrites it. All access goes through one lock
 * so concurrent requests within this process never interleave rewrites.
 */
pub struct RecordStore {
    /**
     * Path to the ledger file.
     */
    data_file: PathBuf,
    /**
     * Serializes reads and rewrites of the ledger file.
     */
    lock: Mutex<()>,
}

impl RecordStore {
    /**
     * Creates a new instance of `RecordStore`. The file is not touched until first use.
     *
     * # Arguments
     * `data_file`: Path to the ledger file.
     *
     * # Returns
     * A new instance of `RecordStore`.
     */
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        RecordStore { data_file: data_file.into(), lock: Mutex::new(()) }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /**
     * Loads all records in file order. A missing file is an empty ledger.
     *
     * # Returns
     * A Result containing the `RecordTable` or an `ApplicationError` if the file is unreadable or malformed.
     */
    #[instrument(skip(self), fields(data_file = %self.data_file.display()))]
    pub async fn load_all(&self) -> Result<RecordTable, ApplicationError> {
        let _guard = self.lock.lock().await;
        self.read_table().await
    }

    /**
     * Appends a record as the last row and rewrites the whole file.
     *
     * # Arguments
     * `record`: The record to append.
     *
     * # Returns
     * A Result containing the updated `RecordTable` or an `ApplicationError`. Nothing is written if the current file cannot be loaded.
     */
    #[instrument(skip(self, record), fields(data_file = %self.data_file.display()))]
    pub async fn append(&self, record: MonitoringRecord) -> Result<RecordTable, ApplicationError> {
        let _guard = self.lock.lock().await;
        let mut table = self.read_table().await?;
        table.push(record);
        let contents = encode_table(&table)?;
        if let Some(parent) = self.data_file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|err| Self::write_failure(format!("Failed to create directory {}: {err}", parent.display())))?;
        }
        tokio::fs::write(&self.data_file, contents).await.map_err(|err| Self::write_failure(format!("Failed to write ledger file {}: {err}", self.data_file.display())))?;
        info!("Ledger rewritten with {} records", table.len());
        Ok(table)
    }

    /**
     * Reads and parses the ledger file. Caller must hold the lock.
     */
    async fn read_table(&self) -> Result<RecordTable, ApplicationError> {
        let contents = match tokio::fs::read(&self.data_file).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Ledger file does not exist yet, using empty ledger");
                return Ok(RecordTable::default());
            }
            Err(err) => return Err(Self::write_failure(format!("Failed to read ledger file {}: {err}", self.data_file.display()))),
        };
        let table = decode_table(&contents).inspect_err(|err| error!("Ledger file {} is malformed: {err}", self.data_file.display()))?;
        debug!("Loaded {} records", table.len());
        Ok(table)
    }

    fn write_failure(message: String) -> ApplicationError {
        error!("{message}");
        ApplicationError::new(ErrorType::WriteFailure, message)
    }
}

/**
 * Serializes a table for download: the ledger contents prefixed by a UTF-8 byte-order marker.
 *
 * # Arguments
 * `table`: The table to export.
 *
 * # Returns
 * A Result containing the file contents or an `ApplicationError`.
 */
pub fn export_table(table: &RecordTable) -> Result<Vec<u8>, ApplicationError> {
    let mut contents = UTF8_BOM.to_vec();
    contents.extend(encode_table(table)?);
    Ok(contents)
}

/**
 * Serializes a table as ledger CSV without byte-order marker.
 */
fn encode_table(table: &RecordTable) -> Result<Vec<u8>, ApplicationError> {
    let mut writer = WriterBuilder::new().terminator(Terminator::Any(b'\n')).from_writer(Vec::new());
    writer.write_record(table.headers()).map_err(|err| ApplicationError::new(ErrorType::WriteFailure, format!("Failed to serialize ledger headers: {err}")))?;
    for record in table.rows() {
        let monthly_income = record.monthly_income.to_string();
        let family_size = record.family_size.to_string();
        let recorded_at = record.recorded_at_text();
        writer
            .write_record([record.name.as_str(), record.gender.label(), monthly_income.as_str(), record.risk_factor.as_str(), family_size.as_str(), recorded_at.as_str()])
            .map_err(|err| ApplicationError::new(ErrorType::WriteFailure, format!("Failed to serialize record: {err}")))?;
    }
    writer.into_inner().map_err(|err| ApplicationError::new(ErrorType::WriteFailure, format!("Failed to serialize ledger: {err}")))
}

/**
 * Parses ledger CSV. A leading byte-order marker is accepted.
 */
fn decode_table(contents: &[u8]) -> Result<RecordTable, ApplicationError> {
    let contents = contents.strip_prefix(UTF8_BOM.as_slice()).unwrap_or(contents);
    if contents.iter().all(u8::is_ascii_whitespace) {
        return Ok(RecordTable::default());
    }
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(contents);
    let headers = reader.headers().map_err(|err| malformed(format!("Failed to read header row: {err}")))?;
    if headers.iter().ne(LEDGER_HEADERS.iter().copied()) {
        return Err(malformed(format!("Unexpected header row {:?}, expected {:?}", headers.iter().collect::<Vec<_>>(), LEDGER_HEADERS)));
    }
    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let row = row.map_err(|err| malformed(format!("Failed to read row {row_number}: {err}")))?;
        records.push(decode_record(&row, row_number)?);
    }
    Ok(RecordTable::new(records))
}

fn decode_record(row: &StringRecord, row_number: usize) -> Result<MonitoringRecord, ApplicationError> {
    let field = |index: usize| row.get(index).ok_or_else(|| malformed(format!("Row {row_number} is missing column {}", LEDGER_HEADERS[index])));
    let name = field(0)?;
    if name.trim().is_empty() {
        return Err(malformed(format!("Row {row_number} has an empty name")));
    }
    let gender = Gender::from_str(field(1)?).map_err(|err| malformed(format!("Row {row_number}: {err}")))?;
    let monthly_income = field(2)?.parse::<u64>().map_err(|err| malformed(format!("Row {row_number} has an invalid monthly income: {err}")))?;
    let risk_factor = field(3)?;
    let family_size = field(4)?.parse::<u32>().map_err(|err| malformed(format!("Row {row_number} has an invalid family size: {err}")))?;
    if family_size == 0 {
        return Err(malformed(format!("Row {row_number} has a family size of zero")));
    }
    let recorded_at = NaiveDateTime::parse_from_str(field(5)?, TIMESTAMP_FORMAT).map_err(|err| malformed(format!("Row {row_number} has an invalid timestamp: {err}")))?;
    Ok(MonitoringRecord { name: name.to_string(), gender, monthly_income, risk_factor: risk_factor.to_string(), family_size, recorded_at })
}

fn malformed(message: String) -> ApplicationError {
    ApplicationError::new(ErrorType::MalformedFile, message)
}
