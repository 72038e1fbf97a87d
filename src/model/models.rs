use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Column headers of the ledger file. Order and spelling must match files written by earlier versions.
 */
pub const LEDGER_HEADERS: [&str; 6] = ["姓名", "性别", "月收入", "风险点", "家庭人口", "录入时间"];

/**
 * Format of the `录入时间` column.
 */
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/**
 * Gender of the head of household. Stored with its Chinese label.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /**
     * All options in the order they are offered by the form.
     */
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /**
     * Returns the label used both in the form and in the ledger file.
     */
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Gender {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|gender| gender.label() == value)
            .ok_or_else(|| ApplicationError::new(ErrorType::Validation, format!("Unknown gender {value}")))
    }
}

/**
 * One household row of the monitoring ledger.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringRecord {
    /**
     * Name of the head of household. Never empty.
     */
    pub name: String,
    pub gender: Gender,
    /**
     * Monthly income in yuan.
     */
    pub monthly_income: u64,
    /**
     * Main reasons for (returning to) poverty. Free text, may be empty or span several lines.
     */
    pub risk_factor: String,
    /**
     * Household population count. At least one.
     */
    pub family_size: u32,
    /**
     * Local time the record was submitted, second precision.
     */
    pub recorded_at: NaiveDateTime,
}

impl MonitoringRecord {
    /**
     * Creates a record from validated input and the submission time.
     *
     * # Arguments
     * `input`: Validated form input.
     * `recorded_at`: Submission time.
     *
     * # Returns
     * A new instance of `MonitoringRecord`.
     */
    pub fn new(input: RecordAddInputType, recorded_at: NaiveDateTime) -> Self {
        MonitoringRecord {
            name: input.name,
            gender: input.gender,
            monthly_income: input.monthly_income,
            risk_factor: input.risk_factor,
            family_size: input.family_size,
            recorded_at,
        }
    }

    /**
     * Submission time formatted as stored in the ledger.
     */
    pub fn recorded_at_text(&self) -> String {
        self.recorded_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/**
 * Validated input for adding a record. The timestamp is added by the service.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAddInputType {
    pub name: String,
    pub gender: Gender,
    pub monthly_income: u64,
    pub risk_factor: String,
    pub family_size: u32,
}

/**
 * The complete ledger in insertion order.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    records: Vec<MonitoringRecord>,
}

impl RecordTable {
    pub fn new(records: Vec<MonitoringRecord>) -> Self {
        RecordTable { records }
    }

    /**
     * Column headers. Present even when the table has no rows.
     */
    pub fn headers(&self) -> &'static [&'static str] {
        &LEDGER_HEADERS
    }

    pub fn rows(&self) -> &[MonitoringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /**
     * Appends a record as the last row.
     */
    pub fn push(&mut self, record: MonitoringRecord) {
        self.records.push(record);
    }
}
