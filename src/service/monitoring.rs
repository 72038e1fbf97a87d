use chrono::{Local, NaiveDateTime, Timelike};
use prometheus::IntGauge;
use tracing::{Instrument, info, instrument};

use crate::{
    dao::records::{RecordStore, export_table},
    model::{
        apperror::ApplicationError,
        models::{MonitoringRecord, RecordAddInputType, RecordTable},
    },
};

/**
 * Represents the service for managing monitoring records.
 */
pub struct MonitoringService {
    /**
     * The DAO owning the ledger file.
     */
    record_store: RecordStore,
    /**
     * Number of records in the ledger as last seen.
     */
    records_gauge: IntGauge,
}

impl MonitoringService {
    /**
     * Creates a new instance of `MonitoringService`.
     *
     * # Arguments
     * `record_store`: The DAO owning the ledger file.
     * `records_gauge`: Gauge updated with the record count after every read and write.
     *
     * # Returns
     * A new instance of `MonitoringService`.
     */
    pub fn new(record_store: RecordStore, records_gauge: IntGauge) -> Self {
        MonitoringService { record_store, records_gauge }
    }

    /**
     * Retrieves the complete ledger.
     *
     * # Returns
     * A Result containing the `RecordTable` or an `ApplicationError`.
     */
    #[instrument(skip(self))]
    pub async fn get_record_table(&self) -> Result<RecordTable, ApplicationError> {
        let span = tracing::Span::current();
        let table = self.record_store.load_all().instrument(span).await?;
        self.update_gauge(&table);
        Ok(table)
    }

    /**
     * Timestamps and appends a record.
     *
     * # Arguments
     * `record_add_input`: Validated form input.
     *
     * # Returns
     * A Result containing the updated `RecordTable` or an `ApplicationError`.
     */
    #[instrument(skip(self, record_add_input))]
    pub async fn add_record(&self, record_add_input: RecordAddInputType) -> Result<RecordTable, ApplicationError> {
        let span = tracing::Span::current();
        let record = MonitoringRecord::new(record_add_input, current_timestamp());
        info!("Adding record recorded at {}", record.recorded_at_text());
        let table = self.record_store.append(record).instrument(span).await?;
        self.update_gauge(&table);
        Ok(table)
    }

    /**
     * Produces the download file for the current ledger.
     *
     * # Returns
     * A Result containing the BOM-prefixed CSV bytes or an `ApplicationError`.
     */
    #[instrument(skip(self))]
    pub async fn export_records(&self) -> Result<Vec<u8>, ApplicationError> {
        let span = tracing::Span::current();
        let table = self.get_record_table().instrument(span).await?;
        export_table(&table)
    }

    fn update_gauge(&self, table: &RecordTable) {
        self.records_gauge.set(i64::try_from(table.len()).unwrap_or(i64::MAX));
    }
}

/**
 * Local time truncated to whole seconds, the precision stored in the ledger.
 */
fn current_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dao::records::UTF8_BOM;
    use crate::model::models::{Gender, TIMESTAMP_FORMAT};

    fn service_in(dir: &tempfile::TempDir) -> MonitoringService {
        let gauge = IntGauge::new("monitoring_records", "Records in the ledger").unwrap();
        MonitoringService::new(RecordStore::new(dir.path().join("poverty_data.csv")), gauge)
    }

    fn input(name: &str) -> RecordAddInputType {
        RecordAddInputType { name: name.to_string(), gender: Gender::Male, monthly_income: 2000, risk_factor: "因病".to_string(), family_size: 4 }
    }

    #[actix_web::test]
    async fn test_add_record_adds_one_timestamped_row() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);
        let before = service.get_record_table().await.unwrap();
        assert_eq!(before.len(), 0);
        let after = service.add_record(input("张三")).await.unwrap();
        assert_eq!(after.len(), 1);
        let record = &after.rows()[0];
        assert_eq!(record.name, "张三");
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.monthly_income, 2000);
        assert_eq!(record.risk_factor, "因病");
        assert_eq!(record.family_size, 4);
        let text = record.recorded_at_text();
        assert_eq!(text.len(), 19);
        assert!(NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).is_ok());
        let age = Local::now().naive_local() - record.recorded_at;
        assert!(age.num_seconds() < 60);
        assert_eq!(service.get_record_table().await.unwrap(), after);
    }

    #[actix_web::test]
    async fn test_gauge_tracks_record_count() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);
        service.add_record(input("张三")).await.unwrap();
        service.add_record(input("张三")).await.unwrap();
        assert_eq!(service.records_gauge.get(), 2);
    }

    #[actix_web::test]
    async fn test_export_matches_current_table() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);
        service.add_record(input("张三")).await.unwrap();
        let exported = service.export_records().await.unwrap();
        let stored = std::fs::read(dir.path().join("poverty_data.csv")).unwrap();
        assert!(exported.starts_with(&UTF8_BOM));
        assert_eq!(&exported[UTF8_BOM.len()..], stored.as_slice());
    }
}
