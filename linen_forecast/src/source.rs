//! Read-only access to the operations store

use crate::calendar::local_date;
use crate::error::{ForecastError, Result};
use crate::records::{ClientMeta, RawInvoiceRecord, RawPickupRecord};
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Source of historical records.
///
/// Date bounds are local calendar dates, both inclusive. Implementations must
/// be idempotent; the pipeline calls each operation once per run.
pub trait RecordSource {
    fn fetch_pickup_records(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<RawPickupRecord>>;

    fn fetch_invoice_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawInvoiceRecord>>;

    fn fetch_clients(&self) -> Result<Vec<ClientMeta>>;
}

/// Export of the store's collections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub pickups: Vec<RawPickupRecord>,
    pub invoices: Vec<RawInvoiceRecord>,
    pub clients: Vec<ClientMeta>,
}

/// Record source backed by an in-memory or on-disk snapshot
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Snapshot,
    offset: FixedOffset,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot, offset: FixedOffset) -> Self {
        Self { snapshot, offset }
    }

    /// Load a JSON snapshot file
    pub fn from_json_file<P: AsRef<Path>>(path: P, offset: FixedOffset) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::Source(format!(
                "cannot read snapshot {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        Ok(Self::new(snapshot, offset))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl RecordSource for SnapshotSource {
    fn fetch_pickup_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPickupRecord>> {
        // Undated pickups are passed through so ingestion can count them as malformed
        Ok(self
            .snapshot
            .pickups
            .iter()
            .filter(|p| match p.timestamp {
                Some(ts) => {
                    let date = local_date(ts, self.offset);
                    date >= start && date <= end
                }
                None => true,
            })
            .cloned()
            .collect())
    }

    fn fetch_invoice_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawInvoiceRecord>> {
        Ok(self
            .snapshot
            .invoices
            .iter()
            .filter(|i| match i.date {
                Some(date) => date >= start && date <= end,
                None => true,
            })
            .cloned()
            .collect())
    }

    fn fetch_clients(&self) -> Result<Vec<ClientMeta>> {
        Ok(self.snapshot.clients.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, TimeZone, Utc};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_snapshot_source_filters_by_local_date() {
        let snapshot = Snapshot {
            pickups: vec![
                RawPickupRecord {
                    client_id: Some("a".to_string()),
                    timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()),
                    weight: Some(10.0),
                    driver_id: None,
                },
                RawPickupRecord {
                    client_id: Some("a".to_string()),
                    timestamp: Some(Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap()),
                    weight: Some(10.0),
                    driver_id: None,
                },
            ],
            ..Snapshot::default()
        };
        let source = SnapshotSource::new(snapshot, Utc.fix());
        let fetched = source
            .fetch_pickup_records(
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            )
            .unwrap();
        assert_eq!(fetched.len(), 1);
    }

    #[test]
    fn test_snapshot_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"clients":[{{"id":"a","name":"Harbor Hotel"}}],"pickups":[]}}"#
        )
        .unwrap();

        let source = SnapshotSource::from_json_file(file.path(), Utc.fix()).unwrap();
        let clients = source.fetch_clients().unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Harbor Hotel");
        assert!(source.snapshot().invoices.is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_source_error() {
        let result = SnapshotSource::from_json_file("/nonexistent/snapshot.json", Utc.fix());
        assert!(matches!(result, Err(ForecastError::Source(_))));
    }
}
