//! Immutable snapshot of historical records for one forecasting pass

use crate::calendar::{local_date, shift_days, start_of_local_day};
use crate::config::ForecastConfig;
use crate::error::Result;
use crate::records::{
    ClientId, ClientMeta, InvoiceRecord, PickupRecord, RawInvoiceRecord, RawPickupRecord,
};
use crate::source::RecordSource;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Totals for one local calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// Total pickup weight in pounds
    pub weight: f64,
    /// Number of pickups
    pub entry_count: usize,
    /// Invoiced revenue dated on this day
    pub revenue: f64,
    /// Clients with at least one pickup on this day
    pub client_ids: BTreeSet<ClientId>,
}

impl DailyAggregate {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            weight: 0.0,
            entry_count: 0,
            revenue: 0.0,
            client_ids: BTreeSet::new(),
        }
    }

    pub fn client_count(&self) -> usize {
        self.client_ids.len()
    }
}

/// Pickups, invoices and client metadata for a bounded lookback window.
///
/// Records are validated on the way in and never change afterwards; a data
/// refresh builds a new dataset.
#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    pickups: Vec<PickupRecord>,
    invoices: Vec<InvoiceRecord>,
    clients: Vec<ClientMeta>,
    offset: FixedOffset,
    skipped_records: usize,
}

impl HistoricalDataset {
    /// Build a dataset from already validated records
    pub fn new(
        mut pickups: Vec<PickupRecord>,
        mut invoices: Vec<InvoiceRecord>,
        clients: Vec<ClientMeta>,
        offset: FixedOffset,
    ) -> Self {
        pickups.sort_by_key(|p| p.timestamp);
        invoices.sort_by_key(|i| i.date);
        Self {
            pickups,
            invoices,
            clients,
            offset,
            skipped_records: 0,
        }
    }

    /// Build a dataset from raw store records, dropping malformed ones
    pub fn from_raw(
        raw_pickups: Vec<RawPickupRecord>,
        raw_invoices: Vec<RawInvoiceRecord>,
        clients: Vec<ClientMeta>,
        offset: FixedOffset,
    ) -> Self {
        let mut skipped = 0;

        let pickups: Vec<PickupRecord> = raw_pickups
            .into_iter()
            .filter_map(|raw| match PickupRecord::try_from(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping pickup: {}", e);
                    skipped += 1;
                    None
                }
            })
            .collect();

        let invoices: Vec<InvoiceRecord> = raw_invoices
            .into_iter()
            .filter_map(|raw| match InvoiceRecord::try_from(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping invoice: {}", e);
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            warn!("Excluded {} malformed records from the dataset", skipped);
        }

        let mut dataset = Self::new(pickups, invoices, clients, offset);
        dataset.skipped_records = skipped;
        dataset
    }

    /// Fetch the lookback window ending today from a record source.
    ///
    /// Each source operation is called exactly once.
    pub fn load<S: RecordSource + ?Sized>(
        source: &S,
        now: DateTime<Utc>,
        config: &ForecastConfig,
    ) -> Result<Self> {
        let offset = config.utc_offset();
        let today = local_date(now, offset);
        let lookback = config
            .pattern_lookback_days
            .max(config.trend_lookback_days);
        let start = shift_days(today, -lookback);

        let pickups = source.fetch_pickup_records(start, today)?;
        let invoices = source.fetch_invoice_records(start, today)?;
        let clients = source.fetch_clients()?;
        debug!(
            "Fetched {} pickups, {} invoices, {} clients for {}..={}",
            pickups.len(),
            invoices.len(),
            clients.len(),
            start,
            today
        );

        Ok(Self::from_raw(pickups, invoices, clients, offset))
    }

    /// Pickups ordered by timestamp
    pub fn pickups(&self) -> &[PickupRecord] {
        &self.pickups
    }

    /// Invoices ordered by date
    pub fn invoices(&self) -> &[InvoiceRecord] {
        &self.invoices
    }

    pub fn clients(&self) -> &[ClientMeta] {
        &self.clients
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Number of raw records rejected during ingestion
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty() && self.invoices.is_empty()
    }

    /// Local calendar date of `now`
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.offset)
    }

    /// Local calendar date of a pickup
    pub fn pickup_date(&self, pickup: &PickupRecord) -> NaiveDate {
        local_date(pickup.timestamp, self.offset)
    }

    pub fn client_name(&self, id: &ClientId) -> Option<&str> {
        self.clients
            .iter()
            .find(|client| &client.id == id)
            .map(|client| client.name.as_str())
    }

    /// Per-date totals over every record in the dataset
    pub fn daily_aggregates(&self) -> BTreeMap<NaiveDate, DailyAggregate> {
        let mut aggregates: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();

        for pickup in &self.pickups {
            let date = self.pickup_date(pickup);
            let entry = aggregates
                .entry(date)
                .or_insert_with(|| DailyAggregate::empty(date));
            entry.weight += pickup.weight;
            entry.entry_count += 1;
            entry.client_ids.insert(pickup.client_id.clone());
        }

        for invoice in &self.invoices {
            let entry = aggregates
                .entry(invoice.date)
                .or_insert_with(|| DailyAggregate::empty(invoice.date));
            entry.revenue += invoice.revenue();
        }

        aggregates
    }

    /// Per-date totals for dates in `start..=end`
    pub fn daily_aggregates_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BTreeMap<NaiveDate, DailyAggregate> {
        self.daily_aggregates()
            .into_iter()
            .filter(|(date, _)| *date >= start && *date <= end)
            .collect()
    }

    /// Pickups grouped by client, each group ordered by timestamp
    pub fn pickups_by_client(&self) -> BTreeMap<ClientId, Vec<&PickupRecord>> {
        let mut groups: BTreeMap<ClientId, Vec<&PickupRecord>> = BTreeMap::new();
        for pickup in &self.pickups {
            groups
                .entry(pickup.client_id.clone())
                .or_default()
                .push(pickup);
        }
        groups
    }

    /// A new dataset holding only records dated strictly before `date`
    pub fn records_before(&self, date: NaiveDate) -> Self {
        let cutoff = start_of_local_day(date, self.offset);
        Self {
            pickups: self
                .pickups
                .iter()
                .filter(|p| p.timestamp < cutoff)
                .cloned()
                .collect(),
            invoices: self
                .invoices
                .iter()
                .filter(|i| i.date < date)
                .cloned()
                .collect(),
            clients: self.clients.clone(),
            offset: self.offset,
            skipped_records: 0,
        }
    }
}
