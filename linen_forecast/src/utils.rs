//! Synthetic operations data for demos and tests

use crate::calendar::{local_date, shift_days, start_of_local_day};
use crate::dataset::HistoricalDataset;
use crate::error::{ForecastError, Result};
use crate::records::{ClientId, ClientMeta, LineItem, RawInvoiceRecord, RawPickupRecord};
use crate::source::Snapshot;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Utc, Weekday};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const CLIENT_KINDS: [&str; 6] = ["Hotel", "Clinic", "Spa", "Restaurant", "Gym", "Salon"];
const SERVICE_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];
/// Chance that a scheduled pickup does not happen
const MISSED_PICKUP_RATE: f64 = 0.08;
/// Chance that a pickup is an unusually heavy one
const SPIKE_RATE: f64 = 0.02;

/// Generate a raw snapshot of `days` days of history ending yesterday (UTC).
///
/// Each client has a fixed set of service weekdays, a typical weight, a
/// usual pickup hour and a per-pound rate. Output is fully determined by
/// `seed`.
pub fn generate_synthetic_snapshot(
    clients: usize,
    days: usize,
    now: DateTime<Utc>,
    seed: u64,
) -> Result<Snapshot> {
    generate_local_snapshot(clients, days, now, seed, Utc.fix())
}

/// Like [`generate_synthetic_snapshot`], with service days and pickup hours
/// laid out on the local calendar of `offset`
pub fn generate_local_snapshot(
    clients: usize,
    days: usize,
    now: DateTime<Utc>,
    seed: u64,
    offset: FixedOffset,
) -> Result<Snapshot> {
    if clients == 0 || days == 0 {
        return Err(ForecastError::InvalidParameter(format!(
            "Synthetic data needs at least one client and one day, got {} clients and {} days",
            clients, days
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let today = local_date(now, offset);
    let mut snapshot = Snapshot::default();

    for index in 0..clients {
        let kind = CLIENT_KINDS[index % CLIENT_KINDS.len()];
        let id = format!("client-{:03}", index + 1);
        let base_weight: f64 = rng.gen_range(150.0..650.0);
        let hour: i64 = rng.gen_range(7..15);
        let rate: f64 = rng.gen_range(1.0..1.6);
        let visits = rng.gen_range(1..=3);
        let service_days: Vec<Weekday> = SERVICE_DAYS
            .choose_multiple(&mut rng, visits)
            .copied()
            .collect();

        snapshot.clients.push(ClientMeta {
            id: ClientId::new(id.clone()),
            name: format!("{} {}", kind, index + 1),
        });

        for days_back in (1..=days as i64).rev() {
            let date = shift_days(today, -days_back);
            if !service_days.contains(&date.weekday()) {
                continue;
            }
            if rng.gen::<f64>() < MISSED_PICKUP_RATE {
                continue;
            }

            let noise: f64 = rng.gen_range(-0.1..0.1);
            let mut weight = base_weight * (1.0 + noise);
            if rng.gen::<f64>() < SPIKE_RATE {
                weight *= 2.5;
            }
            let minute: i64 = rng.gen_range(0..45);
            let timestamp = start_of_local_day(date, offset)
                + Duration::hours(hour)
                + Duration::minutes(minute);

            snapshot.pickups.push(RawPickupRecord {
                client_id: Some(id.clone()),
                timestamp: Some(timestamp),
                weight: Some(weight),
                driver_id: Some(format!("driver-{}", index % 3 + 1)),
            });
            snapshot.invoices.push(RawInvoiceRecord {
                client_id: Some(id.clone()),
                date: Some(date),
                line_items: vec![LineItem {
                    quantity: weight,
                    unit_price: rate,
                }],
            });
        }
    }

    Ok(snapshot)
}

/// Synthetic dataset in UTC; see [`generate_synthetic_snapshot`]
pub fn generate_synthetic_dataset(
    clients: usize,
    days: usize,
    now: DateTime<Utc>,
    seed: u64,
) -> Result<HistoricalDataset> {
    let snapshot = generate_synthetic_snapshot(clients, days, now, seed)?;
    Ok(HistoricalDataset::from_raw(
        snapshot.pickups,
        snapshot.invoices,
        snapshot.clients,
        Utc.fix(),
    ))
}
