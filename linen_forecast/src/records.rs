//! Pickup, invoice and client records as consumed from the operations store

use crate::error::ForecastError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque client identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A validated pickup: one collection of soiled linen from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupRecord {
    /// Client the linen was collected from
    pub client_id: ClientId,
    /// When the pickup was logged
    pub timestamp: DateTime<Utc>,
    /// Collected weight in pounds, never negative
    pub weight: f64,
    /// Driver who made the pickup
    pub driver_id: Option<String>,
}

impl PickupRecord {
    pub fn new(client_id: impl Into<ClientId>, timestamp: DateTime<Utc>, weight: f64) -> Self {
        Self {
            client_id: client_id.into(),
            timestamp,
            weight,
            driver_id: None,
        }
    }
}

/// A pickup as delivered by the store, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPickupRecord {
    pub client_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub weight: Option<f64>,
    pub driver_id: Option<String>,
}

impl TryFrom<RawPickupRecord> for PickupRecord {
    type Error = ForecastError;

    fn try_from(raw: RawPickupRecord) -> Result<Self, Self::Error> {
        let client_id = raw
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ForecastError::MalformedRecord("pickup without client id".to_string()))?;
        let timestamp = raw.timestamp.ok_or_else(|| {
            ForecastError::MalformedRecord(format!("pickup for {} without timestamp", client_id))
        })?;
        let weight = raw.weight.ok_or_else(|| {
            ForecastError::MalformedRecord(format!("pickup for {} without weight", client_id))
        })?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(ForecastError::MalformedRecord(format!(
                "pickup for {} has unusable weight {}",
                client_id, weight
            )));
        }

        Ok(Self {
            client_id: ClientId(client_id),
            timestamp,
            weight,
            driver_id: raw.driver_id,
        })
    }
}

/// One billed line on an invoice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        let amount = self.quantity * self.unit_price;
        if amount.is_finite() {
            amount
        } else {
            0.0
        }
    }
}

/// A validated invoice dated on a local calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub line_items: Vec<LineItem>,
}

impl InvoiceRecord {
    pub fn new(client_id: impl Into<ClientId>, date: NaiveDate, line_items: Vec<LineItem>) -> Self {
        Self {
            client_id: client_id.into(),
            date,
            line_items,
        }
    }

    /// Sum of quantity x unit price over all line items
    pub fn revenue(&self) -> f64 {
        self.line_items.iter().map(LineItem::amount).sum()
    }
}

/// An invoice as delivered by the store, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInvoiceRecord {
    pub client_id: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl TryFrom<RawInvoiceRecord> for InvoiceRecord {
    type Error = ForecastError;

    fn try_from(raw: RawInvoiceRecord) -> Result<Self, Self::Error> {
        let client_id = raw
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ForecastError::MalformedRecord("invoice without client id".to_string())
            })?;
        let date = raw.date.ok_or_else(|| {
            ForecastError::MalformedRecord(format!("invoice for {} without date", client_id))
        })?;

        Ok(Self {
            client_id: ClientId(client_id),
            date,
            line_items: raw.line_items,
        })
    }
}

/// Reference data for a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub id: ClientId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_pickup_validation() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let valid = RawPickupRecord {
            client_id: Some("hotel-1".to_string()),
            timestamp: Some(timestamp),
            weight: Some(420.0),
            driver_id: Some("d-7".to_string()),
        };
        let record = PickupRecord::try_from(valid.clone()).unwrap();
        assert_eq!(record.client_id.as_str(), "hotel-1");
        assert_eq!(record.weight, 420.0);

        let missing_weight = RawPickupRecord {
            weight: None,
            ..valid.clone()
        };
        assert!(matches!(
            PickupRecord::try_from(missing_weight),
            Err(ForecastError::MalformedRecord(_))
        ));

        let negative = RawPickupRecord {
            weight: Some(-3.0),
            ..valid.clone()
        };
        assert!(PickupRecord::try_from(negative).is_err());

        let missing_time = RawPickupRecord {
            timestamp: None,
            ..valid
        };
        assert!(PickupRecord::try_from(missing_time).is_err());
    }

    #[test]
    fn test_invoice_revenue() {
        let invoice = InvoiceRecord::new(
            "spa-2",
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            vec![
                LineItem {
                    quantity: 10.0,
                    unit_price: 2.5,
                },
                LineItem {
                    quantity: 4.0,
                    unit_price: 1.25,
                },
            ],
        );
        assert_eq!(invoice.revenue(), 30.0);
    }

    #[test]
    fn test_raw_records_parse_camel_case() {
        let raw: RawPickupRecord = serde_json::from_str(
            r#"{"clientId":"c1","timestamp":"2024-03-04T09:00:00Z","weight":12.5}"#,
        )
        .unwrap();
        assert_eq!(raw.client_id.as_deref(), Some("c1"));
        assert!(raw.driver_id.is_none());

        let invoice: RawInvoiceRecord = serde_json::from_str(
            r#"{"clientId":"c1","date":"2024-03-04","lineItems":[{"quantity":2,"unitPrice":3}]}"#,
        )
        .unwrap();
        let invoice = InvoiceRecord::try_from(invoice).unwrap();
        assert_eq!(invoice.revenue(), 6.0);
    }
}
