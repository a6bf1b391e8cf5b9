//! Boundary to the carrier that books shipments.

use crate::core::clock::Clock;
use crate::core::error::{Result, SettlementError};
use crate::core::party::CountryCode;
use crate::saga::request::ShippingPriority;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub weight_kg: Decimal,
    pub description: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOrderRequest {
    /// Trade transaction the shipment belongs to.
    pub order_ref: String,
    pub origin: CountryCode,
    pub destination: CountryCode,
    pub packages: Vec<Package>,
    pub priority: ShippingPriority,
    pub insurance_value: Decimal,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOrder {
    pub id: String,
    pub tracking_number: String,
    pub estimated_delivery: DateTime<Utc>,
}

/// Books shipments with an external carrier.
///
/// Failures come back as `SettlementError::Collaborator`. Network-backed
/// implementations should treat a timeout the same way.
pub trait ShippingCollaborator: Send + Sync + Debug {
    fn create_order(&self, request: &ShippingOrderRequest) -> Result<ShippingOrder>;
}

/// Carrier stand-in that books instantly with table-driven transit times.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rust_decimal_macros::dec;
/// use trade_settlement::core::clock::SystemClock;
/// use trade_settlement::core::party::CountryCode;
/// use trade_settlement::saga::{ShippingCollaborator, ShippingOrderRequest, ShippingPriority, SimulatedCarrier};
///
/// let carrier = SimulatedCarrier::new("dhl", Arc::new(SystemClock));
/// let order = carrier
///     .create_order(&ShippingOrderRequest {
///         order_ref: "CBT-1".into(),
///         origin: CountryCode::new("IN"),
///         destination: CountryCode::new("AE"),
///         packages: vec![],
///         priority: ShippingPriority::Express,
///         insurance_value: dec!(0),
///         special_instructions: None,
///     })
///     .unwrap();
/// assert!(order.tracking_number.starts_with("DHL"));
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedCarrier {
    provider: String,
    clock: Arc<dyn Clock>,
}

impl SimulatedCarrier {
    pub fn new(provider: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider: provider.to_ascii_uppercase(),
            clock,
        }
    }

    /// Transit days to `destination` at `priority`.
    pub fn transit_days(priority: ShippingPriority, destination: &CountryCode) -> i64 {
        match priority {
            ShippingPriority::Standard => match destination.as_str() {
                "US" => 3,
                "CA" => 4,
                "UK" | "GB" | "DE" | "FR" => 5,
                "AE" => 7,
                "IN" => 10,
                "CN" => 12,
                "AU" => 8,
                _ => 10,
            },
            ShippingPriority::Express => match destination.as_str() {
                "US" => 1,
                "CA" | "UK" | "GB" | "DE" | "FR" => 2,
                "AE" | "AU" => 3,
                "IN" => 4,
                "CN" => 5,
                _ => 4,
            },
            ShippingPriority::Urgent => 1,
        }
    }
}

impl ShippingCollaborator for SimulatedCarrier {
    fn create_order(&self, request: &ShippingOrderRequest) -> Result<ShippingOrder> {
        if request.destination.as_str().is_empty() {
            return Err(SettlementError::collaborator(
                "shipping",
                "destination country is required",
            ));
        }
        let now = self.clock.now();
        let serial: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let tracking_number = format!("{}{}{:06}", self.provider, now.timestamp_millis(), serial);
        let days = Self::transit_days(request.priority, &request.destination);
        Ok(ShippingOrder {
            id: format!("SHP-{}", request.order_ref),
            tracking_number,
            estimated_delivery: now + Duration::days(days),
        })
    }
}
