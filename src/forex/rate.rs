use crate::core::currency::{CurrencyCode, CurrencyPair};
use crate::store::Entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published exchange rate, or a lock taken against one.
///
/// Current rates and locks share one record type. A lock carries
/// `locked_rate` and `locked_until` and is never edited after creation,
/// except for deactivation once it has expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForexRate {
    pub id: Uuid,
    pub pair: CurrencyPair,
    pub rate: Decimal,
    pub locked_rate: Option<Decimal>,
    pub locked_until: Option<DateTime<Utc>>,
    pub spread_percent: Decimal,
    pub commission_percent: Decimal,
    pub source: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl ForexRate {
    pub fn current(
        pair: CurrencyPair,
        rate: Decimal,
        spread_percent: Decimal,
        commission_percent: Decimal,
        source: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair,
            rate,
            locked_rate: None,
            locked_until: None,
            spread_percent,
            commission_percent,
            source: source.into(),
            active: true,
            created_at: now,
            version: 0,
        }
    }

    /// A lock on `self`'s rate that holds until `until`.
    pub fn lock(&self, until: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair: self.pair.clone(),
            rate: self.rate,
            locked_rate: Some(self.rate),
            locked_until: Some(until),
            spread_percent: self.spread_percent,
            commission_percent: self.commission_percent,
            source: self.source.clone(),
            active: true,
            created_at: now,
            version: 0,
        }
    }

    pub fn is_lock(&self) -> bool {
        self.locked_until.is_some()
    }

    /// A lock is live strictly before `locked_until`.
    pub fn is_live_lock(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Rate to convert with: the locked rate for a lock, otherwise the rate.
    pub fn effective_rate(&self) -> Decimal {
        self.locked_rate.unwrap_or(self.rate)
    }
}

impl Entity for ForexRate {
    const KIND: &'static str = "forex rate";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_label(&self) -> String {
        match (self.is_lock(), self.active) {
            (false, true) => "current",
            (false, false) => "superseded",
            (true, true) => "locked",
            (true, false) => "released",
        }
        .to_string()
    }

    fn lookup_key(&self) -> Option<String> {
        Some(self.pair.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: Decimal,
    /// Convert at a locked rate, reusing a live lock or taking a new one.
    #[serde(default)]
    pub lock_rate: bool,
    pub lock_minutes: Option<i64>,
}

impl ConversionRequest {
    pub fn new(from: impl Into<CurrencyCode>, to: impl Into<CurrencyCode>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            lock_rate: false,
            lock_minutes: None,
        }
    }

    pub fn locked_for(mut self, minutes: i64) -> Self {
        self.lock_rate = true;
        self.lock_minutes = Some(minutes);
        self
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from.clone(), self.to.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: Decimal,
    pub converted_amount: Decimal,
    pub rate: Decimal,
    pub locked_rate: Option<Decimal>,
    pub locked_until: Option<DateTime<Utc>>,
    pub converted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeRequirement {
    pub pair: CurrencyPair,
    pub exposure: Decimal,
    pub hedge_percentage: Decimal,
    pub hedge_amount: Decimal,
    pub current_rate: Decimal,
    /// `hedge_amount` expressed in the quote currency.
    pub hedge_value: Decimal,
}
