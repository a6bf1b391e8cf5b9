//! Configuration for the settlement services.
//!
//! Every table has a `Default` reproducing the production rule tables, so an
//! empty TOML file is a valid configuration.

use crate::compliance::ComplianceCategory;
use crate::core::currency::CurrencyCode;
use crate::core::error::{Result, SettlementError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub compliance: ComplianceConfig,
    pub forex: ForexConfig,
    pub fees: FeeSchedule,
    pub letter_of_credit: LetterOfCreditDefaults,
    pub saga: SagaConfig,
    /// Rates published at start-up by the CLI.
    pub rates: Vec<SeedRate>,
}

/// Rule tables and thresholds for the compliance engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub high_risk_countries: Vec<String>,
    pub embargoed_countries: Vec<String>,
    /// Sanctions checks scoring below this are rejected.
    pub sanctions_approval_score: u8,
    pub aml_high_value_threshold: Decimal,
    /// Days until a monitored transaction is reviewed again.
    pub aml_review_days: i64,
    pub vat_jurisdiction: String,
    pub vat_registration_threshold: Decimal,
    pub restricted_goods: Vec<String>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            high_risk_countries: ["IR", "KP", "SY", "RU", "BY"].map(String::from).to_vec(),
            embargoed_countries: ["CU", "IR", "KP", "SY"].map(String::from).to_vec(),
            sanctions_approval_score: 50,
            aml_high_value_threshold: dec!(10000),
            aml_review_days: 30,
            vat_jurisdiction: "AE".to_string(),
            vat_registration_threshold: dec!(375000),
            restricted_goods: ["weapons", "chemicals", "pharmaceuticals", "tobacco", "alcohol"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForexConfig {
    pub default_lock_minutes: i64,
    pub default_source: String,
}

impl Default for ForexConfig {
    fn default() -> Self {
        Self {
            default_lock_minutes: 30,
            default_source: "manual".to_string(),
        }
    }
}

/// Charges added on top of the converted trade amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Fraction of the converted amount, e.g. 0.02 = 2%.
    pub escrow_rate: Decimal,
    pub letter_of_credit_flat: Decimal,
    pub shipping_estimate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            escrow_rate: dec!(0.02),
            letter_of_credit_flat: dec!(500),
            shipping_estimate: dec!(200),
        }
    }
}

/// Terms used when the saga opens a letter of credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterOfCreditDefaults {
    pub expiry_days: i64,
    pub latest_shipment_days: i64,
    pub documents_required: Vec<String>,
    pub issuing_bank_id: String,
    pub issuing_bank_name: String,
    pub shipment_terms: String,
}

impl Default for LetterOfCreditDefaults {
    fn default() -> Self {
        Self {
            expiry_days: 90,
            latest_shipment_days: 60,
            documents_required: ["commercial_invoice", "bill_of_lading", "packing_list"]
                .map(String::from)
                .to_vec(),
            issuing_bank_id: "bank-001".to_string(),
            issuing_bank_name: "UAE Trade Bank".to_string(),
            shipment_terms: "CIF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SagaConfig {
    /// Currency every trade is converted into.
    pub settlement_currency: CurrencyCode,
    pub rate_lock_minutes: i64,
    /// Checks run, in order, before any money moves.
    pub screening: Vec<ComplianceCategory>,
    pub escrow_release_conditions: Vec<String>,
    pub compliance_due_hours: i64,
    pub payment_due_hours: i64,
    pub operator: String,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            settlement_currency: CurrencyCode::new("AED"),
            rate_lock_minutes: 24 * 60,
            screening: vec![
                ComplianceCategory::Sanctions,
                ComplianceCategory::Embargo,
                ComplianceCategory::AntiMoneyLaundering,
                ComplianceCategory::JurisdictionalVat,
                ComplianceCategory::Customs,
            ],
            escrow_release_conditions: vec![
                "goods_delivered".to_string(),
                "quality_verified".to_string(),
            ],
            compliance_due_hours: 24,
            payment_due_hours: 48,
            operator: "system".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRate {
    pub base: CurrencyCode,
    pub quote: CurrencyCode,
    pub rate: Decimal,
    #[serde(default)]
    pub spread_percent: Decimal,
    #[serde(default)]
    pub commission_percent: Decimal,
}

impl SettlementConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettlementError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SettlementConfig = toml::from_str(content)
            .map_err(|e| SettlementError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `TRADE_SETTLEMENT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = SettlementConfig::default();

        if let Ok(currency) = std::env::var("TRADE_SETTLEMENT_CURRENCY") {
            config.saga.settlement_currency = CurrencyCode::new(currency);
        }

        if let Ok(threshold) = std::env::var("TRADE_SETTLEMENT_AML_THRESHOLD") {
            config.compliance.aml_high_value_threshold = threshold.parse().map_err(|e| {
                SettlementError::Config(format!("TRADE_SETTLEMENT_AML_THRESHOLD: {}", e))
            })?;
        }

        if let Ok(minutes) = std::env::var("TRADE_SETTLEMENT_LOCK_MINUTES") {
            config.saga.rate_lock_minutes = minutes.parse().map_err(|e| {
                SettlementError::Config(format!("TRADE_SETTLEMENT_LOCK_MINUTES: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.saga.settlement_currency.is_empty() {
            return Err(SettlementError::Config("settlement currency is empty".into()));
        }
        if self.saga.rate_lock_minutes <= 0 || self.forex.default_lock_minutes <= 0 {
            return Err(SettlementError::Config("lock durations must be positive".into()));
        }
        if self.letter_of_credit.latest_shipment_days >= self.letter_of_credit.expiry_days {
            return Err(SettlementError::Config(
                "letter of credit shipment window must end before expiry".into(),
            ));
        }
        if self.fees.escrow_rate < Decimal::ZERO {
            return Err(SettlementError::Config("escrow fee rate is negative".into()));
        }
        for seed in &self.rates {
            if seed.rate <= Decimal::ZERO {
                return Err(SettlementError::Config(format!(
                    "seed rate {}/{} must be positive",
                    seed.base, seed.quote
                )));
            }
        }
        Ok(())
    }
}
