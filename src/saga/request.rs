use crate::core::currency::CurrencyCode;
use crate::core::party::{CountryCode, PartyId};
use crate::core::error::{Result, SettlementError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Import,
    Export,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Import => "import",
            Self::Export => "export",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    LetterOfCredit,
    Escrow,
    TelegraphicTransfer,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LetterOfCredit => "letter_of_credit",
            Self::Escrow => "escrow",
            Self::TelegraphicTransfer => "telegraphic_transfer",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingPriority {
    #[default]
    Standard,
    Express,
    Urgent,
}

/// A cross-border trade to settle.
///
/// The buyer sits in `buyer_country` and receives the goods; the seller
/// ships them from `seller_country`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub transaction_type: TransactionType,
    pub buyer: PartyId,
    pub seller: PartyId,
    pub buyer_country: CountryCode,
    pub seller_country: CountryCode,
    /// Buyer's tax registration, read by the VAT rule.
    #[serde(default)]
    pub buyer_tax_id: Option<String>,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub goods_description: String,
    #[serde(default)]
    pub hs_code: Option<String>,
    #[serde(default = "default_incoterms")]
    pub incoterms: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_required: bool,
    #[serde(default)]
    pub priority: ShippingPriority,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

fn default_incoterms() -> String {
    "CIF".to_string()
}

impl TradeRequest {
    /// Reject requests no step could act on.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(SettlementError::validation(format!(
                "trade amount must be positive, got {}",
                self.amount
            )));
        }
        if self.buyer.is_empty() || self.seller.is_empty() {
            return Err(SettlementError::validation("buyer and seller are required"));
        }
        if self.buyer == self.seller {
            return Err(SettlementError::validation("buyer and seller must differ"));
        }
        if self.currency.is_empty() {
            return Err(SettlementError::validation("currency is required"));
        }
        if self.buyer_country.as_str().is_empty() || self.seller_country.as_str().is_empty() {
            return Err(SettlementError::validation("buyer and seller countries are required"));
        }
        Ok(())
    }
}
