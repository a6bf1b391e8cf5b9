use crate::core::currency::CurrencyCode;
use crate::core::party::PartyId;
use crate::escrow::state::EscrowStatus;
use crate::store::Entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowCategory {
    #[default]
    TradePayment,
    Milestone,
    Service,
    Deposit,
}

impl fmt::Display for EscrowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TradePayment => "trade_payment",
            Self::Milestone => "milestone",
            Self::Service => "service",
            Self::Deposit => "deposit",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEscrowRequest {
    /// Reference of the trade this escrow secures.
    pub transaction_ref: String,
    #[serde(default)]
    pub category: EscrowCategory,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub buyer: PartyId,
    pub seller: PartyId,
    #[serde(default)]
    pub release_conditions: Vec<String>,
}

/// Funds held on behalf of a buyer until release to the seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub id: Uuid,
    pub transaction_ref: String,
    pub category: EscrowCategory,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub buyer: PartyId,
    pub seller: PartyId,
    pub status: EscrowStatus,
    pub settlement_reference: Option<String>,
    /// Condition name to whether it has been satisfied.
    pub release_conditions: BTreeMap<String, bool>,
    pub release_notes: Option<String>,
    pub dispute_reason: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub funded_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub version: u64,
}

impl EscrowTransaction {
    pub fn new(request: CreateEscrowRequest, created_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_ref: request.transaction_ref,
            category: request.category,
            amount: request.amount,
            currency: request.currency,
            buyer: request.buyer,
            seller: request.seller,
            status: EscrowStatus::Pending,
            settlement_reference: None,
            release_conditions: request
                .release_conditions
                .into_iter()
                .map(|c| (c, false))
                .collect(),
            release_notes: None,
            dispute_reason: None,
            resolution: None,
            resolved_at: None,
            cancellation_reason: None,
            funded_at: None,
            released_at: None,
            disputed_at: None,
            cancelled_at: None,
            created_at: now,
            created_by: created_by.to_string(),
            version: 0,
        }
    }

    pub fn conditions_met(&self) -> bool {
        self.release_conditions.values().all(|met| *met)
    }
}

impl Entity for EscrowTransaction {
    const KIND: &'static str = "escrow";

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
        self.status.as_str().to_string()
    }

    fn parties(&self) -> Vec<PartyId> {
        vec![self.buyer.clone(), self.seller.clone()]
    }

    fn lookup_key(&self) -> Option<String> {
        Some(self.transaction_ref.clone())
    }
}
