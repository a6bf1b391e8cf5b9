use crate::compliance::{ComplianceStatus, RiskLevel};
use crate::core::currency::CurrencyCode;
use crate::saga::request::PaymentMethod;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Screening raised conditions or open items; settlement proceeded.
    PendingCompliance,
    ComplianceApproved,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStep {
    TradeInitiated,
    RequestValidation,
    ComplianceCheck,
    ForexConversion,
    PaymentSetup,
    ShippingSetup,
    Compensation,
    TradeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Approved,
    Pending,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub step: SagaStep,
    pub status: StepStatus,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    AwaitComplianceApproval,
    FundEscrow,
    AwaitLcIssuance,
    InitiatePayment,
    SchedulePickup,
    MonitorDelivery,
    ContactSupport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForexSnapshot {
    pub exchange_rate: Decimal,
    pub converted_amount: Decimal,
    pub settlement_currency: CurrencyCode,
    pub locked_rate: Option<Decimal>,
    pub lock_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting the payer.
    Pending,
    /// Letter of credit requested from the issuing bank.
    Requested,
    /// Instrument created and then rolled back by compensation.
    Cancelled,
    Failed,
}

impl PaymentStatus {
    /// Money has not moved yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending | Self::Requested)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub escrow_id: Option<Uuid>,
    pub lc_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSnapshot {
    pub shipping_id: String,
    pub tracking_number: String,
    pub estimated_delivery: DateTime<Utc>,
    pub status: ShipmentStatus,
}

/// Combined outcome of the screening battery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    /// `Approved` only when every check approved; `Rejected` when any did.
    pub status: ComplianceStatus,
    /// Worst risk level across the checks.
    pub risk_level: RiskLevel,
    pub restrictions: Vec<String>,
    pub conditions: Vec<String>,
    pub check_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementFailure {
    pub step: SagaStep,
    /// [`SettlementError::kind`](crate::core::error::SettlementError::kind) label.
    pub kind: String,
    pub message: String,
}

/// Everything a caller needs to know about one `settle` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSettlementResult {
    pub transaction_id: String,
    pub status: SettlementStatus,
    pub forex: Option<ForexSnapshot>,
    pub payment: PaymentSnapshot,
    pub shipping: Option<ShippingSnapshot>,
    pub compliance: Option<ComplianceSnapshot>,
    pub timeline: Vec<TimelineEntry>,
    pub total_cost: Decimal,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub next_action: NextAction,
    pub next_action_due: Option<DateTime<Utc>>,
    pub failure: Option<SettlementFailure>,
}

impl TradeSettlementResult {
    pub fn is_failed(&self) -> bool {
        self.status == SettlementStatus::Failed
    }
}
