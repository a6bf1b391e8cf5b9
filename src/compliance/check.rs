use crate::core::currency::CurrencyCode;
use crate::core::party::CountryCode;
use crate::store::Entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Individual,
    Company,
    Transaction,
    Shipment,
}

/// Regulatory area a check covers. Selects the rule applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    ImportLicense,
    ExportLicense,
    Sanctions,
    Embargo,
    DualUse,
    AntiMoneyLaundering,
    KnowYourCustomer,
    TradeRestrictions,
    JurisdictionalVat,
    Customs,
}

impl ComplianceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImportLicense => "import_license",
            Self::ExportLicense => "export_license",
            Self::Sanctions => "sanctions",
            Self::Embargo => "embargo",
            Self::DualUse => "dual_use",
            Self::AntiMoneyLaundering => "anti_money_laundering",
            Self::KnowYourCustomer => "know_your_customer",
            Self::TradeRestrictions => "trade_restrictions",
            Self::JurisdictionalVat => "jurisdictional_vat",
            Self::Customs => "customs",
        }
    }
}

impl fmt::Display for ComplianceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pending,
    Approved,
    Rejected,
    RequiresAdditionalInfo,
    UnderReview,
    Expired,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RequiresAdditionalInfo => "requires_additional_info",
            Self::UnderReview => "under_review",
            Self::Expired => "expired",
        }
    }

    /// Statuses that still need someone to act before the check is settled.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::UnderReview | Self::RequiresAdditionalInfo
        )
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk grade; ordered so that `max` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: RiskLevel,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub name: String,
    pub country: CountryCode,
    pub registration_number: Option<String>,
}

/// Attributes of the screened entity. Every rule reads a subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectData {
    pub name: Option<String>,
    pub registration_number: Option<String>,
    pub tax_id: Option<String>,
    pub country: Option<CountryCode>,
    pub address: Option<String>,
    pub transaction_amount: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub counterparties: Vec<Counterparty>,
    pub goods_description: Option<String>,
    pub hs_code: Option<String>,
    pub origin_country: Option<CountryCode>,
    pub destination_country: Option<CountryCode>,
}

/// Input to [`ComplianceEngine::create_check`](super::ComplianceEngine::create_check).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub category: ComplianceCategory,
    #[serde(default)]
    pub subject: SubjectData,
    #[serde(default)]
    pub priority: Priority,
    pub requested_by: String,
    pub due_date: Option<DateTime<Utc>>,
}

/// Result fields written by a rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: ComplianceStatus,
    pub risk_level: RiskLevel,
    pub score: u8,
    pub findings: Vec<Finding>,
    pub restrictions: Vec<Restriction>,
    pub approved_amount: Option<Decimal>,
    pub conditions: Vec<String>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// A compliance screening record.
///
/// Created pending, resolved exactly once by a rule evaluation, and after
/// that changed only by an administrative status override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub category: ComplianceCategory,
    pub subject: SubjectData,
    pub priority: Priority,
    pub requested_by: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: ComplianceStatus,
    pub risk_level: RiskLevel,
    pub score: u8,
    pub findings: Vec<Finding>,
    pub restrictions: Vec<Restriction>,
    pub approved_amount: Option<Decimal>,
    pub conditions: Vec<String>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub checked_by: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl ComplianceCheck {
    pub fn new(request: CheckRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type: request.entity_type,
            entity_id: request.entity_id,
            category: request.category,
            subject: request.subject,
            priority: request.priority,
            requested_by: request.requested_by,
            due_date: request.due_date,
            status: ComplianceStatus::Pending,
            risk_level: RiskLevel::Low,
            score: 0,
            findings: Vec::new(),
            restrictions: Vec::new(),
            approved_amount: None,
            conditions: Vec::new(),
            next_review_date: None,
            checked_by: None,
            checked_at: None,
            notes: None,
            updated_by: None,
            created_at: now,
            version: 0,
        }
    }

    /// Overwrite every result field with `outcome` and stamp the checker.
    pub fn apply(&mut self, outcome: CheckOutcome, checked_by: &str, now: DateTime<Utc>) {
        self.status = outcome.status;
        self.risk_level = outcome.risk_level;
        self.score = outcome.score;
        self.findings = outcome.findings;
        self.restrictions = outcome.restrictions;
        self.approved_amount = outcome.approved_amount;
        self.conditions = outcome.conditions;
        self.next_review_date = outcome.next_review_date;
        self.notes = outcome.notes;
        self.checked_by = Some(checked_by.to_string());
        self.checked_at = Some(now);
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|due| due < now)
    }
}

impl Entity for ComplianceCheck {
    const KIND: &'static str = "compliance check";

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

    fn lookup_key(&self) -> Option<String> {
        Some(self.entity_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckRequest {
        CheckRequest {
            entity_type: EntityType::Company,
            entity_id: "co-1".into(),
            category: ComplianceCategory::KnowYourCustomer,
            subject: SubjectData::default(),
            priority: Priority::High,
            requested_by: "analyst".into(),
            due_date: None,
        }
    }

    #[test]
    fn test_new_check_is_pending() {
        let check = ComplianceCheck::new(request(), Utc::now());
        assert_eq!(check.status, ComplianceStatus::Pending);
        assert_eq!(check.score, 0);
        assert!(check.checked_at.is_none());
    }

    #[test]
    fn test_risk_ordering_picks_worst() {
        let worst = [RiskLevel::Medium, RiskLevel::Critical, RiskLevel::Low]
            .into_iter()
            .max();
        assert_eq!(worst, Some(RiskLevel::Critical));
    }

    #[test]
    fn test_overdue_only_while_open() {
        let now = Utc::now();
        let mut check = ComplianceCheck::new(request(), now);
        check.due_date = Some(now - chrono::Duration::hours(1));
        assert!(check.is_overdue(now));
        check.status = ComplianceStatus::Approved;
        assert!(!check.is_overdue(now));
    }

    #[test]
    fn test_finding_serializes_type_field() {
        let finding = Finding {
            kind: "embargo_violation".into(),
            severity: RiskLevel::Critical,
            description: "d".into(),
            recommendation: "r".into(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "embargo_violation");
        assert_eq!(json["severity"], "critical");
    }
}
