//! Regulatory screening of parties, transactions and shipments.
//!
//! A [`ComplianceCheck`] is created pending and resolved by a deterministic
//! rule chosen by its [`ComplianceCategory`]. Rule tables (high-risk and
//! embargoed countries, thresholds, restricted goods) come from
//! [`ComplianceConfig`](crate::config::ComplianceConfig).

pub mod analytics;
pub mod check;
pub mod engine;
pub mod rules;

pub use analytics::ComplianceAnalytics;
pub use check::{
    CheckOutcome, CheckRequest, ComplianceCategory, ComplianceCheck, ComplianceStatus,
    Counterparty, EntityType, Finding, Priority, Restriction, RiskLevel, SubjectData,
};
pub use engine::ComplianceEngine;
