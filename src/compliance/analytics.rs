use crate::compliance::check::{ComplianceCheck, ComplianceStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate view over a set of compliance checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAnalytics {
    pub total_checks: usize,
    pub status_distribution: BTreeMap<String, usize>,
    pub category_distribution: BTreeMap<String, usize>,
    pub risk_distribution: BTreeMap<String, usize>,
    /// Mean score of evaluated checks.
    pub average_score: Decimal,
    /// Percentages of all checks, 0..=100.
    pub approval_rate: Decimal,
    pub rejection_rate: Decimal,
    /// Mean of `checked_at - created_at` over evaluated checks, in hours.
    pub average_processing_hours: Decimal,
}

impl ComplianceAnalytics {
    pub fn from_checks(checks: &[ComplianceCheck]) -> Self {
        let mut status_distribution = BTreeMap::new();
        let mut category_distribution = BTreeMap::new();
        let mut risk_distribution = BTreeMap::new();
        let mut score_sum = Decimal::ZERO;
        let mut evaluated = 0u32;
        let mut processing_seconds = Decimal::ZERO;
        let mut approved = 0u32;
        let mut rejected = 0u32;

        for check in checks {
            *status_distribution
                .entry(check.status.to_string())
                .or_insert(0) += 1;
            *category_distribution
                .entry(check.category.to_string())
                .or_insert(0) += 1;
            *risk_distribution
                .entry(check.risk_level.to_string())
                .or_insert(0) += 1;

            match check.status {
                ComplianceStatus::Approved => approved += 1,
                ComplianceStatus::Rejected => rejected += 1,
                _ => {}
            }

            if let Some(checked_at) = check.checked_at {
                evaluated += 1;
                score_sum += Decimal::from(check.score);
                processing_seconds +=
                    Decimal::from((checked_at - check.created_at).num_seconds());
            }
        }

        let total = Decimal::from(checks.len() as u64);
        let percent = |n: u32| {
            if total.is_zero() {
                Decimal::ZERO
            } else {
                (Decimal::from(n) * Decimal::ONE_HUNDRED / total).round_dp(2)
            }
        };
        let (average_score, average_processing_hours) = if evaluated == 0 {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let n = Decimal::from(evaluated);
            (
                (score_sum / n).round_dp(2),
                (processing_seconds / n / Decimal::from(3600)).round_dp(2),
            )
        };

        Self {
            total_checks: checks.len(),
            status_distribution,
            category_distribution,
            risk_distribution,
            average_score,
            approval_rate: percent(approved),
            rejection_rate: percent(rejected),
            average_processing_hours,
        }
    }
}
