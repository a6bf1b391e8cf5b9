//! Deterministic screening rules, one per compliance category.
//!
//! Rules are pure: they read the subject data and the configured tables and
//! return a [`CheckOutcome`]. No I/O, no clock reads beyond the `now` passed in.

use crate::compliance::check::{
    CheckOutcome, ComplianceCategory, ComplianceStatus, Finding, Restriction, RiskLevel,
    SubjectData,
};
use crate::config::ComplianceConfig;
use crate::core::clock;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Evaluate the rule for `category` against `subject`.
pub fn evaluate(
    category: ComplianceCategory,
    subject: &SubjectData,
    config: &ComplianceConfig,
    now: DateTime<Utc>,
) -> CheckOutcome {
    match category {
        ComplianceCategory::Sanctions => sanctions(subject, config),
        ComplianceCategory::Embargo => embargo(subject, config),
        ComplianceCategory::AntiMoneyLaundering => anti_money_laundering(subject, config, now),
        ComplianceCategory::KnowYourCustomer => know_your_customer(subject),
        ComplianceCategory::JurisdictionalVat => jurisdictional_vat(subject, config),
        ComplianceCategory::Customs => customs(subject, config),
        ComplianceCategory::ImportLicense
        | ComplianceCategory::ExportLicense
        | ComplianceCategory::DualUse
        | ComplianceCategory::TradeRestrictions => generic(),
    }
}

fn outcome(status: ComplianceStatus, risk_level: RiskLevel, score: u8) -> CheckOutcome {
    CheckOutcome {
        status,
        risk_level,
        score,
        findings: Vec::new(),
        restrictions: Vec::new(),
        approved_amount: None,
        conditions: Vec::new(),
        next_review_date: None,
        notes: None,
    }
}

fn finding(kind: &str, severity: RiskLevel, description: String, recommendation: &str) -> Finding {
    Finding {
        kind: kind.to_string(),
        severity,
        description,
        recommendation: recommendation.to_string(),
    }
}

fn sanctions(subject: &SubjectData, config: &ComplianceConfig) -> CheckOutcome {
    let high_risk_country = subject
        .country
        .as_ref()
        .filter(|c| c.is_listed_in(&config.high_risk_countries));
    let risky_counterparties = subject
        .counterparties
        .iter()
        .any(|cp| cp.country.is_listed_in(&config.high_risk_countries));

    let risk_level = if high_risk_country.is_some() || risky_counterparties {
        RiskLevel::High
    } else {
        RiskLevel::Low
    };
    let score = if high_risk_country.is_some() { 20 } else { 85 };
    let approved = score >= config.sanctions_approval_score;

    let status = if approved {
        ComplianceStatus::Approved
    } else {
        ComplianceStatus::Rejected
    };
    let mut result = outcome(status, risk_level, score);

    if let Some(country) = high_risk_country {
        result.findings.push(finding(
            "sanctions_risk",
            RiskLevel::High,
            format!("Entity located in high-risk country: {}", country),
            "Enhanced due diligence required",
        ));
    }
    if risky_counterparties {
        result.findings.push(finding(
            "counterparty_risk",
            RiskLevel::Medium,
            "Transaction involves high-risk counterparties".to_string(),
            "Additional documentation required",
        ));
    }
    if !approved {
        result.restrictions.push(Restriction {
            kind: "transaction_restriction".to_string(),
            description: "Transaction restricted due to sanctions risk".to_string(),
            conditions: Vec::new(),
            expires_at: None,
        });
    }
    result
}

fn embargo(subject: &SubjectData, config: &ComplianceConfig) -> CheckOutcome {
    let embargoed = [&subject.origin_country, &subject.destination_country]
        .into_iter()
        .flatten()
        .any(|c| c.is_listed_in(&config.embargoed_countries));

    if !embargoed {
        return outcome(ComplianceStatus::Approved, RiskLevel::Low, 90);
    }

    let mut result = outcome(ComplianceStatus::Rejected, RiskLevel::Critical, 0);
    result.findings.push(finding(
        "embargo_violation",
        RiskLevel::Critical,
        "Trade with embargoed country detected".to_string(),
        "Transaction prohibited",
    ));
    result.restrictions.push(Restriction {
        kind: "trade_embargo".to_string(),
        description: "Trade with this country is prohibited under international embargo"
            .to_string(),
        conditions: Vec::new(),
        expires_at: None,
    });
    result
}

fn anti_money_laundering(
    subject: &SubjectData,
    config: &ComplianceConfig,
    now: DateTime<Utc>,
) -> CheckOutcome {
    let amount = subject.transaction_amount.unwrap_or(Decimal::ZERO);
    if amount <= config.aml_high_value_threshold {
        return outcome(ComplianceStatus::Approved, RiskLevel::Low, 90);
    }

    let mut result = outcome(ComplianceStatus::Approved, RiskLevel::Medium, 70);
    let currency = subject
        .currency
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_default();
    result.findings.push(finding(
        "high_value_transaction",
        RiskLevel::Medium,
        format!("High-value transaction: {} {}", amount, currency)
            .trim_end()
            .to_string(),
        "Enhanced monitoring required",
    ));
    result
        .conditions
        .push("Enhanced transaction monitoring required".to_string());
    result.next_review_date = clock::after_days(now, config.aml_review_days).ok();
    result
}

fn know_your_customer(subject: &SubjectData) -> CheckOutcome {
    let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());
    let complete = present(&subject.name)
        && present(&subject.registration_number)
        && present(&subject.address)
        && subject.country.is_some();

    if complete {
        return outcome(ComplianceStatus::Approved, RiskLevel::Low, 85);
    }

    let mut result = outcome(
        ComplianceStatus::RequiresAdditionalInfo,
        RiskLevel::Medium,
        60,
    );
    result.findings.push(finding(
        "incomplete_kyc",
        RiskLevel::Medium,
        "Incomplete KYC information".to_string(),
        "Additional documentation required",
    ));
    result
}

fn jurisdictional_vat(subject: &SubjectData, config: &ComplianceConfig) -> CheckOutcome {
    let in_jurisdiction = subject
        .country
        .as_ref()
        .is_some_and(|c| c.as_str().eq_ignore_ascii_case(&config.vat_jurisdiction));
    let amount = subject.transaction_amount.unwrap_or(Decimal::ZERO);
    let registration_required = in_jurisdiction && amount > config.vat_registration_threshold;
    let unregistered = subject
        .tax_id
        .as_deref()
        .map_or(true, |t| t.trim().is_empty());

    if !(registration_required && unregistered) {
        return outcome(ComplianceStatus::Approved, RiskLevel::Low, 90);
    }

    let mut result = outcome(ComplianceStatus::Approved, RiskLevel::Medium, 65);
    result.findings.push(finding(
        "vat_registration_required",
        RiskLevel::Medium,
        format!(
            "{} VAT registration required based on transaction volume",
            config.vat_jurisdiction
        ),
        "Register for VAT or provide tax registration number",
    ));
    result
        .conditions
        .push("VAT registration required within 30 days".to_string());
    result
}

fn customs(subject: &SubjectData, config: &ComplianceConfig) -> CheckOutcome {
    let description = subject
        .goods_description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let restricted = config
        .restricted_goods
        .iter()
        .any(|good| !good.is_empty() && description.contains(&good.to_lowercase()));

    if !restricted {
        return outcome(ComplianceStatus::Approved, RiskLevel::Low, 85);
    }

    let mut result = outcome(ComplianceStatus::RequiresAdditionalInfo, RiskLevel::High, 40);
    result.findings.push(finding(
        "restricted_goods",
        RiskLevel::High,
        "Transaction involves restricted goods for customs".to_string(),
        "Special import/export permits required",
    ));
    result.restrictions.push(Restriction {
        kind: "customs_permit_required".to_string(),
        description: "Special customs permit required for restricted goods".to_string(),
        conditions: vec![
            "Valid import/export license".to_string(),
            "Product certification".to_string(),
            "Safety documentation".to_string(),
        ],
        expires_at: None,
    });
    result
}

fn generic() -> CheckOutcome {
    outcome(ComplianceStatus::Approved, RiskLevel::Low, 80)
}
