use crate::core::clock::{self, Clock};
use crate::core::error::{Result, SettlementError};
use crate::core::party::PartyId;
use crate::letter_of_credit::instrument::{
    CreateLcRequest, LetterOfCredit, Presentation, PresentationStatus, PresentedDocument,
    Utilization,
};
use crate::letter_of_credit::state::LcStatus;
use crate::store::{Entity, Filter, Repository};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Drives letters of credit through their lifecycle.
#[derive(Debug, Clone)]
pub struct LetterOfCreditService {
    repo: Arc<dyn Repository<LetterOfCredit>>,
    clock: Arc<dyn Clock>,
}

impl LetterOfCreditService {
    pub fn new(repo: Arc<dyn Repository<LetterOfCredit>>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Create a draft LC.
    ///
    /// Expiry must be in the future and the latest shipment date strictly
    /// before it. LC numbers are unique.
    pub fn create(&self, request: CreateLcRequest, created_by: &str) -> Result<LetterOfCredit> {
        let now = self.clock.now();
        if request.lc_number.trim().is_empty() {
            return Err(SettlementError::validation("LC number is required"));
        }
        if request.amount <= Decimal::ZERO {
            return Err(SettlementError::validation(format!(
                "LC amount must be positive, got {}",
                request.amount
            )));
        }
        if request.expiry_date <= now {
            return Err(SettlementError::validation("expiry date must be in the future"));
        }
        if request.latest_shipment_date >= request.expiry_date {
            return Err(SettlementError::validation(
                "latest shipment date must be before expiry date",
            ));
        }
        if self.find_by_number(&request.lc_number)?.is_some() {
            return Err(SettlementError::validation(format!(
                "LC number {} already exists",
                request.lc_number
            )));
        }

        let lc = LetterOfCredit::new(request, created_by, now);
        let stored = self.repo.insert(&lc)?;
        info!(
            "LC {} created: {} {} for {} -> {}",
            stored.lc_number, stored.amount, stored.currency, stored.applicant,
            stored.beneficiary
        );
        Ok(stored)
    }

    pub fn get(&self, id: Uuid) -> Result<LetterOfCredit> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| SettlementError::not_found(LetterOfCredit::KIND, id))
    }

    pub fn by_number(&self, lc_number: &str) -> Result<LetterOfCredit> {
        self.find_by_number(lc_number)?
            .ok_or_else(|| SettlementError::not_found(LetterOfCredit::KIND, lc_number))
    }

    pub fn request_issuance(&self, id: Uuid, requested_by: &str) -> Result<LetterOfCredit> {
        let lc = self.transition(id, &[LcStatus::Draft], LcStatus::Requested, "request issuance", |_, _| {})?;
        info!("LC {} issuance requested by {}", lc.lc_number, requested_by);
        Ok(lc)
    }

    pub fn issue(
        &self,
        id: Uuid,
        issued_by: &str,
        bank_reference: Option<String>,
    ) -> Result<LetterOfCredit> {
        self.transition(id, &[LcStatus::Requested], LcStatus::Issued, "issue", |lc, now| {
            lc.issued_at = Some(now);
            lc.issued_by = Some(issued_by.to_string());
            lc.bank_reference = bank_reference;
        })
    }

    pub fn activate(&self, id: Uuid, activated_by: &str) -> Result<LetterOfCredit> {
        self.transition(id, &[LcStatus::Issued], LcStatus::Active, "activate", |lc, now| {
            lc.activated_at = Some(now);
            lc.activated_by = Some(activated_by.to_string());
        })
    }

    /// Draw `amount` against an active LC. The LC becomes utilized exactly
    /// when nothing remains.
    pub fn utilize(
        &self,
        id: Uuid,
        amount: Decimal,
        details: Option<String>,
        utilized_by: &str,
    ) -> Result<LetterOfCredit> {
        let mut lc = self.get(id)?;
        if lc.status != LcStatus::Active {
            return Err(SettlementError::invalid_state(
                LetterOfCredit::KIND,
                &lc.lc_number,
                lc.status,
                "utilize",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(SettlementError::validation(format!(
                "utilization amount must be positive, got {}",
                amount
            )));
        }
        if amount > lc.remaining_amount {
            return Err(SettlementError::validation(format!(
                "utilization amount {} exceeds remaining amount {}",
                amount, lc.remaining_amount
            )));
        }
        let now = self.clock.now();
        if lc.is_past_expiry(now) {
            return Err(SettlementError::validation(format!(
                "LC {} expired on {}",
                lc.lc_number,
                lc.expiry_date.to_rfc3339()
            )));
        }

        let exhausted = lc.draw(Utilization {
            amount,
            utilized_at: now,
            details,
            utilized_by: utilized_by.to_string(),
        });
        if exhausted {
            lc.status = LcStatus::Utilized;
        }
        let stored = self.repo.update(&lc)?;
        info!(
            "LC {} utilized {} {}, remaining {}",
            stored.lc_number, amount, stored.currency, stored.remaining_amount
        );
        Ok(stored)
    }

    /// Record a document presentation. Every required document type must be
    /// present.
    pub fn present_documents(
        &self,
        id: Uuid,
        documents: Vec<PresentedDocument>,
        presented_by: &str,
        notes: Option<String>,
    ) -> Result<LetterOfCredit> {
        let mut lc = self.get(id)?;
        if lc.status != LcStatus::Active {
            return Err(SettlementError::invalid_state(
                LetterOfCredit::KIND,
                &lc.lc_number,
                lc.status,
                "present documents",
            ));
        }
        let missing = lc.missing_documents(&documents);
        if !missing.is_empty() {
            return Err(SettlementError::validation(format!(
                "missing required documents: {}",
                missing.join(", ")
            )));
        }

        lc.presentations.push(Presentation {
            documents,
            presented_by: presented_by.to_string(),
            presented_at: self.clock.now(),
            notes,
            status: PresentationStatus::Pending,
        });
        let stored = self.repo.update(&lc)?;
        info!(
            "LC {} documents presented by {} ({} presentations)",
            stored.lc_number,
            presented_by,
            stored.presentations.len()
        );
        Ok(stored)
    }

    /// Cancel a draft or requested LC.
    pub fn cancel(&self, id: Uuid, reason: &str, cancelled_by: &str) -> Result<LetterOfCredit> {
        let lc = self.transition(
            id,
            &[LcStatus::Draft, LcStatus::Requested],
            LcStatus::Cancelled,
            "cancel",
            |lc, now| {
                lc.cancelled_at = Some(now);
                lc.cancelled_by = Some(cancelled_by.to_string());
                lc.cancellation_reason = Some(reason.to_string());
            },
        )?;
        warn!("LC {} cancelled: {}", lc.lc_number, reason);
        Ok(lc)
    }

    pub fn close(&self, id: Uuid, reason: &str, closed_by: &str) -> Result<LetterOfCredit> {
        self.transition(
            id,
            &[LcStatus::Utilized, LcStatus::Expired],
            LcStatus::Closed,
            "close",
            |lc, now| {
                lc.closed_at = Some(now);
                lc.closed_by = Some(closed_by.to_string());
                lc.closure_reason = Some(reason.to_string());
            },
        )
    }

    /// Active → expired, once the expiry date has passed.
    pub fn mark_expired(&self, id: Uuid) -> Result<LetterOfCredit> {
        let lc = self.get(id)?;
        let now = self.clock.now();
        if lc.status == LcStatus::Active && !lc.is_past_expiry(now) {
            return Err(SettlementError::validation(format!(
                "LC {} does not expire until {}",
                lc.lc_number,
                lc.expiry_date.to_rfc3339()
            )));
        }
        self.transition(id, &[LcStatus::Active], LcStatus::Expired, "expire", |lc, now| {
            lc.expired_at = Some(now);
        })
    }

    pub fn by_applicant(
        &self,
        applicant: &PartyId,
        status: Option<LcStatus>,
    ) -> Result<Vec<LetterOfCredit>> {
        Ok(self
            .by_party(applicant, status)?
            .into_iter()
            .filter(|lc| &lc.applicant == applicant)
            .collect())
    }

    pub fn by_beneficiary(
        &self,
        beneficiary: &PartyId,
        status: Option<LcStatus>,
    ) -> Result<Vec<LetterOfCredit>> {
        Ok(self
            .by_party(beneficiary, status)?
            .into_iter()
            .filter(|lc| &lc.beneficiary == beneficiary)
            .collect())
    }

    /// Issued or active LCs expiring within `days` from now, soonest first.
    pub fn expiring_within(&self, days: i64) -> Result<Vec<LetterOfCredit>> {
        let now = self.clock.now();
        let horizon = clock::after_days(now, days)?;
        let mut expiring: Vec<LetterOfCredit> = self
            .repo
            .query(&Filter::new())?
            .into_iter()
            .filter(|lc| matches!(lc.status, LcStatus::Issued | LcStatus::Active))
            .filter(|lc| lc.expiry_date >= now && lc.expiry_date <= horizon)
            .collect();
        expiring.sort_by_key(|lc| lc.expiry_date);
        Ok(expiring)
    }

    pub fn analytics(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LcAnalytics> {
        let lcs = self.repo.query(&Filter::new().created_between(from, to))?;
        Ok(LcAnalytics::from_lcs(&lcs))
    }

    fn find_by_number(&self, lc_number: &str) -> Result<Option<LetterOfCredit>> {
        Ok(self
            .repo
            .query(&Filter::new().lookup_key(lc_number))?
            .into_iter()
            .next())
    }

    fn by_party(&self, party: &PartyId, status: Option<LcStatus>) -> Result<Vec<LetterOfCredit>> {
        let mut filter = Filter::new().party(party.clone());
        if let Some(status) = status {
            filter = filter.status(status.as_str());
        }
        self.repo.query(&filter)
    }

    fn transition(
        &self,
        id: Uuid,
        from: &[LcStatus],
        to: LcStatus,
        operation: &'static str,
        apply: impl FnOnce(&mut LetterOfCredit, DateTime<Utc>),
    ) -> Result<LetterOfCredit> {
        let mut lc = self.get(id)?;
        if !from.contains(&lc.status) || !lc.status.can_transition_to(to) {
            return Err(SettlementError::invalid_state(
                LetterOfCredit::KIND,
                &lc.lc_number,
                lc.status,
                operation,
            ));
        }
        let previous = lc.status;
        apply(&mut lc, self.clock.now());
        lc.status = to;
        let stored = self.repo.update(&lc)?;
        info!("LC {} {} -> {}", stored.lc_number, previous, stored.status);
        Ok(stored)
    }
}

/// Aggregate view over a set of letters of credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LcAnalytics {
    pub total_lcs: usize,
    pub status_distribution: BTreeMap<String, usize>,
    pub type_distribution: BTreeMap<String, usize>,
    pub currency_distribution: BTreeMap<String, usize>,
    pub total_value: Decimal,
    pub average_value: Decimal,
    pub total_utilized: Decimal,
    /// Utilized as a percentage of total value.
    pub utilization_rate: Decimal,
    /// Mean days from issue to completion (last draw, or closure).
    pub average_processing_days: Decimal,
}

impl LcAnalytics {
    pub fn from_lcs(lcs: &[LetterOfCredit]) -> Self {
        let mut status_distribution = BTreeMap::new();
        let mut type_distribution = BTreeMap::new();
        let mut currency_distribution = BTreeMap::new();
        let mut total_value = Decimal::ZERO;
        let mut total_utilized = Decimal::ZERO;
        let mut completed = 0u32;
        let mut processing_seconds = Decimal::ZERO;

        for lc in lcs {
            *status_distribution.entry(lc.status.to_string()).or_insert(0) += 1;
            *type_distribution.entry(lc.lc_type.to_string()).or_insert(0) += 1;
            *currency_distribution
                .entry(lc.currency.to_string())
                .or_insert(0) += 1;
            total_value = total_value.saturating_add(lc.amount);
            total_utilized = total_utilized.saturating_add(lc.utilized_amount);

            let completed_at = match lc.status {
                LcStatus::Utilized => lc.utilizations.last().map(|u| u.utilized_at),
                LcStatus::Closed => lc.closed_at,
                _ => None,
            };
            if let (Some(issued), Some(done)) = (lc.issued_at, completed_at) {
                completed += 1;
                processing_seconds += Decimal::from((done - issued).num_seconds());
            }
        }

        let count = Decimal::from(lcs.len() as u64);
        let average_value = if count.is_zero() {
            Decimal::ZERO
        } else {
            (total_value / count).round_dp(2)
        };
        let utilization_rate = if total_value.is_zero() {
            Decimal::ZERO
        } else {
            (total_utilized / total_value * Decimal::ONE_HUNDRED).round_dp(2)
        };
        let average_processing_days = if completed == 0 {
            Decimal::ZERO
        } else {
            (processing_seconds / Decimal::from(completed) / Decimal::from(86_400)).round_dp(2)
        };

        Self {
            total_lcs: lcs.len(),
            status_distribution,
            type_distribution,
            currency_distribution,
            total_value,
            average_value,
            total_utilized,
            utilization_rate,
            average_processing_days,
        }
    }
}
