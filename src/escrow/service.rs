use crate::core::clock::Clock;
use crate::core::error::{Result, SettlementError};
use crate::core::party::PartyId;
use crate::escrow::state::EscrowStatus;
use crate::escrow::transaction::{CreateEscrowRequest, EscrowTransaction};
use crate::store::{Entity, Filter, Repository};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Drives escrow transactions through their lifecycle.
///
/// Every operation loads the escrow, checks the transition against
/// [`EscrowStatus`], and writes back with a version check. A rejected
/// transition never touches storage.
#[derive(Debug, Clone)]
pub struct EscrowService {
    repo: Arc<dyn Repository<EscrowTransaction>>,
    clock: Arc<dyn Clock>,
}

impl EscrowService {
    pub fn new(repo: Arc<dyn Repository<EscrowTransaction>>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn create(
        &self,
        request: CreateEscrowRequest,
        created_by: &str,
    ) -> Result<EscrowTransaction> {
        if request.amount < Decimal::ZERO {
            return Err(SettlementError::validation(format!(
                "escrow amount must not be negative, got {}",
                request.amount
            )));
        }
        if request.buyer.is_empty() || request.seller.is_empty() {
            return Err(SettlementError::validation("buyer and seller are required"));
        }
        if request.currency.is_empty() {
            return Err(SettlementError::validation("currency is required"));
        }

        let escrow = EscrowTransaction::new(request, created_by, self.clock.now());
        let stored = self.repo.insert(&escrow)?;
        info!(
            "escrow {} created for {}: {} {} ({} -> {})",
            stored.id, stored.transaction_ref, stored.amount, stored.currency, stored.buyer,
            stored.seller
        );
        Ok(stored)
    }

    pub fn get(&self, id: Uuid) -> Result<EscrowTransaction> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| SettlementError::not_found(EscrowTransaction::KIND, id))
    }

    /// Pending → funded. A settlement reference is synthesized when none is given.
    pub fn fund(&self, id: Uuid, settlement_reference: Option<String>) -> Result<EscrowTransaction> {
        self.transition(id, &[EscrowStatus::Pending], EscrowStatus::Funded, "fund", |e, now| {
            e.funded_at = Some(now);
            e.settlement_reference =
                Some(settlement_reference.unwrap_or_else(|| synthesize_reference("FND")));
        })
    }

    /// Funded → released. Releasing attests every release condition.
    pub fn release(
        &self,
        id: Uuid,
        notes: Option<String>,
        settlement_reference: Option<String>,
    ) -> Result<EscrowTransaction> {
        self.transition(id, &[EscrowStatus::Funded], EscrowStatus::Released, "release", |e, now| {
            e.released_at = Some(now);
            e.release_notes = notes;
            if let Some(reference) = settlement_reference {
                e.settlement_reference = Some(reference);
            } else if e.settlement_reference.is_none() {
                e.settlement_reference = Some(synthesize_reference("REL"));
            }
            e.release_conditions.values_mut().for_each(|met| *met = true);
        })
    }

    pub fn dispute(&self, id: Uuid, reason: &str) -> Result<EscrowTransaction> {
        if reason.trim().is_empty() {
            return Err(SettlementError::validation("dispute reason is required"));
        }
        let escrow =
            self.transition(id, &[EscrowStatus::Funded], EscrowStatus::Disputed, "dispute", |e, now| {
                e.disputed_at = Some(now);
                e.dispute_reason = Some(reason.to_string());
            })?;
        warn!("escrow {} disputed: {}", escrow.id, reason);
        Ok(escrow)
    }

    /// Disputed → released. The resolution text is stored as given.
    pub fn resolve_dispute(
        &self,
        id: Uuid,
        resolution: &str,
        notes: Option<String>,
    ) -> Result<EscrowTransaction> {
        if resolution.trim().is_empty() {
            return Err(SettlementError::validation("resolution is required"));
        }
        self.transition(
            id,
            &[EscrowStatus::Disputed],
            EscrowStatus::Released,
            "resolve dispute",
            |e, now| {
                e.resolution = Some(resolution.to_string());
                e.resolved_at = Some(now);
                e.released_at = Some(now);
                e.release_notes = notes;
                if e.settlement_reference.is_none() {
                    e.settlement_reference = Some(synthesize_reference("REL"));
                }
            },
        )
    }

    /// Pending or funded → cancelled.
    pub fn cancel(&self, id: Uuid, reason: &str) -> Result<EscrowTransaction> {
        self.transition(
            id,
            &[EscrowStatus::Pending, EscrowStatus::Funded],
            EscrowStatus::Cancelled,
            "cancel",
            |e, now| {
                e.cancelled_at = Some(now);
                e.cancellation_reason = Some(reason.to_string());
            },
        )
    }

    pub fn escrows_by_buyer(
        &self,
        buyer: &PartyId,
        status: Option<EscrowStatus>,
    ) -> Result<Vec<EscrowTransaction>> {
        Ok(self
            .by_party(buyer, status)?
            .into_iter()
            .filter(|e| &e.buyer == buyer)
            .collect())
    }

    pub fn escrows_by_seller(
        &self,
        seller: &PartyId,
        status: Option<EscrowStatus>,
    ) -> Result<Vec<EscrowTransaction>> {
        Ok(self
            .by_party(seller, status)?
            .into_iter()
            .filter(|e| &e.seller == seller)
            .collect())
    }

    pub fn analytics(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<EscrowAnalytics> {
        let escrows = self
            .repo
            .query(&Filter::new().created_between(from, to))?;
        Ok(EscrowAnalytics::from_escrows(&escrows))
    }

    fn by_party(
        &self,
        party: &PartyId,
        status: Option<EscrowStatus>,
    ) -> Result<Vec<EscrowTransaction>> {
        let mut filter = Filter::new().party(party.clone());
        if let Some(status) = status {
            filter = filter.status(status.as_str());
        }
        self.repo.query(&filter)
    }

    fn transition(
        &self,
        id: Uuid,
        from: &[EscrowStatus],
        to: EscrowStatus,
        operation: &'static str,
        apply: impl FnOnce(&mut EscrowTransaction, DateTime<Utc>),
    ) -> Result<EscrowTransaction> {
        let mut escrow = self.get(id)?;
        if !from.contains(&escrow.status) || !escrow.status.can_transition_to(to) {
            return Err(SettlementError::invalid_state(
                EscrowTransaction::KIND,
                id,
                escrow.status,
                operation,
            ));
        }
        let previous = escrow.status;
        apply(&mut escrow, self.clock.now());
        escrow.status = to;
        let stored = self.repo.update(&escrow)?;
        info!("escrow {} {} -> {}", stored.id, previous, stored.status);
        Ok(stored)
    }
}

fn synthesize_reference(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ESC-{}-{:.12}", prefix, id)
}

/// Aggregate view over a set of escrows.
///
/// Values are summed as stored; callers mixing currencies get mixed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowAnalytics {
    pub total_escrows: usize,
    pub status_distribution: BTreeMap<String, usize>,
    pub total_value: Decimal,
    pub average_value: Decimal,
    /// Released escrows as a percentage of all escrows.
    pub completion_rate: Decimal,
    /// Mean of `released_at - created_at` over released escrows, in days.
    pub average_release_days: Decimal,
}

impl EscrowAnalytics {
    pub fn from_escrows(escrows: &[EscrowTransaction]) -> Self {
        let mut status_distribution = BTreeMap::new();
        let mut total_value = Decimal::ZERO;
        let mut released = 0u32;
        let mut release_seconds = Decimal::ZERO;

        for escrow in escrows {
            *status_distribution
                .entry(escrow.status.to_string())
                .or_insert(0) += 1;
            total_value = total_value.saturating_add(escrow.amount);
            if let (EscrowStatus::Released, Some(at)) = (escrow.status, escrow.released_at) {
                released += 1;
                release_seconds += Decimal::from((at - escrow.created_at).num_seconds());
            }
        }

        let count = Decimal::from(escrows.len() as u64);
        let (average_value, completion_rate) = if count.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            (
                (total_value / count).round_dp(2),
                (Decimal::from(released) * Decimal::ONE_HUNDRED / count).round_dp(2),
            )
        };
        let average_release_days = if released == 0 {
            Decimal::ZERO
        } else {
            (release_seconds / Decimal::from(released) / Decimal::from(86_400)).round_dp(2)
        };

        Self {
            total_escrows: escrows.len(),
            status_distribution,
            total_value,
            average_value,
            completion_rate,
            average_release_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::currency::CurrencyCode;
    use crate::escrow::transaction::EscrowCategory;
    use crate::store::InMemoryRepository;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn service() -> (EscrowService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = EscrowService::new(
            Arc::new(InMemoryRepository::<EscrowTransaction>::new()),
            clock.clone(),
        );
        (service, clock)
    }

    fn request(amount: Decimal) -> CreateEscrowRequest {
        CreateEscrowRequest {
            transaction_ref: "CBT-1".into(),
            category: EscrowCategory::TradePayment,
            amount,
            currency: CurrencyCode::new("AED"),
            buyer: PartyId::new("buyer-1"),
            seller: PartyId::new("seller-1"),
            release_conditions: vec!["goods_delivered".into(), "quality_verified".into()],
        }
    }

    #[test]
    fn test_create_pending() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(10000)), "ops").unwrap();
        assert_eq!(e.status, EscrowStatus::Pending);
        assert_eq!(e.release_conditions.len(), 2);
        assert!(!e.conditions_met());
    }

    #[test]
    fn test_create_zero_allowed_negative_rejected() {
        let (escrow, _) = service();
        assert!(escrow.create(request(Decimal::ZERO), "ops").is_ok());
        let err = escrow.create(request(dec!(-1)), "ops").unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }

    #[test]
    fn test_fund_release_happy_path() {
        let (escrow, clock) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        let funded = escrow.fund(e.id, Some("0xabcdef".into())).unwrap();
        assert_eq!(funded.status, EscrowStatus::Funded);
        assert!(funded.funded_at.is_some());
        assert_eq!(funded.settlement_reference.as_deref(), Some("0xabcdef"));

        clock.advance(Duration::days(2));
        let released = escrow
            .release(e.id, Some("goods received".into()), None)
            .unwrap();
        assert_eq!(released.status, EscrowStatus::Released);
        assert_eq!(released.settlement_reference.as_deref(), Some("0xabcdef"));
        assert!(released.conditions_met());
    }

    #[test]
    fn test_fund_synthesizes_reference() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        let funded = escrow.fund(e.id, None).unwrap();
        assert!(funded
            .settlement_reference
            .as_deref()
            .is_some_and(|r| r.starts_with("ESC-FND-")));
    }

    #[test]
    fn test_synthesized_reference_shape() {
        let reference = synthesize_reference("REL");
        assert_eq!(reference.len(), "ESC-REL-".len() + 12);
        let serial = &reference["ESC-REL-".len()..];
        assert!(serial
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_release_pending_rejected_without_mutation() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        let err = escrow.release(e.id, None, None).unwrap_err();
        assert!(matches!(err, SettlementError::InvalidState { .. }));
        assert!(!err.is_retryable());
        assert_eq!(escrow.get(e.id).unwrap(), e);
    }

    #[test]
    fn test_double_fund_rejected() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        escrow.fund(e.id, None).unwrap();
        assert!(escrow.fund(e.id, None).is_err());
    }

    #[test]
    fn test_dispute_and_resolve() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        escrow.fund(e.id, None).unwrap();
        let disputed = escrow.dispute(e.id, "Goods not as described").unwrap();
        assert_eq!(disputed.status, EscrowStatus::Disputed);
        assert_eq!(disputed.dispute_reason.as_deref(), Some("Goods not as described"));

        assert!(escrow.release(e.id, None, None).is_err());
        assert!(escrow.cancel(e.id, "walk away").is_err());

        let resolved = escrow
            .resolve_dispute(e.id, "Partial credit agreed", None)
            .unwrap();
        assert_eq!(resolved.status, EscrowStatus::Released);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.resolution.as_deref(), Some("Partial credit agreed"));
    }

    #[test]
    fn test_resolve_requires_dispute() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        escrow.fund(e.id, None).unwrap();
        assert!(escrow.resolve_dispute(e.id, "Resolution", None).is_err());
    }

    #[test]
    fn test_cancel_after_funding_allowed() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        escrow.fund(e.id, None).unwrap();
        let cancelled = escrow.cancel(e.id, "buyer withdrew").unwrap();
        assert_eq!(cancelled.status, EscrowStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("buyer withdrew"));
        assert!(escrow.fund(e.id, None).is_err());
    }

    #[test]
    fn test_cancel_after_release_rejected() {
        let (escrow, _) = service();
        let e = escrow.create(request(dec!(500)), "ops").unwrap();
        escrow.fund(e.id, None).unwrap();
        escrow.release(e.id, None, None).unwrap();
        assert!(escrow.cancel(e.id, "too late").is_err());
    }

    #[test]
    fn test_listings_by_party_and_status() {
        let (escrow, _) = service();
        let a = escrow.create(request(dec!(1)), "ops").unwrap();
        escrow.create(request(dec!(2)), "ops").unwrap();
        escrow.fund(a.id, None).unwrap();

        let buyer = PartyId::new("buyer-1");
        assert_eq!(escrow.escrows_by_buyer(&buyer, None).unwrap().len(), 2);
        let funded = escrow
            .escrows_by_buyer(&buyer, Some(EscrowStatus::Funded))
            .unwrap();
        assert_eq!(funded.len(), 1);
        assert_eq!(funded[0].id, a.id);
        assert!(escrow.escrows_by_seller(&buyer, None).unwrap().is_empty());
        assert_eq!(
            escrow
                .escrows_by_seller(&PartyId::new("seller-1"), None)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_analytics() {
        let (escrow, clock) = service();
        for amount in [dec!(10000), dec!(20000), dec!(30000)] {
            escrow.create(request(amount), "ops").unwrap();
        }
        let all = escrow.escrows_by_buyer(&PartyId::new("buyer-1"), None).unwrap();
        for e in &all[..2] {
            escrow.fund(e.id, None).unwrap();
        }
        clock.advance(Duration::days(3));
        escrow.release(all[0].id, None, None).unwrap();

        let analytics = escrow.analytics(None, None).unwrap();
        assert_eq!(analytics.total_escrows, 3);
        assert_eq!(analytics.total_value, dec!(60000));
        assert_eq!(analytics.average_value, dec!(20000));
        assert_eq!(analytics.completion_rate, dec!(33.33));
        assert_eq!(analytics.average_release_days, dec!(3));
        assert_eq!(analytics.status_distribution["funded"], 1);
    }
}
