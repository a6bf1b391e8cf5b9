use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trade_settlement::compliance::{ComplianceStatus, RiskLevel};
use trade_settlement::config::SettlementConfig;
use trade_settlement::core::clock::{Clock, ManualClock};
use trade_settlement::core::currency::{CurrencyCode, CurrencyPair};
use trade_settlement::core::error::SettlementError;
use trade_settlement::core::party::{CountryCode, PartyId};
use trade_settlement::escrow::EscrowStatus;
use trade_settlement::forex::ConversionRequest;
use trade_settlement::letter_of_credit::{LcStatus, PresentedDocument};
use trade_settlement::saga::{
    NextAction, PaymentMethod, PaymentStatus, SagaStep, SettlementStatus, ShippingPriority,
    SimulatedCarrier, StepStatus, TradeRequest, TradeSettlementSaga, TransactionType,
};

fn setup() -> (TradeSettlementSaga, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let carrier = Arc::new(SimulatedCarrier::new("dhl", clock.clone()));
    let saga = TradeSettlementSaga::in_memory(SettlementConfig::default(), clock.clone(), carrier);
    saga.forex()
        .publish_rate(
            CurrencyPair::from_codes("USD", "AED"),
            dec!(3.67),
            Decimal::ZERO,
            Decimal::ZERO,
            Some("central-bank"),
        )
        .unwrap();
    (saga, clock)
}

fn trade(buyer_country: &str, seller_country: &str, amount: Decimal, currency: &str) -> TradeRequest {
    TradeRequest {
        transaction_type: TransactionType::Import,
        buyer: PartyId::new("AE-IMPORTS-LLC"),
        seller: PartyId::new("IN-TEXTILES-PVT"),
        buyer_country: CountryCode::new(buyer_country),
        seller_country: CountryCode::new(seller_country),
        buyer_tax_id: Some("100234567800003".into()),
        amount,
        currency: CurrencyCode::new(currency),
        goods_description: "Cotton fabric rolls".into(),
        hs_code: Some("5208".into()),
        incoterms: "CIF".into(),
        payment_method: PaymentMethod::TelegraphicTransfer,
        shipping_required: false,
        priority: ShippingPriority::Standard,
        special_instructions: None,
    }
}

/// Domestic AED trade: clean screening, identity conversion, shipment booked.
#[test]
fn scenario_a_clean_domestic_trade() {
    let (saga, clock) = setup();
    let mut request = trade("AE", "AE", dec!(5000), "AED");
    request.shipping_required = true;
    request.priority = ShippingPriority::Express;

    let result = saga.settle(&request);

    assert_eq!(result.status, SettlementStatus::ComplianceApproved);
    let compliance = result.compliance.as_ref().unwrap();
    assert_eq!(compliance.status, ComplianceStatus::Approved);
    assert_eq!(compliance.risk_level, RiskLevel::Low);
    assert_eq!(compliance.check_ids.len(), 5);

    let forex = result.forex.as_ref().unwrap();
    assert_eq!(forex.exchange_rate, Decimal::ONE);
    assert_eq!(forex.converted_amount, dec!(5000));
    assert!(forex.locked_rate.is_none());

    // 5000 + shipping 200
    assert_eq!(result.total_cost, dec!(5200));
    assert_eq!(
        result.estimated_delivery,
        Some(clock.now() + Duration::days(3))
    );
    assert_eq!(result.next_action, NextAction::InitiatePayment);

    let steps: Vec<SagaStep> = result.timeline.iter().map(|e| e.step).collect();
    assert_eq!(
        steps,
        vec![
            SagaStep::TradeInitiated,
            SagaStep::ComplianceCheck,
            SagaStep::ForexConversion,
            SagaStep::PaymentSetup,
            SagaStep::ShippingSetup,
        ]
    );
    assert!(result.timeline.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

/// USD trade settled in AED at the locked rate.
#[test]
fn scenario_b_usd_converted_at_locked_rate() {
    let (saga, clock) = setup();
    let result = saga.settle(&trade("AE", "IN", dec!(10000), "USD"));

    let forex = result.forex.as_ref().unwrap();
    assert_eq!(forex.exchange_rate, dec!(3.67));
    assert_eq!(forex.converted_amount, dec!(36700));
    assert_eq!(forex.locked_rate, Some(dec!(3.67)));
    assert_eq!(forex.lock_expiry, Some(clock.now() + Duration::minutes(1440)));
    assert_eq!(forex.settlement_currency.as_str(), "AED");

    // 10000 is not above the AML threshold.
    assert_eq!(result.status, SettlementStatus::ComplianceApproved);
    assert_eq!(result.total_cost, dec!(36700));

    let lock = saga
        .forex()
        .get_locked_rate(&CurrencyPair::from_codes("USD", "AED"))
        .unwrap();
    assert!(lock.is_some());
}

/// Escrow-backed trade creates a pending escrow and asks for funding.
#[test]
fn scenario_c_escrow_payment() {
    let (saga, clock) = setup();
    let mut request = trade("AE", "IN", dec!(10000), "USD");
    request.payment_method = PaymentMethod::Escrow;

    let result = saga.settle(&request);

    assert_eq!(result.payment.method, PaymentMethod::Escrow);
    assert_eq!(result.payment.status, PaymentStatus::Pending);
    assert!(result.payment.lc_id.is_none());
    assert_eq!(result.next_action, NextAction::FundEscrow);
    assert_eq!(result.next_action_due, Some(clock.now() + Duration::hours(48)));
    assert_eq!(result.total_cost, dec!(37434));

    let escrow = saga.escrow().get(result.payment.escrow_id.unwrap()).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Pending);
    assert_eq!(escrow.transaction_ref, result.transaction_id);
    assert_eq!(escrow.amount, dec!(10000));
    assert_eq!(escrow.release_conditions.len(), 2);
}

/// A buyer in a high-risk country fails screening; nothing downstream runs.
#[test]
fn scenario_d_sanctioned_buyer_fails() {
    let (saga, _) = setup();
    let mut request = trade("IR", "IN", dec!(10000), "USD");
    request.payment_method = PaymentMethod::Escrow;
    request.shipping_required = true;

    let result = saga.settle(&request);

    assert!(result.is_failed());
    assert_eq!(result.next_action, NextAction::ContactSupport);
    assert!(result.forex.is_none());
    assert!(result.shipping.is_none());
    assert!(result.payment.escrow_id.is_none());
    assert!(result.payment.lc_id.is_none());
    assert_eq!(result.total_cost, Decimal::ZERO);

    let compliance = result.compliance.as_ref().unwrap();
    assert_eq!(compliance.status, ComplianceStatus::Rejected);
    assert!(compliance.risk_level >= RiskLevel::High);
    assert!(!compliance.restrictions.is_empty());

    let failure = result.failure.as_ref().unwrap();
    assert_eq!(failure.step, SagaStep::ComplianceCheck);
    assert_eq!(failure.kind, "compliance_rejected");

    let last = result.timeline.last().unwrap();
    assert_eq!(last.step, SagaStep::TradeFailed);
    assert_eq!(last.status, StepStatus::Failed);
    assert!(saga
        .escrow()
        .escrows_by_buyer(&PartyId::new("AE-IMPORTS-LLC"), None)
        .unwrap()
        .is_empty());
}

#[test]
fn embargoed_origin_fails_at_embargo_check() {
    let (saga, _) = setup();
    let result = saga.settle(&trade("AE", "CU", dec!(2000), "USD"));
    assert!(result.is_failed());
    let compliance = result.compliance.unwrap();
    assert_eq!(compliance.risk_level, RiskLevel::Critical);
    assert_eq!(compliance.check_ids.len(), 2);
}

#[test]
fn high_risk_seller_is_flagged_but_proceeds() {
    let (saga, _) = setup();
    let result = saga.settle(&trade("AE", "RU", dec!(2000), "USD"));
    assert_eq!(result.status, SettlementStatus::ComplianceApproved);
    assert_eq!(result.compliance.unwrap().risk_level, RiskLevel::High);
}

#[test]
fn high_value_trade_waits_for_compliance() {
    let (saga, clock) = setup();
    let result = saga.settle(&trade("AE", "IN", dec!(25000), "USD"));
    // AML monitoring is a condition, so the trade is approved with conditions.
    let compliance = result.compliance.as_ref().unwrap();
    assert_eq!(
        compliance.conditions,
        vec!["Enhanced transaction monitoring required".to_string()]
    );
    assert_eq!(result.status, SettlementStatus::ComplianceApproved);

    let mut restricted = trade("AE", "IN", dec!(2000), "USD");
    restricted.goods_description = "Tobacco leaf".into();
    let result = saga.settle(&restricted);
    assert_eq!(result.status, SettlementStatus::PendingCompliance);
    assert_eq!(result.next_action, NextAction::AwaitComplianceApproval);
    assert_eq!(result.next_action_due, Some(clock.now() + Duration::hours(24)));
}

/// The LC opened by the saga carries through issuance, drawing and closure.
#[test]
fn letter_of_credit_full_lifecycle() {
    let (saga, clock) = setup();
    let mut request = trade("AE", "IN", dec!(10000), "USD");
    request.payment_method = PaymentMethod::LetterOfCredit;

    let result = saga.settle(&request);
    assert_eq!(result.next_action, NextAction::AwaitLcIssuance);
    assert_eq!(result.total_cost, dec!(37200));

    let lcs = saga.letters_of_credit();
    let lc_number = result.payment.reference.clone().unwrap();
    let lc = lcs.by_number(&lc_number).unwrap();
    assert_eq!(lc.status, LcStatus::Requested);
    assert_eq!(lc.issuing_bank_name, "UAE Trade Bank");

    lcs.issue(lc.id, "bank-officer", Some("UTB-2024-118".into())).unwrap();
    lcs.activate(lc.id, "bank-officer").unwrap();

    let documents: Vec<PresentedDocument> = lc
        .documents_required
        .iter()
        .map(|d| PresentedDocument {
            document_type: d.clone(),
            document_name: format!("{}.pdf", d),
            document_url: None,
        })
        .collect();
    let presented = lcs
        .present_documents(lc.id, documents, "IN-TEXTILES-PVT", None)
        .unwrap();
    assert_eq!(presented.presentations.len(), 1);

    clock.advance(Duration::days(20));
    let partial = lcs.utilize(lc.id, dec!(4000), Some("first shipment".into()), "bank-officer").unwrap();
    assert_eq!(partial.status, LcStatus::Active);
    assert_eq!(partial.remaining_amount, dec!(6000));

    let over = lcs.utilize(lc.id, dec!(6000.01), None, "bank-officer");
    assert!(matches!(over, Err(SettlementError::Validation(_))));

    let drawn = lcs.utilize(lc.id, dec!(6000), None, "bank-officer").unwrap();
    assert_eq!(drawn.status, LcStatus::Utilized);
    assert_eq!(drawn.utilized_amount + drawn.remaining_amount, drawn.amount);

    let closed = lcs.close(lc.id, "fully drawn", "bank-officer").unwrap();
    assert_eq!(closed.status, LcStatus::Closed);
    assert!(lcs.cancel(lc.id, "too late", "ops").is_err());

    let analytics = lcs.analytics(None, None).unwrap();
    assert_eq!(analytics.total_lcs, 1);
    assert_eq!(analytics.total_utilized, dec!(10000));
}

#[test]
fn escrow_dispute_and_resolution_after_settlement() {
    let (saga, clock) = setup();
    let mut request = trade("AE", "IN", dec!(8000), "USD");
    request.payment_method = PaymentMethod::Escrow;
    let result = saga.settle(&request);
    let id = result.payment.escrow_id.unwrap();

    let escrows = saga.escrow();
    let funded = escrows.fund(id, Some("SWIFT-MT103-8841".into())).unwrap();
    assert_eq!(funded.status, EscrowStatus::Funded);

    // Releasing from pending is never allowed, and disputing twice fails.
    escrows.dispute(id, "short delivery").unwrap();
    assert!(matches!(
        escrows.dispute(id, "again"),
        Err(SettlementError::InvalidState { .. })
    ));

    clock.advance(Duration::days(3));
    let resolved = escrows
        .resolve_dispute(id, "partial refund agreed", Some("mediated".into()))
        .unwrap();
    assert_eq!(resolved.status, EscrowStatus::Released);
    assert_eq!(resolved.resolution.as_deref(), Some("partial refund agreed"));
    assert_eq!(resolved.settlement_reference.as_deref(), Some("SWIFT-MT103-8841"));
    assert!(escrows.cancel(id, "late").is_err());

    let analytics = escrows.analytics(None, None).unwrap();
    assert_eq!(analytics.total_escrows, 1);
    assert_eq!(analytics.completion_rate, dec!(100));
}

#[test]
fn conversion_reuses_live_lock_until_expiry() {
    let (saga, clock) = setup();
    let forex = saga.forex();
    let pair = CurrencyPair::from_codes("USD", "AED");

    let first = forex
        .convert(&ConversionRequest::new("USD", "AED", dec!(100)).locked_for(30))
        .unwrap();
    forex
        .publish_rate(pair.clone(), dec!(3.70), Decimal::ZERO, Decimal::ZERO, None)
        .unwrap();

    let second = forex
        .convert(&ConversionRequest::new("USD", "AED", dec!(100)).locked_for(30))
        .unwrap();
    assert_eq!(second.rate, first.rate);
    assert_eq!(second.locked_until, first.locked_until);

    clock.advance(Duration::minutes(30));
    assert!(forex.get_locked_rate(&pair).unwrap().is_none());
    let third = forex
        .convert(&ConversionRequest::new("USD", "AED", dec!(100)).locked_for(30))
        .unwrap();
    assert_eq!(third.rate, dec!(3.70));
    assert_eq!(third.converted_amount, dec!(370));
    assert_eq!(forex.cleanup_expired_locks().unwrap(), 1);
}

#[test]
fn compliance_checks_are_recorded_per_transaction() {
    let (saga, _) = setup();
    let result = saga.settle(&trade("AE", "IN", dec!(1000), "USD"));
    let checks = saga
        .compliance()
        .checks_for_entity(&result.transaction_id)
        .unwrap();
    assert_eq!(checks.len(), 5);
    assert!(checks.iter().all(|c| c.status == ComplianceStatus::Approved));

    let analytics = saga.compliance().analytics(None, None).unwrap();
    assert_eq!(analytics.total_checks, 5);
    assert_eq!(analytics.approval_rate, dec!(100));
}

#[test]
fn settlement_result_serializes_to_json() {
    let (saga, _) = setup();
    let result = saga.settle(&trade("AE", "IN", dec!(1000), "USD"));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "compliance_approved");
    assert_eq!(json["payment"]["method"], "telegraphic_transfer");
    assert_eq!(json["next_action"], "initiate_payment");
    let converted: Decimal = json["forex"]["converted_amount"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(converted, dec!(3670));
}
