use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trade_settlement::compliance::{
    CheckRequest, ComplianceCategory, ComplianceCheck, ComplianceEngine, Counterparty, EntityType,
    Priority, SubjectData,
};
use trade_settlement::config::{ComplianceConfig, SettlementConfig};
use trade_settlement::core::clock::{Clock, SystemClock};
use trade_settlement::core::currency::{CurrencyCode, CurrencyPair};
use trade_settlement::core::party::{CountryCode, PartyId};
use trade_settlement::forex::ConversionRequest;
use trade_settlement::saga::{
    PaymentMethod, ShippingPriority, SimulatedCarrier, TradeRequest, TradeSettlementSaga,
    TransactionType,
};
use trade_settlement::store::InMemoryRepository;

fn saga() -> TradeSettlementSaga {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let carrier = Arc::new(SimulatedCarrier::new("dhl", clock.clone()));
    let saga = TradeSettlementSaga::in_memory(SettlementConfig::default(), clock, carrier);
    saga.forex()
        .publish_rate(
            CurrencyPair::from_codes("USD", "AED"),
            dec!(3.6725),
            Decimal::ZERO,
            Decimal::ZERO,
            None,
        )
        .unwrap();
    saga
}

fn trade(method: PaymentMethod) -> TradeRequest {
    TradeRequest {
        transaction_type: TransactionType::Import,
        buyer: PartyId::new("AE-IMPORTS-LLC"),
        seller: PartyId::new("IN-TEXTILES-PVT"),
        buyer_country: CountryCode::new("AE"),
        seller_country: CountryCode::new("IN"),
        buyer_tax_id: None,
        amount: dec!(48_250.75),
        currency: CurrencyCode::new("USD"),
        goods_description: "Cotton fabric rolls".into(),
        hs_code: Some("5208".into()),
        incoterms: "CIF".into(),
        payment_method: method,
        shipping_required: true,
        priority: ShippingPriority::Standard,
        special_instructions: None,
    }
}

fn bench_settle_escrow(c: &mut Criterion) {
    let saga = saga();
    let request = trade(PaymentMethod::Escrow);

    c.bench_function("settle_escrow_trade", |b| {
        b.iter(|| saga.settle(black_box(&request)))
    });
}

fn bench_settle_letter_of_credit(c: &mut Criterion) {
    let saga = saga();
    let request = trade(PaymentMethod::LetterOfCredit);

    c.bench_function("settle_letter_of_credit_trade", |b| {
        b.iter(|| saga.settle(black_box(&request)))
    });
}

fn bench_locked_conversion(c: &mut Criterion) {
    let saga = saga();
    let request = ConversionRequest::new("USD", "AED", dec!(10_000)).locked_for(1440);

    c.bench_function("convert_with_live_lock", |b| {
        b.iter(|| saga.forex().convert(black_box(&request)).unwrap())
    });
}

fn bench_sanctions_screening(c: &mut Criterion) {
    let engine = ComplianceEngine::new(
        Arc::new(InMemoryRepository::<ComplianceCheck>::new()),
        Arc::new(SystemClock),
        ComplianceConfig::default(),
    );
    let request = CheckRequest {
        entity_type: EntityType::Transaction,
        entity_id: "CBT-BENCH".into(),
        category: ComplianceCategory::Sanctions,
        subject: SubjectData {
            country: Some(CountryCode::new("AE")),
            counterparties: (0..10)
                .map(|i| Counterparty {
                    name: format!("supplier-{}", i),
                    country: CountryCode::new(if i == 9 { "RU" } else { "IN" }),
                    registration_number: None,
                })
                .collect(),
            ..Default::default()
        },
        priority: Priority::Medium,
        requested_by: "bench".into(),
        due_date: None,
    };

    c.bench_function("sanctions_screening_10_counterparties", |b| {
        b.iter(|| engine.run_compliance_check(black_box(request.clone())).unwrap())
    });
}

criterion_group!(
    benches,
    bench_settle_escrow,
    bench_settle_letter_of_credit,
    bench_locked_conversion,
    bench_sanctions_screening
);
criterion_main!(benches);
