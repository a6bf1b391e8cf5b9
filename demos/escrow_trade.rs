//! Escrow-backed import settlement.
//!
//! Settles a USD trade into AED through the saga, then walks the escrow it
//! opened through funding, a dispute and its resolution. A second trade
//! from a sanctioned buyer shows the failure path.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trade_settlement::config::SettlementConfig;
use trade_settlement::core::clock::{Clock, SystemClock};
use trade_settlement::core::currency::{CurrencyCode, CurrencyPair};
use trade_settlement::core::party::{CountryCode, PartyId};
use trade_settlement::saga::{
    PaymentMethod, ShippingPriority, SimulatedCarrier, TradeRequest, TradeSettlementSaga,
    TransactionType,
};

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  trade-settlement: Escrow Trade Example  ║");
    println!("╚══════════════════════════════════════════╝\n");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let carrier = Arc::new(SimulatedCarrier::new("aramex", clock.clone()));
    let saga = TradeSettlementSaga::in_memory(SettlementConfig::default(), clock, carrier);
    saga.forex()
        .publish_rate(
            CurrencyPair::from_codes("USD", "AED"),
            dec!(3.6725),
            dec!(0.1),
            Decimal::ZERO,
            Some("central-bank"),
        )
        .expect("seed rate");

    // --- Scenario 1: clean import ---
    println!("━━━ Scenario 1: Cotton import, Mumbai → Dubai ━━━\n");

    let request = TradeRequest {
        transaction_type: TransactionType::Import,
        buyer: PartyId::new("AE-GULF-TEXTILES"),
        seller: PartyId::new("IN-SURAT-MILLS"),
        buyer_country: CountryCode::new("AE"),
        seller_country: CountryCode::new("IN"),
        buyer_tax_id: Some("100234567800003".into()),
        amount: dec!(42_500),
        currency: CurrencyCode::new("USD"),
        goods_description: "Cotton fabric rolls, 1200 m".into(),
        hs_code: Some("5208".into()),
        incoterms: "CIF".into(),
        payment_method: PaymentMethod::Escrow,
        shipping_required: true,
        priority: ShippingPriority::Express,
        special_instructions: Some("Keep dry".into()),
    };

    let result = saga.settle(&request);
    println!("Transaction:   {}", result.transaction_id);
    println!("Status:        {:?}", result.status);
    if let Some(forex) = &result.forex {
        println!(
            "Converted:     {} AED at {}",
            forex.converted_amount.round_dp(2),
            forex.exchange_rate
        );
    }
    println!("Total cost:    {} AED", result.total_cost.round_dp(2));
    println!("Next action:   {:?}", result.next_action);
    if let Some(shipping) = &result.shipping {
        println!("Tracking:      {}", shipping.tracking_number);
    }
    println!();

    // --- Escrow lifecycle ---
    println!("━━━ Escrow lifecycle ━━━\n");

    let escrows = saga.escrow();
    let id = result.payment.escrow_id.expect("escrow opened");
    let funded = escrows
        .fund(id, Some("SWIFT-MT103-20931".into()))
        .expect("fund");
    println!("  {:<10} ref {}", funded.status, funded.settlement_reference.unwrap_or_default());

    let disputed = escrows
        .dispute(id, "200 m short on delivery")
        .expect("dispute");
    println!("  {:<10} {}", disputed.status, disputed.dispute_reason.unwrap_or_default());

    let released = escrows
        .resolve_dispute(id, "Seller credits 200 m on next order", None)
        .expect("resolve");
    println!("  {:<10} {}", released.status, released.resolution.unwrap_or_default());
    println!();

    // --- Scenario 2: sanctioned buyer ---
    println!("━━━ Scenario 2: Buyer in a high-risk country ━━━\n");

    let blocked = TradeRequest {
        buyer: PartyId::new("KP-TRADING-CO"),
        buyer_country: CountryCode::new("KP"),
        ..request
    };
    let result = saga.settle(&blocked);
    println!("Status:        {:?}", result.status);
    if let Some(failure) = &result.failure {
        println!("Failed at:     {:?} ({})", failure.step, failure.message);
    }
    println!("Next action:   {:?}", result.next_action);
    println!("Escrow opened: {}", result.payment.escrow_id.is_some());
}
