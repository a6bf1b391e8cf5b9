//! Letter of credit from application to closure.
//!
//! The saga opens and requests the LC; the issuing bank then issues and
//! activates it, the beneficiary presents documents and draws in two
//! shipments, and the bank closes it.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trade_settlement::config::SettlementConfig;
use trade_settlement::core::clock::{Clock, ManualClock};
use trade_settlement::core::currency::{CurrencyCode, CurrencyPair};
use trade_settlement::core::party::{CountryCode, PartyId};
use trade_settlement::letter_of_credit::PresentedDocument;
use trade_settlement::saga::{
    PaymentMethod, ShippingPriority, SimulatedCarrier, TradeRequest, TradeSettlementSaga,
    TransactionType,
};

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  trade-settlement: Letter of Credit Lifecycle ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let carrier = Arc::new(SimulatedCarrier::new("maersk", clock.clone()));
    let saga = TradeSettlementSaga::in_memory(SettlementConfig::default(), clock.clone(), carrier);
    saga.forex()
        .publish_rate(
            CurrencyPair::from_codes("EUR", "AED"),
            dec!(3.98),
            Decimal::ZERO,
            Decimal::ZERO,
            None,
        )
        .expect("seed rate");

    let result = saga.settle(&TradeRequest {
        transaction_type: TransactionType::Import,
        buyer: PartyId::new("AE-DESERT-MOTORS"),
        seller: PartyId::new("DE-RHEIN-MASCHINEN"),
        buyer_country: CountryCode::new("AE"),
        seller_country: CountryCode::new("DE"),
        buyer_tax_id: Some("100987654300003".into()),
        amount: dec!(250_000),
        currency: CurrencyCode::new("EUR"),
        goods_description: "CNC milling machines".into(),
        hs_code: Some("8459".into()),
        incoterms: "CIF".into(),
        payment_method: PaymentMethod::LetterOfCredit,
        shipping_required: true,
        priority: ShippingPriority::Standard,
        special_instructions: None,
    });

    println!("Transaction:   {}", result.transaction_id);
    println!("Status:        {:?}", result.status);
    println!("Total cost:    {} AED", result.total_cost);
    println!("Next action:   {:?}\n", result.next_action);

    let lcs = saga.letters_of_credit();
    let lc_id = result.payment.lc_id.expect("LC opened");

    println!("━━━ Bank side ━━━\n");
    let lc = lcs
        .issue(lc_id, "UTB trade desk", Some("UTB/LC/2291".into()))
        .expect("issue");
    println!("  {:<10} bank ref {}", lc.status, lc.bank_reference.clone().unwrap_or_default());
    let lc = lcs.activate(lc_id, "UTB trade desk").expect("activate");
    println!("  {:<10} expires {}", lc.status, lc.expiry_date.format("%Y-%m-%d"));

    println!("\n━━━ Beneficiary side ━━━\n");
    let documents = lc
        .documents_required
        .iter()
        .map(|kind| PresentedDocument {
            document_type: kind.clone(),
            document_name: format!("{}-001.pdf", kind),
            document_url: None,
        })
        .collect();
    let lc = lcs
        .present_documents(lc_id, documents, "DE-RHEIN-MASCHINEN", Some("first shipment".into()))
        .expect("present");
    println!("  presentations: {}", lc.presentations.len());

    for (days, amount) in [(21, dec!(150_000)), (45, dec!(100_000))] {
        clock.advance(Duration::days(days));
        let lc = lcs
            .utilize(lc_id, amount, Some(format!("shipment on day {}", days)), "UTB trade desk")
            .expect("utilize");
        println!(
            "  {} drew {:>10} {}  remaining {:>10}  [{}]",
            clock.now().format("%Y-%m-%d"),
            amount,
            lc.currency,
            lc.remaining_amount,
            lc.status
        );
    }

    let lc = lcs
        .close(lc_id, "fully drawn", "UTB trade desk")
        .expect("close");
    println!("\n  {:<10} {}", lc.status, lc.closure_reason.unwrap_or_default());

    let analytics = lcs.analytics(None, None).expect("analytics");
    println!("\n━━━ Portfolio ━━━\n");
    println!("  LCs:              {}", analytics.total_lcs);
    println!("  Total value:      {}", analytics.total_value);
    println!("  Utilization rate: {}%", analytics.utilization_rate);
}
