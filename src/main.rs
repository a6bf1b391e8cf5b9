//! trade-settlement CLI
//!
//! Settle trades, convert amounts and screen entities from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Settle a trade described in a JSON file
//! trade-settlement settle --input trade.json
//!
//! # Output as JSON, with rates and rules from a config file
//! trade-settlement settle --input trade.json --config settlement.toml --format json
//!
//! # Convert an amount at the configured rates
//! trade-settlement convert --from USD --to AED --amount 2500 --lock
//!
//! # Run one compliance check
//! trade-settlement screen --input check.json
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs;
use std::process;
use std::sync::Arc;
use trade_settlement::compliance::{CheckRequest, ComplianceCheck, ComplianceEngine};
use trade_settlement::config::{SeedRate, SettlementConfig};
use trade_settlement::core::clock::{Clock, SystemClock};
use trade_settlement::core::currency::{CurrencyCode, CurrencyPair};
use trade_settlement::forex::ConversionRequest;
use trade_settlement::saga::{SimulatedCarrier, TradeRequest, TradeSettlementResult, TradeSettlementSaga};
use trade_settlement::store::InMemoryRepository;

fn print_usage() {
    eprintln!(
        r#"trade-settlement: cross-border trade settlement

USAGE:
    trade-settlement <COMMAND> [OPTIONS]

COMMANDS:
    settle      Settle a trade: compliance, FX, payment instrument, shipping
    convert     Convert an amount at the configured rates
    screen      Run a single compliance check
    help        Show this message

OPTIONS (all commands):
    --config <FILE>     TOML configuration (default: built-in tables + env)

OPTIONS (settle, screen):
    --input <FILE>      Path to JSON request file
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (convert):
    --from <CODE>       Source currency
    --to <CODE>         Target currency
    --amount <AMOUNT>   Amount to convert
    --lock              Lock the rate before converting

EXAMPLES:
    trade-settlement settle --input trade.json
    trade-settlement settle --input trade.json --format json
    trade-settlement convert --from USD --to AED --amount 2500
    trade-settlement screen --input check.json --config settlement.toml"#
    );
}

/// Options shared by every command.
#[derive(Default)]
struct Options {
    input: Option<String>,
    config: Option<String>,
    format: String,
    from: Option<String>,
    to: Option<String>,
    amount: Option<String>,
    lock: bool,
}

fn parse_options(args: &[String]) -> Options {
    let mut options = Options {
        format: "text".to_string(),
        ..Default::default()
    };
    let value = |i: usize, flag: &str| -> String {
        args.get(i).cloned().unwrap_or_else(|| {
            eprintln!("{} requires a value", flag);
            process::exit(1);
        })
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                options.input = Some(value(i, "--input"));
            }
            "--config" => {
                i += 1;
                options.config = Some(value(i, "--config"));
            }
            "--format" => {
                i += 1;
                options.format = value(i, "--format");
            }
            "--from" => {
                i += 1;
                options.from = Some(value(i, "--from"));
            }
            "--to" => {
                i += 1;
                options.to = Some(value(i, "--to"));
            }
            "--amount" => {
                i += 1;
                options.amount = Some(value(i, "--amount"));
            }
            "--lock" => options.lock = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }
    options
}

fn load_config(path: Option<&str>) -> SettlementConfig {
    let loaded = match path {
        Some(path) => SettlementConfig::from_file(path),
        None => SettlementConfig::from_env(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    if config.rates.is_empty() {
        config.rates.push(SeedRate {
            base: CurrencyCode::new("USD"),
            quote: CurrencyCode::new("AED"),
            rate: dec!(3.67),
            spread_percent: Decimal::ZERO,
            commission_percent: Decimal::ZERO,
        });
    }
    config
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        process::exit(1);
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error encoding JSON: {}", e);
            process::exit(1);
        }
    }
}

fn build_saga(config: &SettlementConfig) -> TradeSettlementSaga {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let carrier = Arc::new(SimulatedCarrier::new("dhl", clock.clone()));
    let saga = TradeSettlementSaga::in_memory(config.clone(), clock, carrier);
    for seed in &config.rates {
        let published = saga.forex().publish_rate(
            CurrencyPair::new(seed.base.clone(), seed.quote.clone()),
            seed.rate,
            seed.spread_percent,
            seed.commission_percent,
            Some("config"),
        );
        if let Err(e) = published {
            eprintln!("Error seeding rate {}/{}: {}", seed.base, seed.quote, e);
            process::exit(1);
        }
    }
    saga
}

fn print_settlement(result: &TradeSettlementResult) {
    println!("Transaction:   {}", result.transaction_id);
    println!("Status:        {:?}", result.status);
    if let Some(compliance) = &result.compliance {
        println!(
            "Compliance:    {} (risk {}, {} checks)",
            compliance.status,
            compliance.risk_level,
            compliance.check_ids.len()
        );
        for restriction in &compliance.restrictions {
            println!("  restriction: {}", restriction);
        }
        for condition in &compliance.conditions {
            println!("  condition:   {}", condition);
        }
    }
    if let Some(forex) = &result.forex {
        println!(
            "FX:            {} {} at {}",
            forex.converted_amount, forex.settlement_currency, forex.exchange_rate
        );
    }
    println!(
        "Payment:       {} ({:?}) {}",
        result.payment.method,
        result.payment.status,
        result.payment.reference.as_deref().unwrap_or("-")
    );
    if let Some(shipping) = &result.shipping {
        println!(
            "Shipping:      {} ETA {}",
            shipping.tracking_number,
            shipping.estimated_delivery.format("%Y-%m-%d")
        );
    }
    println!("Total cost:    {}", result.total_cost);
    match result.next_action_due {
        Some(due) => println!(
            "Next action:   {:?} by {}",
            result.next_action,
            due.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("Next action:   {:?}", result.next_action),
    }
    if let Some(failure) = &result.failure {
        println!("Failed at:     {:?} [{}] {}", failure.step, failure.kind, failure.message);
    }
    println!("\nTimeline:");
    for entry in &result.timeline {
        println!(
            "  {}  {:<18} {:<10} {}",
            entry.timestamp.format("%H:%M:%S"),
            format!("{:?}", entry.step),
            format!("{:?}", entry.status),
            entry.notes.as_deref().unwrap_or("")
        );
    }
}

fn cmd_settle(args: &[String]) {
    let options = parse_options(args);
    let path = options.input.clone().unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });
    let config = load_config(options.config.as_deref());
    let request: TradeRequest = read_json(&path);

    let saga = build_saga(&config);
    let result = saga.settle(&request);

    if options.format == "json" {
        print_json(&result);
    } else {
        print_settlement(&result);
    }
    if result.is_failed() {
        process::exit(2);
    }
}

fn cmd_convert(args: &[String]) {
    let options = parse_options(args);
    let (Some(from), Some(to), Some(amount)) = (options.from, options.to, options.amount) else {
        eprintln!("Error: --from, --to and --amount are required");
        process::exit(1);
    };
    let amount: Decimal = amount.parse().unwrap_or_else(|e| {
        eprintln!("Invalid amount '{}': {}", amount, e);
        process::exit(1);
    });
    let config = load_config(options.config.as_deref());
    let saga = build_saga(&config);

    let mut request = ConversionRequest::new(from.as_str(), to.as_str(), amount);
    if options.lock {
        request = request.locked_for(config.forex.default_lock_minutes);
    }
    match saga.forex().convert(&request) {
        Ok(result) if options.format == "json" => print_json(&result),
        Ok(result) => {
            println!(
                "{} {} = {} {} (rate {})",
                result.amount, result.from, result.converted_amount, result.to, result.rate
            );
            if let Some(until) = result.locked_until {
                println!("Locked until {}", until.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_screen(args: &[String]) {
    let options = parse_options(args);
    let path = options.input.clone().unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });
    let config = load_config(options.config.as_deref());
    let request: CheckRequest = read_json(&path);

    let engine = ComplianceEngine::new(
        Arc::new(InMemoryRepository::<ComplianceCheck>::new()),
        Arc::new(SystemClock),
        config.compliance,
    );
    let check = engine.run_compliance_check(request).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    if options.format == "json" {
        print_json(&check);
        return;
    }
    println!("Check:     {} ({})", check.id, check.category);
    println!("Status:    {}", check.status);
    println!("Risk:      {} (score {})", check.risk_level, check.score);
    for finding in &check.findings {
        println!("  finding [{}] {}: {}", finding.severity, finding.kind, finding.description);
    }
    for restriction in &check.restrictions {
        println!("  restriction {}: {}", restriction.kind, restriction.description);
    }
    for condition in &check.conditions {
        println!("  condition: {}", condition);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "settle" => cmd_settle(rest),
        "convert" => cmd_convert(rest),
        "screen" => cmd_screen(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
