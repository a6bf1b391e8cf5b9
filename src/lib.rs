//! # trade-settlement
//!
//! Cross-border trade settlement engine.
//!
//! A trade request is screened for compliance, converted into the
//! settlement currency at a locked FX rate, secured by an escrow, a letter
//! of credit or a telegraphic transfer, and optionally handed to a carrier.
//! Each step is a service that can also be driven on its own.
//!
//! ## Architecture
//!
//! - **core**: currencies, parties, the clock and the error type
//! - **store**: repository trait with an in-memory, version-checked backend
//! - **compliance**: sanctions, embargo, AML, KYC, VAT and customs screening
//! - **forex**: rate publication, rate locks, conversion and hedge sizing
//! - **escrow**: escrow lifecycle and analytics
//! - **letter_of_credit**: letter-of-credit lifecycle, drawings and documents
//! - **saga**: the end-to-end settlement of one trade
//! - **config**: TOML / environment configuration

pub mod compliance;
pub mod config;
pub mod core;
pub mod escrow;
pub mod forex;
pub mod letter_of_credit;
pub mod saga;
pub mod store;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::compliance::{ComplianceEngine, ComplianceStatus, RiskLevel};
    pub use crate::config::SettlementConfig;
    pub use crate::core::clock::{Clock, ManualClock, SystemClock};
    pub use crate::core::currency::{CurrencyCode, CurrencyPair};
    pub use crate::core::error::{Result, SettlementError};
    pub use crate::core::party::{CountryCode, PartyId};
    pub use crate::escrow::{EscrowService, EscrowStatus};
    pub use crate::forex::{ConversionRequest, ForexRateManager};
    pub use crate::letter_of_credit::{LcStatus, LetterOfCreditService};
    pub use crate::saga::{
        PaymentMethod, SimulatedCarrier, TradeRequest, TradeSettlementResult, TradeSettlementSaga,
    };
    pub use crate::store::{InMemoryRepository, Repository};
}
