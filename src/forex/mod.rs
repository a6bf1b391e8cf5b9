//! Exchange rates, rate locks and conversion.
//!
//! Locks are separate records that expire by wall-clock comparison at read
//! time; [`ForexRateManager::cleanup_expired_locks`] only tidies them up.

pub mod manager;
pub mod rate;

pub use manager::ForexRateManager;
pub use rate::{ConversionRequest, ConversionResult, ForexRate, HedgeRequirement};
