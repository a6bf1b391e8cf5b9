//! Escrow: funds held between buyer and seller until release.

pub mod service;
pub mod state;
pub mod transaction;

pub use service::{EscrowAnalytics, EscrowService};
pub use state::EscrowStatus;
pub use transaction::{CreateEscrowRequest, EscrowCategory, EscrowTransaction};
