//! Escrow lifecycle state machine.
//!
//! ```text
//! Pending ──→ Funded ──→ Released
//!    │          │  ↘         ↑
//!    │          │   Disputed ┘
//!    ↓          ↓
//! Cancelled ←───┘
//! ```
//!
//! # Examples
//!
//! ```
//! use trade_settlement::escrow::EscrowStatus;
//!
//! assert!(EscrowStatus::Funded.can_transition_to(EscrowStatus::Cancelled));
//! assert!(!EscrowStatus::Disputed.can_transition_to(EscrowStatus::Cancelled));
//! assert!(EscrowStatus::Released.is_terminal());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    #[default]
    Pending,
    Funded,
    Released,
    Disputed,
    Cancelled,
}

impl EscrowStatus {
    pub const ALL: [EscrowStatus; 5] = [
        Self::Pending,
        Self::Funded,
        Self::Released,
        Self::Disputed,
        Self::Cancelled,
    ];

    /// Released and cancelled escrows accept no further changes.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Cancelled)
    }

    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Funded)
                | (Self::Pending, Self::Cancelled)
                | (Self::Funded, Self::Released)
                | (Self::Funded, Self::Disputed)
                | (Self::Funded, Self::Cancelled)
                // resolution always releases
                | (Self::Disputed, Self::Released)
        )
    }

    pub fn valid_transitions(&self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Funded => "funded",
            Self::Released => "released",
            Self::Disputed => "disputed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_exits() {
        for state in EscrowStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(state.valid_transitions().is_empty(), "{} has exits", state);
        }
    }

    #[test]
    fn test_dispute_only_from_funded() {
        for state in EscrowStatus::ALL {
            assert_eq!(
                state.can_transition_to(EscrowStatus::Disputed),
                state == EscrowStatus::Funded
            );
        }
    }

    #[test]
    fn test_funded_exits() {
        assert_eq!(
            EscrowStatus::Funded.valid_transitions(),
            vec![
                EscrowStatus::Released,
                EscrowStatus::Disputed,
                EscrowStatus::Cancelled
            ]
        );
    }
}
