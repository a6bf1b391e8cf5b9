//! Letter-of-credit lifecycle state machine.
//!
//! ```text
//! Draft → Requested → Issued → Active → Utilized → Closed
//!   │         │          │        │
//!   │         │          │        └──→ Expired ──→ Closed
//!   └─────────┴──────────┴────────┴──→ Cancelled
//! ```
//!
//! The table allows cancellation up to `Active`, but
//! [`LetterOfCreditService::cancel`](super::LetterOfCreditService::cancel)
//! only accepts `Draft` and `Requested`: once a bank has issued, cancelling
//! needs the bank's own process.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LcStatus {
    #[default]
    Draft,
    Requested,
    Issued,
    Active,
    Utilized,
    Expired,
    Cancelled,
    Closed,
}

impl LcStatus {
    pub const ALL: [LcStatus; 8] = [
        Self::Draft,
        Self::Requested,
        Self::Issued,
        Self::Active,
        Self::Utilized,
        Self::Expired,
        Self::Cancelled,
        Self::Closed,
    ];

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Closed)
    }

    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Requested)
                | (Self::Draft, Self::Cancelled)
                | (Self::Requested, Self::Issued)
                | (Self::Requested, Self::Cancelled)
                | (Self::Issued, Self::Active)
                | (Self::Issued, Self::Cancelled)
                | (Self::Active, Self::Utilized)
                | (Self::Active, Self::Expired)
                | (Self::Active, Self::Cancelled)
                | (Self::Utilized, Self::Closed)
                | (Self::Expired, Self::Closed)
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
            Self::Draft => "draft",
            Self::Requested => "requested",
            Self::Issued => "issued",
            Self::Active => "active",
            Self::Utilized => "utilized",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for LcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_connected() {
        let path = [
            LcStatus::Draft,
            LcStatus::Requested,
            LcStatus::Issued,
            LcStatus::Active,
            LcStatus::Utilized,
            LcStatus::Closed,
        ];
        for step in path.windows(2) {
            assert!(step[0].can_transition_to(step[1]), "{} -> {}", step[0], step[1]);
        }
    }

    #[test]
    fn test_no_cancel_after_utilization() {
        for state in [LcStatus::Utilized, LcStatus::Expired, LcStatus::Closed] {
            assert!(!state.can_transition_to(LcStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states() {
        for state in LcStatus::ALL {
            assert_eq!(state.is_terminal(), state.valid_transitions().is_empty());
        }
    }
}
