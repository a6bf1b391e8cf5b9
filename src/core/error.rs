use thiserror::Error;

/// Errors surfaced by every settlement component.
///
/// `Validation`, `InvalidState` and `NotFound` are caller errors and are
/// never retried. `Conflict` means another writer moved the entity first;
/// re-fetch and retry. `Collaborator` wraps failures of external systems
/// such as the shipping carrier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} is {current}; cannot {operation}")]
    InvalidState {
        entity: &'static str,
        id: String,
        current: String,
        operation: &'static str,
    },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SettlementError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl ToString,
        current: impl ToString,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            current: current.to_string(),
            operation,
        }
    }

    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator,
            message: message.into(),
        }
    }

    /// Short machine-readable label, used in saga failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidState { .. } => "invalid_state",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Collaborator { .. } => "collaborator",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
        }
    }

    /// Whether repeating the same call may succeed without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Collaborator { .. })
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = SettlementError::invalid_state("escrow", "e-1", "pending", "release");
        assert_eq!(err.to_string(), "escrow e-1 is pending; cannot release");
        assert_eq!(err.kind(), "invalid_state");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(SettlementError::collaborator("shipping", "timeout").is_retryable());
        assert!(SettlementError::Conflict {
            entity: "escrow",
            id: "e-1".into(),
            expected: 1,
            found: 2,
        }
        .is_retryable());
        assert!(!SettlementError::validation("negative amount").is_retryable());
        assert!(!SettlementError::not_found("forex rate", "USD/XXX").is_retryable());
    }
}
