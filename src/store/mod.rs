//! Persistence capability injected into the settlement services.
//!
//! Services never hold a global handle; each receives an
//! `Arc<dyn Repository<E>>` for the entity it owns. Updates are optimistic
//! check-and-set on the entity version, which serializes racing state
//! transitions on the same entity.

pub mod memory;
pub mod row;

use crate::core::error::Result;
use crate::core::party::PartyId;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use uuid::Uuid;

pub use memory::InMemoryRepository;
pub use row::{Entity, Row, RowMapper};

/// Narrow listing filter over the indexed row columns.
///
/// # Examples
///
/// ```
/// use trade_settlement::core::party::PartyId;
/// use trade_settlement::store::Filter;
///
/// let filter = Filter::new().party(PartyId::new("buyer-1")).status("funded");
/// assert_eq!(filter.status.as_deref(), Some("funded"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub party: Option<PartyId>,
    pub status: Option<String>,
    pub lookup_key: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn party(mut self, party: PartyId) -> Self {
        self.party = Some(party);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn lookup_key(mut self, key: impl Into<String>) -> Self {
        self.lookup_key = Some(key.into());
        self
    }

    /// Inclusive creation-time range; either bound may be open.
    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        if let Some(party) = &self.party {
            if !row.parties.contains(party) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &row.status != status {
                return false;
            }
        }
        if let Some(key) = &self.lookup_key {
            if row.lookup_key.as_ref() != Some(key) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if row.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if row.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Per-entity create/read/update store.
pub trait Repository<E: Entity>: Send + Sync + Debug {
    /// Persist a new entity. Returns it with its stored version (1).
    fn insert(&self, entity: &E) -> Result<E>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<E>>;

    /// Replace the stored entity if its version still equals `entity.version()`.
    ///
    /// On success the stored version is incremented and the updated entity is
    /// returned. A stale version yields `SettlementError::Conflict` and leaves
    /// the stored row untouched.
    fn update(&self, entity: &E) -> Result<E>;

    /// Entities matching `filter`, in insertion order.
    fn query(&self, filter: &Filter) -> Result<Vec<E>>;
}
