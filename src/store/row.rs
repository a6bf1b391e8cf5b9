//! Mapping between domain entities and stored rows.
//!
//! Domain types stay plain structs. A [`Row`] carries the indexed columns a
//! store filters on (status, parties, lookup key, creation time) next to the
//! serialized body, and [`RowMapper`] converts in both directions.

use crate::core::error::{Result, SettlementError};
use crate::core::party::PartyId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted domain entity.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// Human-readable entity name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
    fn created_at(&self) -> DateTime<Utc>;

    /// Status column value, e.g. `"funded"`.
    fn status_label(&self) -> String;

    /// Parties the entity can be listed by.
    fn parties(&self) -> Vec<PartyId> {
        Vec::new()
    }

    /// Secondary lookup column (LC number, currency pair, subject id).
    fn lookup_key(&self) -> Option<String> {
        None
    }
}

/// Stored representation of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub id: Uuid,
    pub kind: String,
    pub version: u64,
    pub seq: u64,
    pub status: String,
    pub parties: Vec<PartyId>,
    pub lookup_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

pub struct RowMapper;

impl RowMapper {
    pub fn to_row<E: Entity>(entity: &E, seq: u64) -> Result<Row> {
        let body = serde_json::to_value(entity)
            .map_err(|e| SettlementError::Storage(format!("encode {}: {}", E::KIND, e)))?;
        Ok(Row {
            id: entity.id(),
            kind: E::KIND.to_string(),
            version: entity.version(),
            seq,
            status: entity.status_label(),
            parties: entity.parties(),
            lookup_key: entity.lookup_key(),
            created_at: entity.created_at(),
            body,
        })
    }

    pub fn from_row<E: Entity>(row: &Row) -> Result<E> {
        if row.kind != E::KIND {
            return Err(SettlementError::Storage(format!(
                "row {} holds {}, expected {}",
                row.id,
                row.kind,
                E::KIND
            )));
        }
        let mut entity: E = serde_json::from_value(row.body.clone())
            .map_err(|e| SettlementError::Storage(format!("decode {}: {}", E::KIND, e)))?;
        entity.set_version(row.version);
        Ok(entity)
    }
}
