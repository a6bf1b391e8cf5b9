use crate::core::error::{Result, SettlementError};
use crate::store::row::{Entity, Row, RowMapper};
use crate::store::{Filter, Repository};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// In-memory [`Repository`] backed by a `HashMap` of mapped rows.
///
/// Thread-safe; the write lock covers the version check and the write, so
/// check-and-set is atomic.
pub struct InMemoryRepository<E> {
    inner: RwLock<Inner>,
    _entity: PhantomData<fn() -> E>,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<Uuid, Row>,
    next_seq: u64,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            _entity: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for InMemoryRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("rows", &self.inner.read().rows.len())
            .finish()
    }
}

impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    fn insert(&self, entity: &E) -> Result<E> {
        let mut inner = self.inner.write();
        if inner.rows.contains_key(&entity.id()) {
            return Err(SettlementError::Storage(format!(
                "{} {} already exists",
                E::KIND,
                entity.id()
            )));
        }
        let mut stored = entity.clone();
        stored.set_version(1);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let row = RowMapper::to_row(&stored, seq)?;
        inner.rows.insert(row.id, row);
        Ok(stored)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<E>> {
        let inner = self.inner.read();
        inner.rows.get(&id).map(RowMapper::from_row).transpose()
    }

    fn update(&self, entity: &E) -> Result<E> {
        let mut inner = self.inner.write();
        let current = inner
            .rows
            .get(&entity.id())
            .ok_or_else(|| SettlementError::not_found(E::KIND, entity.id()))?;
        if current.version != entity.version() {
            return Err(SettlementError::Conflict {
                entity: E::KIND,
                id: entity.id().to_string(),
                expected: entity.version(),
                found: current.version,
            });
        }
        let seq = current.seq;
        let mut stored = entity.clone();
        stored.set_version(entity.version() + 1);
        let row = RowMapper::to_row(&stored, seq)?;
        inner.rows.insert(row.id, row);
        Ok(stored)
    }

    fn query(&self, filter: &Filter) -> Result<Vec<E>> {
        let inner = self.inner.read();
        let mut rows: Vec<&Row> = inner.rows.values().filter(|r| filter.matches(r)).collect();
        rows.sort_by_key(|r| r.seq);
        rows.into_iter().map(RowMapper::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::party::PartyId;
    use chrono::{DateTime, Duration, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        owner: PartyId,
        status: String,
        created_at: DateTime<Utc>,
        #[serde(skip)]
        version: u64,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";
        fn id(&self) -> Uuid {
            self.id
        }
        fn version(&self) -> u64 {
            self.version
        }
        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
        fn status_label(&self) -> String {
            self.status.clone()
        }
        fn parties(&self) -> Vec<PartyId> {
            vec![self.owner.clone()]
        }
    }

    fn note(owner: &str, status: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            owner: PartyId::new(owner),
            status: status.to_string(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let repo = InMemoryRepository::<Note>::new();
        let stored = repo.insert(&note("a", "open")).unwrap();
        assert_eq!(stored.version, 1);
        let found = repo.find_by_id(stored.id).unwrap().unwrap();
        assert_eq!(found.version, 1);
        assert_eq!(found.owner, PartyId::new("a"));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let repo = InMemoryRepository::<Note>::new();
        let n = note("a", "open");
        repo.insert(&n).unwrap();
        assert!(matches!(repo.insert(&n), Err(SettlementError::Storage(_))));
    }

    #[test]
    fn test_stale_update_conflicts() {
        let repo = InMemoryRepository::<Note>::new();
        let stored = repo.insert(&note("a", "open")).unwrap();

        let mut first = stored.clone();
        first.status = "closed".into();
        let mut second = stored;
        second.status = "archived".into();

        repo.update(&first).unwrap();
        let err = repo.update(&second).unwrap_err();
        assert!(matches!(err, SettlementError::Conflict { expected: 1, found: 2, .. }));

        let current = repo.find_by_id(first.id).unwrap().unwrap();
        assert_eq!(current.status, "closed");
    }

    #[test]
    fn test_query_filters_and_orders() {
        let repo = InMemoryRepository::<Note>::new();
        repo.insert(&note("a", "open")).unwrap();
        repo.insert(&note("b", "open")).unwrap();
        repo.insert(&note("a", "closed")).unwrap();

        let a = repo.query(&Filter::new().party(PartyId::new("a"))).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].status, "open");
        assert_eq!(a[1].status, "closed");

        let open = repo.query(&Filter::new().status("open")).unwrap();
        assert_eq!(open.len(), 2);

        let future = Utc::now() + Duration::days(1);
        let none = repo
            .query(&Filter::new().created_between(Some(future), None))
            .unwrap();
        assert!(none.is_empty());
    }
}
