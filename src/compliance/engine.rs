use crate::compliance::analytics::ComplianceAnalytics;
use crate::compliance::check::{
    CheckRequest, ComplianceCategory, ComplianceCheck, ComplianceStatus,
};
use crate::compliance::rules;
use crate::config::ComplianceConfig;
use crate::core::clock::Clock;
use crate::core::error::{Result, SettlementError};
use crate::store::{Entity, Filter, Repository};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::cmp::Reverse;
use std::sync::Arc;
use uuid::Uuid;

/// Screens entities against the configured rule tables.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    repo: Arc<dyn Repository<ComplianceCheck>>,
    clock: Arc<dyn Clock>,
    config: ComplianceConfig,
}

impl ComplianceEngine {
    pub fn new(
        repo: Arc<dyn Repository<ComplianceCheck>>,
        clock: Arc<dyn Clock>,
        config: ComplianceConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Persist a new pending check.
    pub fn create_check(&self, request: CheckRequest) -> Result<ComplianceCheck> {
        if request.entity_id.trim().is_empty() {
            return Err(SettlementError::validation("entity id is required"));
        }
        if request.requested_by.trim().is_empty() {
            return Err(SettlementError::validation("requested_by is required"));
        }
        let check = ComplianceCheck::new(request, self.clock.now());
        let stored = self.repo.insert(&check)?;
        debug!(
            "compliance check {} created: {} for {}",
            stored.id, stored.category, stored.entity_id
        );
        Ok(stored)
    }

    /// Evaluate a pending check and persist the outcome.
    ///
    /// A check is evaluated exactly once; any other status yields
    /// `InvalidState` and leaves the stored record untouched.
    pub fn run_check(&self, id: Uuid, checked_by: &str) -> Result<ComplianceCheck> {
        let mut check = self.get(id)?;
        if check.status != ComplianceStatus::Pending {
            return Err(SettlementError::invalid_state(
                ComplianceCheck::KIND,
                id,
                check.status,
                "run check",
            ));
        }

        let now = self.clock.now();
        let outcome = rules::evaluate(check.category, &check.subject, &self.config, now);
        check.apply(outcome, checked_by, now);
        let stored = self.repo.update(&check)?;

        match stored.status {
            ComplianceStatus::Rejected => warn!(
                "compliance check {} rejected: {} for {} (risk {}, score {})",
                stored.id, stored.category, stored.entity_id, stored.risk_level, stored.score
            ),
            status => info!(
                "compliance check {} {}: {} for {} (risk {}, score {})",
                stored.id, status, stored.category, stored.entity_id, stored.risk_level,
                stored.score
            ),
        }
        Ok(stored)
    }

    /// Create and immediately evaluate a check.
    pub fn run_compliance_check(&self, request: CheckRequest) -> Result<ComplianceCheck> {
        let checked_by = request.requested_by.clone();
        let check = self.create_check(request)?;
        self.run_check(check.id, &checked_by)
    }

    pub fn get(&self, id: Uuid) -> Result<ComplianceCheck> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| SettlementError::not_found(ComplianceCheck::KIND, id))
    }

    /// Administrative status change. Does not re-run the rules.
    pub fn override_status(
        &self,
        id: Uuid,
        status: ComplianceStatus,
        notes: Option<String>,
        updated_by: &str,
    ) -> Result<ComplianceCheck> {
        let mut check = self.get(id)?;
        let previous = check.status;
        check.status = status;
        if notes.is_some() {
            check.notes = notes;
        }
        check.updated_by = Some(updated_by.to_string());
        let stored = self.repo.update(&check)?;
        info!(
            "compliance check {} overridden {} -> {} by {}",
            id, previous, status, updated_by
        );
        Ok(stored)
    }

    pub fn checks_for_entity(&self, entity_id: &str) -> Result<Vec<ComplianceCheck>> {
        self.repo.query(&Filter::new().lookup_key(entity_id))
    }

    pub fn checks_by_category(
        &self,
        category: ComplianceCategory,
        status: Option<ComplianceStatus>,
    ) -> Result<Vec<ComplianceCheck>> {
        let filter = match status {
            Some(status) => Filter::new().status(status.as_str()),
            None => Filter::new(),
        };
        Ok(self
            .repo
            .query(&filter)?
            .into_iter()
            .filter(|c| c.category == category)
            .collect())
    }

    /// Pending checks, most urgent first, oldest first within a priority.
    pub fn pending_checks(&self) -> Result<Vec<ComplianceCheck>> {
        let mut checks = self
            .repo
            .query(&Filter::new().status(ComplianceStatus::Pending.as_str()))?;
        checks.sort_by_key(|c| (Reverse(c.priority), c.created_at));
        Ok(checks)
    }

    /// Open checks whose due date has passed.
    pub fn overdue_checks(&self) -> Result<Vec<ComplianceCheck>> {
        let now = self.clock.now();
        Ok(self
            .repo
            .query(&Filter::new())?
            .into_iter()
            .filter(|c| c.is_overdue(now))
            .collect())
    }

    pub fn analytics(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<ComplianceAnalytics> {
        let checks = self
            .repo
            .query(&Filter::new().created_between(from, to))?;
        Ok(ComplianceAnalytics::from_checks(&checks))
    }
}
