use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use mandate_core::errors::AuditError;
use mandate_core::state::DecisionAudit;
use mandate_core::types::AuthorityLevel;

/// In-memory audit trails, one per decision.
///
/// Appends to one decision serialize on that decision's mutex; the outer
/// map is only write-locked to open a new trail.
#[derive(Default)]
pub struct AuditLedger {
    trails: RwLock<HashMap<String, Arc<Mutex<DecisionAudit>>>>,
}

fn poisoned(decision_id: &str) -> AuditError {
    AuditError::WriteFailure(format!("audit trail for {decision_id} poisoned"))
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a trail for a freshly routed decision.
    ///
    /// A decision id gets one trail: a pending trail fails with `AlreadyOpen`,
    /// a closed one with `Sealed`.
    pub fn open(
        &self,
        decision_id: &str,
        route_id: &str,
        level: AuthorityLevel,
        at: DateTime<Utc>,
    ) -> Result<(), AuditError> {
        let mut trails = self.trails.write().map_err(|_| poisoned(decision_id))?;
        if let Some(existing) = trails.get(decision_id) {
            let audit = existing.lock().map_err(|_| poisoned(decision_id))?;
            if audit.is_sealed() {
                return Err(AuditError::Sealed(decision_id.to_string()));
            }
            return Err(AuditError::AlreadyOpen {
                decision_id: decision_id.to_string(),
                route_id: audit.route_id.clone(),
            });
        }
        let audit = DecisionAudit::open(decision_id, route_id, level, at);
        trails.insert(decision_id.to_string(), Arc::new(Mutex::new(audit)));
        Ok(())
    }

    fn trail(&self, decision_id: &str) -> Result<Arc<Mutex<DecisionAudit>>, AuditError> {
        let trails = self.trails.read().map_err(|_| poisoned(decision_id))?;
        trails
            .get(decision_id)
            .cloned()
            .ok_or_else(|| AuditError::UnknownDecision(decision_id.to_string()))
    }

    /// Run `f` against a decision's trail under its lock.
    pub fn with<T>(
        &self,
        decision_id: &str,
        f: impl FnOnce(&mut DecisionAudit) -> Result<T, AuditError>,
    ) -> Result<T, AuditError> {
        let trail = self.trail(decision_id)?;
        let mut audit = trail.lock().map_err(|_| poisoned(decision_id))?;
        f(&mut audit)
    }

    pub fn snapshot(&self, decision_id: &str) -> Option<DecisionAudit> {
        let trail = self.trail(decision_id).ok()?;
        let audit = trail.lock().ok()?;
        Some(audit.clone())
    }

    pub fn contains(&self, decision_id: &str) -> bool {
        self.trails
            .read()
            .map(|t| t.contains_key(decision_id))
            .unwrap_or(false)
    }

    /// Every trail, sorted by decision id.
    pub fn all(&self) -> Vec<DecisionAudit> {
        let Ok(trails) = self.trails.read() else {
            return Vec::new();
        };
        let mut out: Vec<DecisionAudit> = trails
            .values()
            .filter_map(|t| t.lock().ok().map(|a| a.clone()))
            .collect();
        out.sort_by(|a, b| a.decision_id.cmp(&b.decision_id));
        out
    }
}
