use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::BusinessOutcome;
use crate::errors::AuditError;
use crate::types::{ApproverRole, AuthorityLevel, DecisionStatus, EscalationTrigger, Verdict};

/// One recorded approver answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub step_id: String,
    pub role: ApproverRole,
    pub approver_id: String,
    pub verdict: Verdict,
    /// True when a delegate answered on behalf of the step's role.
    #[serde(default)]
    pub delegated: bool,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

/// A fired escalation trigger. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub decision_id: String,
    pub trigger: EscalationTrigger,
    pub from_level: AuthorityLevel,
    pub to_level: AuthorityLevel,
    pub at: DateTime<Utc>,
    pub reason: String,
}

impl EscalationEvent {
    /// True when the trigger fired at the ceiling and the level stayed put.
    pub fn is_saturated(&self) -> bool {
        self.from_level == self.to_level
    }
}

/// Append-only history of one decision.
///
/// Sealed once the decision reaches a terminal status; after that only a
/// single outcome link is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionAudit {
    pub decision_id: String,
    /// Route approvals must be given against; replaced when an escalation
    /// raises the decision.
    pub route_id: String,
    pub opened_at: DateTime<Utc>,
    pub authority_level: AuthorityLevel,
    pub status: DecisionStatus,
    #[serde(default)]
    pub approval_events: Vec<ApprovalEvent>,
    #[serde(default)]
    pub escalation_events: Vec<EscalationEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BusinessOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl DecisionAudit {
    pub fn open(
        decision_id: &str,
        route_id: &str,
        level: AuthorityLevel,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            decision_id: decision_id.to_string(),
            route_id: route_id.to_string(),
            opened_at: at,
            authority_level: level,
            status: DecisionStatus::Pending,
            approval_events: Vec::new(),
            escalation_events: Vec::new(),
            outcome: None,
            closed_at: None,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_open(&self) -> Result<(), AuditError> {
        if self.is_sealed() {
            return Err(AuditError::Sealed(self.decision_id.clone()));
        }
        Ok(())
    }

    /// Append an approval answer unless the exact same answer is already recorded.
    pub fn record_approval(&mut self, event: ApprovalEvent) -> Result<bool, AuditError> {
        self.ensure_open()?;
        if self.approval_events.contains(&event) {
            return Ok(false);
        }
        self.approval_events.push(event);
        Ok(true)
    }

    /// Append an escalation. `raised_route` becomes the current route when
    /// the escalation produced one.
    pub fn record_escalation(
        &mut self,
        event: EscalationEvent,
        raised_route: Option<&str>,
    ) -> Result<(), AuditError> {
        self.ensure_open()?;
        self.authority_level = self.authority_level.stricter(event.to_level);
        if let Some(route_id) = raised_route {
            self.route_id = route_id.to_string();
        }
        self.escalation_events.push(event);
        Ok(())
    }

    /// True when approvals may be given against this route: it is the current
    /// one and not below the recorded level.
    pub fn accepts_route(&self, route_id: &str, level: AuthorityLevel) -> bool {
        self.route_id == route_id && level >= self.authority_level
    }

    /// Move to a terminal status. Pending → Pending is a no-op.
    pub fn close(&mut self, status: DecisionStatus, at: DateTime<Utc>) -> Result<(), AuditError> {
        self.ensure_open()?;
        if status.is_terminal() {
            self.status = status;
            self.closed_at = Some(at);
        }
        Ok(())
    }

    pub fn link_outcome(&mut self, outcome: BusinessOutcome) -> Result<(), AuditError> {
        if self.outcome.is_some() {
            return Err(AuditError::Sealed(self.decision_id.clone()));
        }
        self.outcome = Some(outcome);
        Ok(())
    }
}
