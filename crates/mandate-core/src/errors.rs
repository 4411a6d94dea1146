use crate::types::{ApproverRole, AuthorityLevel, DecisionType, EscalationTrigger};

/// Errors surfaced by routing, approval processing and escalation.
///
/// Callers always get either a complete route or one of these; timeouts are
/// recovered internally and only `EscalationExhausted` reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("no authority matrix entry for decision type {decision_type}")]
    Configuration { decision_type: DecisionType },

    #[error("invalid authority matrix: {0}")]
    InvalidMatrix(String),

    #[error("decision {decision_id}: no approver assigned for role {role}")]
    UnassignedApprover {
        decision_id: String,
        role: ApproverRole,
    },

    #[error("decision {decision_id}: invalid field `{field}`: {reason}")]
    Validation {
        decision_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("decision {decision_id}: {trigger} at {level} has no higher authority")]
    EscalationExhausted {
        decision_id: String,
        trigger: EscalationTrigger,
        level: AuthorityLevel,
    },

    #[error("decision {decision_id}: trigger {trigger} is not on the escalation path")]
    UnknownTrigger {
        decision_id: String,
        trigger: EscalationTrigger,
    },

    #[error("decision {decision_id} is already {status} and cannot change")]
    AlreadyFinal { decision_id: String, status: String },

    #[error("decision {decision_id}: route {route_id} was superseded by route {current}")]
    Superseded {
        decision_id: String,
        route_id: String,
        current: String,
    },

    #[error(transparent)]
    Notification(#[from] NotifyError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl AuthorityError {
    /// Decision id the error refers to, when it refers to one.
    pub fn decision_id(&self) -> Option<&str> {
        match self {
            AuthorityError::UnassignedApprover { decision_id, .. }
            | AuthorityError::Validation { decision_id, .. }
            | AuthorityError::EscalationExhausted { decision_id, .. }
            | AuthorityError::UnknownTrigger { decision_id, .. }
            | AuthorityError::AlreadyFinal { decision_id, .. }
            | AuthorityError::Superseded { decision_id, .. } => Some(decision_id),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery to {role} failed: {reason}")]
    DeliveryFailed { role: ApproverRole, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("write failure: {0}")]
    WriteFailure(String),
    #[error("chain corruption at entry {0}")]
    ChainCorruption(u64),
    #[error("audit trail for {0} is sealed")]
    Sealed(String),
    #[error("decision {decision_id} is already routed (route {route_id} pending)")]
    AlreadyOpen {
        decision_id: String,
        route_id: String,
    },
    #[error("no audit trail for {0}")]
    UnknownDecision(String),
}

/// Structured check result for `mandate check --json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    pub file: String,
    pub version: String,
    pub pass: bool,
    pub errors: Vec<CheckIssue>,
    pub warnings: Vec<CheckIssue>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckIssue {
    pub code: String,
    pub check: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CheckIssue {
    pub fn new(code: &str, check: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            check: check.to_string(),
            message: message.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}
