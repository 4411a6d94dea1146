use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::errors::{AuditError, NotifyError};
use crate::types::{ApproverRole, AuditEventType, AuthorityLevel};

/// Maps a decision to its governance tier.
///
/// Implementations must be total and deterministic: every well-formed
/// decision gets exactly one level and the same input always gets the same
/// level.
pub trait DecisionClassifier {
    fn classify(&self, decision: &Decision) -> AuthorityLevel;
}

/// Resolves approver roles to the people currently holding them.
pub trait ApproverDirectory {
    /// Person ids assigned to `role`. Empty means nobody is assigned.
    fn assignees(&self, role: ApproverRole) -> Vec<String>;
}

/// Role → people table, as read from an assignments file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignments(pub BTreeMap<ApproverRole, Vec<String>>);

impl Assignments {
    pub fn assign(mut self, role: ApproverRole, person: impl Into<String>) -> Self {
        self.0.entry(role).or_default().push(person.into());
        self
    }
}

impl ApproverDirectory for Assignments {
    fn assignees(&self, role: ApproverRole) -> Vec<String> {
        self.0
            .get(&role)
            .map(|ids| ids.iter().filter(|id| !id.trim().is_empty()).cloned().collect())
            .unwrap_or_default()
    }
}

impl ApproverDirectory for HashMap<ApproverRole, Vec<String>> {
    fn assignees(&self, role: ApproverRole) -> Vec<String> {
        self.get(&role).cloned().unwrap_or_default()
    }
}

/// A message to one recipient role about a routed decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub decision_id: String,
    pub role: ApproverRole,
    pub recipients: Vec<String>,
    pub level: AuthorityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub message: String,
}

/// Delivers notifications. Called synchronously for immediate dispatch.
pub trait NotificationSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sink that accepts and drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardNotifications;

impl NotificationSink for DiscardNotifications {
    fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event_type: AuditEventType,
    pub decision_id: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<AuthorityLevel>,
    pub ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType, decision_id: &str, detail: impl Into<String>) -> Self {
        Self {
            event_type,
            decision_id: decision_id.to_string(),
            detail: detail.into(),
            level: None,
            ts: Utc::now(),
            prev_hash: None,
        }
    }

    pub fn at_level(mut self, level: AuthorityLevel) -> Self {
        self.level = Some(level);
        self
    }
}

/// Receives audit entries for persistence.
pub trait AuditSink {
    fn log(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}
