use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::matrix::entry::AuthorityMatrixEntry;
use crate::state::{ApprovalEvent, EscalationEvent};
use crate::types::{ApproverRole, AuthorityLevel, DecisionStatus, EscalationTrigger, Verdict};

/// Sign-off sequence for one routed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    pub id: String,
    pub decision_id: String,
    pub level: AuthorityLevel,
    pub stages: Vec<ApprovalStage>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalWorkflow {
    pub fn steps(&self) -> impl Iterator<Item = &ApprovalStep> {
        self.stages.iter().flat_map(|s| s.steps.iter())
    }

    pub fn step(&self, step_id: &str) -> Option<&ApprovalStep> {
        self.steps().find(|s| s.step_id == step_id)
    }

    /// Required roles in chain order.
    pub fn required_roles(&self) -> Vec<ApproverRole> {
        self.steps()
            .filter(|s| s.required)
            .map(|s| s.approver_role)
            .collect()
    }
}

/// Steps that open together. A sequential stage holds exactly one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStage {
    pub index: usize,
    pub parallel: bool,
    pub steps: Vec<ApprovalStep>,
}

impl ApprovalStage {
    /// Longest step limit in the stage; the stage deadline.
    pub fn time_limit_hours(&self) -> u32 {
        self.steps
            .iter()
            .filter(|s| s.required)
            .map(|s| s.time_limit_hours)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub step_id: String,
    pub approver_role: ApproverRole,
    pub approver_ids: Vec<String>,
    pub required: bool,
    pub time_limit_hours: u32,
    pub delegation_allowed: bool,
    /// People who may answer on behalf of `approver_role`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegate_ids: Vec<String>,
    /// Approver set of the next tier; empty at the ceiling.
    pub escalation_path: Vec<ApproverRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_level: Option<AuthorityLevel>,
}

impl ApprovalStep {
    pub fn is_assignee(&self, person: &str) -> bool {
        self.approver_ids.iter().any(|id| id == person)
    }

    pub fn is_delegate(&self, person: &str) -> bool {
        self.delegation_allowed && self.delegate_ids.iter().any(|id| id == person)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dispatch {
    /// Nothing to send.
    None,
    /// Sent synchronously before routing returns.
    Immediate,
    /// Queued; recipients must be told before the deadline.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub required: bool,
    pub recipients: Vec<ApproverRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub dispatch: Dispatch,
}

impl NotificationPlan {
    pub fn none() -> Self {
        Self {
            required: false,
            recipients: Vec::new(),
            deadline: None,
            dispatch: Dispatch::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationStep {
    pub trigger: EscalationTrigger,
    pub next_level: AuthorityLevel,
}

/// Ordered trigger → target tier pairs for a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPath {
    pub current: AuthorityLevel,
    pub steps: Vec<EscalationStep>,
}

impl EscalationPath {
    pub fn next_for(&self, trigger: EscalationTrigger) -> Option<AuthorityLevel> {
        self.steps
            .iter()
            .find(|s| s.trigger == trigger)
            .map(|s| s.next_level)
    }

    pub fn triggers(&self) -> impl Iterator<Item = EscalationTrigger> + '_ {
        self.steps.iter().map(|s| s.trigger)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineKind {
    NotificationDeadline,
    /// Latest completion of a stage if every earlier stage used its full limit.
    StageDeadline { stage: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConstraint {
    #[serde(flatten)]
    pub kind: TimelineKind,
    pub due_at: DateTime<Utc>,
}

/// Complete routing answer for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRoute {
    pub route_id: String,
    pub decision: Decision,
    /// Level the classifier produced.
    pub classified_level: AuthorityLevel,
    /// Effective level: the stricter of classification and the type's entry,
    /// raised further by escalations.
    pub authority_level: AuthorityLevel,
    pub policy: AuthorityMatrixEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_workflow: Option<ApprovalWorkflow>,
    pub notification_plan: NotificationPlan,
    pub escalation_path: EscalationPath,
    #[serde(default)]
    pub timeline: Vec<TimelineConstraint>,
    pub routed_at: DateTime<Utc>,
    /// Route this one replaced through escalation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
}

impl DecisionRoute {
    pub fn requires_approval(&self) -> bool {
        self.approval_workflow.is_some()
    }

    pub fn deadline_for_stage(&self, stage: usize) -> Option<DateTime<Utc>> {
        self.timeline.iter().find_map(|t| match t.kind {
            TimelineKind::StageDeadline { stage: s } if s == stage => Some(t.due_at),
            _ => None,
        })
    }
}

/// One approver's answer as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub step_id: String,
    pub approver_id: String,
    pub verdict: Verdict,
    pub responded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Makes an approval conditional: it only satisfies the step once every
    /// condition is attested on the decision.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

impl ApprovalResponse {
    /// Conditions of this answer the decision has not attested.
    pub fn unmet_conditions<'a>(
        &'a self,
        decision: &'a Decision,
    ) -> impl Iterator<Item = &'a str> {
        self.conditions
            .iter()
            .map(String::as_str)
            .filter(|c| !decision.has_condition(c))
    }
}

/// Outcome of evaluating approver responses against a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResult {
    pub decision_id: String,
    pub route_id: String,
    pub status: DecisionStatus,
    pub approved: bool,
    pub auto_approved: bool,
    pub reason: String,
    #[serde(default)]
    pub approval_events: Vec<ApprovalEvent>,
    #[serde(default)]
    pub escalations: Vec<EscalationEvent>,
    /// Replacement route when a timeout escalated the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_route: Option<Box<DecisionRoute>>,
    pub evaluated_at: DateTime<Utc>,
}

/// Success-rate aggregate for one authority level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelPerformance {
    pub decisions: usize,
    pub with_outcome: usize,
    pub positive: usize,
    /// `positive / with_outcome`; `None` when no outcome is known yet.
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalytics {
    pub levels: BTreeMap<AuthorityLevel, LevelPerformance>,
    pub total_decisions: usize,
    pub total_with_outcome: usize,
    /// Outcomes whose decision id matched nothing.
    pub orphan_outcomes: usize,
    pub overall_success_rate: Option<f64>,
}

impl PerformanceAnalytics {
    pub fn level(&self, level: AuthorityLevel) -> Option<&LevelPerformance> {
        self.levels.get(&level)
    }
}

/// `start + hours`, saturating instead of overflowing.
pub fn deadline(start: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    start
        .checked_add_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
