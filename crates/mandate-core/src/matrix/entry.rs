use serde::{Deserialize, Serialize};

use crate::types::{ApproverRole, AuthorityLevel, DecisionType, EscalationTrigger};

/// Governance policy for one decision type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityMatrixEntry {
    pub decision_type: DecisionType,
    pub level: AuthorityLevel,

    #[serde(default)]
    pub description: String,

    pub approval_required: bool,
    pub notification_required: bool,

    /// Hours allowed for each approval step and for notification delivery.
    #[serde(default)]
    pub time_limit_hours: u32,

    #[serde(default)]
    pub escalation_triggers: Vec<EscalationTrigger>,

    /// Ordered sign-off chain.
    #[serde(default)]
    pub required_approvers: Vec<ApproverRole>,

    /// Roles whose consecutive runs in `required_approvers` approve in parallel.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel_approvers: Vec<ApproverRole>,

    /// Advisory sign-offs appended after the required chain; never block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_approvers: Vec<ApproverRole>,

    /// Roles told about the decision without being asked to approve it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stakeholder_roles: Vec<ApproverRole>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegation_rules: Vec<DelegationRule>,
}

impl AuthorityMatrixEntry {
    pub fn is_parallel(&self, role: ApproverRole) -> bool {
        self.parallel_approvers.contains(&role)
    }

    /// Delegation rules that let someone stand in for `role`.
    pub fn delegations_for(&self, role: ApproverRole) -> impl Iterator<Item = &DelegationRule> {
        self.delegation_rules.iter().filter(move |r| r.covers(role))
    }
}

/// Lets a delegate role sign on behalf of others when every condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRule {
    pub delegate: ApproverRole,

    /// Roles the delegate may stand in for. Empty means any role on the chain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_behalf_of: Vec<ApproverRole>,

    pub conditions: Vec<String>,
}

impl DelegationRule {
    pub fn covers(&self, role: ApproverRole) -> bool {
        role != self.delegate && (self.on_behalf_of.is_empty() || self.on_behalf_of.contains(&role))
    }
}

/// Default policy of an authority tier.
///
/// Used when a decision classifies stricter than its type's entry, and as the
/// approver set a timed-out step escalates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPolicy {
    pub level: AuthorityLevel,
    pub approval_required: bool,
    pub notification_required: bool,
    #[serde(default)]
    pub time_limit_hours: u32,
    #[serde(default)]
    pub approvers: Vec<ApproverRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel_approvers: Vec<ApproverRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stakeholder_roles: Vec<ApproverRole>,
}
