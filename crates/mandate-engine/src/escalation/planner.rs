use chrono::{DateTime, Utc};

use mandate_core::decision::Decision;
use mandate_core::matrix::entry::AuthorityMatrixEntry;
use mandate_core::route::{
    deadline, ApprovalWorkflow, Dispatch, EscalationPath, EscalationStep, NotificationPlan,
    TimelineConstraint, TimelineKind,
};
use mandate_core::types::{ApproverRole, EscalationTrigger};

/// Plan who hears about a decision and how it can escalate.
///
/// Recipients are the required approvers followed by stakeholder roles, in
/// matrix order without repeats; decisions with regulatory exposure also
/// reach the compliance officer. A zero time limit means the notice goes out
/// before routing returns.
pub fn plan(
    decision: &Decision,
    policy: &AuthorityMatrixEntry,
    routed_at: DateTime<Utc>,
) -> (NotificationPlan, EscalationPath) {
    (notification_plan(decision, policy, routed_at), escalation_path(policy))
}

fn notification_plan(
    decision: &Decision,
    policy: &AuthorityMatrixEntry,
    routed_at: DateTime<Utc>,
) -> NotificationPlan {
    if !policy.notification_required {
        return NotificationPlan::none();
    }

    let mut recipients: Vec<ApproverRole> = Vec::new();
    let regulatory = decision
        .has_regulatory_exposure()
        .then_some(ApproverRole::ComplianceOfficer);
    for role in policy
        .required_approvers
        .iter()
        .chain(policy.stakeholder_roles.iter())
        .copied()
        .chain(regulatory)
    {
        if !recipients.contains(&role) {
            recipients.push(role);
        }
    }

    let dispatch = if policy.time_limit_hours == 0 {
        Dispatch::Immediate
    } else {
        Dispatch::Deferred
    };

    NotificationPlan {
        required: true,
        recipients,
        deadline: Some(deadline(routed_at, policy.time_limit_hours)),
        dispatch,
    }
}

/// Trigger → next tier pairs: the entry's triggers in matrix order, then
/// `APPROVAL_TIMEOUT`. At the ceiling every trigger points at the ceiling.
pub fn escalation_path(policy: &AuthorityMatrixEntry) -> EscalationPath {
    let next_level = policy.level.escalated();
    let mut steps: Vec<EscalationStep> = Vec::new();
    for &trigger in policy
        .escalation_triggers
        .iter()
        .chain(std::iter::once(&EscalationTrigger::ApprovalTimeout))
    {
        if steps.iter().any(|s| s.trigger == trigger) {
            continue;
        }
        steps.push(EscalationStep { trigger, next_level });
    }
    EscalationPath {
        current: policy.level,
        steps,
    }
}

/// Deadlines a route commits to: the notification deadline, then the latest
/// completion of each approval stage if every earlier stage used its full
/// limit.
pub fn timeline(
    notification: &NotificationPlan,
    workflow: Option<&ApprovalWorkflow>,
    routed_at: DateTime<Utc>,
) -> Vec<TimelineConstraint> {
    let mut out = Vec::new();
    if let Some(due_at) = notification.deadline {
        out.push(TimelineConstraint {
            kind: TimelineKind::NotificationDeadline,
            due_at,
        });
    }
    if let Some(wf) = workflow {
        let mut at = routed_at;
        for stage in &wf.stages {
            at = deadline(at, stage.time_limit_hours());
            out.push(TimelineConstraint {
                kind: TimelineKind::StageDeadline { stage: stage.index },
                due_at: at,
            });
        }
    }
    out
}
