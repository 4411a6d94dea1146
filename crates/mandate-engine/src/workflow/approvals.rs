use chrono::{DateTime, Utc};

use mandate_core::errors::AuthorityError;
use mandate_core::route::{deadline, ApprovalResponse, ApprovalStep, DecisionRoute};
use mandate_core::state::ApprovalEvent;
use mandate_core::types::Verdict;

/// Where a route stands given the responses received so far.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The route carries no workflow.
    AutoApproved,
    Approved {
        events: Vec<ApprovalEvent>,
    },
    Rejected {
        events: Vec<ApprovalEvent>,
        step_id: String,
        approver_id: String,
    },
    Pending {
        events: Vec<ApprovalEvent>,
        stage: usize,
        due_at: DateTime<Utc>,
        /// Conditions attached to approvals in the open stage that the
        /// decision has not attested yet.
        unmet_conditions: Vec<String>,
    },
    /// A required step of the open stage passed its deadline unanswered.
    TimedOut {
        events: Vec<ApprovalEvent>,
        stage: usize,
        step_id: String,
        due_at: DateTime<Utc>,
    },
}

impl Evaluation {
    pub fn events(&self) -> &[ApprovalEvent] {
        match self {
            Evaluation::AutoApproved => &[],
            Evaluation::Approved { events }
            | Evaluation::Rejected { events, .. }
            | Evaluation::Pending { events, .. }
            | Evaluation::TimedOut { events, .. } => events,
        }
    }
}

/// Evaluate approver responses against a route's workflow.
///
/// Stages run in order and a stage opens when the previous one completes.
/// A required step is satisfied by an on-time approve from an assignee or an
/// authorized delegate; any on-time reject of a required step rejects the
/// decision. A conditional approve only counts once the decision attests all
/// of its conditions. Optional steps never block. Responses after their stage
/// deadline are ignored.
///
/// Responses for unknown steps or from people with no standing on the step
/// are rejected as invalid input.
pub fn evaluate(
    route: &DecisionRoute,
    responses: &[ApprovalResponse],
    now: DateTime<Utc>,
) -> Result<Evaluation, AuthorityError> {
    let Some(workflow) = &route.approval_workflow else {
        return Ok(Evaluation::AutoApproved);
    };
    let decision_id = &route.decision.id;

    let mut ordered: Vec<&ApprovalResponse> = responses.iter().collect();
    ordered.sort_by(|a, b| {
        a.responded_at
            .cmp(&b.responded_at)
            .then_with(|| a.step_id.cmp(&b.step_id))
            .then_with(|| a.approver_id.cmp(&b.approver_id))
    });

    let mut valid: Vec<(&ApprovalResponse, &ApprovalStep)> = Vec::new();
    for r in ordered {
        let step = workflow.step(&r.step_id).ok_or_else(|| AuthorityError::Validation {
            decision_id: decision_id.clone(),
            field: "step_id",
            reason: format!("no step {} in workflow {}", r.step_id, workflow.id),
        })?;
        if !step.is_assignee(&r.approver_id) && !step.is_delegate(&r.approver_id) {
            return Err(AuthorityError::Validation {
                decision_id: decision_id.clone(),
                field: "approver_id",
                reason: format!("{} may not answer step {}", r.approver_id, r.step_id),
            });
        }
        valid.push((r, step));
    }

    let mut events: Vec<ApprovalEvent> = Vec::new();
    let mut opened_at = route.routed_at;

    for stage in &workflow.stages {
        let due_at = deadline(opened_at, stage.time_limit_hours());
        let on_time = |at: DateTime<Utc>| at <= due_at;

        for (r, step) in valid.iter().filter(|(r, s)| {
            stage.steps.iter().any(|x| x.step_id == s.step_id) && on_time(r.responded_at)
        }) {
            events.push(event(r, step));
        }

        if let Some((r, _)) = valid.iter().find(|(r, s)| {
            s.required
                && r.verdict == Verdict::Reject
                && on_time(r.responded_at)
                && stage.steps.iter().any(|x| x.step_id == s.step_id)
        }) {
            return Ok(Evaluation::Rejected {
                events,
                step_id: r.step_id.clone(),
                approver_id: r.approver_id.clone(),
            });
        }

        let mut completed_at = opened_at;
        for step in stage.steps.iter().filter(|s| s.required) {
            let approval = valid.iter().find(|(r, s)| {
                s.step_id == step.step_id
                    && r.verdict == Verdict::Approve
                    && on_time(r.responded_at)
                    && r.unmet_conditions(&route.decision).next().is_none()
            });
            match approval {
                Some((r, _)) => completed_at = completed_at.max(r.responded_at),
                None if now > due_at => {
                    return Ok(Evaluation::TimedOut {
                        events,
                        stage: stage.index,
                        step_id: step.step_id.clone(),
                        due_at,
                    });
                }
                None => {
                    let mut unmet_conditions: Vec<String> = Vec::new();
                    for (r, _) in valid.iter().filter(|(r, s)| {
                        r.verdict == Verdict::Approve
                            && on_time(r.responded_at)
                            && stage.steps.iter().any(|x| x.step_id == s.step_id)
                    }) {
                        for c in r.unmet_conditions(&route.decision) {
                            if !unmet_conditions.iter().any(|u| u == c) {
                                unmet_conditions.push(c.to_string());
                            }
                        }
                    }
                    return Ok(Evaluation::Pending {
                        events,
                        stage: stage.index,
                        due_at,
                        unmet_conditions,
                    });
                }
            }
        }
        opened_at = completed_at;
    }

    Ok(Evaluation::Approved { events })
}

fn event(r: &ApprovalResponse, step: &ApprovalStep) -> ApprovalEvent {
    ApprovalEvent {
        step_id: step.step_id.clone(),
        role: step.approver_role,
        approver_id: r.approver_id.clone(),
        verdict: r.verdict,
        delegated: !step.is_assignee(&r.approver_id),
        at: r.responded_at,
        comment: r.comment.clone(),
        conditions: r.conditions.clone(),
    }
}
