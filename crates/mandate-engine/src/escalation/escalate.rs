use chrono::{DateTime, Utc};

use mandate_core::errors::AuthorityError;
use mandate_core::matrix::AuthorityMatrix;
use mandate_core::route::DecisionRoute;
use mandate_core::state::EscalationEvent;
use mandate_core::traits::ApproverDirectory;
use mandate_core::types::EscalationTrigger;

use crate::policy::precedence::resolve_policy;
use crate::routing::compose_route;

/// Result of firing a trigger.
#[derive(Debug, Clone)]
pub enum Escalation {
    /// The decision moved one tier up; `route` replaces the old one.
    Raised {
        route: Box<DecisionRoute>,
        event: EscalationEvent,
    },
    /// Already at the ceiling; the trigger is recorded, the route stands.
    Saturated { event: EscalationEvent },
}

impl Escalation {
    pub fn event(&self) -> &EscalationEvent {
        match self {
            Escalation::Raised { event, .. } | Escalation::Saturated { event } => event,
        }
    }
}

/// Fire `trigger` on a route.
///
/// Moves exactly one tier up and rebuilds the workflow, notification plan
/// and timeline under the merged policy of the new tier. The level never
/// goes down. At the ceiling an ordinary trigger is recorded without effect,
/// while an approval timeout has nowhere left to go and fails with
/// `EscalationExhausted`.
pub fn escalate(
    route: &DecisionRoute,
    trigger: EscalationTrigger,
    reason: &str,
    matrix: &AuthorityMatrix,
    directory: &dyn ApproverDirectory,
    now: DateTime<Utc>,
) -> Result<Escalation, AuthorityError> {
    let decision_id = &route.decision.id;
    if route.escalation_path.next_for(trigger).is_none() {
        return Err(AuthorityError::UnknownTrigger {
            decision_id: decision_id.clone(),
            trigger,
        });
    }

    let from_level = route.authority_level;
    let Some(to_level) = from_level.next() else {
        if trigger == EscalationTrigger::ApprovalTimeout {
            return Err(AuthorityError::EscalationExhausted {
                decision_id: decision_id.clone(),
                trigger,
                level: from_level,
            });
        }
        return Ok(Escalation::Saturated {
            event: EscalationEvent {
                decision_id: decision_id.clone(),
                trigger,
                from_level,
                to_level: from_level,
                at: now,
                reason: reason.to_string(),
            },
        });
    };

    let policy = resolve_policy(&route.policy, to_level, matrix.level_policy(to_level));
    let raised = compose_route(
        route.decision.clone(),
        route.classified_level,
        policy,
        matrix,
        directory,
        now,
        Some(route.route_id.clone()),
    )?;

    Ok(Escalation::Raised {
        route: Box::new(raised),
        event: EscalationEvent {
            decision_id: decision_id.clone(),
            trigger,
            from_level,
            to_level,
            at: now,
            reason: reason.to_string(),
        },
    })
}
