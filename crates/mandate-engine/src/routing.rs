use chrono::{DateTime, Utc};
use uuid::Uuid;

use mandate_core::decision::Decision;
use mandate_core::errors::AuthorityError;
use mandate_core::matrix::entry::AuthorityMatrixEntry;
use mandate_core::matrix::AuthorityMatrix;
use mandate_core::route::DecisionRoute;
use mandate_core::traits::{ApproverDirectory, DecisionClassifier};
use mandate_core::types::AuthorityLevel;

use crate::escalation::planner;
use crate::policy::precedence::{effective_level, resolve_policy};
use crate::workflow::builder::build_workflow;

/// Classify, look up and assemble a route. Pure apart from the fresh ids.
///
/// Fails on invalid input, a missing matrix entry or an unassigned required
/// approver; never returns a partial route.
pub fn route(
    decision: Decision,
    classifier: &dyn DecisionClassifier,
    matrix: &AuthorityMatrix,
    directory: &dyn ApproverDirectory,
    now: DateTime<Utc>,
) -> Result<DecisionRoute, AuthorityError> {
    decision.validate()?;
    let classified = classifier.classify(&decision);
    let entry = matrix.lookup(decision.decision_type)?;
    let level = effective_level(entry, classified);
    let policy = resolve_policy(entry, level, matrix.level_policy(level));
    compose_route(decision, classified, policy, matrix, directory, now, None)
}

/// Assemble a route for a decision whose policy is already resolved.
pub fn compose_route(
    decision: Decision,
    classified_level: AuthorityLevel,
    policy: AuthorityMatrixEntry,
    matrix: &AuthorityMatrix,
    directory: &dyn ApproverDirectory,
    now: DateTime<Utc>,
    supersedes: Option<String>,
) -> Result<DecisionRoute, AuthorityError> {
    let approval_workflow = build_workflow(&decision, &policy, matrix, directory, now)?;
    let (notification_plan, escalation_path) = planner::plan(&decision, &policy, now);
    let timeline = planner::timeline(&notification_plan, approval_workflow.as_ref(), now);

    Ok(DecisionRoute {
        route_id: Uuid::new_v4().to_string(),
        decision,
        classified_level,
        authority_level: policy.level,
        policy,
        approval_workflow,
        notification_plan,
        escalation_path,
        timeline,
        routed_at: now,
        supersedes,
    })
}
