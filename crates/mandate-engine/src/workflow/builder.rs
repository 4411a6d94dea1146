use chrono::{DateTime, Utc};
use uuid::Uuid;

use mandate_core::decision::Decision;
use mandate_core::errors::AuthorityError;
use mandate_core::matrix::entry::AuthorityMatrixEntry;
use mandate_core::matrix::AuthorityMatrix;
use mandate_core::route::{ApprovalStage, ApprovalStep, ApprovalWorkflow};
use mandate_core::traits::ApproverDirectory;
use mandate_core::types::ApproverRole;

/// Build the approval workflow for a decision under `policy`.
///
/// Returns `None` when the policy needs no approval. Every required role must
/// resolve to at least one person; the first that does not aborts the build
/// with `UnassignedApprover`. Optional roles nobody holds are left out.
pub fn build_workflow(
    decision: &Decision,
    policy: &AuthorityMatrixEntry,
    matrix: &AuthorityMatrix,
    directory: &dyn ApproverDirectory,
    now: DateTime<Utc>,
) -> Result<Option<ApprovalWorkflow>, AuthorityError> {
    if !policy.approval_required {
        return Ok(None);
    }

    let escalation_level = policy.level.next();
    let escalation_path = escalation_level
        .map(|l| matrix.level_policy(l).approvers.clone())
        .unwrap_or_default();

    let mut stages: Vec<ApprovalStage> = Vec::new();
    let mut seen: Vec<ApproverRole> = Vec::new();
    // Index of the stage still accepting parallel roles.
    let mut open_parallel: Option<usize> = None;

    for &role in &policy.required_approvers {
        if seen.contains(&role) {
            continue;
        }
        seen.push(role);

        let approver_ids = directory.assignees(role);
        if approver_ids.is_empty() {
            return Err(AuthorityError::UnassignedApprover {
                decision_id: decision.id.clone(),
                role,
            });
        }

        let delegate_ids = delegates_for(decision, policy, directory, role, &approver_ids);
        let parallel = policy.is_parallel(role);
        let index = match open_parallel {
            Some(i) if parallel => i,
            _ => {
                stages.push(ApprovalStage {
                    index: stages.len(),
                    parallel: false,
                    steps: Vec::new(),
                });
                stages.len() - 1
            }
        };
        open_parallel = parallel.then_some(index);

        stages[index].steps.push(ApprovalStep {
            step_id: step_id(index, role),
            approver_role: role,
            approver_ids,
            required: true,
            time_limit_hours: policy.time_limit_hours,
            delegation_allowed: !delegate_ids.is_empty(),
            delegate_ids,
            escalation_path: escalation_path.clone(),
            escalation_level,
        });
    }

    // Advisory sign-offs ride along with the final required stage.
    if let Some(last) = stages.len().checked_sub(1) {
        for &role in &policy.optional_approvers {
            if seen.contains(&role) {
                continue;
            }
            seen.push(role);
            let approver_ids = directory.assignees(role);
            if approver_ids.is_empty() {
                tracing::debug!(
                    decision_id = %decision.id,
                    %role,
                    "optional approver unassigned, skipped"
                );
                continue;
            }
            stages[last].steps.push(ApprovalStep {
                step_id: step_id(last, role),
                approver_role: role,
                approver_ids,
                required: false,
                time_limit_hours: policy.time_limit_hours,
                delegation_allowed: false,
                delegate_ids: Vec::new(),
                escalation_path: Vec::new(),
                escalation_level: None,
            });
        }
    }

    for stage in &mut stages {
        stage.parallel = stage.steps.len() > 1;
    }

    Ok(Some(ApprovalWorkflow {
        id: Uuid::new_v4().to_string(),
        decision_id: decision.id.clone(),
        level: policy.level,
        stages,
        created_at: now,
    }))
}

/// Stable step id: `s<stage>-<role>`, e.g. `s0-ceo`.
pub fn step_id(stage: usize, role: ApproverRole) -> String {
    format!("s{stage}-{}", role.as_str().to_ascii_lowercase())
}

/// People allowed to answer for `role`: holders of a delegate role whose rule
/// conditions the decision attests to in full.
fn delegates_for(
    decision: &Decision,
    policy: &AuthorityMatrixEntry,
    directory: &dyn ApproverDirectory,
    role: ApproverRole,
    assigned: &[String],
) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for rule in policy.delegations_for(role) {
        if !rule.conditions.iter().all(|c| decision.has_condition(c)) {
            continue;
        }
        for id in directory.assignees(rule.delegate) {
            if !assigned.contains(&id) && !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandate_core::traits::Assignments;
    use mandate_core::types::{AuthorityLevel, DecisionType, RiskLevel};

    fn everyone() -> Assignments {
        Assignments::default()
            .assign(ApproverRole::Ceo, "ceo")
            .assign(ApproverRole::BoardChair, "chair")
            .assign(ApproverRole::BoardMember, "member")
            .assign(ApproverRole::CSuitePeer, "cfo")
            .assign(ApproverRole::FunctionalHead, "head")
            .assign(ApproverRole::LegalCounsel, "counsel")
            .assign(ApproverRole::ComplianceOfficer, "compliance")
            .assign(ApproverRole::AuditCommittee, "audit")
            .assign(ApproverRole::RegulatoryLiaison, "liaison")
    }

    fn build(
        t: DecisionType,
        dir: &Assignments,
    ) -> Result<Option<ApprovalWorkflow>, AuthorityError> {
        let m = AuthorityMatrix::default();
        let d = Decision::new("d-1", t, "because").with_risk(RiskLevel::Low);
        build_workflow(&d, m.lookup(t).unwrap(), &m, dir, Utc::now())
    }

    #[test]
    fn no_approval_means_no_workflow() {
        assert!(build(DecisionType::TechnologyImplementation, &everyone())
            .unwrap()
            .is_none());
        assert!(build(DecisionType::TechnologyInvestmentMedium, &everyone())
            .unwrap()
            .is_none());
    }

    #[test]
    fn major_acquisition_chain() {
        let wf = build(DecisionType::MajorAcquisition, &everyone()).unwrap().unwrap();
        assert_eq!(wf.level, AuthorityLevel::BoardEscalation);
        assert_eq!(
            wf.required_roles(),
            vec![ApproverRole::Ceo, ApproverRole::BoardChair, ApproverRole::AuditCommittee]
        );
        // CEO alone, then chair + audit committee in parallel (+ optional counsel)
        assert_eq!(wf.stages.len(), 2);
        assert!(!wf.stages[0].parallel);
        assert!(wf.stages[1].parallel);
        assert_eq!(wf.stages[1].steps.len(), 3);
        assert!(wf.steps().all(|s| s.time_limit_hours == 504));

        let counsel = wf.step("s1-legal_counsel").unwrap();
        assert!(!counsel.required);

        // escalation path is the shareholder tier's approver set
        let ceo = wf.step("s0-ceo").unwrap();
        assert_eq!(ceo.escalation_level, Some(AuthorityLevel::ShareholderApproval));
        assert_eq!(
            ceo.escalation_path,
            vec![
                ApproverRole::BoardChair,
                ApproverRole::AuditCommittee,
                ApproverRole::RegulatoryLiaison
            ]
        );
    }

    #[test]
    fn unassigned_required_role_fails() {
        let dir = Assignments::default().assign(ApproverRole::Ceo, "ceo");
        let err = build(DecisionType::MajorAcquisition, &dir).unwrap_err();
        match err {
            AuthorityError::UnassignedApprover { decision_id, role } => {
                assert_eq!(decision_id, "d-1");
                assert_eq!(role, ApproverRole::BoardChair);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unassigned_optional_role_is_skipped() {
        let mut dir = everyone();
        dir.0.remove(&ApproverRole::LegalCounsel);
        let wf = build(DecisionType::MajorAcquisition, &dir).unwrap().unwrap();
        assert!(wf.step("s1-legal_counsel").is_none());
        assert_eq!(wf.stages[1].steps.len(), 2);
    }

    #[test]
    fn sequential_roles_get_own_stages() {
        let wf = build(DecisionType::CorporateGovernanceChange, &everyone())
            .unwrap()
            .unwrap();
        assert_eq!(wf.stages.len(), 3);
        assert!(wf.stages.iter().all(|s| !s.parallel));
        assert!(wf.steps().all(|s| s.escalation_path.is_empty()));
        assert!(wf.steps().all(|s| s.escalation_level.is_none()));
    }

    #[test]
    fn delegation_requires_attested_conditions() {
        let m = AuthorityMatrix::default();
        let t = DecisionType::StrategicInitiativeChange;
        let dir = everyone().assign(ApproverRole::Ceo, "deputy");

        let plain = Decision::new("d-1", t, "r");
        let wf = build_workflow(&plain, m.lookup(t).unwrap(), &m, &dir, Utc::now())
            .unwrap()
            .unwrap();
        assert!(!wf.step("s1-c_suite_peer").unwrap().delegation_allowed);

        let mut attested = plain.clone();
        attested.attested_conditions = vec!["budget_within_plan".into()];
        let wf = build_workflow(&attested, m.lookup(t).unwrap(), &m, &dir, Utc::now())
            .unwrap()
            .unwrap();
        let peer = wf.step("s1-c_suite_peer").unwrap();
        assert!(peer.delegation_allowed);
        assert_eq!(peer.delegate_ids, vec!["ceo".to_string(), "deputy".to_string()]);
        // the CEO step itself has no delegate
        assert!(!wf.step("s0-ceo").unwrap().delegation_allowed);
    }

    #[test]
    fn workflow_ids_are_unique() {
        let a = build(DecisionType::TechnologyInvestmentLarge, &everyone()).unwrap().unwrap();
        let b = build(DecisionType::TechnologyInvestmentLarge, &everyone()).unwrap().unwrap();
        assert_ne!(a.id, b.id);
    }
}
