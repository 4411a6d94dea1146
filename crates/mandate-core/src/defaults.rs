//! Built-in authority matrix.
//!
//! Mirrors the five-tier executive authority table. Written as data so that
//! `mandate init` can dump it as a starting configuration.

use crate::matrix::entry::{AuthorityMatrixEntry, DelegationRule, LevelPolicy};
use crate::matrix::thresholds::ImpactThresholds;
use crate::matrix::{AuthorityMatrix, MatrixConfig};
use crate::types::{ApproverRole, AuthorityLevel, DecisionType, EscalationTrigger};

use ApproverRole::*;
use AuthorityLevel::*;
use EscalationTrigger::*;

/// Per-tier default policies, indexed by `rank() - 1`.
pub fn level_policies() -> [LevelPolicy; 5] {
    [
        LevelPolicy {
            level: FullAutonomy,
            approval_required: false,
            notification_required: false,
            time_limit_hours: 0,
            approvers: vec![],
            parallel_approvers: vec![],
            stakeholder_roles: vec![],
        },
        LevelPolicy {
            level: PostNotification,
            approval_required: false,
            notification_required: true,
            time_limit_hours: 48,
            approvers: vec![],
            parallel_approvers: vec![],
            stakeholder_roles: vec![Ceo],
        },
        LevelPolicy {
            level: CrossFunctional,
            approval_required: true,
            notification_required: true,
            time_limit_hours: 72,
            approvers: vec![Ceo, CSuitePeer],
            parallel_approvers: vec![],
            stakeholder_roles: vec![],
        },
        LevelPolicy {
            level: BoardEscalation,
            approval_required: true,
            notification_required: true,
            time_limit_hours: 336,
            approvers: vec![Ceo, BoardChair, BoardMember],
            parallel_approvers: vec![BoardChair, BoardMember],
            stakeholder_roles: vec![],
        },
        LevelPolicy {
            level: ShareholderApproval,
            approval_required: true,
            notification_required: true,
            time_limit_hours: 2160,
            approvers: vec![BoardChair, AuditCommittee, RegulatoryLiaison],
            parallel_approvers: vec![],
            stakeholder_roles: vec![Ceo],
        },
    ]
}

struct Row {
    decision_type: DecisionType,
    level: AuthorityLevel,
    description: &'static str,
    approval: bool,
    notify: bool,
    hours: u32,
    triggers: &'static [EscalationTrigger],
    approvers: &'static [ApproverRole],
}

fn entry(row: Row) -> AuthorityMatrixEntry {
    AuthorityMatrixEntry {
        decision_type: row.decision_type,
        level: row.level,
        description: row.description.to_string(),
        approval_required: row.approval,
        notification_required: row.notify,
        time_limit_hours: row.hours,
        escalation_triggers: row.triggers.to_vec(),
        required_approvers: row.approvers.to_vec(),
        parallel_approvers: vec![],
        optional_approvers: vec![],
        stakeholder_roles: vec![],
        delegation_rules: vec![],
    }
}

/// Built-in entries, one per decision type.
pub fn entries() -> Vec<AuthorityMatrixEntry> {
    vec![
        // Level 1: full autonomy
        entry(Row {
            decision_type: DecisionType::TechnologyImplementation,
            level: FullAutonomy,
            description: "Technology implementation decisions under $500K",
            approval: false,
            notify: false,
            hours: 0,
            triggers: &[RiskThresholdExceeded, StakeholderObjection],
            approvers: &[],
        }),
        entry(Row {
            decision_type: DecisionType::OperationalProcessImprovement,
            level: FullAutonomy,
            description: "Operational process improvements and optimizations",
            approval: false,
            notify: false,
            hours: 0,
            triggers: &[PerformanceImpact],
            approvers: &[],
        }),
        AuthorityMatrixEntry {
            stakeholder_roles: vec![ComplianceOfficer],
            ..entry(Row {
                decision_type: DecisionType::SecurityPolicyEnforcement,
                level: FullAutonomy,
                description: "Security policy enforcement and incident response",
                approval: false,
                notify: true,
                hours: 24,
                triggers: &[RegulatoryImpact],
                approvers: &[],
            })
        },
        // Level 2: post-notification
        AuthorityMatrixEntry {
            stakeholder_roles: vec![Ceo, CSuitePeer],
            delegation_rules: vec![DelegationRule {
                delegate: Ceo,
                on_behalf_of: vec![],
                conditions: vec!["strategic_alignment".into()],
            }],
            ..entry(Row {
                decision_type: DecisionType::TechnologyInvestmentMedium,
                level: PostNotification,
                description: "Technology investments $500K-$2M",
                approval: false,
                notify: true,
                hours: 48,
                triggers: &[BudgetImpact, StrategicDeviation],
                approvers: &[],
            })
        },
        AuthorityMatrixEntry {
            stakeholder_roles: vec![Ceo, FunctionalHead],
            ..entry(Row {
                decision_type: DecisionType::OrganizationalStructureChange,
                level: PostNotification,
                description: "Organizational structure and reporting changes",
                approval: false,
                notify: true,
                hours: 24,
                triggers: &[EmployeeImpact],
                approvers: &[],
            })
        },
        // Level 3: cross-functional
        AuthorityMatrixEntry {
            optional_approvers: vec![FunctionalHead],
            delegation_rules: vec![DelegationRule {
                delegate: Ceo,
                on_behalf_of: vec![CSuitePeer],
                conditions: vec!["budget_within_plan".into()],
            }],
            ..entry(Row {
                decision_type: DecisionType::StrategicInitiativeChange,
                level: CrossFunctional,
                description: "Major strategic initiative changes and new programs",
                approval: true,
                notify: true,
                hours: 72,
                triggers: &[CrossFunctionalConflict, ResourceConstraint],
                approvers: &[Ceo, CSuitePeer],
            })
        },
        entry(Row {
            decision_type: DecisionType::TechnologyInvestmentLarge,
            level: CrossFunctional,
            description: "Technology investments over $2M",
            approval: true,
            notify: true,
            hours: 168,
            triggers: &[FinancialImpact],
            approvers: &[Ceo, CSuitePeer],
        }),
        // Level 4: board escalation
        AuthorityMatrixEntry {
            parallel_approvers: vec![BoardChair, BoardMember],
            ..entry(Row {
                decision_type: DecisionType::CorporateStrategyChange,
                level: BoardEscalation,
                description: "Fundamental corporate strategy changes",
                approval: true,
                notify: true,
                hours: 336,
                triggers: &[MarketImpact],
                approvers: &[Ceo, BoardChair, BoardMember],
            })
        },
        AuthorityMatrixEntry {
            parallel_approvers: vec![BoardChair, AuditCommittee],
            optional_approvers: vec![LegalCounsel],
            ..entry(Row {
                decision_type: DecisionType::MajorAcquisition,
                level: BoardEscalation,
                description: "Major acquisitions and partnerships over $10M",
                approval: true,
                notify: true,
                hours: 504,
                triggers: &[RegulatoryReview],
                approvers: &[Ceo, BoardChair, AuditCommittee],
            })
        },
        AuthorityMatrixEntry {
            stakeholder_roles: vec![AuditCommittee],
            ..entry(Row {
                decision_type: DecisionType::RegulatoryCompliance,
                level: BoardEscalation,
                description: "Regulatory compliance commitments and remediation",
                approval: true,
                notify: true,
                hours: 336,
                triggers: &[RegulatoryReview, RegulatoryRequirement],
                approvers: &[Ceo, LegalCounsel, ComplianceOfficer],
            })
        },
        // Level 5: shareholder approval
        entry(Row {
            decision_type: DecisionType::CorporateGovernanceChange,
            level: ShareholderApproval,
            description: "Fundamental corporate governance changes",
            approval: true,
            notify: true,
            hours: 2160,
            triggers: &[RegulatoryRequirement],
            approvers: &[BoardChair, AuditCommittee, RegulatoryLiaison],
        }),
        entry(Row {
            decision_type: DecisionType::CapitalStructureChange,
            level: ShareholderApproval,
            description: "Share issuance, buybacks and other capital structure changes",
            approval: true,
            notify: true,
            hours: 2160,
            triggers: &[RegulatoryRequirement, FinancialImpact],
            approvers: &[BoardChair, AuditCommittee, RegulatoryLiaison],
        }),
        entry(Row {
            decision_type: DecisionType::MergerOfEquals,
            level: ShareholderApproval,
            description: "Mergers of equals",
            approval: true,
            notify: true,
            hours: 2160,
            triggers: &[RegulatoryReview, MarketImpact],
            approvers: &[Ceo, BoardChair, AuditCommittee, RegulatoryLiaison],
        }),
    ]
}

pub fn config() -> MatrixConfig {
    MatrixConfig {
        schema_uri: None,
        version: "1.0".to_string(),
        thresholds: ImpactThresholds::default(),
        levels: level_policies().to_vec(),
        entries: entries(),
    }
}

/// The built-in matrix.
pub fn matrix() -> AuthorityMatrix {
    AuthorityMatrix::from_parts(entries(), level_policies(), ImpactThresholds::default())
}
