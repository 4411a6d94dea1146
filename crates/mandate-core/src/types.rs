#![allow(clippy::doc_markdown)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Governance tier, ordered by required oversight.
///
/// The derived `Ord` follows declaration order, so
/// `FullAutonomy < PostNotification < ... < ShareholderApproval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityLevel {
    FullAutonomy,
    PostNotification,
    CrossFunctional,
    BoardEscalation,
    ShareholderApproval,
}

impl AuthorityLevel {
    pub const ALL: [AuthorityLevel; 5] = [
        AuthorityLevel::FullAutonomy,
        AuthorityLevel::PostNotification,
        AuthorityLevel::CrossFunctional,
        AuthorityLevel::BoardEscalation,
        AuthorityLevel::ShareholderApproval,
    ];

    /// Numeric tier, 1 (no approval) through 5 (shareholder approval).
    pub fn rank(self) -> u8 {
        match self {
            AuthorityLevel::FullAutonomy => 1,
            AuthorityLevel::PostNotification => 2,
            AuthorityLevel::CrossFunctional => 3,
            AuthorityLevel::BoardEscalation => 4,
            AuthorityLevel::ShareholderApproval => 5,
        }
    }

    /// The next stricter tier, or `None` at the ceiling.
    pub fn next(self) -> Option<Self> {
        match self {
            AuthorityLevel::FullAutonomy => Some(AuthorityLevel::PostNotification),
            AuthorityLevel::PostNotification => Some(AuthorityLevel::CrossFunctional),
            AuthorityLevel::CrossFunctional => Some(AuthorityLevel::BoardEscalation),
            AuthorityLevel::BoardEscalation => Some(AuthorityLevel::ShareholderApproval),
            AuthorityLevel::ShareholderApproval => None,
        }
    }

    /// One tier up, saturating at `ShareholderApproval`.
    pub fn escalated(self) -> Self {
        self.next().unwrap_or(self)
    }

    pub fn is_ceiling(self) -> bool {
        self.next().is_none()
    }

    /// Returns the stricter of two levels.
    pub fn stricter(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthorityLevel::FullAutonomy => "FULL_AUTONOMY",
            AuthorityLevel::PostNotification => "POST_NOTIFICATION",
            AuthorityLevel::CrossFunctional => "CROSS_FUNCTIONAL",
            AuthorityLevel::BoardEscalation => "BOARD_ESCALATION",
            AuthorityLevel::ShareholderApproval => "SHAREHOLDER_APPROVAL",
        }
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative risk attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Business-action category. Each one has exactly one matrix entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    TechnologyImplementation,
    TechnologyInvestmentMedium,
    TechnologyInvestmentLarge,
    OperationalProcessImprovement,
    OrganizationalStructureChange,
    SecurityPolicyEnforcement,
    StrategicInitiativeChange,
    CorporateStrategyChange,
    MajorAcquisition,
    CorporateGovernanceChange,
    RegulatoryCompliance,
    CapitalStructureChange,
    MergerOfEquals,
}

impl DecisionType {
    pub const ALL: [DecisionType; 13] = [
        DecisionType::TechnologyImplementation,
        DecisionType::TechnologyInvestmentMedium,
        DecisionType::TechnologyInvestmentLarge,
        DecisionType::OperationalProcessImprovement,
        DecisionType::OrganizationalStructureChange,
        DecisionType::SecurityPolicyEnforcement,
        DecisionType::StrategicInitiativeChange,
        DecisionType::CorporateStrategyChange,
        DecisionType::MajorAcquisition,
        DecisionType::CorporateGovernanceChange,
        DecisionType::RegulatoryCompliance,
        DecisionType::CapitalStructureChange,
        DecisionType::MergerOfEquals,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionType::TechnologyImplementation => "TECHNOLOGY_IMPLEMENTATION",
            DecisionType::TechnologyInvestmentMedium => "TECHNOLOGY_INVESTMENT_MEDIUM",
            DecisionType::TechnologyInvestmentLarge => "TECHNOLOGY_INVESTMENT_LARGE",
            DecisionType::OperationalProcessImprovement => "OPERATIONAL_PROCESS_IMPROVEMENT",
            DecisionType::OrganizationalStructureChange => "ORGANIZATIONAL_STRUCTURE_CHANGE",
            DecisionType::SecurityPolicyEnforcement => "SECURITY_POLICY_ENFORCEMENT",
            DecisionType::StrategicInitiativeChange => "STRATEGIC_INITIATIVE_CHANGE",
            DecisionType::CorporateStrategyChange => "CORPORATE_STRATEGY_CHANGE",
            DecisionType::MajorAcquisition => "MAJOR_ACQUISITION",
            DecisionType::CorporateGovernanceChange => "CORPORATE_GOVERNANCE_CHANGE",
            DecisionType::RegulatoryCompliance => "REGULATORY_COMPLIANCE",
            DecisionType::CapitalStructureChange => "CAPITAL_STRUCTURE_CHANGE",
            DecisionType::MergerOfEquals => "MERGER_OF_EQUALS",
        }
    }

    /// Types that always carry regulatory implications.
    pub fn implies_regulatory(self) -> bool {
        matches!(self, DecisionType::RegulatoryCompliance)
    }

    /// Types that always go to shareholders.
    pub fn implies_shareholder_approval(self) -> bool {
        matches!(
            self,
            DecisionType::CorporateGovernanceChange
                | DecisionType::CapitalStructureChange
                | DecisionType::MergerOfEquals
        )
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown decision type: {0}")]
pub struct UnknownDecisionType(pub String);

impl FromStr for DecisionType {
    type Err = UnknownDecisionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        DecisionType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| UnknownDecisionType(s.to_string()))
    }
}

/// Condition that forces a decision one tier upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationTrigger {
    RiskThresholdExceeded,
    StakeholderObjection,
    PerformanceImpact,
    RegulatoryImpact,
    BudgetImpact,
    StrategicDeviation,
    EmployeeImpact,
    CrossFunctionalConflict,
    ResourceConstraint,
    FinancialImpact,
    MarketImpact,
    RegulatoryReview,
    RegulatoryRequirement,
    /// A required approval step passed its deadline.
    ApprovalTimeout,
}

impl EscalationTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            EscalationTrigger::RiskThresholdExceeded => "RISK_THRESHOLD_EXCEEDED",
            EscalationTrigger::StakeholderObjection => "STAKEHOLDER_OBJECTION",
            EscalationTrigger::PerformanceImpact => "PERFORMANCE_IMPACT",
            EscalationTrigger::RegulatoryImpact => "REGULATORY_IMPACT",
            EscalationTrigger::BudgetImpact => "BUDGET_IMPACT",
            EscalationTrigger::StrategicDeviation => "STRATEGIC_DEVIATION",
            EscalationTrigger::EmployeeImpact => "EMPLOYEE_IMPACT",
            EscalationTrigger::CrossFunctionalConflict => "CROSS_FUNCTIONAL_CONFLICT",
            EscalationTrigger::ResourceConstraint => "RESOURCE_CONSTRAINT",
            EscalationTrigger::FinancialImpact => "FINANCIAL_IMPACT",
            EscalationTrigger::MarketImpact => "MARKET_IMPACT",
            EscalationTrigger::RegulatoryReview => "REGULATORY_REVIEW",
            EscalationTrigger::RegulatoryRequirement => "REGULATORY_REQUIREMENT",
            EscalationTrigger::ApprovalTimeout => "APPROVAL_TIMEOUT",
        }
    }
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationTrigger {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        serde_json::from_value(serde_json::Value::String(wanted))
    }
}

/// Role that can sign off on (or be notified about) a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverRole {
    Ceo,
    BoardChair,
    BoardMember,
    CSuitePeer,
    FunctionalHead,
    LegalCounsel,
    ComplianceOfficer,
    AuditCommittee,
    RegulatoryLiaison,
}

impl ApproverRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ApproverRole::Ceo => "CEO",
            ApproverRole::BoardChair => "BOARD_CHAIR",
            ApproverRole::BoardMember => "BOARD_MEMBER",
            ApproverRole::CSuitePeer => "C_SUITE_PEER",
            ApproverRole::FunctionalHead => "FUNCTIONAL_HEAD",
            ApproverRole::LegalCounsel => "LEGAL_COUNSEL",
            ApproverRole::ComplianceOfficer => "COMPLIANCE_OFFICER",
            ApproverRole::AuditCommittee => "AUDIT_COMMITTEE",
            ApproverRole::RegulatoryLiaison => "REGULATORY_LIAISON",
        }
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a routed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl DecisionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DecisionStatus::Pending)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionStatus::Pending => "PENDING",
            DecisionStatus::Approved => "APPROVED",
            DecisionStatus::Rejected => "REJECTED",
            DecisionStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// An approver's answer to an approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approve,
    Reject,
}

/// Audit event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventType {
    DecisionRouted,
    NotificationSent,
    ApprovalRecorded,
    Escalation,
    StatusChange,
    OutcomeLinked,
}

impl AuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventType::DecisionRouted => "DecisionRouted",
            AuditEventType::NotificationSent => "NotificationSent",
            AuditEventType::ApprovalRecorded => "ApprovalRecorded",
            AuditEventType::Escalation => "Escalation",
            AuditEventType::StatusChange => "StatusChange",
            AuditEventType::OutcomeLinked => "OutcomeLinked",
        }
    }
}
