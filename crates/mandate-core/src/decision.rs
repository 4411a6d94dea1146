use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AuthorityError;
use crate::types::{DecisionType, RiskLevel};

/// A proposed action submitted for governance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,

    #[serde(rename = "type")]
    pub decision_type: DecisionType,

    /// Estimated financial impact in whole currency units. `None` is treated as 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_impact: Option<i64>,

    /// `None` means no risk assessment was supplied; never treated as LOW.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,

    #[serde(default)]
    pub has_regulatory_implications: bool,

    #[serde(default)]
    pub has_cross_functional_impact: bool,

    #[serde(default)]
    pub requires_board_approval: bool,

    #[serde(default)]
    pub requires_shareholder_approval: bool,

    #[serde(default)]
    pub has_moderate_stakeholder_impact: bool,

    #[serde(default)]
    pub has_strategic_implications: bool,

    pub rationale: String,

    /// Conditions the submitter attests to (matched against delegation rules).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attested_conditions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(
        id: impl Into<String>,
        decision_type: DecisionType,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            decision_type,
            financial_impact: None,
            risk_level: None,
            has_regulatory_implications: false,
            has_cross_functional_impact: false,
            requires_board_approval: false,
            requires_shareholder_approval: false,
            has_moderate_stakeholder_impact: false,
            has_strategic_implications: false,
            rationale: rationale.into(),
            attested_conditions: Vec::new(),
            submitted_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_impact(mut self, amount: i64) -> Self {
        self.financial_impact = Some(amount);
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    /// Financial impact with a missing estimate read as zero.
    pub fn impact(&self) -> i64 {
        self.financial_impact.unwrap_or(0)
    }

    pub fn needs_shareholder_approval(&self) -> bool {
        self.requires_shareholder_approval || self.decision_type.implies_shareholder_approval()
    }

    pub fn has_regulatory_exposure(&self) -> bool {
        self.has_regulatory_implications || self.decision_type.implies_regulatory()
    }

    pub fn has_condition(&self, condition: &str) -> bool {
        self.attested_conditions.iter().any(|c| c == condition)
    }

    /// Reject decisions missing required fields before classification.
    pub fn validate(&self) -> Result<(), AuthorityError> {
        if self.id.trim().is_empty() {
            return Err(AuthorityError::Validation {
                decision_id: self.id.clone(),
                field: "id",
                reason: "must not be empty".into(),
            });
        }
        if self.rationale.trim().is_empty() {
            return Err(AuthorityError::Validation {
                decision_id: self.id.clone(),
                field: "rationale",
                reason: "must not be empty".into(),
            });
        }
        if let Some(c) = self.attested_conditions.iter().find(|c| c.trim().is_empty()) {
            return Err(AuthorityError::Validation {
                decision_id: self.id.clone(),
                field: "attested_conditions",
                reason: format!("blank condition {c:?}"),
            });
        }
        Ok(())
    }
}

/// Realized business result of a decision, linked by decision id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessOutcome {
    pub decision_id: String,
    pub positive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_impact: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
