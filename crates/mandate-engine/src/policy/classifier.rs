use mandate_core::decision::Decision;
use mandate_core::matrix::thresholds::ImpactThresholds;
use mandate_core::matrix::AuthorityMatrix;
use mandate_core::traits::DecisionClassifier;
use mandate_core::types::{AuthorityLevel, RiskLevel};

/// Threshold-based classifier.
///
/// Rules are evaluated most demanding first and the first match wins:
/// 1. Shareholder approval required (explicit or implied by type) → SHAREHOLDER_APPROVAL
/// 2. Board approval required, impact ≥ board threshold, CRITICAL risk, or
///    regulatory implications → BOARD_ESCALATION
/// 3. Cross-functional impact, impact ≥ cross-functional threshold, or HIGH
///    risk → CROSS_FUNCTIONAL
/// 4. Impact ≥ notification threshold, moderate stakeholder impact, strategic
///    implications, or risk other than an explicit LOW → POST_NOTIFICATION
/// 5. Otherwise → FULL_AUTONOMY
///
/// Every threshold comparison is inclusive, so a boundary value lands in the
/// higher tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdClassifier {
    thresholds: ImpactThresholds,
}

impl ThresholdClassifier {
    pub fn new(thresholds: ImpactThresholds) -> Self {
        Self { thresholds }
    }

    pub fn for_matrix(matrix: &AuthorityMatrix) -> Self {
        Self::new(*matrix.thresholds())
    }

    /// Level plus the rule that produced it.
    pub fn explain(&self, decision: &Decision) -> (AuthorityLevel, &'static str) {
        let t = &self.thresholds;
        let impact = decision.impact();
        let risk = decision.risk_level;

        if decision.requires_shareholder_approval {
            return (AuthorityLevel::ShareholderApproval, "shareholder approval requested");
        }
        if decision.decision_type.implies_shareholder_approval() {
            return (
                AuthorityLevel::ShareholderApproval,
                "decision type requires shareholder approval",
            );
        }

        if decision.requires_board_approval {
            return (AuthorityLevel::BoardEscalation, "board approval requested");
        }
        if impact >= t.board {
            return (AuthorityLevel::BoardEscalation, "impact at or above board threshold");
        }
        if risk == Some(RiskLevel::Critical) {
            return (AuthorityLevel::BoardEscalation, "critical risk");
        }
        if decision.has_regulatory_exposure() {
            return (AuthorityLevel::BoardEscalation, "regulatory implications");
        }

        if decision.has_cross_functional_impact {
            return (AuthorityLevel::CrossFunctional, "cross-functional impact");
        }
        if impact >= t.cross_functional {
            return (
                AuthorityLevel::CrossFunctional,
                "impact at or above cross-functional threshold",
            );
        }
        if risk == Some(RiskLevel::High) {
            return (AuthorityLevel::CrossFunctional, "high risk");
        }

        if impact >= t.notification {
            return (
                AuthorityLevel::PostNotification,
                "impact at or above notification threshold",
            );
        }
        if decision.has_moderate_stakeholder_impact {
            return (AuthorityLevel::PostNotification, "moderate stakeholder impact");
        }
        if decision.has_strategic_implications {
            return (AuthorityLevel::PostNotification, "strategic implications");
        }
        match risk {
            Some(RiskLevel::Low) => (AuthorityLevel::FullAutonomy, "within autonomous limits"),
            Some(_) => (AuthorityLevel::PostNotification, "medium risk"),
            None => (AuthorityLevel::PostNotification, "no risk assessment"),
        }
    }
}

impl DecisionClassifier for ThresholdClassifier {
    fn classify(&self, decision: &Decision) -> AuthorityLevel {
        self.explain(decision).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandate_core::types::DecisionType;

    fn classify(d: &Decision) -> AuthorityLevel {
        ThresholdClassifier::default().classify(d)
    }

    fn low(t: DecisionType, impact: i64) -> Decision {
        Decision::new("d", t, "because").with_impact(impact).with_risk(RiskLevel::Low)
    }

    #[test]
    fn small_low_risk_is_autonomous() {
        let d = low(DecisionType::TechnologyImplementation, 100_000);
        assert_eq!(classify(&d), AuthorityLevel::FullAutonomy);
    }

    #[test]
    fn medium_investment_needs_notification() {
        let d = low(DecisionType::TechnologyInvestmentMedium, 1_500_000);
        assert_eq!(classify(&d), AuthorityLevel::PostNotification);
    }

    #[test]
    fn large_acquisition_goes_to_board() {
        let d = low(DecisionType::MajorAcquisition, 15_000_000);
        assert_eq!(classify(&d), AuthorityLevel::BoardEscalation);
    }

    #[test]
    fn governance_change_goes_to_shareholders() {
        let mut d = low(DecisionType::CorporateGovernanceChange, 0);
        d.requires_shareholder_approval = true;
        assert_eq!(classify(&d), AuthorityLevel::ShareholderApproval);

        // implied by type even without the flag
        let d = low(DecisionType::CorporateGovernanceChange, 0);
        assert_eq!(classify(&d), AuthorityLevel::ShareholderApproval);
    }

    #[test]
    fn boundaries_belong_to_higher_tier() {
        let t = ImpactThresholds::default();
        let cases = [
            (t.notification - 1, AuthorityLevel::FullAutonomy),
            (t.notification, AuthorityLevel::PostNotification),
            (t.cross_functional - 1, AuthorityLevel::PostNotification),
            (t.cross_functional, AuthorityLevel::CrossFunctional),
            (t.board - 1, AuthorityLevel::CrossFunctional),
            (t.board, AuthorityLevel::BoardEscalation),
        ];
        for (impact, want) in cases {
            let d = low(DecisionType::TechnologyImplementation, impact);
            assert_eq!(classify(&d), want, "impact {impact}");
        }
    }

    #[test]
    fn missing_risk_is_not_low() {
        let d = Decision::new("d", DecisionType::TechnologyImplementation, "r").with_impact(1_000);
        assert_eq!(classify(&d), AuthorityLevel::PostNotification);
        assert_eq!(
            ThresholdClassifier::default().explain(&d).1,
            "no risk assessment"
        );
    }

    #[test]
    fn missing_impact_reads_as_zero() {
        let d = Decision::new("d", DecisionType::TechnologyImplementation, "r")
            .with_risk(RiskLevel::Low);
        assert_eq!(classify(&d), AuthorityLevel::FullAutonomy);
    }

    #[test]
    fn risk_drives_level() {
        let base = low(DecisionType::TechnologyImplementation, 0);
        let at = |r| classify(&base.clone().with_risk(r));
        assert_eq!(at(RiskLevel::Low), AuthorityLevel::FullAutonomy);
        assert_eq!(at(RiskLevel::Medium), AuthorityLevel::PostNotification);
        assert_eq!(at(RiskLevel::High), AuthorityLevel::CrossFunctional);
        assert_eq!(at(RiskLevel::Critical), AuthorityLevel::BoardEscalation);
    }

    #[test]
    fn regulatory_type_implies_board() {
        let d = low(DecisionType::RegulatoryCompliance, 0);
        assert_eq!(classify(&d), AuthorityLevel::BoardEscalation);
    }

    #[test]
    fn impact_is_monotonic() {
        let impacts = [
            i64::MIN,
            -5_000_000,
            -1,
            0,
            499_999,
            500_000,
            1_999_999,
            2_000_000,
            9_999_999,
            10_000_000,
            i64::MAX,
        ];
        for risk in [None, Some(RiskLevel::Low), Some(RiskLevel::High)] {
            let mut prev = AuthorityLevel::FullAutonomy;
            for impact in impacts {
                let mut d = low(DecisionType::StrategicInitiativeChange, impact);
                d.risk_level = risk;
                let level = classify(&d);
                assert!(level >= prev, "{impact} {risk:?}: {level} < {prev}");
                prev = level;
            }
        }
    }

    #[test]
    fn flags_never_lower_the_level() {
        let base = low(DecisionType::TechnologyImplementation, 600_000);
        let base_level = classify(&base);
        let mut flagged = base.clone();
        flagged.has_strategic_implications = true;
        flagged.has_cross_functional_impact = true;
        assert!(classify(&flagged) >= base_level);
    }

    #[test]
    fn custom_thresholds_apply() {
        let c = ThresholdClassifier::new(ImpactThresholds {
            notification: 10,
            cross_functional: 20,
            board: 30,
        });
        let d = low(DecisionType::TechnologyImplementation, 25);
        assert_eq!(c.classify(&d), AuthorityLevel::CrossFunctional);
    }
}
