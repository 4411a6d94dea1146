use std::sync::Arc;

use chrono::{DateTime, Utc};

use mandate_core::decision::{BusinessOutcome, Decision};
use mandate_core::errors::{AuditError, AuthorityError};
use mandate_core::matrix::AuthorityMatrix;
use mandate_core::route::{
    ApprovalResponse, ApprovalResult, DecisionRoute, Dispatch, PerformanceAnalytics,
};
use mandate_core::state::{DecisionAudit, EscalationEvent};
use mandate_core::traits::{
    ApproverDirectory, AuditEntry, AuditSink, DecisionClassifier, DiscardNotifications,
    Notification, NotificationSink,
};
use mandate_core::types::{
    ApproverRole, AuditEventType, AuthorityLevel, DecisionStatus, EscalationTrigger, Verdict,
};

use crate::escalation::escalate::{self, Escalation};
use crate::outcomes::track_outcomes;
use crate::policy::classifier::ThresholdClassifier;
use crate::policy::precedence::effective_level;
use crate::routing;
use crate::state::ledger::AuditLedger;
use crate::workflow::approvals::{self, Evaluation};

/// Routing service: classification, approvals, escalation and audit for
/// many decisions at once.
///
/// `Send + Sync`; share it behind an `Arc`. The matrix is never mutated and
/// each decision's audit trail is locked on its own.
pub struct DecisionRouter {
    matrix: Arc<AuthorityMatrix>,
    classifier: Box<dyn DecisionClassifier + Send + Sync>,
    directory: Arc<dyn ApproverDirectory + Send + Sync>,
    notifier: Arc<dyn NotificationSink + Send + Sync>,
    ledger: AuditLedger,
    audit_sink: Option<Arc<dyn AuditSink + Send + Sync>>,
}

impl DecisionRouter {
    /// Router with the threshold classifier configured by the matrix and no
    /// notification delivery.
    pub fn new(
        matrix: Arc<AuthorityMatrix>,
        directory: Arc<dyn ApproverDirectory + Send + Sync>,
    ) -> Self {
        let classifier = ThresholdClassifier::for_matrix(&matrix);
        Self {
            matrix,
            classifier: Box::new(classifier),
            directory,
            notifier: Arc::new(DiscardNotifications),
            ledger: AuditLedger::new(),
            audit_sink: None,
        }
    }

    pub fn with_classifier(
        mut self,
        classifier: impl DecisionClassifier + Send + Sync + 'static,
    ) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink + Send + Sync>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink + Send + Sync>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn matrix(&self) -> &AuthorityMatrix {
        &self.matrix
    }

    pub fn route_decision(&self, decision: Decision) -> Result<DecisionRoute, AuthorityError> {
        self.route_decision_at(decision, Utc::now())
    }

    /// Route a decision and open its audit trail.
    ///
    /// Immediate notifications are delivered before the trail is opened, so a
    /// delivery failure leaves no trace of the decision. A decision id is
    /// routed once: resubmitting a pending decision fails with `Validation`,
    /// a closed one with `AlreadyFinal`.
    pub fn route_decision_at(
        &self,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<DecisionRoute, AuthorityError> {
        if let Some(audit) = self.ledger.snapshot(&decision.id) {
            return Err(resubmitted(&audit));
        }
        let route = routing::route(
            decision,
            self.classifier.as_ref(),
            &self.matrix,
            self.directory.as_ref(),
            now,
        )?;
        let notified = self.dispatch(&route)?;

        let id = &route.decision.id;
        self.ledger
            .open(id, &route.route_id, route.authority_level, now)
            .map_err(|e| match e {
                AuditError::AlreadyOpen { .. } | AuditError::Sealed(_) => self
                    .ledger
                    .snapshot(id)
                    .map_or(AuthorityError::Audit(e), |audit| resubmitted(&audit)),
                e => AuthorityError::Audit(e),
            })?;
        self.log(
            AuditEntry::new(
                AuditEventType::DecisionRouted,
                id,
                format!("route {} ({})", route.route_id, route.decision.decision_type),
            )
            .at_level(route.authority_level),
        )?;
        if notified > 0 {
            self.log(AuditEntry::new(
                AuditEventType::NotificationSent,
                id,
                format!("{notified} recipient role(s) notified"),
            ))?;
        }

        tracing::info!(
            decision = %id,
            route = %route.route_id,
            classified = %route.classified_level,
            level = %route.authority_level,
            approval = route.requires_approval(),
            "decision routed"
        );
        Ok(route)
    }

    /// Evaluate approver responses and record the result.
    ///
    /// `route` must be the decision's current route; one replaced by an
    /// escalation fails with `Superseded`. A timed-out required step
    /// escalates the decision one tier; the result then stays PENDING and
    /// carries the replacement route. At the ceiling the decision expires and
    /// `EscalationExhausted` is returned. Final results are announced to the
    /// approvers and stakeholders before the trail is sealed.
    pub fn process_approvals(
        &self,
        route: &DecisionRoute,
        responses: &[ApprovalResponse],
        now: DateTime<Utc>,
    ) -> Result<ApprovalResult, AuthorityError> {
        self.ensure_trail(route)?;
        let id = route.decision.id.as_str();
        let evaluation = approvals::evaluate(route, responses, now)?;

        let fresh = self.ledger.with(id, |audit| {
            let mut fresh = Vec::new();
            for event in evaluation.events() {
                if audit.record_approval(event.clone())? {
                    fresh.push(event.clone());
                }
            }
            Ok(fresh)
        })?;
        for event in &fresh {
            let verdict = match event.verdict {
                Verdict::Approve => "approved",
                Verdict::Reject => "rejected",
            };
            let mut detail = format!("{} {verdict} {}", event.approver_id, event.step_id);
            if !event.conditions.is_empty() {
                detail.push_str(&format!(" subject to {}", event.conditions.join(", ")));
            }
            self.log(AuditEntry::new(AuditEventType::ApprovalRecorded, id, detail))?;
        }

        let mut result = ApprovalResult {
            decision_id: id.to_string(),
            route_id: route.route_id.clone(),
            status: DecisionStatus::Pending,
            approved: false,
            auto_approved: false,
            reason: String::new(),
            approval_events: evaluation.events().to_vec(),
            escalations: Vec::new(),
            escalated_route: None,
            evaluated_at: now,
        };

        match evaluation {
            Evaluation::AutoApproved => {
                result.status = DecisionStatus::Approved;
                result.approved = true;
                result.auto_approved = true;
                result.reason = format!("no approval required at {}", route.authority_level);
            }
            Evaluation::Approved { .. } => {
                result.status = DecisionStatus::Approved;
                result.approved = true;
                result.reason = "all required approvals received".to_string();
            }
            Evaluation::Rejected {
                step_id,
                approver_id,
                ..
            } => {
                result.status = DecisionStatus::Rejected;
                result.reason = format!("rejected by {approver_id} on {step_id}");
            }
            Evaluation::Pending {
                stage,
                due_at,
                unmet_conditions,
                ..
            } => {
                result.reason = format!("awaiting stage {stage} (due {})", due_at.to_rfc3339());
                if !unmet_conditions.is_empty() {
                    result.reason.push_str(&format!(
                        "; conditions not attested: {}",
                        unmet_conditions.join(", ")
                    ));
                }
            }
            Evaluation::TimedOut {
                stage,
                step_id,
                due_at,
                ..
            } => {
                tracing::warn!(
                    decision = %id,
                    step = %step_id,
                    due = %due_at,
                    "approval timed out"
                );
                let reason = format!("step {step_id} unanswered at {}", due_at.to_rfc3339());
                let escalation =
                    self.escalate(route, EscalationTrigger::ApprovalTimeout, &reason, now)?;
                result.escalations.push(escalation.event().clone());
                result.reason = format!("stage {stage} timed out; {reason}");
                if let Escalation::Raised { route: raised, .. } = escalation {
                    result.route_id = raised.route_id.clone();
                    result.escalated_route = Some(raised);
                }
            }
        }

        if result.status.is_terminal() {
            self.announce(route, &result)?;
            self.close(id, result.status, now)?;
        }

        tracing::debug!(decision = %id, status = %result.status, "approvals processed");
        Ok(result)
    }

    /// Fire an escalation trigger on a routed decision.
    pub fn escalate(
        &self,
        route: &DecisionRoute,
        trigger: EscalationTrigger,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Escalation, AuthorityError> {
        self.ensure_trail(route)?;
        let id = route.decision.id.as_str();

        let escalation = match escalate::escalate(
            route,
            trigger,
            reason,
            &self.matrix,
            self.directory.as_ref(),
            now,
        ) {
            Ok(e) => e,
            Err(e @ AuthorityError::EscalationExhausted { .. }) => {
                tracing::warn!(decision = %id, %trigger, "escalation exhausted, decision expired");
                self.close(id, DecisionStatus::Expired, now)?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let raised_route = match &escalation {
            Escalation::Raised { route: raised, .. } => Some(raised.route_id.as_str()),
            Escalation::Saturated { .. } => None,
        };
        self.record_escalation(escalation.event(), raised_route)?;
        if let Escalation::Raised { route: raised, .. } = &escalation {
            let notified = self.dispatch(raised)?;
            if notified > 0 {
                self.log(AuditEntry::new(
                    AuditEventType::NotificationSent,
                    id,
                    format!("{notified} recipient role(s) notified after escalation"),
                ))?;
            }
        }

        let event = escalation.event();
        tracing::info!(
            decision = %id,
            %trigger,
            from = %event.from_level,
            to = %event.to_level,
            saturated = event.is_saturated(),
            "decision escalated"
        );
        Ok(escalation)
    }

    /// Link a realized outcome to a routed decision. Allowed once, also after
    /// the decision closed.
    pub fn record_outcome(&self, outcome: BusinessOutcome) -> Result<(), AuthorityError> {
        let id = outcome.decision_id.clone();
        let positive = outcome.positive;
        self.ledger.with(&id, |audit| audit.link_outcome(outcome))?;
        self.log(AuditEntry::new(
            AuditEventType::OutcomeLinked,
            &id,
            if positive { "positive" } else { "negative" },
        ))?;
        Ok(())
    }

    /// Success rates per level. Decisions this router has seen are counted at
    /// their recorded level, others at the level routing would give them.
    pub fn track_decision_outcomes(
        &self,
        decisions: &[Decision],
        outcomes: &[BusinessOutcome],
    ) -> PerformanceAnalytics {
        track_outcomes(decisions, outcomes, |d| {
            self.ledger
                .snapshot(&d.id)
                .map(|audit| audit.authority_level)
                .unwrap_or_else(|| self.level_for(d))
        })
    }

    pub fn audit(&self, decision_id: &str) -> Option<DecisionAudit> {
        self.ledger.snapshot(decision_id)
    }

    pub fn audits(&self) -> Vec<DecisionAudit> {
        self.ledger.all()
    }

    fn level_for(&self, decision: &Decision) -> AuthorityLevel {
        let classified = self.classifier.classify(decision);
        match self.matrix.lookup(decision.decision_type) {
            Ok(entry) => effective_level(entry, classified),
            Err(_) => classified,
        }
    }

    /// Check `route` may act on its decision's trail, opening the trail for
    /// a route this router has not seen.
    fn ensure_trail(&self, route: &DecisionRoute) -> Result<(), AuthorityError> {
        let id = &route.decision.id;
        let Some(audit) = self.ledger.snapshot(id) else {
            return match self
                .ledger
                .open(id, &route.route_id, route.authority_level, route.routed_at)
            {
                Err(AuditError::AlreadyOpen { .. }) => self.ensure_trail(route),
                other => Ok(other?),
            };
        };
        if audit.is_sealed() {
            return Err(AuthorityError::AlreadyFinal {
                decision_id: id.clone(),
                status: audit.status.to_string(),
            });
        }
        if !audit.accepts_route(&route.route_id, route.authority_level) {
            return Err(AuthorityError::Superseded {
                decision_id: id.clone(),
                route_id: route.route_id.clone(),
                current: audit.route_id,
            });
        }
        Ok(())
    }

    fn record_escalation(
        &self,
        event: &EscalationEvent,
        raised_route: Option<&str>,
    ) -> Result<(), AuthorityError> {
        self.ledger.with(&event.decision_id, |audit| {
            audit.record_escalation(event.clone(), raised_route)
        })?;
        self.log(
            AuditEntry::new(
                AuditEventType::Escalation,
                &event.decision_id,
                format!(
                    "{}: {} -> {} ({})",
                    event.trigger, event.from_level, event.to_level, event.reason
                ),
            )
            .at_level(event.to_level),
        )
    }

    fn close(
        &self,
        decision_id: &str,
        status: DecisionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), AuthorityError> {
        self.ledger.with(decision_id, |audit| audit.close(status, at))?;
        self.log(AuditEntry::new(AuditEventType::StatusChange, decision_id, status.to_string()))
    }

    /// Deliver immediate notifications. Returns the number of roles notified.
    fn dispatch(&self, route: &DecisionRoute) -> Result<usize, AuthorityError> {
        let plan = &route.notification_plan;
        if plan.dispatch != Dispatch::Immediate {
            return Ok(0);
        }
        let message = format!(
            "{} decision {} routed at {}",
            route.decision.decision_type, route.decision.id, route.authority_level
        );
        self.notify_roles(route, &plan.recipients, plan.deadline, &message)
    }

    /// Tell the workflow's approvers and the plan's recipients how the
    /// decision ended.
    fn announce(
        &self,
        route: &DecisionRoute,
        result: &ApprovalResult,
    ) -> Result<(), AuthorityError> {
        let mut roles: Vec<ApproverRole> = route
            .approval_workflow
            .as_ref()
            .map(|wf| wf.required_roles())
            .unwrap_or_default();
        for &role in &route.notification_plan.recipients {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        let message = format!(
            "{} decision {} {}: {}",
            route.decision.decision_type, route.decision.id, result.status, result.reason
        );
        let notified = self.notify_roles(route, &roles, None, &message)?;
        if notified > 0 {
            self.log(AuditEntry::new(
                AuditEventType::NotificationSent,
                &route.decision.id,
                format!("{notified} recipient role(s) told the decision is {}", result.status),
            ))?;
        }
        Ok(())
    }

    fn notify_roles(
        &self,
        route: &DecisionRoute,
        roles: &[ApproverRole],
        deadline: Option<DateTime<Utc>>,
        message: &str,
    ) -> Result<usize, AuthorityError> {
        let mut sent = 0;
        for &role in roles {
            let recipients = self.directory.assignees(role);
            if recipients.is_empty() {
                tracing::warn!(decision = %route.decision.id, %role, "no one to notify");
                continue;
            }
            self.notifier.notify(&Notification {
                decision_id: route.decision.id.clone(),
                role,
                recipients,
                level: route.authority_level,
                deadline,
                message: message.to_string(),
            })?;
            sent += 1;
        }
        Ok(sent)
    }

    fn log(&self, entry: AuditEntry) -> Result<(), AuthorityError> {
        if let Some(sink) = &self.audit_sink {
            sink.log(&entry)?;
        }
        Ok(())
    }
}

fn resubmitted(audit: &DecisionAudit) -> AuthorityError {
    if audit.is_sealed() {
        return AuthorityError::AlreadyFinal {
            decision_id: audit.decision_id.clone(),
            status: audit.status.to_string(),
        };
    }
    AuthorityError::Validation {
        decision_id: audit.decision_id.clone(),
        field: "id",
        reason: format!("already routed as {} and still pending", audit.route_id),
    }
}
