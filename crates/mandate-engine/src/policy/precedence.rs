use mandate_core::matrix::entry::{AuthorityMatrixEntry, LevelPolicy};
use mandate_core::types::{ApproverRole, AuthorityLevel};

/// Effective level of a route: the stricter of what the classifier produced
/// and what the decision type's entry demands. Never below either.
pub fn effective_level(entry: &AuthorityMatrixEntry, classified: AuthorityLevel) -> AuthorityLevel {
    classified.stricter(entry.level)
}

/// Resolve the policy a route at `level` runs under.
///
/// At or below the entry's own level the entry is used as-is. Above it the
/// entry is merged with the tier's policy:
/// - approval / notification = OR
/// - approvers = entry chain, then tier approvers not already on it
/// - parallel and stakeholder roles = union
/// - time limit = the tier's (entry's when the tier has none)
/// - optional approvers that became required are dropped
pub fn resolve_policy(
    entry: &AuthorityMatrixEntry,
    level: AuthorityLevel,
    tier: &LevelPolicy,
) -> AuthorityMatrixEntry {
    if level <= entry.level {
        return entry.clone();
    }

    let mut merged = entry.clone();
    merged.level = level;
    merged.approval_required |= tier.approval_required;
    merged.notification_required |= tier.notification_required;
    if tier.time_limit_hours > 0 {
        merged.time_limit_hours = tier.time_limit_hours;
    }

    if tier.approval_required {
        union_into(&mut merged.required_approvers, &tier.approvers);
        union_into(&mut merged.parallel_approvers, &tier.parallel_approvers);
    }
    union_into(&mut merged.stakeholder_roles, &tier.stakeholder_roles);

    let required = merged.required_approvers.clone();
    merged.optional_approvers.retain(|r| !required.contains(r));
    merged.stakeholder_roles.retain(|r| !required.contains(r));
    merged
}

fn union_into(into: &mut Vec<ApproverRole>, from: &[ApproverRole]) {
    for role in from {
        if !into.contains(role) {
            into.push(*role);
        }
    }
}
