use anyhow::{bail, Context, Result};
use jsonschema::Validator;
use serde_json::Value;

use crate::errors::{CheckIssue, CheckReport};
use crate::matrix::entry::AuthorityMatrixEntry;
use crate::matrix::MatrixConfig;
use crate::types::{AuthorityLevel, DecisionType};

const SCHEMA_V10: &str = include_str!("../schema/authority-matrix-v1.0.schema.json");

/// Version string of a matrix document, or "unknown".
pub fn detect_version(data: &Value) -> &'static str {
    match data.get("version").and_then(Value::as_str) {
        Some("1.0") => "1.0",
        _ => "unknown",
    }
}

pub fn validator() -> Result<Validator> {
    let schema: Value =
        serde_json::from_str(SCHEMA_V10).context("embedded schema is invalid JSON")?;
    Validator::new(&schema).map_err(|e| anyhow::anyhow!("schema compilation failed: {e}"))
}

/// Validate a matrix document against the embedded schema.
pub fn validate(data: &Value) -> Result<()> {
    let v = validator()?;
    if v.is_valid(data) {
        return Ok(());
    }
    let mut msgs: Vec<String> = Vec::new();
    for error in v.iter_errors(data) {
        let path = error.instance_path.to_string();
        let loc = if path.is_empty() {
            "(root)".into()
        } else {
            path
        };
        msgs.push(format!("  {loc}: {error}"));
    }
    bail!("validation failed:\n{}", msgs.join("\n"));
}

/// Full check producing a structured report (for `mandate check --json`).
///
/// Errors make the matrix unusable; warnings flag policies that will route
/// but probably not the way the author meant. `strict` fails on warnings too.
pub fn check(data: &Value, file: &str, strict: bool) -> CheckReport {
    let version = detect_version(data).to_string();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Ok(v) = validator() {
        for error in v.iter_errors(data) {
            let path = error.instance_path.to_string();
            errors.push(
                CheckIssue::new("E001", "schema", error.to_string()).at(if path.is_empty() {
                    "$(root)".to_string()
                } else {
                    format!("${path}")
                }),
            );
        }
    }

    // Semantic checks need a typed document; schema errors above already
    // explain why parsing would fail.
    if let Ok(config) = serde_json::from_value::<MatrixConfig>(data.clone()) {
        check_structure(&config, &mut errors, &mut warnings);
        for (i, entry) in config.entries.iter().enumerate() {
            check_entry(entry, i, &mut errors, &mut warnings);
        }
    }

    let pass = errors.is_empty() && (!strict || warnings.is_empty());
    CheckReport {
        file: file.to_string(),
        version,
        pass,
        errors,
        warnings,
    }
}

fn check_structure(
    config: &MatrixConfig,
    errors: &mut Vec<CheckIssue>,
    warnings: &mut Vec<CheckIssue>,
) {
    if !config.thresholds.is_ordered() {
        errors.push(
            CheckIssue::new(
                "E003",
                "thresholds",
                "thresholds must be positive and strictly ascending \
                 (notification < cross_functional < board)",
            )
            .at("$.thresholds"),
        );
    }

    for t in DecisionType::ALL {
        let count = config.entries.iter().filter(|e| e.decision_type == t).count();
        if count > 1 {
            errors.push(
                CheckIssue::new("E002", "coverage", format!("{count} entries for {t}"))
                    .at("$.entries"),
            );
        } else if count == 0 {
            warnings.push(
                CheckIssue::new(
                    "W001",
                    "coverage",
                    format!("no entry for {t}; routing it fails with a configuration error"),
                )
                .at("$.entries"),
            );
        }
    }

    for level in AuthorityLevel::ALL {
        let count = config.levels.iter().filter(|p| p.level == level).count();
        if count > 1 {
            errors.push(
                CheckIssue::new("E007", "levels", format!("{count} level policies for {level}"))
                    .at("$.levels"),
            );
        }
    }
    for (i, policy) in config.levels.iter().enumerate() {
        if policy.approval_required && policy.approvers.is_empty() {
            errors.push(
                CheckIssue::new(
                    "E004",
                    "approvers",
                    format!("{} requires approval but lists no approvers", policy.level),
                )
                .at(format!("$.levels[{i}].approvers")),
            );
        }
    }
}

fn check_entry(
    entry: &AuthorityMatrixEntry,
    i: usize,
    errors: &mut Vec<CheckIssue>,
    warnings: &mut Vec<CheckIssue>,
) {
    let t = entry.decision_type;

    if entry.approval_required && entry.required_approvers.is_empty() {
        errors.push(
            CheckIssue::new(
                "E004",
                "approvers",
                format!("{t} requires approval but lists no approvers"),
            )
            .at(format!("$.entries[{i}].required_approvers")),
        );
    }

    for role in &entry.parallel_approvers {
        if !entry.required_approvers.contains(role) {
            errors.push(
                CheckIssue::new(
                    "E005",
                    "approvers",
                    format!("{t}: parallel approver {role} is not a required approver"),
                )
                .at(format!("$.entries[{i}].parallel_approvers")),
            );
        }
    }

    for role in &entry.optional_approvers {
        if entry.required_approvers.contains(role) {
            errors.push(
                CheckIssue::new(
                    "E006",
                    "approvers",
                    format!("{t}: {role} is listed as both required and optional"),
                )
                .at(format!("$.entries[{i}].optional_approvers")),
            );
        }
    }

    if !entry.approval_required && !entry.required_approvers.is_empty() {
        warnings.push(
            CheckIssue::new(
                "W002",
                "lint",
                format!(
                    "{t}: approvers listed but approval_required is false; they only get notified"
                ),
            )
            .at(format!("$.entries[{i}].required_approvers")),
        );
    }

    if entry.notification_required
        && entry.required_approvers.is_empty()
        && entry.stakeholder_roles.is_empty()
    {
        warnings.push(
            CheckIssue::new(
                "W003",
                "lint",
                format!("{t}: notification required but nobody to notify"),
            )
            .at(format!("$.entries[{i}].stakeholder_roles")),
        );
    }

    if entry.approval_required && entry.time_limit_hours == 0 {
        warnings.push(
            CheckIssue::new(
                "W004",
                "lint",
                format!("{t}: approval steps with a 0 hour limit time out immediately"),
            )
            .at(format!("$.entries[{i}].time_limit_hours")),
        );
    }

    for (j, rule) in entry.delegation_rules.iter().enumerate() {
        if rule.conditions.is_empty() {
            warnings.push(
                CheckIssue::new(
                    "W005",
                    "delegation",
                    format!("{t}: {} may delegate unconditionally", rule.delegate),
                )
                .at(format!("$.entries[{i}].delegation_rules[{j}]")),
            );
        }
    }

    if entry.escalation_triggers.is_empty() {
        warnings.push(
            CheckIssue::new("W006", "lint", format!("{t}: no escalation triggers besides timeout"))
                .at(format!("$.entries[{i}].escalation_triggers")),
        );
    }
}
