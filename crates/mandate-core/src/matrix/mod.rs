pub mod entry;
pub mod thresholds;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use self::entry::{AuthorityMatrixEntry, LevelPolicy};
use self::thresholds::ImpactThresholds;
use crate::errors::AuthorityError;
use crate::types::{AuthorityLevel, DecisionType};

/// Workspace default location of the matrix configuration.
pub const WORKSPACE_MATRIX: &str = ".mandate/matrix.json";

/// On-disk authority matrix document (v1.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,

    pub version: String,

    #[serde(default)]
    pub thresholds: ImpactThresholds,

    /// Per-tier defaults. Omitted tiers fall back to the built-in policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<LevelPolicy>,

    pub entries: Vec<AuthorityMatrixEntry>,
}

/// Immutable decision-type → policy table, built once at startup.
///
/// Safe to share across threads behind an `Arc`; nothing mutates it after
/// construction.
#[derive(Debug, Clone)]
pub struct AuthorityMatrix {
    entries: BTreeMap<DecisionType, AuthorityMatrixEntry>,
    levels: [LevelPolicy; 5],
    thresholds: ImpactThresholds,
}

impl AuthorityMatrix {
    /// Build from a configuration document.
    ///
    /// Duplicates and unordered thresholds are rejected, as is any policy that
    /// requires approval from nobody. Missing decision types are allowed here;
    /// they fail at lookup time.
    pub fn from_config(config: MatrixConfig) -> Result<Self, AuthorityError> {
        if !config.thresholds.is_ordered() {
            return Err(AuthorityError::InvalidMatrix(format!(
                "thresholds must be positive and ascending (got {} / {} / {})",
                config.thresholds.notification,
                config.thresholds.cross_functional,
                config.thresholds.board
            )));
        }

        let mut levels = crate::defaults::level_policies();
        let mut seen_levels = Vec::new();
        for policy in config.levels {
            if seen_levels.contains(&policy.level) {
                return Err(AuthorityError::InvalidMatrix(format!(
                    "duplicate level policy for {}",
                    policy.level
                )));
            }
            seen_levels.push(policy.level);
            if policy.approval_required && policy.approvers.is_empty() {
                return Err(AuthorityError::InvalidMatrix(format!(
                    "{} requires approval but lists no approvers",
                    policy.level
                )));
            }
            let slot = usize::from(policy.level.rank() - 1);
            levels[slot] = policy;
        }

        let mut entries = BTreeMap::new();
        for entry in config.entries {
            let t = entry.decision_type;
            if entry.approval_required && entry.required_approvers.is_empty() {
                return Err(AuthorityError::InvalidMatrix(format!(
                    "{t} requires approval but lists no approvers"
                )));
            }
            if entries.insert(t, entry).is_some() {
                return Err(AuthorityError::InvalidMatrix(format!(
                    "duplicate entry for decision type {t}"
                )));
            }
        }

        Ok(Self {
            entries,
            levels,
            thresholds: config.thresholds,
        })
    }

    /// Assemble without validation; only for trusted built-in data.
    pub(crate) fn from_parts(
        entries: Vec<AuthorityMatrixEntry>,
        levels: [LevelPolicy; 5],
        thresholds: ImpactThresholds,
    ) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.decision_type, e)).collect(),
            levels,
            thresholds,
        }
    }

    /// Fetch the entry for a decision type.
    ///
    /// A missing entry is a fatal misconfiguration, never a silent default.
    pub fn lookup(
        &self,
        decision_type: DecisionType,
    ) -> Result<&AuthorityMatrixEntry, AuthorityError> {
        self.entries
            .get(&decision_type)
            .ok_or(AuthorityError::Configuration { decision_type })
    }

    pub fn level_policy(&self, level: AuthorityLevel) -> &LevelPolicy {
        &self.levels[usize::from(level.rank() - 1)]
    }

    pub fn thresholds(&self) -> &ImpactThresholds {
        &self.thresholds
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuthorityMatrixEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decision types with no entry.
    pub fn missing_types(&self) -> Vec<DecisionType> {
        DecisionType::ALL
            .into_iter()
            .filter(|t| !self.entries.contains_key(t))
            .collect()
    }

    pub fn to_config(&self) -> MatrixConfig {
        MatrixConfig {
            schema_uri: None,
            version: "1.0".to_string(),
            thresholds: self.thresholds,
            levels: self.levels.to_vec(),
            entries: self.entries.values().cloned().collect(),
        }
    }
}

impl Default for AuthorityMatrix {
    fn default() -> Self {
        crate::defaults::matrix()
    }
}

/// Load a matrix configuration file and build the matrix.
pub fn load_matrix(path: &str) -> Result<AuthorityMatrix> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read matrix {path}"))?;
    let data: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("{path}: invalid JSON"))?;
    crate::schema::validate(&data).with_context(|| format!("{path}: schema check failed"))?;
    let config: MatrixConfig =
        serde_json::from_value(data).with_context(|| format!("{path}: invalid matrix"))?;
    AuthorityMatrix::from_config(config).with_context(|| format!("{path}: invalid matrix"))
}

/// Resolve the matrix for this process: explicit path, then the workspace
/// default, then the built-in table.
pub fn resolve_matrix(explicit: Option<&str>) -> Result<AuthorityMatrix> {
    if let Some(path) = explicit {
        return load_matrix(path);
    }
    if std::path::Path::new(WORKSPACE_MATRIX).exists() {
        return load_matrix(WORKSPACE_MATRIX);
    }
    Ok(AuthorityMatrix::default())
}
