use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use mandate_core::errors::AuditError;
use mandate_core::traits::AuditEntry;

use super::atomic::atomic_write;

/// `prev_hash` of the first entry in a log.
pub const GENESIS: &str = "genesis";

fn line_hash(line: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(line.as_bytes()))
}

fn last_line(content: &str) -> Option<&str> {
    content.lines().rev().find(|line| !line.trim().is_empty())
}

/// Append an entry to a JSONL audit log, chaining it to the previous line.
///
/// The entry's `prev_hash` is set to the SHA-256 of the previous line, or
/// `"genesis"` for the first entry. Returns the hash of the written line.
pub fn append_audit(path: &str, entry: &AuditEntry) -> Result<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("cannot read audit {path}")),
    };
    let prev_hash = last_line(&content)
        .map(line_hash)
        .unwrap_or_else(|| GENESIS.to_string());

    let mut entry = entry.clone();
    entry.prev_hash = Some(prev_hash);
    let line = serde_json::to_string(&entry)?;

    if let Some(dir) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open audit {path}"))?;
    // a log left without a trailing newline would glue two entries together
    if !content.is_empty() && !content.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{line}").with_context(|| format!("cannot write audit {path}"))?;

    Ok(line_hash(&line))
}

/// Verify the hash chain of an audit log. Returns the number of entries.
pub fn verify_chain(path: &str) -> Result<u64> {
    verify_chain_from(path, 0)
}

/// Verify the chain from entry `from_entry` (0-based) on.
///
/// Earlier entries are hashed to seed the chain but their own `prev_hash` is
/// not checked, so a log whose head was pruned can still be verified from a
/// checkpoint.
pub fn verify_chain_from(path: &str, from_entry: u64) -> Result<u64> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read audit {path}"))?;

    let mut count = 0u64;
    let mut prev_hash = GENESIS.to_string();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("{path}: invalid JSON at line {}", i + 1))?;

        if count >= from_entry {
            let entry_prev = entry
                .get("prev_hash")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(GENESIS);
            if entry_prev != prev_hash {
                return Err(AuditError::ChainCorruption(count)).with_context(|| {
                    format!("{path}: expected prev_hash '{prev_hash}', got '{entry_prev}'")
                });
            }
        }

        prev_hash = line_hash(line);
        count += 1;
    }

    Ok(count)
}

/// All entries of a log, in order.
pub fn read_entries(path: &str) -> Result<Vec<AuditEntry>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read audit {path}"))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<AuditEntry>(line)
                .with_context(|| format!("{path}: invalid entry at line {}", i + 1))
        })
        .collect()
}

/// Chain head anchor: entry count and hash of the last entry at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub audit_file: String,
    pub entries: u64,
    pub chain_head: String,
    pub created_at: DateTime<Utc>,
}

/// Verify the log and record its current head in `checkpoint_path`.
pub fn create_checkpoint(audit_path: &str, checkpoint_path: &str) -> Result<Checkpoint> {
    let entries = verify_chain(audit_path)?;
    let content = std::fs::read_to_string(audit_path)
        .with_context(|| format!("cannot read audit {audit_path}"))?;

    let checkpoint = Checkpoint {
        audit_file: audit_path.to_string(),
        entries,
        chain_head: last_line(&content)
            .map(line_hash)
            .unwrap_or_else(|| GENESIS.to_string()),
        created_at: Utc::now(),
    };

    let json = serde_json::to_string_pretty(&checkpoint)?;
    atomic_write(checkpoint_path, json.as_bytes())
        .with_context(|| format!("cannot write checkpoint {checkpoint_path}"))?;
    Ok(checkpoint)
}

/// Check that the first `entries` lines of the log still chain to the
/// recorded head. Entries appended after the checkpoint are not examined.
pub fn verify_checkpoint(audit_path: &str, checkpoint_path: &str) -> Result<bool> {
    let raw = std::fs::read_to_string(checkpoint_path)
        .with_context(|| format!("cannot read checkpoint {checkpoint_path}"))?;
    let checkpoint: Checkpoint = serde_json::from_str(&raw)
        .with_context(|| format!("{checkpoint_path}: invalid checkpoint"))?;

    let content = std::fs::read_to_string(audit_path)
        .with_context(|| format!("cannot read audit {audit_path}"))?;

    let mut count = 0u64;
    let mut prev_hash = GENESIS.to_string();

    for (i, line) in content.lines().enumerate() {
        if count >= checkpoint.entries {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let entry: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("{audit_path}: invalid JSON at line {}", i + 1))?;
        let entry_prev = entry
            .get("prev_hash")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(GENESIS);
        if entry_prev != prev_hash {
            return Ok(false);
        }
        prev_hash = line_hash(line);
        count += 1;
    }

    Ok(count == checkpoint.entries && prev_hash == checkpoint.chain_head)
}
