#![forbid(unsafe_code)]

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use mandate_core::decision::{BusinessOutcome, Decision};
use mandate_core::matrix::{resolve_matrix, AuthorityMatrix, WORKSPACE_MATRIX};
use mandate_core::route::{ApprovalResponse, DecisionRoute};
use mandate_core::traits::{Assignments, AuditSink};
use mandate_core::types::{AuthorityLevel, DecisionStatus, EscalationTrigger};
use mandate_engine::escalation::escalate::Escalation;
use mandate_engine::policy::classifier::ThresholdClassifier;
use mandate_engine::policy::precedence::effective_level;
use mandate_engine::state::atomic::atomic_write;
use mandate_engine::state::audit_log;
use mandate_engine::state::sink::JsonlAuditSink;
use mandate_engine::DecisionRouter;

#[derive(Parser)]
#[command(
    name = "mandate",
    version,
    about = "Route business decisions to the right level of authority."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write the built-in authority matrix to .mandate/matrix.json.
    Init {
        /// Overwrite an existing matrix.
        #[arg(long)]
        force: bool,
    },

    /// Validate an authority matrix: schema, coverage, approvers, lint.
    Check {
        /// Path to matrix .json file.
        file: String,

        /// Output structured JSON report.
        #[arg(long)]
        json: bool,

        /// Fail on warnings (not just errors).
        #[arg(long)]
        strict: bool,
    },

    /// Show the active authority matrix.
    Matrix {
        /// Matrix file (default: .mandate/matrix.json, then built-in).
        #[arg(long)]
        matrix: Option<String>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a decision without routing it.
    Classify {
        /// Path to decision .json (or "-" for stdin).
        #[arg(default_value = "-")]
        file: String,

        #[arg(long)]
        matrix: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Route a decision: authority level, approval workflow, notifications.
    Route {
        /// Path to decision .json (or "-" for stdin).
        #[arg(default_value = "-")]
        file: String,

        /// Role → people assignments .json.
        #[arg(long)]
        assignments: Option<String>,

        #[arg(long)]
        matrix: Option<String>,

        /// Write the route to this file.
        #[arg(short, long)]
        out: Option<String>,

        /// Append audit entries to this JSONL log.
        #[arg(long)]
        audit: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Evaluate approver responses against a route.
    Approve {
        /// Path to route .json.
        route: String,

        /// Approver responses .json (array).
        #[arg(long)]
        responses: String,

        #[arg(long)]
        assignments: Option<String>,

        #[arg(long)]
        matrix: Option<String>,

        /// Evaluation time (RFC 3339, default: now).
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        #[arg(long)]
        audit: Option<String>,

        /// Write the escalated route here when a timeout escalates.
        #[arg(short, long)]
        out: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Fire an escalation trigger on a route.
    Escalate {
        /// Path to route .json.
        route: String,

        /// Trigger name, e.g. BUDGET_IMPACT.
        #[arg(long)]
        trigger: EscalationTrigger,

        #[arg(long)]
        reason: String,

        #[arg(long)]
        assignments: Option<String>,

        #[arg(long)]
        matrix: Option<String>,

        #[arg(long)]
        now: Option<DateTime<Utc>>,

        #[arg(long)]
        audit: Option<String>,

        /// Write the escalated route to this file.
        #[arg(short, long)]
        out: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Success rates per authority level from realized outcomes.
    Outcomes {
        /// Decisions .json (array).
        #[arg(long)]
        decisions: String,

        /// Outcomes .json (array).
        #[arg(long)]
        outcomes: String,

        #[arg(long)]
        matrix: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Verify or checkpoint an audit log hash-chain.
    Audit {
        /// Path to audit .jsonl file.
        file: String,

        /// Verify the hash chain.
        #[arg(long)]
        verify: bool,

        /// Write a checkpoint of the current chain head.
        #[arg(long)]
        checkpoint: Option<String>,

        /// Check the log against a checkpoint.
        #[arg(long)]
        verify_checkpoint: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Init { force } => cmd_init(force),

        Cmd::Check { file, json, strict } => cmd_check(&file, json, strict),

        Cmd::Matrix { matrix, json } => cmd_matrix(matrix.as_deref(), json),

        Cmd::Classify { file, matrix, json } => cmd_classify(&file, matrix.as_deref(), json),

        Cmd::Route {
            file,
            assignments,
            matrix,
            out,
            audit,
            json,
        } => {
            let router = build_router(matrix.as_deref(), assignments.as_deref(), audit.as_deref())?;
            cmd_route(&router, &file, out.as_deref(), json)
        }

        Cmd::Approve {
            route,
            responses,
            assignments,
            matrix,
            now,
            audit,
            out,
            json,
        } => {
            let router = build_router(matrix.as_deref(), assignments.as_deref(), audit.as_deref())?;
            cmd_approve(&router, &route, &responses, now, out.as_deref(), json)
        }

        Cmd::Escalate {
            route,
            trigger,
            reason,
            assignments,
            matrix,
            now,
            audit,
            out,
            json,
        } => {
            let router = build_router(matrix.as_deref(), assignments.as_deref(), audit.as_deref())?;
            cmd_escalate(&router, &route, trigger, &reason, now, out.as_deref(), json)
        }

        Cmd::Outcomes {
            decisions,
            outcomes,
            matrix,
            json,
        } => cmd_outcomes(&decisions, &outcomes, matrix.as_deref(), json),

        Cmd::Audit {
            file,
            verify,
            checkpoint,
            verify_checkpoint,
        } => cmd_audit(&file, verify, checkpoint.as_deref(), verify_checkpoint.as_deref()),
    }
}

fn read_json<T: DeserializeOwned>(file: &str) -> Result<T> {
    let content = if file == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("cannot read {file}"))?
    };
    serde_json::from_str(&content).with_context(|| format!("{file}: invalid JSON"))
}

fn write_json<T: serde::Serialize>(path: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())?;
    eprintln!("wrote {path}");
    Ok(())
}

fn build_router(
    matrix: Option<&str>,
    assignments: Option<&str>,
    audit: Option<&str>,
) -> Result<DecisionRouter> {
    let matrix = resolve_matrix(matrix)?;
    let directory: Assignments = match assignments {
        Some(path) => read_json(path)?,
        None => Assignments::default(),
    };
    let router = DecisionRouter::new(Arc::new(matrix), Arc::new(directory));
    Ok(match audit {
        Some(path) => {
            let sink: Arc<dyn AuditSink + Send + Sync> = Arc::new(JsonlAuditSink::new(path));
            router.with_audit_sink(sink)
        }
        None => router,
    })
}

fn cmd_init(force: bool) -> Result<()> {
    if std::path::Path::new(WORKSPACE_MATRIX).exists() && !force {
        bail!("{WORKSPACE_MATRIX} already exists (use --force to overwrite)");
    }
    std::fs::create_dir_all(".mandate")?;
    let json = serde_json::to_string_pretty(&mandate_core::defaults::config())?;
    atomic_write(WORKSPACE_MATRIX, json.as_bytes())?;
    eprintln!("created {WORKSPACE_MATRIX}");
    Ok(())
}

fn cmd_check(file: &str, json_out: bool, strict: bool) -> Result<()> {
    let data: serde_json::Value = read_json(file)?;
    let report = mandate_core::schema::check(&data, file, strict);

    if json_out {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if report.pass {
            eprintln!("  ok  {file} (v{})", report.version);
        } else {
            eprintln!("  FAIL {file} (v{})", report.version);
        }
        for e in &report.errors {
            eprintln!(
                "  error {}: {} {}",
                e.code,
                e.message,
                e.path.as_deref().unwrap_or("")
            );
        }
        for w in &report.warnings {
            eprintln!(
                "  warn  {}: {} {}",
                w.code,
                w.message,
                w.path.as_deref().unwrap_or("")
            );
        }
    }

    if !report.pass {
        bail!("check failed for {file}");
    }
    Ok(())
}

fn cmd_matrix(matrix: Option<&str>, json_out: bool) -> Result<()> {
    let matrix = resolve_matrix(matrix)?;
    if json_out {
        println!("{}", serde_json::to_string_pretty(&matrix.to_config())?);
        return Ok(());
    }

    let t = matrix.thresholds();
    println!(
        "  thresholds: notify {} / cross-functional {} / board {}",
        t.notification, t.cross_functional, t.board
    );
    for e in matrix.entries() {
        let approvers: Vec<&str> = e.required_approvers.iter().map(|r| r.as_str()).collect();
        println!(
            "  {:<38} {:<22} {:>5}h  {}",
            e.decision_type.as_str(),
            e.level.as_str(),
            e.time_limit_hours,
            if approvers.is_empty() {
                "-".to_string()
            } else {
                approvers.join(", ")
            }
        );
    }
    for t in matrix.missing_types() {
        eprintln!("  warn  no entry for {t}");
    }
    Ok(())
}

fn classified(
    matrix: &AuthorityMatrix,
    decision: &Decision,
) -> Result<(AuthorityLevel, &'static str, AuthorityLevel)> {
    decision.validate()?;
    let (level, rule) = ThresholdClassifier::for_matrix(matrix).explain(decision);
    let entry = matrix.lookup(decision.decision_type)?;
    Ok((level, rule, effective_level(entry, level)))
}

fn cmd_classify(file: &str, matrix: Option<&str>, json_out: bool) -> Result<()> {
    let matrix = resolve_matrix(matrix)?;
    let decision: Decision = read_json(file)?;
    let (level, rule, effective) = classified(&matrix, &decision)?;

    if json_out {
        let out = serde_json::json!({
            "decision_id": decision.id,
            "classified_level": level,
            "rule": rule,
            "authority_level": effective,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{effective}");
        eprintln!("  classified {level} ({rule})");
        if effective != level {
            eprintln!("  raised to {effective} by the {} entry", decision.decision_type);
        }
    }
    Ok(())
}

fn print_route(route: &DecisionRoute) {
    eprintln!(
        "  routed {} -> {} (route {})",
        route.decision.id, route.authority_level, route.route_id
    );
    match &route.approval_workflow {
        Some(wf) => {
            for stage in &wf.stages {
                let steps: Vec<String> = stage
                    .steps
                    .iter()
                    .map(|s| {
                        let mark = if s.required { "" } else { " (optional)" };
                        format!("{} [{}]{mark}", s.approver_role, s.approver_ids.join(", "))
                    })
                    .collect();
                let due = route
                    .deadline_for_stage(stage.index)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_else(|| "-".into());
                eprintln!("  stage {}: {} due {due}", stage.index, steps.join(" | "));
            }
        }
        None => eprintln!("  no approval required"),
    }
    if route.notification_plan.required {
        let roles: Vec<&str> = route
            .notification_plan
            .recipients
            .iter()
            .map(|r| r.as_str())
            .collect();
        eprintln!("  notify: {}", roles.join(", "));
    }
}

fn cmd_route(router: &DecisionRouter, file: &str, out: Option<&str>, json_out: bool) -> Result<()> {
    let decision: Decision = read_json(file)?;
    let route = router.route_decision(decision)?;

    if let Some(path) = out {
        write_json(path, &route)?;
    }
    if json_out {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        print_route(&route);
    }
    Ok(())
}

fn cmd_approve(
    router: &DecisionRouter,
    route_file: &str,
    responses_file: &str,
    now: Option<DateTime<Utc>>,
    out: Option<&str>,
    json_out: bool,
) -> Result<()> {
    let route: DecisionRoute = read_json(route_file)?;
    let responses: Vec<ApprovalResponse> = read_json(responses_file)?;
    let result = router.process_approvals(&route, &responses, now.unwrap_or_else(Utc::now))?;

    if let (Some(path), Some(raised)) = (out, result.escalated_route.as_deref()) {
        write_json(path, raised)?;
    }
    if json_out {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        eprintln!("  {} {}: {}", result.status, result.decision_id, result.reason);
        for e in &result.escalations {
            eprintln!("  escalated {} -> {} ({})", e.from_level, e.to_level, e.trigger);
        }
    }

    if result.status == DecisionStatus::Rejected {
        bail!("decision {} rejected", result.decision_id);
    }
    Ok(())
}

fn cmd_escalate(
    router: &DecisionRouter,
    route_file: &str,
    trigger: EscalationTrigger,
    reason: &str,
    now: Option<DateTime<Utc>>,
    out: Option<&str>,
    json_out: bool,
) -> Result<()> {
    let route: DecisionRoute = read_json(route_file)?;
    let escalation = router.escalate(&route, trigger, reason, now.unwrap_or_else(Utc::now))?;
    let event = escalation.event();

    let raised = match &escalation {
        Escalation::Raised { route, .. } => Some(route.as_ref()),
        Escalation::Saturated { .. } => None,
    };
    if let (Some(path), Some(raised)) = (out, raised) {
        write_json(path, raised)?;
    }

    if json_out {
        let out = serde_json::json!({
            "event": event,
            "saturated": event.is_saturated(),
            "route": raised,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if event.is_saturated() {
        eprintln!("  {} already at {}; trigger recorded", route.decision.id, event.to_level);
    } else {
        eprintln!(
            "  escalated {}: {} -> {} ({trigger})",
            route.decision.id, event.from_level, event.to_level
        );
        if let Some(raised) = raised {
            print_route(raised);
        }
    }
    Ok(())
}

fn cmd_outcomes(
    decisions_file: &str,
    outcomes_file: &str,
    matrix: Option<&str>,
    json_out: bool,
) -> Result<()> {
    let decisions: Vec<Decision> = read_json(decisions_file)?;
    let outcomes: Vec<BusinessOutcome> = read_json(outcomes_file)?;
    let router = build_router(matrix, None, None)?;
    let analytics = router.track_decision_outcomes(&decisions, &outcomes);

    if json_out {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    let rate = |r: Option<f64>| {
        r.map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".into())
    };
    for (level, perf) in &analytics.levels {
        println!(
            "  {:<22} {:>4} decisions  {:>4} with outcome  {:>7}",
            level.as_str(),
            perf.decisions,
            perf.with_outcome,
            rate(perf.success_rate)
        );
    }
    println!(
        "  {:<22} {:>4} decisions  {:>4} with outcome  {:>7}",
        "TOTAL",
        analytics.total_decisions,
        analytics.total_with_outcome,
        rate(analytics.overall_success_rate)
    );
    if analytics.orphan_outcomes > 0 {
        eprintln!("  warn  {} outcome(s) match no decision", analytics.orphan_outcomes);
    }
    Ok(())
}

fn cmd_audit(
    file: &str,
    verify: bool,
    checkpoint: Option<&str>,
    verify_checkpoint: Option<&str>,
) -> Result<()> {
    if !verify && checkpoint.is_none() && verify_checkpoint.is_none() {
        bail!("specify --verify, --checkpoint or --verify-checkpoint");
    }
    if !std::path::Path::new(file).exists() {
        eprintln!("  no audit log found at {file}");
        return Ok(());
    }

    if verify {
        let count = audit_log::verify_chain(file)?;
        eprintln!("  audit chain valid ({count} entries)");
    }
    if let Some(path) = verify_checkpoint {
        if !audit_log::verify_checkpoint(file, path)? {
            bail!("audit log {file} does not match checkpoint {path}");
        }
        eprintln!("  checkpoint {path} matches");
    }
    if let Some(path) = checkpoint {
        let cp = audit_log::create_checkpoint(file, path)?;
        eprintln!("  checkpoint written to {path} ({} entries)", cp.entries);
    }
    Ok(())
}
