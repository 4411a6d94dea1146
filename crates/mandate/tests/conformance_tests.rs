//! CLI integration via the JSON interface.

use serde_json::Value;
use test_helpers::{fixture, mandate_bin, mandate_json, workspace_root};

fn route_to(dir: &tempfile::TempDir, decision: &str, extra: &[&str]) -> (String, Value) {
    let path = dir.path().join("route.json").to_str().unwrap().to_string();
    let decision = fixture(decision);
    let assignments = fixture("assignments.json");
    let mut args = vec![
        "route",
        decision.as_str(),
        "--assignments",
        assignments.as_str(),
        "--out",
        path.as_str(),
        "--json",
    ];
    args.extend_from_slice(extra);
    let v = mandate_json(&args, 0);
    (path, v)
}

/// One APPROVE per required step, answered at routing time.
fn approve_everything(route: &Value) -> Value {
    let at = route["routed_at"].clone();
    let responses: Vec<Value> = route["approval_workflow"]["stages"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["steps"].as_array().unwrap().iter())
        .filter(|s| s["required"] == true)
        .map(|s| {
            serde_json::json!({
                "step_id": s["step_id"],
                "approver_id": s["approver_ids"][0],
                "verdict": "APPROVE",
                "responded_at": at,
            })
        })
        .collect();
    Value::Array(responses)
}

fn write_responses(dir: &tempfile::TempDir, responses: &Value) -> String {
    let path = dir.path().join("responses.json");
    std::fs::write(&path, serde_json::to_string_pretty(responses).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

// ── Matrix check ────────────────────────────────────────────────

#[test]
fn init_writes_a_matrix_that_passes_strict_check() {
    let dir = tempfile::tempdir().unwrap();
    let out = mandate_bin()
        .current_dir(dir.path())
        .arg("init")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(dir.path().join(".mandate/matrix.json").exists());

    let out = mandate_bin()
        .current_dir(dir.path())
        .args(["check", ".mandate/matrix.json", "--strict", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["pass"], true);
    assert_eq!(v["version"], "1.0");
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let init = |force: bool| {
        let mut cmd = mandate_bin();
        cmd.current_dir(dir.path()).arg("init");
        if force {
            cmd.arg("--force");
        }
        cmd.output().unwrap().status.code()
    };
    assert_eq!(init(false), Some(0));
    assert_eq!(init(false), Some(1));
    assert_eq!(init(true), Some(0));
}

#[test]
fn broken_matrix_reports_errors() {
    let v = mandate_json(&["check", &fixture("matrix_broken.json"), "--json"], 1);
    assert_eq!(v["pass"], false);
    let codes: Vec<&str> = v["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"E004"));
    assert!(codes.contains(&"E005"));
}

#[test]
fn partial_matrix_warns_on_coverage() {
    let v = mandate_json(&["check", &fixture("matrix_partial.json"), "--json"], 0);
    assert_eq!(v["pass"], true);
    assert!(v["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["code"] == "W001"));

    let strict = mandate_json(&["check", &fixture("matrix_partial.json"), "--strict", "--json"], 1);
    assert_eq!(strict["pass"], false);
}

#[test]
fn matrix_json_lists_every_type() {
    let v = mandate_json(&["matrix", "--json"], 0);
    assert_eq!(v["entries"].as_array().unwrap().len(), 13);
    assert_eq!(v["thresholds"]["board"], 10_000_000);
}

// ── Classification ──────────────────────────────────────────────

#[test]
fn classify_reference_scenarios() {
    let cases = [
        ("decisions/tech_implementation.json", "FULL_AUTONOMY"),
        ("decisions/tech_investment_medium.json", "POST_NOTIFICATION"),
        ("decisions/major_acquisition.json", "BOARD_ESCALATION"),
        ("decisions/governance_change.json", "SHAREHOLDER_APPROVAL"),
    ];
    for (file, level) in cases {
        let v = mandate_json(&["classify", &fixture(file), "--json"], 0);
        assert_eq!(v["authority_level"], level, "{file}");
    }
}

#[test]
fn classify_shows_entry_floor() {
    let decision = fixture("decisions/strategic_initiative.json");
    let v = mandate_json(&["classify", &decision, "--json"], 0);
    assert_eq!(v["classified_level"], "FULL_AUTONOMY");
    assert_eq!(v["authority_level"], "CROSS_FUNCTIONAL");
}

#[test]
fn classify_against_matrix_without_the_type() {
    let out = mandate_bin()
        .args([
            "classify",
            &fixture("decisions/tech_investment_medium.json"),
            "--matrix",
            &fixture("matrix_partial.json"),
            "--json",
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("TECHNOLOGY_INVESTMENT_MEDIUM"));
}

#[test]
fn invalid_decision_is_rejected() {
    let out = mandate_bin()
        .args(["classify", &fixture("decisions/missing_rationale.json")])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("rationale"));
}

// ── Routing ─────────────────────────────────────────────────────

#[test]
fn autonomous_route_has_no_workflow() {
    let v = mandate_json(&["route", &fixture("decisions/tech_implementation.json"), "--json"], 0);
    assert_eq!(v["authority_level"], "FULL_AUTONOMY");
    assert!(v["approval_workflow"].is_null());
    assert_eq!(v["notification_plan"]["required"], false);
}

#[test]
fn post_notification_route_notifies_without_workflow() {
    let decision = fixture("decisions/tech_investment_medium.json");
    let v = mandate_json(&["route", &decision, "--json"], 0);
    assert_eq!(v["authority_level"], "POST_NOTIFICATION");
    assert!(v["approval_workflow"].is_null());
    assert_eq!(v["notification_plan"]["required"], true);
    assert_eq!(v["notification_plan"]["dispatch"], "DEFERRED");
}

#[test]
fn acquisition_route_goes_to_the_board() {
    let dir = tempfile::tempdir().unwrap();
    let (_, v) = route_to(&dir, "decisions/major_acquisition.json", &[]);
    assert_eq!(v["authority_level"], "BOARD_ESCALATION");

    let stages = v["approval_workflow"]["stages"].as_array().unwrap();
    assert_eq!(stages[0]["steps"][0]["approver_role"], "CEO");
    assert_eq!(stages[0]["steps"][0]["time_limit_hours"], 504);
    let roles: Vec<&str> = stages
        .iter()
        .flat_map(|s| s["steps"].as_array().unwrap().iter())
        .filter(|s| s["required"] == true)
        .map(|s| s["approver_role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["CEO", "BOARD_CHAIR", "AUDIT_COMMITTEE"]);
}

#[test]
fn route_ids_are_unique() {
    let a = mandate_json(&["route", &fixture("decisions/tech_implementation.json"), "--json"], 0);
    let b = mandate_json(&["route", &fixture("decisions/tech_implementation.json"), "--json"], 0);
    assert_ne!(a["route_id"], b["route_id"]);
}

#[test]
fn unassigned_approver_fails_routing() {
    let out = mandate_bin()
        .args(["route", &fixture("decisions/major_acquisition.json"), "--json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no approver assigned"));
}

// ── Approvals ───────────────────────────────────────────────────

#[test]
fn full_approval_flow_with_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.jsonl").to_str().unwrap().to_string();
    let (route_path, route) =
        route_to(&dir, "decisions/strategic_initiative.json", &["--audit", &log]);
    let responses = write_responses(&dir, &approve_everything(&route));

    let v = mandate_json(
        &[
            "approve",
            &route_path,
            "--responses",
            &responses,
            "--assignments",
            &fixture("assignments.json"),
            "--audit",
            &log,
            "--json",
        ],
        0,
    );
    assert_eq!(v["status"], "APPROVED");
    assert_eq!(v["approved"], true);
    assert_eq!(v["auto_approved"], false);
    assert_eq!(v["approval_events"].as_array().unwrap().len(), 2);

    let out = mandate_bin().args(["audit", &log, "--verify"]).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("audit chain valid (5 entries)"));
}

#[test]
fn rejection_exits_nonzero_with_result() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, route) = route_to(&dir, "decisions/strategic_initiative.json", &[]);
    let mut responses = approve_everything(&route);
    responses[1]["verdict"] = "REJECT".into();
    let responses = write_responses(&dir, &responses);

    let v = mandate_json(
        &[
            "approve",
            &route_path,
            "--responses",
            &responses,
            "--assignments",
            &fixture("assignments.json"),
            "--json",
        ],
        1,
    );
    assert_eq!(v["status"], "REJECTED");
    assert!(v["reason"].as_str().unwrap().contains("omar.cfo"));
}

#[test]
fn conditional_approval_stays_pending() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, route) = route_to(&dir, "decisions/strategic_initiative.json", &[]);
    let mut responses = approve_everything(&route);
    responses[0]["conditions"] = serde_json::json!(["pilot_signed_off"]);
    let responses = write_responses(&dir, &responses);

    let v = mandate_json(
        &[
            "approve",
            &route_path,
            "--responses",
            &responses,
            "--assignments",
            &fixture("assignments.json"),
            "--json",
        ],
        0,
    );
    assert_eq!(v["status"], "PENDING");
    assert!(v["reason"].as_str().unwrap().contains("pilot_signed_off"));
    assert_eq!(v["approval_events"][0]["conditions"][0], "pilot_signed_off");
}

#[test]
fn unanswered_stage_escalates_on_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, _) = route_to(&dir, "decisions/strategic_initiative.json", &[]);
    let responses = write_responses(&dir, &Value::Array(vec![]));
    let escalated = dir.path().join("escalated.json").to_str().unwrap().to_string();

    let v = mandate_json(
        &[
            "approve",
            &route_path,
            "--responses",
            &responses,
            "--assignments",
            &fixture("assignments.json"),
            "--now",
            "2099-01-01T00:00:00Z",
            "--out",
            &escalated,
            "--json",
        ],
        0,
    );
    assert_eq!(v["status"], "PENDING");
    assert_eq!(v["escalations"][0]["trigger"], "APPROVAL_TIMEOUT");
    assert_eq!(v["escalated_route"]["authority_level"], "BOARD_ESCALATION");

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&escalated).unwrap()).unwrap();
    assert_eq!(written["route_id"], v["escalated_route"]["route_id"]);
    assert!(written["supersedes"].is_string());
}

#[test]
fn timeout_at_the_ceiling_expires() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, _) = route_to(&dir, "decisions/governance_change.json", &[]);
    let responses = write_responses(&dir, &Value::Array(vec![]));

    let out = mandate_bin()
        .args([
            "approve",
            &route_path,
            "--responses",
            &responses,
            "--assignments",
            &fixture("assignments.json"),
            "--now",
            "2099-01-01T00:00:00Z",
            "--json",
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no higher authority"));
}

#[test]
fn stranger_cannot_answer() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, route) = route_to(&dir, "decisions/strategic_initiative.json", &[]);
    let mut responses = approve_everything(&route);
    responses[0]["approver_id"] = "mallory".into();
    let responses = write_responses(&dir, &responses);

    let out = mandate_bin()
        .args([
            "approve",
            &route_path,
            "--responses",
            &responses,
            "--assignments",
            &fixture("assignments.json"),
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("mallory may not answer"));
}

// ── Escalation ──────────────────────────────────────────────────

#[test]
fn budget_trigger_raises_post_notification() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, _) = route_to(&dir, "decisions/tech_investment_medium.json", &[]);

    let v = mandate_json(
        &[
            "escalate",
            &route_path,
            "--trigger",
            "budget-impact",
            "--reason",
            "vendor quote doubled",
            "--assignments",
            &fixture("assignments.json"),
            "--json",
        ],
        0,
    );
    assert_eq!(v["saturated"], false);
    assert_eq!(v["event"]["from_level"], "POST_NOTIFICATION");
    assert_eq!(v["event"]["to_level"], "CROSS_FUNCTIONAL");
    assert_eq!(v["route"]["authority_level"], "CROSS_FUNCTIONAL");
    assert!(!v["route"]["approval_workflow"].is_null());
}

#[test]
fn trigger_off_the_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, _) = route_to(&dir, "decisions/tech_investment_medium.json", &[]);

    let out = mandate_bin()
        .args([
            "escalate",
            &route_path,
            "--trigger",
            "MARKET_IMPACT",
            "--reason",
            "x",
            "--assignments",
            &fixture("assignments.json"),
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("not on the escalation path"));
}

#[test]
fn trigger_at_the_ceiling_saturates() {
    let dir = tempfile::tempdir().unwrap();
    let (route_path, _) = route_to(&dir, "decisions/governance_change.json", &[]);

    let v = mandate_json(
        &[
            "escalate",
            &route_path,
            "--trigger",
            "REGULATORY_REQUIREMENT",
            "--reason",
            "new listing rules",
            "--assignments",
            &fixture("assignments.json"),
            "--json",
        ],
        0,
    );
    assert_eq!(v["saturated"], true);
    assert!(v["route"].is_null());
}

// ── Outcomes ────────────────────────────────────────────────────

#[test]
fn outcome_success_rates_per_level() {
    let v = mandate_json(
        &[
            "outcomes",
            "--decisions",
            &fixture("decisions_batch.json"),
            "--outcomes",
            &fixture("outcomes.json"),
            "--json",
        ],
        0,
    );
    assert_eq!(v["total_decisions"], 4);
    assert_eq!(v["total_with_outcome"], 3);
    assert_eq!(v["orphan_outcomes"], 1);
    assert_eq!(v["levels"]["FULL_AUTONOMY"]["success_rate"], 1.0);
    assert_eq!(v["levels"]["POST_NOTIFICATION"]["success_rate"], 0.0);
    assert_eq!(v["levels"]["BOARD_ESCALATION"]["positive"], 1);
    assert_eq!(v["levels"]["CROSS_FUNCTIONAL"]["decisions"], 1);
    assert!(v["levels"]["CROSS_FUNCTIONAL"]["success_rate"].is_null());
    assert_eq!(v["levels"]["SHAREHOLDER_APPROVAL"]["decisions"], 0);
}

// ── Audit log ───────────────────────────────────────────────────

#[test]
fn tampered_log_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.jsonl").to_str().unwrap().to_string();
    route_to(&dir, "decisions/tech_implementation.json", &["--audit", &log]);
    route_to(&dir, "decisions/strategic_initiative.json", &["--audit", &log]);

    let content = std::fs::read_to_string(&log).unwrap();
    std::fs::write(&log, content.replacen("ti-001", "ti-999", 1)).unwrap();

    let out = mandate_bin().args(["audit", &log, "--verify"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("chain corruption at entry 1"));
}

#[test]
fn checkpoint_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.jsonl").to_str().unwrap().to_string();
    let cp = dir.path().join("audit.checkpoint.json").to_str().unwrap().to_string();
    route_to(&dir, "decisions/tech_implementation.json", &["--audit", &log]);

    let out = mandate_bin().args(["audit", &log, "--checkpoint", &cp]).output().unwrap();
    assert!(out.status.success());

    route_to(&dir, "decisions/tech_investment_medium.json", &["--audit", &log]);
    let out = mandate_bin()
        .args(["audit", &log, "--verify", "--verify-checkpoint", &cp])
        .output()
        .unwrap();
    assert!(out.status.success());

    let mut raw: Value = serde_json::from_str(&std::fs::read_to_string(&cp).unwrap()).unwrap();
    raw["entries"] = 7.into();
    std::fs::write(&cp, raw.to_string()).unwrap();
    let out = mandate_bin()
        .args(["audit", &log, "--verify-checkpoint", &cp])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn audit_needs_a_mode() {
    let out = mandate_bin().args(["audit", "missing.jsonl"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn runs_from_workspace_root_without_local_matrix() {
    assert!(!workspace_root().join(".mandate/matrix.json").exists());
}
