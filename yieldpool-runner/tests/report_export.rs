use yieldpool_runner::{
    export_json, export_steps_csv, export_strategies_csv, generate_report, import_json,
    load_report, run_scenario, save_report, ScenarioConfig, ScenarioReport, SCHEMA_VERSION,
};

const SCENARIO: &str = r#"
name = "export/check"
description = "small run for artifact tests"

[pool]
owner = "treasury"

[[pool.strategies]]
name = "a"
weight = 1
adapter = { type = "SIMULATED" }

[[pool.strategies]]
name = "dead"
weight = 0
adapter = { type = "FAILING", stuck_balance = 40 }

[[steps]]
action = "deposit"
holder = "alice"
amount = 200

[[steps]]
action = "withdraw"
holder = "alice"
units = 100

[[steps]]
action = "transfer"
from = "alice"
to = "bob"
units = 10

[[steps]]
action = "set_weight"
caller = "mallory"
strategy = "a"
weight = 2
expect_error = true
"#;

fn make_report() -> ScenarioReport {
    let config = ScenarioConfig::from_toml(SCENARIO).unwrap();
    run_scenario(&config).unwrap()
}

#[test]
fn json_roundtrip_preserves_report() {
    let report = make_report();
    let json = export_json(&report).unwrap();
    let back = import_json(&json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn newer_schema_version_is_rejected() {
    let mut report = make_report();
    report.schema_version = SCHEMA_VERSION + 1;
    let json = export_json(&report).unwrap();
    let err = import_json(&json).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}

#[test]
fn steps_csv_has_one_row_per_step() {
    let report = make_report();
    let csv = export_steps_csv(&report.steps).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1 + report.steps.len());
    assert!(lines[0].starts_with("step,action,result"));
    // 200 into "a" at bootstrap, 40 stuck in "dead"
    assert!(lines[1].starts_with("0,deposit,ok,200,"));
    // withdrawal of half the units skips the dead adapter
    assert!(lines[2].starts_with("1,withdraw,partial,,100,100,#1,"));
    assert!(lines[4].starts_with("3,set_weight,rejected,"));
}

#[test]
fn strategies_csv_lists_final_state() {
    let report = make_report();
    let csv = export_strategies_csv(&report).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "index,name,weight,enabled,valuation");
    assert_eq!(lines[1], "0,a,1,true,100");
    assert_eq!(lines[2], "1,dead,0,true,40");
}

#[test]
fn markdown_report_mentions_every_strategy() {
    let report = make_report();
    let md = generate_report(&report);
    assert!(md.starts_with("# Scenario Report: export/check"));
    assert!(md.contains("| 0 | a | 1 | yes | 100 |"));
    assert!(md.contains("| 1 | dead | 0 | yes | 40 |"));
    assert!(md.contains("| bob | 10 |"));
}

#[test]
fn save_and_load_artifact_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let report = make_report();

    let paths = save_report(&report, temp_dir.path()).unwrap();
    assert!(paths.manifest.exists());
    assert!(paths.steps_csv.exists());
    assert!(paths.strategies_csv.exists());
    assert!(paths.report_markdown.exists());
    // path separator in the scenario name does not create a subdirectory
    let dirname = paths.dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(dirname.starts_with("export_check_"));

    let loaded = load_report(&paths.dir).unwrap();
    assert_eq!(loaded, report);
}
