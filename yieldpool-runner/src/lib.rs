//! YieldPool Runner — scenario orchestration and report export.
//!
//! This crate builds on `yieldpool-core` to provide:
//! - TOML scenario files: a pool config plus a scripted list of steps
//! - Scenario execution with a supply-invariant check after every step
//! - Parallel batch runs over many scenario files
//! - JSON / CSV / Markdown report export with schema versioning

pub mod export;
pub mod runner;
pub mod scenario;

pub use export::{
    export_json, export_steps_csv, export_strategies_csv, generate_report, import_json,
    load_report, save_report, ReportPaths,
};
pub use runner::{
    run_file, run_files, run_scenario, RunError, RunSummary, ScenarioReport, StepOutcome,
    StepRecord, SCHEMA_VERSION,
};
pub use scenario::{ScenarioConfig, ScenarioError, Step, StepSpec, StrategyRef};
