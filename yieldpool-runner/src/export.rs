//! Report export — JSON, CSV, and Markdown artifacts for scenario runs.
//!
//! - **JSON**: the full `ScenarioReport`, with schema versioning
//! - **CSV**: step tape and final per-strategy state
//! - **Markdown**: a human-readable summary
//!
//! Amounts are written as plain integer strings; nothing is rounded.
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::runner::{ScenarioReport, StepOutcome, StepRecord, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &ScenarioReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScenarioReport to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<ScenarioReport> {
    let report: ScenarioReport =
        serde_json::from_str(json).context("failed to deserialize ScenarioReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: step, action, result, units_minted, units_burned,
/// amount_returned, skipped, total_units, pool_value, detail
pub fn export_steps_csv(steps: &[StepRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "step",
        "action",
        "result",
        "units_minted",
        "units_burned",
        "amount_returned",
        "skipped",
        "total_units",
        "pool_value",
        "detail",
    ])?;

    for s in steps {
        let (result, minted, burned, returned, skipped, detail) = match &s.outcome {
            StepOutcome::Deposited {
                units_minted,
                allocations,
            } => (
                "ok",
                units_minted.to_string(),
                String::new(),
                String::new(),
                String::new(),
                allocations
                    .iter()
                    .map(|a| format!("{}={}", a.index, a.amount))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            StepOutcome::Withdrew {
                units_burned,
                amount_returned,
                skipped,
            } => (
                if skipped.is_empty() { "ok" } else { "partial" },
                String::new(),
                units_burned.to_string(),
                amount_returned.to_string(),
                skipped
                    .iter()
                    .map(|k| k.index.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
                String::new(),
            ),
            StepOutcome::Transferred { units } => (
                "ok",
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("units={units}"),
            ),
            StepOutcome::VenueAdjusted { strategy, balance } => (
                "ok",
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("{strategy} balance={balance}"),
            ),
            StepOutcome::StrategyAdded { index } => (
                "ok",
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("index={index}"),
            ),
            StepOutcome::Updated => (
                "ok",
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ),
            StepOutcome::Rejected { error } => (
                "rejected",
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                error.clone(),
            ),
        };

        wtr.write_record([
            s.step.to_string().as_str(),
            &s.action,
            result,
            &minted,
            &burned,
            &returned,
            &skipped,
            &s.total_units.to_string(),
            &s.pool_value.to_string(),
            &detail,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Final registry state: index, name, weight, enabled, valuation.
pub fn export_strategies_csv(report: &ScenarioReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "name", "weight", "enabled", "valuation"])?;
    for s in &report.final_snapshot.strategies {
        wtr.write_record([
            s.index.as_usize().to_string().as_str(),
            &s.name,
            &s.weight.to_string(),
            &s.enabled.to_string(),
            &s.valuation.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(report: &ScenarioReport) -> String {
    let snap = &report.final_snapshot;
    let mut md = String::with_capacity(2048);

    md.push_str(&format!("# Scenario Report: {}\n\n", report.scenario));
    if !report.description.is_empty() {
        md.push_str(&format!("{}\n\n", report.description));
    }

    md.push_str("## Summary\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Scenario Hash | {} |\n", report.scenario_hash));
    md.push_str(&format!(
        "| Steps | {} ({} rejected) |\n",
        report.summary.steps, report.summary.rejected
    ));
    md.push_str(&format!("| Deposited | {} |\n", report.summary.deposited));
    md.push_str(&format!("| Returned | {} |\n", report.summary.returned));
    md.push_str(&format!(
        "| Partial Withdrawals | {} |\n",
        report.summary.partial_withdrawals
    ));
    md.push_str(&format!("| Owner | {} |\n", snap.owner));
    md.push_str(&format!("| Claim Supply | {} |\n", snap.total_units));
    md.push_str(&format!("| Pool Value | {} |\n", snap.pool_value));
    md.push_str(&format!("| Exchange Rate | {:.6} |\n", snap.rate.as_f64()));
    md.push('\n');

    md.push_str("## Strategies\n\n");
    md.push_str("| Index | Name | Weight | Enabled | Valuation |\n");
    md.push_str("| --- | --- | --- | --- | --- |\n");
    for s in &snap.strategies {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            s.index.as_usize(),
            s.name,
            s.weight,
            if s.enabled { "yes" } else { "no" },
            s.valuation
        ));
    }
    md.push('\n');

    if !snap.holders.is_empty() {
        md.push_str("## Holders\n\n");
        md.push_str("| Holder | Units |\n");
        md.push_str("| --- | --- |\n");
        for h in &snap.holders {
            md.push_str(&format!("| {} | {} |\n", h.holder, h.units));
        }
        md.push('\n');
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Paths written by [`save_report`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub dir: PathBuf,
    pub manifest: PathBuf,
    pub steps_csv: PathBuf,
    pub strategies_csv: PathBuf,
    pub report_markdown: PathBuf,
}

/// Save the full artifact set for one scenario run.
///
/// Creates `{scenario}_{hash prefix}/` under `output_dir` containing
/// `manifest.json`, `steps.csv`, `strategies.csv` and `report.md`.
/// Re-running the same scenario overwrites the same directory.
pub fn save_report(report: &ScenarioReport, output_dir: &Path) -> Result<ReportPaths> {
    let prefix = report.scenario_hash.get(..8).unwrap_or(&report.scenario_hash);
    let dirname = format!("{}_{}", sanitize(&report.scenario), prefix);
    let dir = output_dir.join(dirname);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create report dir: {}", dir.display()))?;

    let paths = ReportPaths {
        manifest: dir.join("manifest.json"),
        steps_csv: dir.join("steps.csv"),
        strategies_csv: dir.join("strategies.csv"),
        report_markdown: dir.join("report.md"),
        dir,
    };

    write(&paths.manifest, &export_json(report)?)?;
    write(&paths.steps_csv, &export_steps_csv(&report.steps)?)?;
    write(&paths.strategies_csv, &export_strategies_csv(report)?)?;
    write(&paths.report_markdown, &generate_report(report))?;

    Ok(paths)
}

/// Load a report from a directory written by [`save_report`].
pub fn load_report(dir: &Path) -> Result<ScenarioReport> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
