//! Command handler functions for the cloverlens CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::analyzer::{self, AnalysisSummary};
use crate::config::Config;
use crate::driver::CoverageDriver;
use crate::metrics::names;
use crate::project::{ElementKind, Project};
use crate::runner::TracingSink;

/// Config file looked up in the project directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "cloverlens.toml";

pub fn load_config(project_dir: &Path, config: Option<&Path>) -> Result<Config> {
    match config {
        Some(path) => Ok(Config::load(path)?),
        None => {
            let path = project_dir.join(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                Ok(Config::load(&path)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn cmd_analyze(
    project_dir: &Path,
    report: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<String> {
    let config = load_config(project_dir, config)?;
    let project_dir = project_dir
        .canonicalize()
        .with_context(|| format!("Project directory {} not found", project_dir.display()))?;

    let mut project = Project::scan(&project_dir, &config.extensions)
        .context("Failed to scan project directory")?;

    let content = match report {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read report {}", path.display()))?,
        ),
        None => CoverageDriver::new(config).run(&project_dir, &mut TracingSink)?,
    };

    let Some(content) = content else {
        return Ok("No coverage report produced.\n".to_string());
    };

    let summary = analyzer::analyze_bytes(&content, &mut project)?;

    if json {
        let value = serde_json::json!({
            "summary": summary,
            "project": project,
        });
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(render_text(&summary, &project))
    }
}

fn render_text(summary: &AnalysisSummary, project: &Project) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "Files:      {} annotated, {} untracked",
        summary.files_annotated, summary.files_skipped
    )
    .unwrap();
    writeln!(out, "Lines:      {} annotated", summary.lines_annotated).unwrap();
    if let Some(generated) = &summary.report_generated {
        writeln!(out, "Report:     generated {}", generated).unwrap();
    }

    if let (Some(covered), Some(total)) = (
        project.metric(names::COVERED_STATEMENTS),
        project.metric(names::STATEMENTS),
    ) {
        let rate = crate::model::coverage_ratio(covered.max(0) as u64, total.max(0) as u64);
        writeln!(
            out,
            "Statements: {}/{} ({:.1}%)",
            covered,
            total,
            rate * 100.0
        )
        .unwrap();
    }
    writeln!(out, "Classes:    {}", summary.classes).unwrap();
    writeln!(out, "Methods:    {}", summary.methods).unwrap();
    if summary.malformed_fragments > 0 {
        writeln!(
            out,
            "Skipped:    {} malformed report fragments",
            summary.malformed_fragments
        )
        .unwrap();
    }

    let classes: Vec<_> = project
        .code_elements()
        .filter(|e| e.kind == ElementKind::Class)
        .collect();
    if classes.is_empty() {
        return out;
    }

    writeln!(out).unwrap();
    writeln!(
        out,
        "{:<50} {:>8} {:>8} {:>9}",
        "CLASS", "METHODS", "COVERED", "COVERAGE"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(78)).unwrap();
    for class in classes {
        writeln!(
            out,
            "{:<50} {:>8} {:>8} {:>8.1}%",
            class.name,
            class.metric(names::METHODS).unwrap_or(0.0),
            class.metric(names::COVERED_METHODS).unwrap_or(0.0),
            class.metric(names::COVERAGE).unwrap_or(0.0) * 100.0
        )
        .unwrap();
    }
    out
}
