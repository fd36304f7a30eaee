//! Correlate a parsed report with the project, in document order:
//! line hits per file, then project metrics, then class metrics and method
//! resolution per file.
//!
//! Malformed fragments (project metrics, a class' metrics) are logged and
//! skipped so the rest of the report still lands on the project.

use chrono::SecondsFormat;

use crate::annotate::annotate_lines;
use crate::error::{CloverError, Result};
use crate::methods::FileMethodResolver;
use crate::metrics::{store_class_metrics, store_project_metrics, ClassMetrics};
use crate::model::{ClassNode, CoverageReport, FileNode};
use crate::parsers::clover::CloverParser;
use crate::parsers::Parser;
use crate::path::relative_path;
use crate::project::Project;

/// What one analysis run attached to the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AnalysisSummary {
    /// When the report was generated, as RFC 3339.
    pub report_generated: Option<String>,
    pub files_annotated: usize,
    pub files_skipped: usize,
    pub lines_annotated: usize,
    pub project_metrics_stored: bool,
    pub classes: usize,
    pub methods: usize,
    pub malformed_fragments: usize,
}

/// Parse Clover XML and analyze it against the project.
pub fn analyze_bytes(input: &[u8], project: &mut Project) -> Result<AnalysisSummary> {
    let report = CloverParser.parse(input)?;
    analyze(&report, project)
}

pub fn analyze(report: &CoverageReport, project: &mut Project) -> Result<AnalysisSummary> {
    let mut summary = AnalysisSummary {
        report_generated: report
            .generated
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ..AnalysisSummary::default()
    };

    let mut resolved = Vec::new();
    for (package, file) in report.files() {
        match relative_path(&file.path, project.dir()) {
            Ok(relative) => resolved.push((package, file, relative)),
            Err(err) => {
                tracing::warn!("skipping file: {}", err);
                summary.malformed_fragments += 1;
            }
        }
    }

    for (_, file, relative) in &resolved {
        let tracked = project.file_mut(relative);
        if tracked.is_none() {
            tracing::debug!("skipping untracked file {}", relative);
            summary.files_skipped += 1;
            continue;
        }
        summary.lines_annotated += annotate_lines(tracked, &file.lines);
        summary.files_annotated += 1;
    }

    if let Some(metrics) = &report.project_metrics {
        match store_project_metrics(project, metrics) {
            Ok(()) => summary.project_metrics_stored = true,
            Err(err) => {
                tracing::warn!("skipping project metrics: {}", err);
                summary.malformed_fragments += 1;
            }
        }
    }

    for (package, file, relative) in &resolved {
        if file.classes.is_empty() {
            continue;
        }
        let Some(source) = project.file(relative).map(|f| f.content().to_string()) else {
            continue;
        };
        analyze_file(project, *package, file, relative, &source, &mut summary);
    }

    Ok(summary)
}

/// Store class metrics and resolve methods for every class of one file,
/// sharing one resolver so declarations are attributed to classes in order.
fn analyze_file(
    project: &mut Project,
    package: Option<&str>,
    file: &FileNode,
    relative: &str,
    source: &str,
    summary: &mut AnalysisSummary,
) {
    let mut resolver = FileMethodResolver::new(source, &file.lines);

    for class in &file.classes {
        let class_name = class.qualified_name(package);
        let metrics = match class_metrics(class) {
            Ok(metrics) => metrics,
            Err(err) => {
                // The resolver does not advance past this class, so its
                // declarations go to the next class of the file.
                tracing::warn!(
                    "skipping class {} in {}: {}; its methods may be attributed to the next class",
                    class_name,
                    relative,
                    err
                );
                summary.malformed_fragments += 1;
                continue;
            }
        };

        store_class_metrics(project, &class_name, relative, &metrics);
        let resolution =
            resolver.resolve_class(&class_name, metrics.methods, metrics.covered_methods);
        resolution.apply(project, &class_name, relative);

        summary.classes += 1;
        summary.methods += resolution.methods.len();
    }
}

fn class_metrics(class: &ClassNode) -> Result<ClassMetrics> {
    let metrics = class.metrics.as_ref().ok_or_else(|| {
        CloverError::MalformedReport(format!("class '{}' has no metrics", class.name))
    })?;
    ClassMetrics::from_metrics(metrics)
}
