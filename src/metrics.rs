//! Project- and class-level summary metrics taken from the report.
//!
//! Project counters are stored verbatim, so applying the same report twice
//! leaves the same values behind. Class method counters are not written
//! here: they are only known once closures misreported as methods have been
//! filtered out (see `methods`).

use crate::annotate::saturating_i64;
use crate::error::Result;
use crate::model::{coverage_ratio, Metrics};
use crate::project::{ElementKind, Project};

/// Metric names as stored on the project and its code elements.
pub mod names {
    pub const FILES: &str = "php_code_coverage:files";
    pub const LINES_OF_CODE: &str = "php_code_coverage:lines_of_code";
    pub const NON_COMMENT_LINES_OF_CODE: &str = "php_code_coverage:non_comment_lines_of_code";
    pub const CLASSES: &str = "php_code_coverage:classes";
    pub const METHODS: &str = "php_code_coverage:methods";
    pub const COVERED_METHODS: &str = "php_code_coverage:covered_methods";
    pub const CONDITIONALS: &str = "php_code_coverage:conditionals";
    pub const COVERED_CONDITIONALS: &str = "php_code_coverage:covered_conditionals";
    pub const STATEMENTS: &str = "php_code_coverage:statements";
    pub const COVERED_STATEMENTS: &str = "php_code_coverage:covered_statements";
    pub const ELEMENTS: &str = "php_code_coverage:elements";
    pub const COVERED_ELEMENTS: &str = "php_code_coverage:covered_elements";
    pub const COVERAGE: &str = "php_code_coverage:coverage";
    pub const CHANGE_RISK_ANTI_PATTERN: &str = "php_code_coverage:change_risk_anti_pattern";
    pub const COUNT: &str = "php_code_coverage:count";
}

/// Report attribute → stored project metric.
const PROJECT_METRICS: [(&str, &str); 12] = [
    ("files", names::FILES),
    ("loc", names::LINES_OF_CODE),
    ("ncloc", names::NON_COMMENT_LINES_OF_CODE),
    ("classes", names::CLASSES),
    ("methods", names::METHODS),
    ("coveredmethods", names::COVERED_METHODS),
    ("conditionals", names::CONDITIONALS),
    ("coveredconditionals", names::COVERED_CONDITIONALS),
    ("statements", names::STATEMENTS),
    ("coveredstatements", names::COVERED_STATEMENTS),
    ("elements", names::ELEMENTS),
    ("coveredelements", names::COVERED_ELEMENTS),
];

/// Store the twelve project counters. Nothing is written unless all of them
/// are present and numeric.
pub fn store_project_metrics(project: &mut Project, metrics: &Metrics) -> Result<()> {
    let values = PROJECT_METRICS
        .iter()
        .map(|&(attr, name)| -> Result<(&'static str, u64)> { Ok((name, metrics.require_u64(attr)?)) })
        .collect::<Result<Vec<_>>>()?;

    for (name, value) in values {
        project.set_simple_valued_metric(name, saturating_i64(value));
    }
    Ok(())
}

/// The counters of a class `<metrics>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassMetrics {
    pub methods: u64,
    pub covered_methods: u64,
    pub conditionals: u64,
    pub covered_conditionals: u64,
    pub statements: u64,
    pub covered_statements: u64,
    pub elements: u64,
    pub covered_elements: u64,
}

impl ClassMetrics {
    pub fn from_metrics(metrics: &Metrics) -> Result<Self> {
        Ok(Self {
            methods: metrics.require_u64("methods")?,
            covered_methods: metrics.require_u64("coveredmethods")?,
            conditionals: metrics.require_u64("conditionals")?,
            covered_conditionals: metrics.require_u64("coveredconditionals")?,
            statements: metrics.require_u64("statements")?,
            covered_statements: metrics.require_u64("coveredstatements")?,
            elements: metrics.require_u64("elements")?,
            covered_elements: metrics.require_u64("coveredelements")?,
        })
    }

    #[must_use]
    pub fn coverage_ratio(&self) -> f64 {
        coverage_ratio(self.covered_statements, self.statements)
    }
}

/// Create (or update) the class element and store its counters and ratio.
pub fn store_class_metrics(
    project: &mut Project,
    class_name: &str,
    location: &str,
    metrics: &ClassMetrics,
) {
    let class = project.get_or_create_code_element(ElementKind::Class, class_name);
    class.set_location(location);
    class.set_metric(names::CONDITIONALS, metrics.conditionals as f64);
    class.set_metric(names::COVERED_CONDITIONALS, metrics.covered_conditionals as f64);
    class.set_metric(names::STATEMENTS, metrics.statements as f64);
    class.set_metric(names::COVERED_STATEMENTS, metrics.covered_statements as f64);
    class.set_metric(names::ELEMENTS, metrics.elements as f64);
    class.set_metric(names::COVERED_ELEMENTS, metrics.covered_elements as f64);
    class.set_metric(names::COVERAGE, metrics.coverage_ratio());
}
