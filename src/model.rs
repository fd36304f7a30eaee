//! In-memory representation of a parsed Clover report. The parser produces a
//! `CoverageReport` which the analyzer then correlates against the project.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{CloverError, Result};

/// Compute a coverage ratio, returning 1.0 when the total is zero.
///
/// Classes without statements cannot be tested, so they count as fully
/// covered. The result is clamped so that inconsistent reports (covered
/// greater than total) still land in `[0, 1]`.
#[must_use]
pub fn coverage_ratio(covered: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        (covered as f64 / total as f64).min(1.0)
    }
}

/// Attributes of a `<metrics>` element, kept as raw strings and converted on
/// access so a bad value only fails the fragment that reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    attrs: BTreeMap<String, String>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Read a required non-negative integer attribute.
    pub fn require_u64(&self, name: &str) -> Result<u64> {
        let raw = self.get(name).ok_or_else(|| {
            CloverError::MalformedReport(format!("metrics missing '{}' attribute", name))
        })?;
        raw.trim().parse().map_err(|_| {
            CloverError::MalformedReport(format!(
                "metrics attribute '{}' is not an integer: '{}'",
                name, raw
            ))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metrics = Metrics::new();
        for (k, v) in iter {
            metrics.insert(k, v);
        }
        metrics
    }
}

/// What a `<line>` entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Statement,
    MethodDecl,
    Other,
}

impl LineKind {
    pub fn from_attr(value: &str) -> Self {
        match value {
            "stmt" => LineKind::Statement,
            "method" => LineKind::MethodDecl,
            _ => LineKind::Other,
        }
    }
}

/// A single `<line>` entry of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct LineHit {
    pub line_number: u32,
    pub kind: LineKind,
    pub hit_count: Option<u64>,
    pub declared_name: Option<String>,
    pub change_risk_score: Option<u64>,
}

impl LineHit {
    pub fn is_method(&self) -> bool {
        self.kind == LineKind::MethodDecl
    }
}

/// A `<class>` element with its metrics.
#[derive(Debug, Clone, Default)]
pub struct ClassNode {
    pub name: String,
    pub namespace: Option<String>,
    pub metrics: Option<Metrics>,
}

impl ClassNode {
    /// Fully-qualified class name, preferring the class' own namespace over
    /// the enclosing package name. The pseudo-package `global` is dropped.
    pub fn qualified_name(&self, package: Option<&str>) -> String {
        let namespace = self
            .namespace
            .as_deref()
            .or(package)
            .filter(|ns| !ns.is_empty() && *ns != "global");
        match namespace {
            Some(ns) => format!("{}\\{}", ns.trim_end_matches('\\'), self.name),
            None => self.name.clone(),
        }
    }
}

/// A `<file>` element: its absolute path, classes and ordered line entries.
#[derive(Debug, Clone, Default)]
pub struct FileNode {
    pub path: String,
    pub classes: Vec<ClassNode>,
    pub lines: Vec<LineHit>,
}

impl FileNode {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    pub fn method_lines(&self) -> impl Iterator<Item = &LineHit> {
        self.lines.iter().filter(|l| l.is_method())
    }
}

/// A `<package>` element. Files placed directly under `<project>` are
/// gathered in a package without a name.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub name: Option<String>,
    pub files: Vec<FileNode>,
}

/// The complete result of parsing a Clover report.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub generated: Option<DateTime<Utc>>,
    pub project_metrics: Option<Metrics>,
    pub packages: Vec<Package>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every file in document order, paired with its package name.
    pub fn files(&self) -> impl Iterator<Item = (Option<&str>, &FileNode)> {
        self.packages
            .iter()
            .flat_map(|p| p.files.iter().map(move |f| (p.name.as_deref(), f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_ratio_zero_statements() {
        assert_eq!(coverage_ratio(0, 0), 1.0);
        assert_eq!(coverage_ratio(5, 0), 1.0);
    }

    #[test]
    fn test_coverage_ratio_partial() {
        assert_eq!(coverage_ratio(1, 4), 0.25);
        assert_eq!(coverage_ratio(0, 4), 0.0);
        assert_eq!(coverage_ratio(9, 4), 1.0);
    }

    #[test]
    fn test_require_u64() {
        let metrics: Metrics = [("statements", "12"), ("methods", "x")].into_iter().collect();
        assert_eq!(metrics.require_u64("statements").unwrap(), 12);

        let err = metrics.require_u64("methods").unwrap_err();
        assert!(format!("{}", err).contains("not an integer"));

        let err = metrics.require_u64("elements").unwrap_err();
        assert!(format!("{}", err).contains("missing 'elements'"));
    }

    #[test]
    fn test_qualified_name() {
        let class = ClassNode {
            name: "Foo".to_string(),
            namespace: Some("App\\Model".to_string()),
            metrics: None,
        };
        assert_eq!(class.qualified_name(Some("Other")), "App\\Model\\Foo");

        let class = ClassNode {
            name: "Foo".to_string(),
            namespace: None,
            metrics: None,
        };
        assert_eq!(class.qualified_name(Some("Pkg")), "Pkg\\Foo");
        assert_eq!(class.qualified_name(Some("global")), "Foo");
        assert_eq!(class.qualified_name(None), "Foo");
    }

    #[test]
    fn test_line_kind_from_attr() {
        assert_eq!(LineKind::from_attr("stmt"), LineKind::Statement);
        assert_eq!(LineKind::from_attr("method"), LineKind::MethodDecl);
        assert_eq!(LineKind::from_attr("cond"), LineKind::Other);
    }
}
