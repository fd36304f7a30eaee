//! In-memory project code model: the tracked source files with their line
//! attributes, project-wide metrics, and code elements (classes, methods)
//! that analysis attaches facts to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Class,
    Method,
}

/// A tracked source file.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    path: String,
    #[serde(skip)]
    content: String,
    /// line number → attribute name → value
    line_attributes: BTreeMap<u32, BTreeMap<String, i64>>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            line_attributes: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_line_attribute(&mut self, line: u32, name: &str, value: i64) {
        self.line_attributes
            .entry(line)
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn line_attribute(&self, line: u32, name: &str) -> Option<i64> {
        self.line_attributes.get(&line)?.get(name).copied()
    }

    /// Lines carrying at least one attribute, ascending.
    pub fn attributed_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.line_attributes.keys().copied()
    }
}

/// A class or method known to the project.
#[derive(Debug, Clone, Serialize)]
pub struct CodeElement {
    pub kind: ElementKind,
    pub name: String,
    pub location: Option<String>,
    pub metrics: BTreeMap<String, f64>,
    /// Fully-qualified names of child elements.
    pub children: Vec<String>,
}

impl CodeElement {
    fn new(kind: ElementKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            location: None,
            metrics: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, name: &str) {
        if !self.children.iter().any(|c| c == name) {
            self.children.push(name.to_string());
        }
    }

    pub fn set_location(&mut self, path: &str) {
        self.location = Some(path.to_string());
    }

    pub fn set_metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    dir: PathBuf,
    files: BTreeMap<String, SourceFile>,
    metrics: BTreeMap<String, i64>,
    #[serde(serialize_with = "serialize_elements")]
    elements: BTreeMap<(ElementKind, String), CodeElement>,
}

/// Elements are keyed by `(kind, name)`, which JSON cannot use as a map key.
fn serialize_elements<S: Serializer>(
    elements: &BTreeMap<(ElementKind, String), CodeElement>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(elements.values())
}

impl Project {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: BTreeMap::new(),
            metrics: BTreeMap::new(),
            elements: BTreeMap::new(),
        }
    }

    /// Load every file under `dir` whose extension is in `extensions`,
    /// honouring `.gitignore` and skipping hidden entries.
    pub fn scan(dir: &Path, extensions: &[String]) -> Result<Self> {
        let mut project = Project::new(dir);

        for entry in ignore::WalkBuilder::new(dir).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("walk error: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let tracked = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
            if !tracked {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let bytes = std::fs::read(path)?;
            project.add_file(key, String::from_utf8_lossy(&bytes).into_owned());
        }

        tracing::debug!("tracked {} files under {}", project.files.len(), dir.display());
        Ok(project)
    }

    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        self.files
            .insert(path.clone(), SourceFile::new(path, content));
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(path)
    }

    pub fn file_mut(&mut self, path: &str) -> Option<&mut SourceFile> {
        self.files.get_mut(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn set_simple_valued_metric(&mut self, name: &str, value: i64) {
        self.metrics.insert(name.to_string(), value);
    }

    pub fn metric(&self, name: &str) -> Option<i64> {
        self.metrics.get(name).copied()
    }

    pub fn metrics(&self) -> &BTreeMap<String, i64> {
        &self.metrics
    }

    pub fn get_or_create_code_element(&mut self, kind: ElementKind, name: &str) -> &mut CodeElement {
        self.elements
            .entry((kind, name.to_string()))
            .or_insert_with(|| CodeElement::new(kind, name))
    }

    pub fn code_element(&self, kind: ElementKind, name: &str) -> Option<&CodeElement> {
        self.elements.get(&(kind, name.to_string()))
    }

    pub fn code_elements(&self) -> impl Iterator<Item = &CodeElement> {
        self.elements.values()
    }

    pub fn count_elements(&self, kind: ElementKind) -> usize {
        self.elements.keys().filter(|(k, _)| *k == kind).count()
    }
}
