//! Method resolution.
//!
//! PHPUnit reports closures as `type="method"` lines, sometimes under the
//! name of the method enclosing them. A method entry is only accepted when a
//! `function <name>` declaration can be found in the source, scanning
//! forward from the previous match. Rejected entries are subtracted from the
//! class' method counters.
//!
//! A file may declare several classes while the report lists all method
//! lines per file. Each class scans the file from the start; declarations
//! already attributed to an earlier class of the same file are skipped, and
//! rejected entries an earlier class has already subtracted are not
//! subtracted again.

use crate::annotate::saturating_i64;
use crate::metrics::names;
use crate::model::LineHit;
use crate::project::{ElementKind, Project};
use crate::tokenizer::TokenStream;

/// A method entry confirmed against the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCoverage {
    /// `Class::method`
    pub qualified_name: String,
    pub line: u32,
    pub change_risk_anti_pattern: u64,
    pub hit_count: u64,
}

/// Outcome of resolving one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassResolution {
    pub method_count: u64,
    pub covered_method_count: u64,
    pub methods: Vec<MethodCoverage>,
}

impl ClassResolution {
    /// Store the corrected method counters on the class and create one child
    /// element per confirmed method.
    pub fn apply(&self, project: &mut Project, class_name: &str, location: &str) {
        let class = project.get_or_create_code_element(ElementKind::Class, class_name);
        class.set_metric(names::METHODS, self.method_count as f64);
        class.set_metric(names::COVERED_METHODS, self.covered_method_count as f64);
        for method in &self.methods {
            class.add_child(&method.qualified_name);
        }

        for method in &self.methods {
            let element = project.get_or_create_code_element(ElementKind::Method, &method.qualified_name);
            element.set_location(location);
            element.set_metric(
                names::CHANGE_RISK_ANTI_PATTERN,
                saturating_i64(method.change_risk_anti_pattern) as f64,
            );
            element.set_metric(names::COUNT, saturating_i64(method.hit_count) as f64);
        }
    }
}

/// Resolves the classes of one file, in document order.
pub struct FileMethodResolver<'a> {
    tokens: TokenStream,
    method_lines: Vec<&'a LineHit>,
    /// Confirmed methods already attributed to earlier classes of the file.
    added_methods: usize,
    /// Method entries an earlier class has already examined.
    examined_entries: usize,
}

impl<'a> FileMethodResolver<'a> {
    pub fn new(source: &str, lines: &'a [LineHit]) -> Self {
        Self {
            tokens: TokenStream::tokenize(source),
            method_lines: lines.iter().filter(|l| l.is_method()).collect(),
            added_methods: 0,
            examined_entries: 0,
        }
    }

    pub fn added_methods(&self) -> usize {
        self.added_methods
    }

    /// Resolve the next class of the file given its reported method counters.
    pub fn resolve_class(
        &mut self,
        class_name: &str,
        reported_methods: u64,
        reported_covered: u64,
    ) -> ClassResolution {
        let mut resolution = ClassResolution {
            method_count: reported_methods,
            covered_method_count: reported_covered,
            methods: Vec::new(),
        };

        let mut cursor = self.tokens.cursor();
        let mut matched = 0usize;
        let mut examined = self.method_lines.len();

        for (index, line) in self.method_lines.iter().enumerate() {
            let name = line.declared_name.as_deref().unwrap_or_default();
            let found = !name.is_empty() && cursor.find_function_declaration(name).is_some();

            if !found {
                if index >= self.examined_entries {
                    tracing::debug!(
                        "{}: no declaration for method entry '{}' on line {}",
                        class_name,
                        name,
                        line.line_number
                    );
                    resolution.method_count = resolution.method_count.saturating_sub(1);
                    if line.hit_count.unwrap_or(0) > 0 {
                        resolution.covered_method_count =
                            resolution.covered_method_count.saturating_sub(1);
                    }
                }
                continue;
            }

            matched += 1;
            if matched <= self.added_methods {
                // Belongs to an earlier class of this file.
                continue;
            }

            // The reported count includes closures; bound by what is left of
            // it after subtracting the entries rejected so far.
            if resolution.methods.len() as u64 >= resolution.method_count {
                examined = index;
                break;
            }

            resolution.methods.push(MethodCoverage {
                qualified_name: format!("{}::{}", class_name, name),
                line: line.line_number,
                change_risk_anti_pattern: line.change_risk_score.unwrap_or(0),
                hit_count: line.hit_count.unwrap_or(0),
            });
            self.added_methods += 1;
        }

        self.examined_entries = self.examined_entries.max(examined);
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineKind;

    fn method(line_number: u32, name: &str, count: u64) -> LineHit {
        LineHit {
            line_number,
            kind: LineKind::MethodDecl,
            hit_count: Some(count),
            declared_name: Some(name.to_string()),
            change_risk_score: Some(line_number as u64),
        }
    }

    fn stmt(line_number: u32) -> LineHit {
        LineHit {
            line_number,
            kind: LineKind::Statement,
            hit_count: Some(1),
            declared_name: None,
            change_risk_score: None,
        }
    }

    const CLOSURE_SOURCE: &str = r#"<?php
class Person
{
    public function getName()
    {
        return array_map(function ($x) {
            return $x;
        }, [$this->name]);
    }
}
"#;

    #[test]
    fn test_plain_methods() {
        let source = "<?php\nclass A {\n  function one() {}\n  function two() {}\n}\n";
        let lines = vec![method(3, "one", 1), stmt(3), method(4, "two", 0)];
        let mut resolver = FileMethodResolver::new(source, &lines);

        let res = resolver.resolve_class("A", 2, 1);

        assert_eq!(res.method_count, 2);
        assert_eq!(res.covered_method_count, 1);
        let names: Vec<_> = res.methods.iter().map(|m| m.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["A::one", "A::two"]);
        assert_eq!(res.methods[0].change_risk_anti_pattern, 3);
        assert_eq!(res.methods[1].hit_count, 0);
    }

    #[test]
    fn test_covered_closure_with_same_name() {
        let lines = vec![method(4, "getName", 3), method(6, "getName", 2)];
        let mut resolver = FileMethodResolver::new(CLOSURE_SOURCE, &lines);

        let res = resolver.resolve_class("Person", 2, 2);

        assert_eq!(res.methods.len(), 1);
        assert_eq!(res.methods[0].qualified_name, "Person::getName");
        assert_eq!(res.methods[0].line, 4);
        assert_eq!(res.method_count, 1);
        assert_eq!(res.covered_method_count, 1);
    }

    #[test]
    fn test_uncovered_closure_keeps_covered_count() {
        let lines = vec![method(4, "getName", 3), method(6, "getName", 0)];
        let mut resolver = FileMethodResolver::new(CLOSURE_SOURCE, &lines);

        let res = resolver.resolve_class("Person", 2, 1);

        assert_eq!(res.methods.len(), 1);
        assert_eq!(res.method_count, 1);
        assert_eq!(res.covered_method_count, 1);
    }

    #[test]
    fn test_closure_entry_does_not_move_cursor() {
        // The spurious entry comes first; the real declaration must still be
        // found afterwards.
        let source = "<?php\nclass A {\n  function run() {}\n}\n";
        let lines = vec![method(2, "{closure}", 1), method(3, "run", 1)];
        let mut resolver = FileMethodResolver::new(source, &lines);

        let res = resolver.resolve_class("A", 2, 2);

        assert_eq!(res.methods.len(), 1);
        assert_eq!(res.methods[0].qualified_name, "A::run");
        assert_eq!(res.method_count, 1);
        assert_eq!(res.covered_method_count, 1);
    }

    #[test]
    fn test_never_exceeds_reported_method_count() {
        let source = "<?php\nclass A {\n function a() {}\n function b() {}\n function c() {}\n}\n";
        let lines = vec![method(3, "a", 1), method(4, "b", 1), method(5, "c", 1)];
        let mut resolver = FileMethodResolver::new(source, &lines);

        let res = resolver.resolve_class("A", 2, 2);

        assert_eq!(res.methods.len(), 2);
        assert_eq!(res.method_count, 2);
        assert_eq!(resolver.added_methods(), 2);
    }

    #[test]
    fn test_zero_reported_methods() {
        let source = "<?php\nfunction a() {}\n";
        let lines = vec![method(2, "a", 1)];
        let mut resolver = FileMethodResolver::new(source, &lines);

        let res = resolver.resolve_class("A", 0, 0);
        assert!(res.methods.is_empty());
        assert_eq!(res.method_count, 0);
    }

    #[test]
    fn test_counts_do_not_underflow() {
        let source = "<?php\n";
        let lines = vec![method(2, "{closure}", 1), method(3, "{closure}", 1)];
        let mut resolver = FileMethodResolver::new(source, &lines);

        let res = resolver.resolve_class("A", 1, 1);
        assert_eq!(res.method_count, 0);
        assert_eq!(res.covered_method_count, 0);
    }

    #[test]
    fn test_two_classes_in_one_file() {
        let source = r#"<?php
class First
{
    public function alpha()
    {
        return function () {};
    }

    public function beta() {}
}

class Second
{
    public function gamma() {}
}
"#;
        let lines = vec![
            method(4, "alpha", 1),
            method(6, "{closure}", 1),
            method(9, "beta", 0),
            method(14, "gamma", 1),
        ];
        let mut resolver = FileMethodResolver::new(source, &lines);

        let first = resolver.resolve_class("First", 3, 2);
        let names: Vec<_> = first.methods.iter().map(|m| m.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["First::alpha", "First::beta"]);
        assert_eq!(first.method_count, 2);
        assert_eq!(first.covered_method_count, 1);

        let second = resolver.resolve_class("Second", 1, 1);
        let names: Vec<_> = second.methods.iter().map(|m| m.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["Second::gamma"]);
        // The closure was already subtracted from First.
        assert_eq!(second.method_count, 1);
        assert_eq!(second.covered_method_count, 1);
        assert_eq!(resolver.added_methods(), 3);
    }

    #[test]
    fn test_apply_creates_method_elements() {
        let lines = vec![method(4, "getName", 3), method(6, "getName", 2)];
        let mut resolver = FileMethodResolver::new(CLOSURE_SOURCE, &lines);
        let res = resolver.resolve_class("Person", 2, 2);

        let mut project = Project::new("/proj");
        res.apply(&mut project, "Person", "src/Person.php");

        let class = project.code_element(ElementKind::Class, "Person").unwrap();
        assert_eq!(class.metric(names::METHODS), Some(1.0));
        assert_eq!(class.metric(names::COVERED_METHODS), Some(1.0));
        assert_eq!(class.children, vec!["Person::getName".to_string()]);

        let method = project
            .code_element(ElementKind::Method, "Person::getName")
            .unwrap();
        assert_eq!(method.location.as_deref(), Some("src/Person.php"));
        assert_eq!(method.metric(names::COUNT), Some(3.0));
        assert_eq!(method.metric(names::CHANGE_RISK_ANTI_PATTERN), Some(4.0));
    }
}
