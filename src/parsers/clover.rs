/// Parser for Clover XML coverage reports as written by PHPUnit.
///
///   <coverage generated="1700000000">
///     <project timestamp="...">
///       <package name="App">
///         <file name="/abs/path/src/Foo.php">
///           <class name="Foo" namespace="App">
///             <metrics methods="2" coveredmethods="1" statements="5" .../>
///           </class>
///           <line num="7" type="method" name="getName" crap="1" count="3"/>
///           <line num="9" type="stmt" count="3"/>
///           <metrics loc="20" .../>
///         </file>
///       </package>
///       <file name="/abs/path/functions.php">...</file>
///       <metrics files="2" loc="40" ncloc="30" classes="1" .../>
///     </project>
///   </coverage>
///
/// Notes:
///   - PHPUnit writes the absolute path into `name`; other generators use
///     `path`. We prefer `path` when available.
///   - Method entries are `<line type="method">` carrying the declared
///     `name` and a CRAP score, not separate `<method>` elements.
///   - Only the `<metrics>` that are direct children of `<project>` and
///     `<class>` are kept; package and file metrics are derivable.
use chrono::{DateTime, TimeZone, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{get_attr, xml_err, Parser};
use crate::error::{CloverError, Result};
use crate::model::*;

/// Clover XML format parser.
pub struct CloverParser;

impl Parser for CloverParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageReport> {
        parse(input)
    }
}

/// Parse Clover XML coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageReport> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut report = CoverageReport::new();
    let mut buf = Vec::new();

    // Names of the currently open elements, used to find a <metrics> parent.
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    let mut seen_project = false;

    let mut current_package: Option<Package> = None;
    let mut current_file: Option<FileNode> = None;
    let mut current_class: Option<ClassNode> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name().as_ref().to_vec();

                if !seen_root {
                    if name != b"coverage" {
                        return Err(CloverError::MalformedReport(format!(
                            "expected <coverage> root element, found <{}>",
                            String::from_utf8_lossy(&name)
                        )));
                    }
                    seen_root = true;
                    report.generated = get_attr(e, b"generated").and_then(|v| timestamp(&v));
                }

                match name.as_slice() {
                    b"project" => seen_project = true,
                    b"package" => {
                        let package = Package {
                            name: get_attr(e, b"name"),
                            files: Vec::new(),
                        };
                        if is_start_event {
                            current_package = Some(package);
                        } else {
                            report.packages.push(package);
                        }
                    }
                    b"file" => {
                        let path = get_attr(e, b"path")
                            .or_else(|| get_attr(e, b"name"))
                            .unwrap_or_default();
                        let file = FileNode::new(path);
                        if is_start_event {
                            current_file = Some(file);
                        } else {
                            push_file(&mut report, current_package.as_mut(), file);
                        }
                    }
                    b"class" => {
                        let class = ClassNode {
                            name: get_attr(e, b"name").unwrap_or_default(),
                            namespace: get_attr(e, b"namespace"),
                            metrics: None,
                        };
                        if is_start_event {
                            current_class = Some(class);
                        } else if let Some(file) = current_file.as_mut() {
                            file.classes.push(class);
                        }
                    }
                    b"line" => {
                        if let (Some(file), Some(line)) = (current_file.as_mut(), parse_line(e)) {
                            file.lines.push(line);
                        }
                    }
                    b"metrics" => {
                        let parent = stack.last().map(Vec::as_slice);
                        match parent {
                            Some(b"project") if report.project_metrics.is_none() => {
                                report.project_metrics = Some(attr_metrics(e));
                            }
                            Some(b"class") => {
                                if let Some(class) = current_class.as_mut() {
                                    class.metrics = Some(attr_metrics(e));
                                }
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }

                if is_start_event {
                    stack.push(name);
                }
            }
            Ok(Event::End(ref e)) => {
                stack.pop();
                match e.name().as_ref() {
                    b"class" => {
                        if let (Some(file), Some(class)) = (current_file.as_mut(), current_class.take()) {
                            file.classes.push(class);
                        }
                    }
                    b"file" => {
                        if let Some(file) = current_file.take() {
                            push_file(&mut report, current_package.as_mut(), file);
                        }
                    }
                    b"package" => {
                        if let Some(package) = current_package.take() {
                            report.packages.push(package);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    // Handle unclosed elements
    if let Some(file) = current_file.take() {
        push_file(&mut report, current_package.as_mut(), file);
    }
    if let Some(package) = current_package.take() {
        report.packages.push(package);
    }

    if !seen_project {
        return Err(CloverError::MalformedReport(
            "report has no <project> element".to_string(),
        ));
    }

    Ok(report)
}

/// Attach a finished file to its package, or to the trailing unnamed package
/// when it sits directly under `<project>`.
fn push_file(report: &mut CoverageReport, package: Option<&mut Package>, mut file: FileNode) {
    if !file.lines.windows(2).all(|w| w[0].line_number <= w[1].line_number) {
        file.lines.sort_by_key(|l| l.line_number);
    }
    match package {
        Some(package) => package.files.push(file),
        None => match report.packages.last_mut() {
            Some(last) if last.name.is_none() => last.files.push(file),
            _ => report.packages.push(Package {
                name: None,
                files: vec![file],
            }),
        },
    }
}

fn parse_line(e: &BytesStart) -> Option<LineHit> {
    let mut num: Option<u32> = None;
    let mut kind = LineKind::Other;
    let mut hit_count: Option<u64> = None;
    let mut declared_name: Option<String> = None;
    let mut change_risk_score: Option<u64> = None;

    for attr in e.attributes().flatten() {
        let Ok(value) = attr.unescape_value() else {
            continue;
        };
        match attr.key.as_ref() {
            b"num" => num = value.trim().parse().ok(),
            b"type" => kind = LineKind::from_attr(&value),
            b"count" => hit_count = value.trim().parse().ok(),
            b"name" => declared_name = Some(value.into_owned()),
            b"crap" => change_risk_score = parse_score(&value),
            _ => {}
        }
    }

    Some(LineHit {
        line_number: num?,
        kind,
        hit_count,
        declared_name,
        change_risk_score,
    })
}

/// CRAP scores are integers in older PHPUnit releases and decimals in newer
/// ones; both are rounded to the nearest integer.
fn parse_score(value: &str) -> Option<u64> {
    let value = value.trim();
    value.parse::<u64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}

fn attr_metrics(e: &BytesStart) -> Metrics {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8(attr.key.local_name().as_ref().to_vec()).ok()?;
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

fn timestamp(value: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = value.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}
