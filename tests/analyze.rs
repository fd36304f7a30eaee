mod common;

use cloverlens::analyzer::analyze_bytes;
use cloverlens::annotate::COVERAGE_COUNT;
use cloverlens::metrics::names;
use cloverlens::project::{ElementKind, Project};

#[test]
fn sample_report_end_to_end() {
    let mut project = common::fixture_project();
    let input = std::fs::read(common::fixtures_dir().join("sample_clover.xml")).unwrap();

    let summary = analyze_bytes(&input, &mut project).unwrap();

    assert_eq!(summary.files_annotated, 2);
    assert_eq!(summary.files_skipped, 0);
    assert_eq!(summary.lines_annotated, 7);
    assert!(summary.project_metrics_stored);
    assert_eq!(summary.classes, 1);
    assert_eq!(summary.methods, 2);
    assert_eq!(summary.malformed_fragments, 0);

    let user = project.file("src/User.php").unwrap();
    assert_eq!(user.line_attribute(8, COVERAGE_COUNT), Some(2));
    assert_eq!(user.line_attribute(17, COVERAGE_COUNT), Some(0));
    assert_eq!(user.line_attribute(9, COVERAGE_COUNT), None);
    let helpers = project.file("helpers.php").unwrap();
    assert_eq!(helpers.line_attribute(3, COVERAGE_COUNT), Some(1));

    assert_eq!(project.metric(names::FILES), Some(2));
    assert_eq!(project.metric(names::STATEMENTS), Some(5));
    assert_eq!(project.metric(names::COVERED_STATEMENTS), Some(4));

    // The closure entry is dropped from both method counters.
    let class = project.code_element(ElementKind::Class, "App\\User").unwrap();
    assert_eq!(class.location.as_deref(), Some("src/User.php"));
    assert_eq!(class.metric(names::METHODS), Some(2.0));
    assert_eq!(class.metric(names::COVERED_METHODS), Some(1.0));
    assert_eq!(class.metric(names::COVERAGE), Some(0.75));
    assert_eq!(
        class.children,
        vec!["App\\User::getName".to_string(), "App\\User::setName".to_string()]
    );

    let get_name = project
        .code_element(ElementKind::Method, "App\\User::getName")
        .unwrap();
    assert_eq!(get_name.metric(names::COUNT), Some(2.0));
    assert_eq!(get_name.metric(names::CHANGE_RISK_ANTI_PATTERN), Some(1.0));
    let set_name = project
        .code_element(ElementKind::Method, "App\\User::setName")
        .unwrap();
    assert_eq!(set_name.metric(names::COUNT), Some(0.0));
    assert_eq!(set_name.metric(names::CHANGE_RISK_ANTI_PATTERN), Some(2.0));
    assert_eq!(project.count_elements(ElementKind::Method), 2);
}

#[test]
fn analyzing_twice_gives_the_same_model() {
    let input = std::fs::read(common::fixtures_dir().join("sample_clover.xml")).unwrap();

    let mut once = common::fixture_project();
    analyze_bytes(&input, &mut once).unwrap();

    let mut twice = common::fixture_project();
    analyze_bytes(&input, &mut twice).unwrap();
    analyze_bytes(&input, &mut twice).unwrap();

    assert_eq!(once.metrics(), twice.metrics());
    let once_json = serde_json::to_value(&once).unwrap();
    let twice_json = serde_json::to_value(&twice).unwrap();
    assert_eq!(once_json, twice_json);
}

#[test]
fn empty_file_and_zero_metrics() {
    let input = br#"<?xml version="1.0" encoding="UTF-8"?>
<coverage generated="1700000000">
  <project timestamp="1700000000">
    <package name="Foo">
      <file name="/proj/src/Foo.php">
      </file>
    </package>
    <metrics files="0" loc="0" ncloc="0" classes="0" methods="0" coveredmethods="0" conditionals="0" coveredconditionals="0" statements="0" coveredstatements="0" elements="0" coveredelements="0"/>
  </project>
</coverage>"#;
    let mut project = Project::new("/proj");
    project.add_file("src/Foo.php", "<?php\n");

    let summary = analyze_bytes(input, &mut project).unwrap();

    assert_eq!(summary.files_annotated, 1);
    assert_eq!(project.metrics().len(), 12);
    assert!(project.metrics().values().all(|v| *v == 0));
    assert_eq!(project.code_elements().count(), 0);
    let file = project.file("src/Foo.php").unwrap();
    assert_eq!(file.attributed_lines().count(), 0);
}

#[test]
fn untracked_file_is_skipped() {
    let input = br#"<?xml version="1.0" encoding="UTF-8"?>
<coverage generated="1700000000">
  <project>
    <package name="App">
      <file name="/proj/var/cache/Proxy.php">
        <class name="Proxy" namespace="App">
          <metrics methods="1" coveredmethods="1" conditionals="0" coveredconditionals="0" statements="1" coveredstatements="1" elements="2" coveredelements="2"/>
        </class>
        <line num="3" type="method" name="load" crap="1" count="1"/>
      </file>
      <file name="/proj/src/Real.php">
        <class name="Real" namespace="App">
          <metrics methods="1" coveredmethods="0" conditionals="0" coveredconditionals="0" statements="2" coveredstatements="0" elements="3" coveredelements="0"/>
        </class>
        <line num="3" type="method" name="load" crap="2" count="0"/>
        <line num="4" type="stmt" count="0"/>
      </file>
    </package>
  </project>
</coverage>"#;
    let mut project = Project::new("/proj");
    project.add_file(
        "src/Real.php",
        "<?php\nclass Real {\n  function load() {\n    return null;\n  }\n}\n",
    );

    let summary = analyze_bytes(input, &mut project).unwrap();

    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.files_annotated, 1);
    assert!(project.code_element(ElementKind::Class, "App\\Proxy").is_none());

    let real = project.code_element(ElementKind::Class, "App\\Real").unwrap();
    assert_eq!(real.metric(names::COVERAGE), Some(0.0));
    assert_eq!(real.metric(names::METHODS), Some(1.0));
    assert!(project
        .code_element(ElementKind::Method, "App\\Real::load")
        .is_some());
    let file = project.file("src/Real.php").unwrap();
    assert_eq!(file.line_attribute(4, COVERAGE_COUNT), Some(0));
}

#[test]
fn coverage_ratio_stays_in_unit_interval() {
    let mut project = common::fixture_project();
    let input = std::fs::read(common::fixtures_dir().join("sample_clover.xml")).unwrap();
    analyze_bytes(&input, &mut project).unwrap();

    for class in project
        .code_elements()
        .filter(|e| e.kind == ElementKind::Class)
    {
        let ratio = class.metric(names::COVERAGE).unwrap();
        assert!((0.0..=1.0).contains(&ratio), "{}: {}", class.name, ratio);
    }
}
