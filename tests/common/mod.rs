use std::path::{Path, PathBuf};

use cloverlens::project::Project;

/// Root directory the fixture reports were generated in.
pub const REPORT_ROOT: &str = "/home/user/project";

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// The fixture project, rooted where the fixture reports expect it.
pub fn fixture_project() -> Project {
    let scanned = Project::scan(&fixtures_dir().join("project"), &["php".to_string()]).unwrap();
    let mut project = Project::new(REPORT_ROOT);
    for file in scanned.files() {
        project.add_file(file.path(), file.content());
    }
    project
}
