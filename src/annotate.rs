use crate::model::LineHit;
use crate::project::SourceFile;

/// Line attribute holding the raw hit count reported for a line.
pub const COVERAGE_COUNT: &str = "coverage_count";

/// Copy per-line hit counts onto a tracked file. Returns how many lines were
/// annotated; an untracked file is a no-op.
pub fn annotate_lines(file: Option<&mut SourceFile>, lines: &[LineHit]) -> usize {
    let Some(file) = file else {
        return 0;
    };

    let mut annotated = 0;
    for line in lines {
        if let Some(count) = line.hit_count {
            file.set_line_attribute(line.line_number, COVERAGE_COUNT, saturating_i64(count));
            annotated += 1;
        }
    }
    annotated
}

pub(crate) fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
