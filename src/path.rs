use std::path::Path;

use crate::error::{CloverError, Result};

/// Turn an absolute path from the report into a project-relative key by
/// stripping the project root and the separator that follows it.
///
/// Reports are expected to be produced inside the project, so a path outside
/// the root is a malformed report rather than something to guess at.
pub fn relative_path(report_path: &str, root: &Path) -> Result<String> {
    let root_str = root.to_string_lossy();
    let root_str = root_str.trim_end_matches(['/', '\\']);

    let outside = || {
        CloverError::MalformedReport(format!(
            "file '{}' is not inside project root '{}'",
            report_path, root_str
        ))
    };

    let rest = report_path.strip_prefix(root_str).ok_or_else(outside)?;
    let relative = rest
        .strip_prefix('/')
        .or_else(|| rest.strip_prefix('\\'))
        .ok_or_else(outside)?;

    if relative.is_empty() {
        return Err(outside());
    }
    Ok(relative.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_root() {
        let rel = relative_path("/proj/src/Bar.php", Path::new("/proj")).unwrap();
        assert_eq!(rel, "src/Bar.php");
    }

    #[test]
    fn test_root_with_trailing_separator() {
        let rel = relative_path("/proj/src/Bar.php", Path::new("/proj/")).unwrap();
        assert_eq!(rel, "src/Bar.php");
    }

    #[test]
    fn test_unrelated_root_fails() {
        let err = relative_path("/other/src/Bar.php", Path::new("/proj")).unwrap_err();
        assert!(matches!(err, CloverError::MalformedReport(_)));
    }

    #[test]
    fn test_sibling_with_common_prefix_fails() {
        // "/project" starts with "/proj" but is not inside it.
        assert!(relative_path("/project/src/Bar.php", Path::new("/proj")).is_err());
    }

    #[test]
    fn test_root_itself_fails() {
        assert!(relative_path("/proj", Path::new("/proj")).is_err());
    }

    #[test]
    fn test_windows_separators() {
        let rel = relative_path("C:\\proj\\src\\Bar.php", Path::new("C:\\proj")).unwrap();
        assert_eq!(rel, "src/Bar.php");
    }
}
