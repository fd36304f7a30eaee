//! Run the project's test suite with Clover output enabled and collect the
//! report it writes.

use std::path::Path;

use crate::config::Config;
use crate::error::{CloverError, Result};
use crate::runner::{self, OutputSink};

pub struct CoverageDriver {
    config: Config,
}

impl CoverageDriver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The full test command for a report written to `report_path`.
    pub fn test_command(&self, report_path: &Path) -> String {
        let mut command = format!(
            "{} --coverage-clover {}",
            self.config.test_command,
            shell_quote(&report_path.to_string_lossy())
        );
        if let Some(config_path) = &self.config.config_path {
            command.push_str(" --configuration ");
            command.push_str(&shell_quote(config_path));
        }
        command
    }

    /// Fail unless a coverage driver is available to the test command.
    pub fn check_environment(&self, project_dir: &Path, sink: &mut dyn OutputSink) -> Result<()> {
        let probe = &self.config.coverage_probe;
        let out = runner::run(
            probe,
            project_dir,
            self.config.timeout,
            self.config.idle_timeout,
            sink,
        )?;
        if !out.success() {
            return Err(CloverError::EnvironmentUnavailable(format!(
                "no code coverage driver found (xdebug or pcov); probe '{}' exited with {}",
                probe, out.exit_code
            )));
        }
        Ok(())
    }

    /// Run the tests and return the raw Clover report.
    ///
    /// Returns `Ok(None)` when the run succeeded but wrote no report, and
    /// `ProcessFailed` when it failed without writing one. A failing run that
    /// still wrote a report is logged and its report returned.
    pub fn run(&self, project_dir: &Path, sink: &mut dyn OutputSink) -> Result<Option<Vec<u8>>> {
        self.check_environment(project_dir, sink)?;

        let report_file = tempfile::Builder::new()
            .prefix("cloverlens-")
            .suffix(".xml")
            .tempfile()?;
        let command = self.test_command(report_file.path());

        let out = runner::run(
            &command,
            project_dir,
            self.config.timeout,
            self.config.idle_timeout,
            sink,
        )?;

        let content = std::fs::read(report_file.path())?;
        interpret_report(&command, out.exit_code, &out.output, content)
    }
}

/// Decide what an exit code and report content amount to.
pub fn interpret_report(
    command: &str,
    exit_code: i32,
    output: &str,
    content: Vec<u8>,
) -> Result<Option<Vec<u8>>> {
    let empty = content.iter().all(u8::is_ascii_whitespace);
    match (empty, exit_code) {
        (true, 0) => {
            tracing::info!("'{}' produced no coverage report", command);
            Ok(None)
        }
        (true, _) => Err(CloverError::ProcessFailed {
            command: command.to_string(),
            exit_code,
            output: output.to_string(),
        }),
        (false, 0) => Ok(Some(content)),
        (false, _) => {
            tracing::warn!(
                "'{}' exited with {}; using the coverage report it wrote",
                command,
                exit_code
            );
            Ok(Some(content))
        }
    }
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/._-+=:,".contains(&b))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
