use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Malformed coverage report: {0}")]
    MalformedReport(String),

    #[error("Command '{command}' failed with exit code {exit_code}:\n{output}")]
    ProcessFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Command '{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("Command '{command}' produced no output for {idle_timeout:?}")]
    IdleTimeout {
        command: String,
        idle_timeout: Duration,
    },

    #[error("Coverage environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CloverError>;
