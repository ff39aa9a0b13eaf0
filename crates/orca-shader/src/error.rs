use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranspileError {
    #[error("input shader source is empty")]
    EmptyInput,
    #[error("missing curly braces in shader source")]
    MalformedBraces,
    #[error("{tool} failed ({}){}", fmt_status(.status), fmt_stderr(.stderr))]
    ExternalToolFailure {
        tool: &'static str,
        status: Option<i32>,
        stderr: String,
    },
    #[error("failed to run {tool} at {}: {source}", .path.display())]
    ToolUnavailable {
        tool: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Reported with `success == true` and an empty payload rather than as a failed result.
    #[error("{message}")]
    SoftToolFailure { tool: &'static str, message: String },
    #[error("invalid integer literal `{literal}` in layout qualifier: {source}")]
    IntegerParse {
        literal: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid SPIR-V module: {0}")]
    InvalidBinary(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

/// Flat view of [`TranspileError`] for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyInput,
    MalformedBraces,
    ExternalToolFailure,
    ToolUnavailable,
    SoftToolFailure,
    IntegerParse,
    InvalidBinary,
    Io,
}

impl TranspileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranspileError::EmptyInput => ErrorKind::EmptyInput,
            TranspileError::MalformedBraces => ErrorKind::MalformedBraces,
            TranspileError::ExternalToolFailure { .. } => ErrorKind::ExternalToolFailure,
            TranspileError::ToolUnavailable { .. } => ErrorKind::ToolUnavailable,
            TranspileError::SoftToolFailure { .. } => ErrorKind::SoftToolFailure,
            TranspileError::IntegerParse { .. } => ErrorKind::IntegerParse,
            TranspileError::InvalidBinary(_) => ErrorKind::InvalidBinary,
            TranspileError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Errors raised by the pre-flight validator.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TranspileError::EmptyInput | TranspileError::MalformedBraces
        )
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        TranspileError::Io {
            context: context.into(),
            source,
        }
    }
}

fn fmt_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn fmt_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
