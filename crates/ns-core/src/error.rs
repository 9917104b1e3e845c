use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SourceSpan;

pub const CANCELED_ERROR_CODE: &str = "ASYNC_OPERATION_CANCELED";

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct ScriptError {
    pub code: String,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl ScriptError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(
        code: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: Some(span),
        }
    }

    /// Error raised when an async operation observes a cancelled token.
    pub fn canceled() -> Self {
        Self::new(CANCELED_ERROR_CODE, "Async operation was canceled.")
    }

    pub fn is_cancellation(&self) -> bool {
        self.code == CANCELED_ERROR_CODE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A compile-time finding scoped to one line of one script.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub script_name: String,
    pub line_index: usize,
    pub error: ScriptError,
}

impl Diagnostic {
    pub fn error(script_name: &str, line_index: usize, error: ScriptError) -> Self {
        Self {
            severity: Severity::Error,
            script_name: script_name.to_string(),
            line_index,
            error,
        }
    }

    pub fn warning(script_name: &str, line_index: usize, error: ScriptError) -> Self {
        Self {
            severity: Severity::Warning,
            script_name: script_name.to_string(),
            line_index,
            error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} {}",
            self.script_name,
            self.line_index + 1,
            self.severity,
            self.error
        )
    }
}
