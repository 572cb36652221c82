//! Error codes, severities and log markers.
//!
//! # Responsibilities
//! - Let any failure optionally expose a stable error code and a severity
//! - Classify failures into a `Failure` consumable by alerting
//! - Carry an error code on individual log records via `Marker`
//!
//! # Design Decisions
//! - Opting in is one empty `impl ErrorCode for E {}`; the defaults mean
//!   "ERROR, no code"
//! - Boxed errors are classified by searching their `source()` chain for a
//!   `CodedError`

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Alerting severity of a failed unit of work or a coded log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional classification capability of a failure.
pub trait ErrorCode {
    /// Stable machine-readable code, if the failure has one.
    fn error_code(&self) -> Option<&str> {
        None
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl ErrorCode for std::io::Error {}

impl ErrorCode for std::convert::Infallible {}

impl ErrorCode for Box<dyn StdError + Send + Sync> {
    fn error_code(&self) -> Option<&str> {
        find_coded(&**self).map(CodedError::code)
    }

    fn severity(&self) -> Severity {
        find_coded(&**self)
            .map(|coded| coded.severity)
            .unwrap_or(Severity::Error)
    }
}

fn find_coded<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a CodedError> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(coded) = err.downcast_ref::<CodedError>() {
            return Some(coded);
        }
        current = err.source();
    }
    None
}

/// A general purpose failure carrying its own code and severity.
#[derive(Debug)]
pub struct CodedError {
    code: Cow<'static, str>,
    severity: Severity,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CodedError {
    pub fn new(code: impl Into<Cow<'static, str>>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            source: None,
        }
    }

    pub fn warn(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    pub fn error(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, errorCode={}", self.message, self.code)
    }
}

impl StdError for CodedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

impl ErrorCode for CodedError {
    fn error_code(&self) -> Option<&str> {
        Some(&self.code)
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

/// Classification of a failed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub error_code: Option<String>,
    pub severity: Severity,
}

impl Failure {
    /// Classify a failure through its `ErrorCode` capability.
    pub fn classify<E: ErrorCode + ?Sized>(err: &E) -> Self {
        Self {
            error_code: err.error_code().map(str::to_string),
            severity: err.severity(),
        }
    }

    /// A failure that exposes no classification.
    pub fn unclassified() -> Self {
        Self {
            error_code: None,
            severity: Severity::Error,
        }
    }

    pub fn coded(code: impl Into<String>, severity: Severity) -> Self {
        Self {
            error_code: Some(code.into()),
            severity,
        }
    }
}

/// Stable error code attached to a single log record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    error_code: Cow<'static, str>,
}

impl Marker {
    pub fn error_code(code: impl Into<Cow<'static, str>>) -> Self {
        Self {
            error_code: code.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.error_code
    }
}
