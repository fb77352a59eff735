//! Scanner Error Taxonomy
//!
//! Every failure that crosses a component boundary is a [`ScannerError`]: a
//! classified [`ErrorKind`], a human-readable message, and a correlation id that
//! is unique per occurrence so a user-facing report can be matched against the
//! server-side log line without exposing internal detail.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Classified failure kinds
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
pub enum ErrorKind {
    /// Repository or path does not exist
    NotFound,
    /// Transient transport failure
    NetworkError,
    /// Credentials rejected
    AuthError,
    /// Local path conflict, held lock, or partial clone
    LocalStateError,
    /// A single file could not be read; always recovered by skipping the file
    #[strum(to_string = "ScanIOError")]
    #[serde(rename = "ScanIOError")]
    ScanIoError,
    /// Anything that could not be classified
    Unknown,
}

/// Severity used to pick the log level when an error is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl ErrorKind {
    pub fn severity(self) -> ErrorSeverity {
        match self {
            ErrorKind::NotFound | ErrorKind::ScanIoError => ErrorSeverity::Low,
            ErrorKind::NetworkError | ErrorKind::AuthError | ErrorKind::LocalStateError => {
                ErrorSeverity::Medium
            }
            ErrorKind::Unknown => ErrorSeverity::High,
        }
    }

    /// Generic, actionable text that is safe to show to an end user
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::NotFound => {
                "Repository not found. Please check the repository URL or name and try again."
            }
            ErrorKind::NetworkError => {
                "Network connectivity issue. Please check your connection and retry."
            }
            ErrorKind::AuthError => {
                "Authentication failed. Please check your access permissions for this repository."
            }
            ErrorKind::LocalStateError => {
                "The local copy of this repository is busy or in an inconsistent state. Please try again later."
            }
            ErrorKind::ScanIoError => "A file could not be read and was skipped.",
            ErrorKind::Unknown => {
                "An unexpected error occurred. Please contact support if the issue persists."
            }
        }
    }
}

/// Correlation identifier attached to each error occurrence
///
/// Format: `ERR-<unix seconds>-<8 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("ERR-{}-{}", Utc::now().timestamp(), &uuid[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorContext {
    pub operation: String,
    pub component: String,
    pub repo_url: Option<String>,
    pub file_path: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            ..Self::default()
        }
    }

    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = Some(repo_url.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operation.is_empty() && self.component.is_empty()
    }

    /// Fill the fields this context is missing from `other`
    fn fill_from(&mut self, other: &ErrorContext) {
        if self.operation.is_empty() {
            self.operation = other.operation.clone();
        }
        if self.component.is_empty() {
            self.component = other.component.clone();
        }
        if self.repo_url.is_none() {
            self.repo_url = other.repo_url.clone();
        }
        if self.file_path.is_none() {
            self.file_path = other.file_path.clone();
        }
    }
}

/// A classified failure with a correlation id
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("[{correlation_id}] {kind}: {message}")]
pub struct ScannerError {
    kind: ErrorKind,
    message: String,
    correlation_id: CorrelationId,
    transient: bool,
    context: ErrorContext,
    source_message: Option<String>,
    timestamp: DateTime<Utc>,
}

pub type ScannerResult<T> = Result<T, ScannerError>;

impl ScannerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            correlation_id: CorrelationId::generate(),
            transient: kind == ErrorKind::NetworkError,
            context: ErrorContext::default(),
            source_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthError, message)
    }

    pub fn local_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LocalStateError, message)
    }

    pub fn scan_io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ScanIoError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Mark this failure as transient (a held lock, a timeout)
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Attach a context, keeping any fields already set
    pub fn with_context(mut self, context: &ErrorContext) -> Self {
        self.context.fill_from(context);
        self
    }

    /// Keep the text of the underlying failure for the log
    pub fn with_source(mut self, source: impl fmt::Display) -> Self {
        self.source_message = Some(source.to_string());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn source_message(&self) -> Option<&str> {
        self.source_message.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.kind.severity()
    }

    pub fn display_message(&self) -> &'static str {
        self.kind.user_message()
    }

    /// Only transient network and lock failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        self.transient
            && matches!(
                self.kind,
                ErrorKind::NetworkError | ErrorKind::LocalStateError
            )
    }
}

impl From<std::io::Error> for ScannerError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;
        let scanner_error = match error.kind() {
            IoKind::NotFound => ScannerError::not_found(error.to_string()),
            IoKind::PermissionDenied | IoKind::AlreadyExists => {
                ScannerError::local_state(error.to_string())
            }
            IoKind::TimedOut | IoKind::ConnectionReset | IoKind::ConnectionAborted => {
                ScannerError::network(error.to_string())
            }
            IoKind::WouldBlock => ScannerError::local_state(error.to_string()).transient(),
            _ => ScannerError::unknown(error.to_string()),
        };
        scanner_error.with_source(error)
    }
}
