//! Error handling at component boundaries
//!
//! Safe-execution wrappers turn any failure (or panic) into a classified
//! `ScannerError`; the reporter logs each surfaced error once.

use crate::core::error::{ErrorContext, ErrorSeverity, ScannerError, ScannerResult};
use crate::core::sync::LockResultExt;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;

/// Boxed error accepted by the safe-execution wrappers
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Convert any boxed failure into a classified error for `context`
///
/// A `ScannerError` keeps its classification and correlation id; anything
/// else becomes `Unknown` with the original message preserved.
pub fn classify_boxed(error: BoxedError, context: &ErrorContext) -> ScannerError {
    match error.downcast::<ScannerError>() {
        Ok(scanner_error) => (*scanner_error).with_context(context),
        Err(other) => {
            let message = other.to_string();
            ScannerError::unknown(message.clone())
                .with_source(message)
                .with_context(context)
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}

/// Run a fallible operation so the caller always receives a typed result
///
/// # Examples
/// ```rust
/// use todoscan::core::error::{ErrorContext, ErrorKind};
/// use todoscan::core::error_handling::safe_execute;
///
/// let context = ErrorContext::new("parse_port", "config");
/// let result = safe_execute(&context, || "eighty".parse::<u16>());
/// assert_eq!(result.unwrap_err().kind(), ErrorKind::Unknown);
/// ```
pub fn safe_execute<T, E, F>(context: &ErrorContext, operation: F) -> ScannerResult<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<BoxedError>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(operation)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(classify_boxed(error.into(), context)),
        Err(payload) => Err(ScannerError::unknown(panic_message(payload)).with_context(context)),
    }
}

/// Async variant of [`safe_execute`]
pub async fn safe_execute_async<T, E, Fut>(context: &ErrorContext, operation: Fut) -> ScannerResult<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxedError>,
{
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(classify_boxed(error.into(), context)),
        Err(payload) => Err(ScannerError::unknown(panic_message(payload)).with_context(context)),
    }
}

/// Convert a failed blocking task into a classified error
pub fn from_join_error(error: tokio::task::JoinError, context: &ErrorContext) -> ScannerError {
    let message = if error.is_panic() {
        panic_message(error.into_panic())
    } else {
        format!("Task execution failed: {}", error)
    };
    ScannerError::unknown(message).with_context(context)
}

/// Logs every surfaced error once and tracks how often each kind occurs
#[derive(Debug, Default)]
pub struct ErrorReporter {
    counts: Mutex<HashMap<String, usize>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `error` at a level matching its severity and count it
    pub fn report(&self, error: &ScannerError) {
        let context = error.context();
        let mut line = format!("[{}] {}", error.correlation_id(), error.message());
        if !context.is_empty() {
            line.push_str(&format!(
                " | Operation: {} | Component: {}",
                context.operation, context.component
            ));
        }
        if let Some(source) = error.source_message() {
            log::debug!("[{}] caused by: {}", error.correlation_id(), source);
        }

        match error.severity() {
            ErrorSeverity::High => log::error!("{}", line),
            ErrorSeverity::Medium => log::warn!("{}", line),
            ErrorSeverity::Low => log::info!("{}", line),
        }

        let key = format!("{}:{}", error.kind(), context.operation);
        match self.counts.lock().or_poisoned("counts", "error_reporter") {
            Ok(mut counts) => *counts.entry(key).or_insert(0) += 1,
            Err(e) => log::debug!("Error statistics unavailable: {}", e),
        }
    }

    /// Snapshot of error counts keyed by `<kind>:<operation>`
    pub fn stats(&self) -> HashMap<String, usize> {
        self.counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }
}
