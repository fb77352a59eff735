//! Poison-aware lock access
//!
//! A panic while a lock is held leaves it poisoned. Shared state in this
//! crate (the repository store maps, the error reporter counters) surfaces
//! that as an `Unknown` [`ScannerError`] rather than panicking again.
//!
//! ```
//! use std::sync::RwLock;
//! use todoscan::core::sync::LockResultExt;
//!
//! let names = RwLock::new(vec!["project".to_string()]);
//! let guard = names.read().or_poisoned("names", "example").unwrap();
//! assert_eq!(guard.len(), 1);
//! ```

use crate::core::error::{ErrorContext, ScannerError, ScannerResult};
use std::sync::LockResult;

/// Convert a poisoned lock result with a caller supplied constructor
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|_| {
        error_constructor(
            "lock poisoned: a panic occurred while another task held it".to_string(),
        )
    })
}

pub trait LockResultExt<T> {
    /// Name the lock and owning component in the resulting error
    fn or_poisoned(self, lock: &str, component: &str) -> ScannerResult<T>;
}

impl<T> LockResultExt<T> for LockResult<T> {
    fn or_poisoned(self, lock: &str, component: &str) -> ScannerResult<T> {
        handle_mutex_poison(self, |message| {
            ScannerError::unknown(format!("{} {}", lock, message))
                .with_context(&ErrorContext::new("lock", component))
        })
    }
}
