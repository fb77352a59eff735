//! Repository acquisition and local storage
//!
//! - [`identifier`]: parsing and normalising repository identifiers
//! - [`store`]: identifier to working-directory mapping with freshness tracking
//! - [`transport`]: clone and fast-forward primitive
//! - [`acquirer`]: clone-or-update with retry and per-repository serialisation

pub mod acquirer;
pub mod api;
pub mod identifier;
pub mod store;
pub mod transport;
pub mod types;
