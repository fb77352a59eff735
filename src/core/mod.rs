//! Core services and infrastructure

pub mod error;
pub mod error_handling;
pub mod logging;
pub mod retry;
pub mod settings;
pub mod shutdown;
pub mod styles;
pub mod sync;
pub mod version;
