//! Incremental scan delivery
//!
//! - [`event`]: the typed wire events
//! - [`session`]: per-scan ordering and running count
//! - [`emitter`]: producer task and the consumer-side stream

pub mod api;
pub mod emitter;
pub mod event;
pub mod session;

pub use emitter::{EventEmitter, EventStream};
pub use event::ScanEvent;
