//! Events API
//!
//! Public surface of the event delivery system.

pub use crate::events::emitter::{EventEmitter, EventStream};
pub use crate::events::event::ScanEvent;
pub use crate::events::session::{ScanSession, SessionStatus};
