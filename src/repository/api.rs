//! Repository API
//!
//! Public surface of the repository subsystem.

pub use crate::repository::acquirer::RepositoryAcquirer;
pub use crate::repository::identifier::{IdentifierKind, RepositoryIdentifier};
pub use crate::repository::store::RepositoryStore;
pub use crate::repository::transport::{GitTransport, RepositoryTransport, TransportError};
pub use crate::repository::types::{AcquireMode, RepositoryReference};
