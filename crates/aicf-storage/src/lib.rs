//! Storage interface for the AICF job queue and its in-memory reference
//! implementation. No concrete database backend ships here — persistence
//! backends are treated as an external collaborator behind [`Storage`].

pub mod error;
pub mod job;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use job::{JobRecord, Lease, ProofRef, ProofRefKind};
pub use memory::MemoryStorage;
pub use traits::{ExpireStats, Storage};
