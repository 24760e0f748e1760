//! Shared primitives for the AI Compute Fund workspace: hex identifiers,
//! token/height/timestamp aliases, the root error taxonomy, and the
//! cross-component event union.

pub mod error;
pub mod event;
pub mod types;

pub use error::AicfError;
pub use event::AicfEvent;
pub use types::*;

pub type AicfResult<T> = Result<T, AicfError>;
