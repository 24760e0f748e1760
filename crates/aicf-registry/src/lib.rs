//! Provider registry, staking, and heartbeat-driven health scoring.

pub mod allowlist;
pub mod error;
pub mod heartbeat;
pub mod provider;
pub mod registry;
pub mod staking;

pub use allowlist::Allowlist;
pub use error::RegistryError;
pub use heartbeat::{HealthStatus, HeartbeatConfig, HeartbeatMonitor, ProviderHeartbeatState};
pub use provider::{PendingUnlock, ProviderRecord};
pub use registry::Registry;
pub use staking::{StakeMinimums, StakingConfig};
