//! Primitive identifiers and value types shared across every AICF crate.
//!
//! IDs are fixed-size byte arrays printed as lowercase hex, never base58 —
//! the wire format and the storage layer both key on hex strings.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! hex_id {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn from_bytes(b: [u8; $len]) -> Self {
                Self(b)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, AicfIdError> {
                let bytes = hex::decode(s).map_err(|_| AicfIdError::NotHex(s.to_string()))?;
                if bytes.len() != $len {
                    return Err(AicfIdError::WrongLength {
                        expected: $len,
                        actual: bytes.len(),
                    });
                }
                let mut arr = [0u8; $len];
                arr.copy_from_slice(&bytes);
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}…)", stringify!($name), &self.to_hex()[..8.min(self.to_hex().len())])
            }
        }

        impl TryFrom<String> for $name {
            type Error = AicfIdError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::from_hex(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_hex()
            }
        }
    };
}

hex_id!(JobId, 32, "Identifies a queued job for its whole lifetime.");
hex_id!(ProviderId, 32, "Identifies a registered compute provider.");
hex_id!(TaskId, 32, "Deterministic task id assigned at enqueue time.");
hex_id!(
    LeaseId,
    32,
    "Identifies a single lease grant; new on every (re)assignment."
);
hex_id!(EscrowId, 32, "Identifies an open or closed escrow hold.");

#[derive(Debug, thiserror::Error)]
pub enum AicfIdError {
    #[error("value is not valid hex: {0}")]
    NotHex(String),
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// A 64-char lowercase hex nullifier, domain-separated by the proof system.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier(pub String);

impl Nullifier {
    pub fn new(s: impl Into<String>) -> Result<Self, AicfIdError> {
        let s = s.into();
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AicfIdError::WrongLength {
                expected: 64,
                actual: s.len(),
            });
        }
        Ok(Self(s.to_lowercase()))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({}…)", &self.0[..16])
    }
}

/// Base-unit token amount (nano-tokens). All settlement math is integer.
pub type TokenAmount = u128;

/// Chain height used for epoch indexing, stake unlocks and leases.
pub type BlockHeight = u64;

/// Unix-millisecond timestamp used on the wire and in storage.
pub type TimestampMs = i64;

/// Fractional unix-second timestamp, used internally by heartbeat/slash decay
/// math that naturally wants `float` seconds rather than integer
/// milliseconds.
pub type TimestampSecs = f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Ai,
    Quantum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Gold,
    Premium,
    Standard,
}

impl Tier {
    /// Lower is better; unknown/missing tiers are treated as Standard.
    pub fn score(&self) -> u8 {
        match self {
            Tier::Gold => 0,
            Tier::Premium => 1,
            Tier::Standard => 2,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Standard
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Assigned,
    Completed,
    Failed,
    Expired,
    Canceled,
    Tombstoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderStatus {
    Registered,
    Active,
    Paused,
    Jailed,
    Inactive,
    Retired,
}

/// Provider capability bitset. A provider with `AI | QUANTUM` is eligible
/// for either job kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(pub u8);

impl Capability {
    pub const NONE: Capability = Capability(0);
    pub const AI: Capability = Capability(0b01);
    pub const QUANTUM: Capability = Capability(0b10);

    pub fn required_for(kind: JobKind) -> Capability {
        match kind {
            JobKind::Ai => Capability::AI,
            JobKind::Quantum => Capability::QUANTUM,
        }
    }

    pub fn contains(&self, other: Capability) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Capability {
    type Output = Capability;
    fn bitor(self, rhs: Capability) -> Capability {
        Capability(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for Capability {
    type Output = Capability;
    fn bitand(self, rhs: Capability) -> Capability {
        Capability(self.0 & rhs.0)
    }
}
