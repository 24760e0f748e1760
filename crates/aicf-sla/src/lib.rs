//! SLA evaluation (§4.16) and the slash engine (§4.17): turns measured
//! provider windows into pass/fail decisions, stake penalties, and jails.

pub mod error;
pub mod evaluator;
pub mod slash;
pub mod wilson;

pub use error::SlaError;
pub use evaluator::{evaluate, DimensionResult, SlaDecision, SlaThresholds, WindowMeasurement};
pub use slash::{SlashConfig, SlashEngine, SlashEvent};
pub use wilson::{wilson_lower_bound, Confidence};
