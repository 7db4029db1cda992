//! State module for tracking per-item progress
//!
//! # Components
//!
//! - `AttemptPhase`: the two-attempt retry machine driven by the item processor
//! - `ResultOutcome`: how the final attempt for an input URL ended

mod attempt;
mod outcome;

pub use attempt::AttemptPhase;
pub use outcome::ResultOutcome;
