//! Core abstractions for the demo execution model.
//!
//! - [`DemoPhase`] - Trait that each protocol phase implements
//! - [`PhaseDescriptor`] - Static index, name and metadata of a phase
//! - [`RunContext`] - Collaborators, keys and artifacts shared across phases
//! - [`PhaseSequencer`] - Runs phases with start/complete boundary events
//! - [`DemoEmitter`] - Typed helpers for publishing demo events
//! - [`Pacing`] - Presentation delays between narrated steps

mod events;
mod execution;
mod pacing;
mod phase;

pub use events::DemoEmitter;
pub use execution::PhaseSequencer;
pub use pacing::{Beat, Pacing, PacingConfig};
pub use phase::{DemoPhase, PhaseDescriptor, RunArtifacts, RunContext};
