//! Builders wiring configuration to runtime components.

pub mod scheduler_builder;

pub use scheduler_builder::{build_scheduler, start_scheduler};
