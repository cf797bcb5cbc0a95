//! Filesystem and telemetry helpers.

pub mod fs;
pub mod telemetry;

pub use fs::{write_atomic, write_json_atomic};
pub use telemetry::init_tracing;
