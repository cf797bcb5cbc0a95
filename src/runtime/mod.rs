//! Runtime adapters hosting the scheduler's workers.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
