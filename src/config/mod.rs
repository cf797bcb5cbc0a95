//! Configuration models for the scheduler, endpoint, and operator commands.

pub mod operator;
pub mod scheduler;

pub use operator::{
    AccountsConfig, Cluster, ConnectionConfig, DebugConfig, OperatorConfig, PathsConfig,
};
pub use scheduler::SchedulerConfig;
