//! Configuration models for the scheduler, its executor and built-in modules.

pub mod scheduler;

pub use scheduler::{BlockConfig, ExecutorConfig, SchedulerConfig, CONFIG_PATH_ENV};
