//! Builders to construct a scheduler from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{build_executor, build_scheduler, build_scheduler_with_executor};
