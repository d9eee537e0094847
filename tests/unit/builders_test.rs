//! Tests for builder modules

use std::sync::Arc;

use fleet_scheduler::builders::{build_executor, build_scheduler, build_scheduler_with_executor};
use fleet_scheduler::config::{BlockConfig, ExecutorConfig, SchedulerConfig};
use fleet_scheduler::core::SchedulerError;
use fleet_scheduler::runtime::ManualExecutor;

#[test]
fn test_build_scheduler_defaults() {
    let cfg = SchedulerConfig {
        executor: ExecutorConfig::ThreadPool {
            worker_count: Some(1),
        },
        ..SchedulerConfig::default()
    };

    let scheduler = build_scheduler(&cfg, Vec::new()).unwrap();
    assert!(scheduler.is_initialized());
    assert!(scheduler.allocations().is_empty());
}

#[test]
fn test_build_scheduler_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        blocks: vec![BlockConfig {
            name: "empty".into(),
            resources: Vec::new(),
        }],
        ..SchedulerConfig::default()
    };

    let result = build_scheduler_with_executor(&cfg, Arc::new(ManualExecutor::new()), Vec::new());
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[test]
fn test_tokio_executor_needs_runtime() {
    // No runtime is running on a plain test thread.
    assert!(build_executor(&ExecutorConfig::Tokio).is_err());
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_executor_built_inside_runtime() {
    assert!(build_executor(&ExecutorConfig::Tokio).is_ok());
}
