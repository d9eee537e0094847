//! Build an initialized [`Scheduler`] from [`SchedulerConfig`].

use std::sync::Arc;

use crate::config::{ExecutorConfig, SchedulerConfig};
use crate::core::{
    resource_set, Block, BlockModule, InMemoryAuditSink, Scheduler, SchedulerError, SharedModule,
    TaskExecutor,
};

/// Build the executor selected by the configuration.
///
/// # Errors
///
/// `Executor` if the executor cannot be started (no tokio runtime, thread
/// spawn failure, or the `tokio-runtime` feature is disabled).
pub fn build_executor(cfg: &ExecutorConfig) -> Result<Arc<dyn TaskExecutor>, SchedulerError> {
    match cfg {
        #[cfg(feature = "tokio-runtime")]
        ExecutorConfig::Tokio => Ok(Arc::new(crate::runtime::TokioExecutor::current()?)),
        #[cfg(not(feature = "tokio-runtime"))]
        ExecutorConfig::Tokio => Err(SchedulerError::Executor(
            "tokio executor requires the `tokio-runtime` feature".into(),
        )),
        #[cfg(not(target_arch = "wasm32"))]
        ExecutorConfig::ThreadPool { worker_count } => {
            let executor = match worker_count {
                Some(count) => crate::runtime::ThreadPoolExecutor::new(*count)?,
                None => crate::runtime::ThreadPoolExecutor::with_default_workers()?,
            };
            Ok(Arc::new(executor))
        }
        #[cfg(target_arch = "wasm32")]
        ExecutorConfig::ThreadPool { .. } => Err(SchedulerError::Executor(
            "thread pool executor is not available on wasm32".into(),
        )),
    }
}

/// Build and initialize a scheduler, creating the configured executor.
///
/// Configured blocks are enforced by a [`BlockModule`] placed ahead of
/// `extra_modules`.
///
/// # Errors
///
/// `Config` if the configuration is invalid, `Executor` if the executor
/// cannot be started.
pub fn build_scheduler(
    cfg: &SchedulerConfig,
    extra_modules: Vec<SharedModule>,
) -> Result<Scheduler, SchedulerError> {
    cfg.validate()
        .map_err(|e| SchedulerError::Config(format!("config invalid: {e}")))?;
    let executor = build_executor(&cfg.executor)?;
    build_scheduler_with_executor(cfg, executor, extra_modules)
}

/// Build and initialize a scheduler on a caller-provided executor.
///
/// A configured `log_filter` installs the default subscriber with that
/// filter, unless the process already has one.
///
/// # Errors
///
/// `Config` if the configuration is invalid.
pub fn build_scheduler_with_executor(
    cfg: &SchedulerConfig,
    executor: Arc<dyn TaskExecutor>,
    extra_modules: Vec<SharedModule>,
) -> Result<Scheduler, SchedulerError> {
    cfg.validate()
        .map_err(|e| SchedulerError::Config(format!("config invalid: {e}")))?;
    if let Some(filter) = &cfg.log_filter {
        crate::util::init_tracing_with_filter(filter);
    }

    let mut modules: Vec<SharedModule> = Vec::with_capacity(extra_modules.len() + 1);
    if !cfg.blocks.is_empty() {
        let blocks = cfg
            .blocks
            .iter()
            .map(|b| Block::new(b.name.clone(), resource_set(&b.resources)))
            .collect();
        modules.push(Arc::new(BlockModule::new(blocks)));
    }
    modules.extend(extra_modules);

    let mut scheduler = Scheduler::new(executor, modules);
    if let Some(capacity) = cfg.audit_capacity {
        scheduler = scheduler.with_audit(Box::new(InMemoryAuditSink::new(capacity)));
    }
    scheduler.initialize();
    Ok(scheduler)
}
