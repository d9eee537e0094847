//! Task executor adapters: Tokio, dedicated worker threads, and a manual
//! executor for deterministic runs.

pub mod manual;
#[cfg(not(target_arch = "wasm32"))]
pub mod thread_pool;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_executor;

pub use manual::ManualExecutor;
#[cfg(not(target_arch = "wasm32"))]
pub use thread_pool::ThreadPoolExecutor;
#[cfg(feature = "tokio-runtime")]
pub use tokio_executor::TokioExecutor;
