//! Hashed timer-wheel scheduler
//!
//! A ring is a fixed number of slots advanced by one slot per tick. Tasks are
//! registered with an offset in ticks; when the cursor reaches a task's slot
//! on its final revolution the task becomes due. All tasks due on one tick
//! are grouped by kind and handed to the executor registered for that kind.
//!
//! # Features
//!
//! - **Single owner**: one loop owns the slots and the registry; callers talk
//!   to it through a bounded event queue
//! - **Bounded waits**: registrations fail with [`RingError::Busy`] instead of
//!   blocking when the queue stays full
//! - **Kind-grouped batches**: one executor call per kind per tick
//! - **Retry**: failed tasks are registered again for the next tick
//! - **Metrics**: Prometheus counters labelled by ring name
//!
//! # Example
//!
//! ```no_run
//! use tick_ring::ring::{executor_fn, ticker, ExecutionOutcome, Ring, RingConfig, TaskRef};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RingConfig::default();
//!     let token = CancellationToken::new();
//!
//!     let ring: Ring<String, u8, String> = Ring::builder(config.clone())
//!         .executor(0, executor_fn(|tick, tasks: Vec<TaskRef<String, u8, String>>| async move {
//!             for task in &tasks {
//!                 println!("{} fired at {}", task.id(), tick);
//!             }
//!             ExecutionOutcome::ok()
//!         }))
//!         .start(&token, ticker(config.tick_interval()))?;
//!
//!     ring.register("report".to_string(), 0, "payload".to_string(), 5).await?;
//!
//!     tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;
//!     ring.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod dispatch;
mod error;
mod executor;
mod hooks;
mod metrics;
mod pool;
mod submit;
mod task;
mod ticker;
mod wheel;

pub use config::{RingConfig, RingConfigBuilder};
pub use core::{Ring, RingBuilder};
pub use error::{RingError, RingResult};
pub use executor::{executor_fn, provider, ExecutionOutcome, Executor, FnExecutor, Provider};
pub use hooks::LogFn;
pub use metrics::{init_ring_metrics, RingMetrics, RING_METRICS};
pub use pool::TaskPool;
pub use submit::Submitter;
pub use task::{Task, TaskId, TaskKind, TaskRef};
pub use ticker::{manual_ticker, ticker, Tick, TickStream};
