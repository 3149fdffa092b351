//! Worker pool driver.
//!
//! The driver re-launches the current executable once per chunk with the
//! chunk's [`WorkerTask`] in the environment. Children share nothing but the
//! output directory, and each owns a disjoint set of archive names.

mod driver;
mod task;

pub use driver::{run_pool, FailedChunk, PoolPlan, PoolReport};
pub use task::{plan_tasks, run_worker_task, WorkerTask, WORKER_TASK_ENV};
