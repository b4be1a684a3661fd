//! Task orchestration for Flotilla.
//!
//! The coordinator owns the task queue, routes tasks to agents, enforces
//! per-task timeouts and retry budgets, and periodically cleans up terminal
//! results.
//!
//! # Architecture
//!
//! ```text
//! add_task ──> [ TaskQueue (FIFO, priority-biased overflow) ]
//!                      │ pop
//!                      ▼
//!              ┌───────────────┐    route     ┌────────┐
//!              │ dispatch loop │ ───────────> │ Router │
//!              └───────┬───────┘              └────────┘
//!                      │ execute (sequential or spawned, bounded)
//!                      ▼
//!              agent.execute_task ──> TaskResult ──> retry? ──> record
//!
//!              ┌──────────────┐
//!              │ cleanup loop │  retention purge, stale locks
//!              └──────────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod manager;
pub mod queue;
pub mod router;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder, CoordinatorMetrics};
pub use manager::{Evaluation, ExecutionStrategy, Manager, RetryOverrides, Submission};
pub use queue::{Admission, QueueEntry, TaskQueue};
pub use router::TaskRouter;
