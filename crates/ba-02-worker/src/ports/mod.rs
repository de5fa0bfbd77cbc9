//! Ports for the worker.

pub mod outbound;

pub use outbound::{Executor, ExecutorFactory};

#[cfg(test)]
pub use outbound::{MockExecutor, MockExecutorFactory};
