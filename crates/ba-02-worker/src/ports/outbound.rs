//! Outbound (Driven) ports for the worker.
//!
//! The executor is the capability that actually performs an action against
//! the automated session.

use crate::domain::ExecutionError;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::CommandMessage;

/// Performs actions against one stateful session.
///
/// Calls are strictly serial: the command loop awaits each `execute` before
/// reading the next frame.
#[async_trait]
pub trait Executor: Send {
    /// Run one action.
    ///
    /// # Returns
    /// - `Ok(details)`: reported with `status: success`
    /// - `Err(ResourceUnusable)`: reported, then the session is torn down
    /// - `Err(_)`: reported with `status: error`, session continues
    async fn execute(&mut self, command: &CommandMessage) -> Result<Value, ExecutionError>;

    /// Release the session. Called once when the connection ends.
    async fn shutdown(&mut self) {}
}

/// Builds a fresh executor for every connection.
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    type Executor: Executor;

    async fn open(&self) -> Result<Self::Executor, ExecutionError>;
}

/// Mock executor for testing.
///
/// Understands `echo` (returns its arguments), `fail` (ordinary failure) and
/// `crash` (resource unusable).
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockExecutor {
    pub executed: Vec<String>,
    pub shut_down: bool,
}

#[cfg(test)]
#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&mut self, command: &CommandMessage) -> Result<Value, ExecutionError> {
        self.executed.push(command.action.clone());
        match command.action.as_str() {
            "echo" => Ok(Value::Object(command.arguments.clone())),
            "fail" => Err(ExecutionError::failed("fail", "boom")),
            "crash" => Err(ExecutionError::ResourceUnusable("Target closed".into())),
            other => Err(ExecutionError::UnknownAction(other.to_string())),
        }
    }

    async fn shutdown(&mut self) {
        self.shut_down = true;
    }
}

/// Counts how many sessions were opened.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockExecutorFactory {
    pub opened: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[async_trait]
impl ExecutorFactory for MockExecutorFactory {
    type Executor = MockExecutor;

    async fn open(&self) -> Result<MockExecutor, ExecutionError> {
        self.opened
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(MockExecutor::default())
    }
}
