//! Test harness: a controller on an ephemeral port, workers pointed at it and
//! a tiny page server for the fetch executor.

use async_trait::async_trait;
use axum::extract::Path;
use axum::routing::get;
use axum::Router;
use ba_01_broker::Broker;
use ba_02_worker::{
    CommandLoop, ExecutionError, Executor, ExecutorFactory, FetchExecutorFactory, WorkerConfig,
};
use ba_03_decision_loop::DecisionFunction;
use ba_04_api_gateway::{GatewayConfig, GatewayService};
use serde_json::Value;
use shared_types::CommandMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running controller.
pub struct Controller {
    pub addr: SocketAddr,
    pub broker: Arc<Broker>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Controller {
    pub async fn start(decision: Arc<dyn DecisionFunction>) -> Self {
        let mut config = GatewayConfig::default();
        config.openai.api_key = "sk-test".into();
        config.decision_loop.action_timeout = Duration::from_secs(5);

        let service = GatewayService::new(config, decision).expect("valid config");
        let broker = service.broker();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            service
                .serve_on(listener, async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            broker,
            shutdown: Some(tx),
            handle,
        }
    }

    pub fn agent_endpoint(&self) -> String {
        format!("ws://{}/ws/agent", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), &mut self.handle).await;
    }
}

pub fn worker_config(endpoint: String) -> WorkerConfig {
    WorkerConfig {
        endpoint,
        reconnect_interval: Duration::from_millis(50),
        ..WorkerConfig::default()
    }
}

/// Spawn a worker using the fetch executor.
pub fn spawn_fetch_worker(endpoint: String) -> JoinHandle<()> {
    let factory = FetchExecutorFactory::new(Duration::from_secs(5)).unwrap();
    let worker = CommandLoop::new(worker_config(endpoint), factory);
    tokio::spawn(async move {
        let _ = worker.run().await;
    })
}

/// Spawn a worker using [`StubExecutor`].
pub fn spawn_stub_worker(endpoint: String) -> JoinHandle<()> {
    let worker = CommandLoop::new(worker_config(endpoint), StubExecutorFactory);
    tokio::spawn(async move {
        let _ = worker.run().await;
    })
}

/// Poll until `check` holds or five seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

/// Serve `/page/{name}` returning `<p>{name}</p>`. Returns the base URL.
pub async fn start_page_server() -> String {
    let router = Router::new().route(
        "/page/:name",
        get(|Path(name): Path<String>| async move { format!("<p>{name}</p>") }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Executor with controllable timing: `echo` answers with its arguments,
/// `hang` never answers.
#[derive(Debug, Default)]
pub struct StubExecutor;

#[async_trait]
impl Executor for StubExecutor {
    async fn execute(&mut self, command: &CommandMessage) -> Result<Value, ExecutionError> {
        match command.action.as_str() {
            "echo" => Ok(Value::Object(command.arguments.clone())),
            "hang" => std::future::pending().await,
            other => Err(ExecutionError::UnknownAction(other.to_string())),
        }
    }
}

pub struct StubExecutorFactory;

#[async_trait]
impl ExecutorFactory for StubExecutorFactory {
    type Executor = StubExecutor;

    async fn open(&self) -> Result<StubExecutor, ExecutionError> {
        Ok(StubExecutor)
    }
}

/// Decision function that never acts; for tests that drive the broker directly.
pub struct Idle;

#[async_trait]
impl DecisionFunction for Idle {
    async fn decide(
        &self,
        _state: &ba_03_decision_loop::ActionState,
    ) -> Result<ba_03_decision_loop::Decision, ba_03_decision_loop::DecisionError> {
        Ok(ba_03_decision_loop::Decision::finish("nothing to do"))
    }
}
