//! # End-to-End Agent Runs
//!
//! `POST /api/agent/command` against a running controller, with a real
//! worker fetching pages from a local server. The model is replaced by a
//! scripted decision function.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use async_trait::async_trait;
    use ba_03_decision_loop::{ActionState, Decision, DecisionError, DecisionFunction, ProposedAction};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Visits each URL in turn, one per decision, then finishes.
    struct Browse {
        urls: Vec<String>,
        observed: Mutex<Vec<usize>>,
    }

    impl Browse {
        fn new(urls: Vec<String>) -> Self {
            Self {
                urls,
                observed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DecisionFunction for Browse {
        async fn decide(&self, state: &ActionState) -> Result<Decision, DecisionError> {
            let done = state.records.len();
            self.observed.lock().push(done);
            match self.urls.get(done) {
                Some(url) => Ok(Decision::act(vec![ProposedAction::new(
                    format!("call_{done}"),
                    "goto",
                )
                .with_argument("url", url.as_str())])),
                None => Ok(Decision::finish(format!("Visited {done} pages."))),
            }
        }
    }

    async fn post_command(controller: &Controller, body: Value) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(controller.url("/api/agent/command"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_instruction_drives_worker_until_finished() {
        let pages = start_page_server().await;
        let urls = vec![format!("{pages}/page/one"), format!("{pages}/page/two")];
        let decision = Arc::new(Browse::new(urls.clone()));
        let controller = Controller::start(decision.clone()).await;
        let worker = spawn_fetch_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let (status, body) =
            post_command(&controller, json!({ "prompt": "open both pages" })).await;

        assert_eq!(status, 200);
        assert_eq!(body["termination"], "completed");
        assert_eq!(body["instruction"], "open both pages");
        assert_eq!(body["notes"], json!(["Visited 2 pages."]));

        let steps = body["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        for (step, url) in steps.iter().zip(&urls) {
            assert_eq!(step["action"], "goto");
            assert_eq!(step["arguments"]["url"], url.as_str());
            assert_eq!(step["outcome"]["type"], "completed");
            assert_eq!(step["outcome"]["status"], "success");
            assert_eq!(step["outcome"]["payload"], format!("Navigated to {url}").as_str());
        }

        // Each decision saw the results of every earlier action.
        assert_eq!(*decision.observed.lock(), vec![0, 1, 2]);
        assert_eq!(controller.broker.pending_count(), 0);

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_worker_error_reply_is_recorded_and_run_continues() {
        let controller = Controller::start(Arc::new(Browse::new(vec![
            "not a url".to_string(),
        ])))
        .await;
        let worker = spawn_fetch_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let (status, body) = post_command(&controller, json!({ "prompt": "go" })).await;

        assert_eq!(status, 200);
        assert_eq!(body["termination"], "completed");
        assert_eq!(body["steps"][0]["outcome"]["type"], "completed");
        assert_eq!(body["steps"][0]["outcome"]["status"], "error");
        assert_eq!(body["notes"], json!(["Visited 1 pages."]));

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_no_worker_is_service_unavailable() {
        let controller = Controller::start(Arc::new(Browse::new(Vec::new()))).await;

        let (status, body) = post_command(&controller, json!({ "prompt": "anything" })).await;
        assert_eq!(status, 503);
        assert!(body["error"].as_str().unwrap().contains("not connected"));

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_health_and_pending_view() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_stub_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let client = reqwest::Client::new();
        let health: Value = client
            .get(controller.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let pending: Value = client
            .get(controller.url("/admin/pending"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(pending["connected"], true);
        assert_eq!(pending["pending"], 0);

        worker.abort();
        controller.stop().await;
    }
}
