//! An [`AgentRunner`] that delegates to an external agent-inference service
//! over HTTP (spec's agent inference layer: "Out of scope (external
//! collaborators)"). This crate only owns the request/response shuttle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use switchyard_dispatcher::{AgentRunner, EffectRequest, RunError, RunOutcome, RunRequest};

/// Calls `POST {base_url}/v1/runs` with the dispatch request and expects a
/// JSON body shaped like [`RunResponse`] back.
pub struct HttpAgentRunner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentRunner {
    /// Build a runner posting against `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunPayload<'a> {
    dispatch_id: String,
    queue_key: &'a str,
    work_item_id: String,
    agent_id: &'a str,
    session_key: &'a str,
    coalesced_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    effects: Vec<EffectPayload>,
    #[serde(default)]
    detail: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EffectPayload {
    effect_key: String,
    plugin_instance_id: uuid::Uuid,
    channel: String,
    kind: String,
    payload: serde_json::Value,
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunError> {
        let payload = RunPayload {
            dispatch_id: request.dispatch_id.to_string(),
            queue_key: request.queue_key.as_str(),
            work_item_id: request.work_item_id.to_string(),
            agent_id: &request.agent_id,
            session_key: request.session_key.as_str(),
            coalesced_text: &request.coalesced_text,
        };

        let response = self
            .client
            .post(format!("{}/v1/runs", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|err| RunError::retryable(err.to_string()))?;

        if !response.status().is_success() {
            let retryable = response.status().is_server_error();
            let status = response.status();
            return Err(if retryable {
                RunError::retryable(format!("agent runner returned {status}"))
            } else {
                RunError::terminal(format!("agent runner returned {status}"))
            });
        }

        let body: RunResponse = response
            .json()
            .await
            .map_err(|err| RunError::terminal(format!("malformed agent response: {err}")))?;

        Ok(RunOutcome {
            effects: body
                .effects
                .into_iter()
                .map(|effect| EffectRequest {
                    effect_key: effect.effect_key,
                    plugin_instance_id: switchyard_core::PluginInstanceId::from_uuid(
                        effect.plugin_instance_id,
                    ),
                    channel: effect.channel,
                    kind: effect.kind,
                    payload: effect.payload,
                })
                .collect(),
            detail: body.detail,
        })
    }
}
