//! A configurable test-double [`Plugin`] implementation, for exercising
//! Ingress, the Run Dispatcher, and the Effect Outbox without a real
//! platform integration.

use async_trait::async_trait;
use switchyard_core::{
    ConfigValidation, DecryptedPluginInstance, ParseOutcome, ParseResult, Plugin, PluginCategory,
    PluginError, PluginResult, PostResponseOutcome, SkipReason, WebhookRequest, WorkItem,
};

#[derive(Debug, Clone)]
enum ParseBehavior {
    Process {
        work_item: WorkItem,
        idempotency_keys: Vec<String>,
        ingress_event_id: String,
        response_context: Option<serde_json::Value>,
        actor: Option<switchyard_core::Actor>,
    },
    Skip {
        reason: SkipReason,
        ingress_event_id: String,
    },
    ParseError(String),
}

#[derive(Debug, Clone)]
enum PostResponseBehavior {
    Ack(Option<String>),
    RetryableError(String),
    TerminalError(String),
}

/// A `Plugin` whose `parse_webhook`/`post_response` outcomes are fixed at
/// construction time (builder-style), so a test can assert exactly what
/// Ingress or the Effect Outbox does with a given outcome without standing
/// up a real platform integration.
pub struct StubPlugin {
    plugin_type: String,
    category: PluginCategory,
    parse_behavior: ParseBehavior,
    post_response_behavior: PostResponseBehavior,
}

impl StubPlugin {
    /// A stub that skips every webhook (`SkipReason::NoWorkItem`) and
    /// acknowledges every send, under the given plugin type tag.
    #[must_use]
    pub fn new(plugin_type: impl Into<String>) -> Self {
        Self {
            plugin_type: plugin_type.into(),
            category: PluginCategory::Messaging,
            parse_behavior: ParseBehavior::Skip {
                reason: SkipReason::NoWorkItem,
                ingress_event_id: "stub-event".to_string(),
            },
            post_response_behavior: PostResponseBehavior::Ack(None),
        }
    }

    /// Override the plugin category (builder-style).
    #[must_use]
    pub fn with_category(mut self, category: PluginCategory) -> Self {
        self.category = category;
        self
    }

    /// Make `parse_webhook` return a `Process` outcome for the given work
    /// item, with no idempotency keys and the item's own id as the ingress
    /// event id.
    #[must_use]
    pub fn with_process(mut self, work_item: WorkItem) -> Self {
        let ingress_event_id = work_item.id.to_string();
        self.parse_behavior = ParseBehavior::Process {
            work_item,
            idempotency_keys: Vec::new(),
            ingress_event_id,
            response_context: None,
            actor: None,
        };
        self
    }

    /// Make `parse_webhook` return a `Process` outcome with explicit
    /// idempotency keys and ingress event id.
    #[must_use]
    pub fn with_process_keys(
        mut self,
        work_item: WorkItem,
        idempotency_keys: Vec<String>,
        ingress_event_id: impl Into<String>,
    ) -> Self {
        self.parse_behavior = ParseBehavior::Process {
            work_item,
            idempotency_keys,
            ingress_event_id: ingress_event_id.into(),
            response_context: None,
            actor: None,
        };
        self
    }

    /// Make `parse_webhook` return a `Skip` outcome with the given reason.
    #[must_use]
    pub fn with_skip(mut self, reason: SkipReason) -> Self {
        self.parse_behavior = ParseBehavior::Skip {
            reason,
            ingress_event_id: "stub-event".to_string(),
        };
        self
    }

    /// Make `parse_webhook` fail with [`PluginError::ParseError`].
    #[must_use]
    pub fn with_parse_error(mut self, message: impl Into<String>) -> Self {
        self.parse_behavior = ParseBehavior::ParseError(message.into());
        self
    }

    /// Make `post_response` succeed with the given provider reference.
    #[must_use]
    pub fn with_ack(mut self, provider_ref: Option<String>) -> Self {
        self.post_response_behavior = PostResponseBehavior::Ack(provider_ref);
        self
    }

    /// Make `post_response` fail with [`PluginError::RetryableSend`].
    #[must_use]
    pub fn with_retryable_send_error(mut self, message: impl Into<String>) -> Self {
        self.post_response_behavior = PostResponseBehavior::RetryableError(message.into());
        self
    }

    /// Make `post_response` fail with [`PluginError::TerminalSend`].
    #[must_use]
    pub fn with_terminal_send_error(mut self, message: impl Into<String>) -> Self {
        self.post_response_behavior = PostResponseBehavior::TerminalError(message.into());
        self
    }
}

#[async_trait]
impl Plugin for StubPlugin {
    fn plugin_type(&self) -> &str {
        &self.plugin_type
    }

    fn category(&self) -> PluginCategory {
        self.category
    }

    async fn validate_config(&self, _config: &serde_json::Value) -> ConfigValidation {
        ConfigValidation::ok()
    }

    async fn parse_webhook(
        &self,
        _request: &WebhookRequest,
        _instance: &DecryptedPluginInstance,
    ) -> PluginResult<ParseResult> {
        match &self.parse_behavior {
            ParseBehavior::Process {
                work_item,
                idempotency_keys,
                ingress_event_id,
                response_context,
                actor,
            } => {
                let mut result = ParseResult::process(
                    work_item.clone(),
                    idempotency_keys.clone(),
                    ingress_event_id.clone(),
                );
                if let ParseOutcome::Process {
                    response_context: rc,
                    actor: a,
                    ..
                } = &mut result.outcome
                {
                    *rc = response_context.clone();
                    *a = actor.clone();
                }
                Ok(result)
            }
            ParseBehavior::Skip {
                reason,
                ingress_event_id,
            } => Ok(ParseResult::skip(*reason, ingress_event_id.clone())),
            ParseBehavior::ParseError(message) => {
                Err(PluginError::ParseError(message.clone()))
            }
        }
    }

    async fn post_response(
        &self,
        _channel: &str,
        _payload: &serde_json::Value,
    ) -> PluginResult<PostResponseOutcome> {
        match &self.post_response_behavior {
            PostResponseBehavior::Ack(provider_ref) => Ok(PostResponseOutcome {
                provider_ref: provider_ref.clone(),
                acknowledged: true,
            }),
            PostResponseBehavior::RetryableError(message) => {
                Err(PluginError::RetryableSend(message.clone()))
            }
            PostResponseBehavior::TerminalError(message) => {
                Err(PluginError::TerminalSend(message.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_work_item;

    fn request() -> WebhookRequest {
        WebhookRequest {
            body: Vec::new(),
            headers: std::collections::HashMap::new(),
            query: std::collections::HashMap::new(),
        }
    }

    fn instance() -> DecryptedPluginInstance {
        DecryptedPluginInstance {
            config: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn default_stub_skips() {
        let plugin = StubPlugin::new("discord");
        let result = plugin
            .parse_webhook(&request(), &instance())
            .await
            .unwrap();
        assert!(matches!(result.outcome, ParseOutcome::Skip { .. }));
    }

    #[tokio::test]
    async fn with_process_returns_the_given_work_item() {
        let item = test_work_item();
        let id = item.id;
        let plugin = StubPlugin::new("discord").with_process(item);
        let result = plugin
            .parse_webhook(&request(), &instance())
            .await
            .unwrap();
        match result.outcome {
            ParseOutcome::Process { work_item, .. } => assert_eq!(work_item.id, id),
            ParseOutcome::Skip { .. } => panic!("expected Process"),
        }
    }

    #[tokio::test]
    async fn with_parse_error_surfaces_plugin_error() {
        let plugin = StubPlugin::new("discord").with_parse_error("malformed body");
        let err = plugin.parse_webhook(&request(), &instance()).await;
        assert!(matches!(err, Err(PluginError::ParseError(_))));
    }

    #[tokio::test]
    async fn with_retryable_send_error_surfaces_on_post_response() {
        let plugin = StubPlugin::new("discord").with_retryable_send_error("rate limited");
        let err = plugin.post_response("general", &serde_json::json!({})).await;
        assert!(matches!(err, Err(PluginError::RetryableSend(_))));
    }

    #[tokio::test]
    async fn default_stub_acknowledges_post_response() {
        let plugin = StubPlugin::new("discord");
        let outcome = plugin
            .post_response("general", &serde_json::json!({}))
            .await
            .unwrap();
        assert!(outcome.acknowledged);
    }
}
