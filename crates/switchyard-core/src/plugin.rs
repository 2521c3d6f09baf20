//! The plugin handler interface (§6 "Plugin handler interface").
//!
//! Plugin loading, sandboxing, and manifest validation are external
//! collaborators (§1 "Out of scope") — this module only defines the
//! contract Ingress and the Effect Outbox consume once a plugin is loaded.
//! Optional methods resolve to explicit no-ops rather than member misses,
//! per the typed-target design note in §9.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::WorkItemId;
use crate::work_item::{Actor, WorkItem};

/// Broad category a plugin belongs to, for admin UIs and trust policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    /// Chat platforms (Discord, Slack, etc.).
    Messaging,
    /// Source control / CI platforms (GitHub, GitLab, etc.).
    Code,
    /// Everything else (calendars, trackers, etc.).
    Productivity,
}

/// Errors a plugin handler can report back to the Ingress Router or Effect
/// Outbox.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The webhook body could not be parsed.
    #[error("parse error: {0}")]
    ParseError(String),
    /// The plugin instance's config failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Delivery of an effect failed and should be retried.
    #[error("retryable send failure: {0}")]
    RetryableSend(String),
    /// Delivery of an effect failed terminally.
    #[error("non-retryable send failure: {0}")]
    TerminalSend(String),
}

/// Convenience alias for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Result of [`Plugin::validate_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValidation {
    /// Whether the config is acceptable.
    pub valid: bool,
    /// Human-readable validation errors, if any.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ConfigValidation {
    /// A config that passed validation.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A config that failed validation with the given messages.
    #[must_use]
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// A synchronous response a plugin handler can hand straight back to the
/// caller of `routeWebhook`, for platforms that demand an inline
/// acknowledgment (e.g. a challenge-response handshake).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// HTTP status code to return.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// Why a handler chose not to process an inbound webhook, for the
/// `skipped(...)` reason family in §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The handler's `should_process` check returned false.
    ShouldProcessFalse,
    /// The handler did not produce a work item draft.
    NoWorkItem,
    /// An inbound policy filter dropped the event (e.g. bot-authored).
    InboundPolicyFiltered,
}

/// The outcome of [`Plugin::parse_webhook`] — whether ingress should
/// continue to persist a work item.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// Proceed: persist the draft work item under the given idempotency
    /// keys.
    Process {
        /// Draft work item to persist (session key, payload, etc. already
        /// resolved by the handler).
        work_item: Box<WorkItem>,
        /// Ordered idempotency key aliases, pre-normalization.
        idempotency_keys: Vec<String>,
        /// Primary event ID for ingress-event logging.
        ingress_event_id: String,
        /// Opaque context carried forward to the run (e.g. reply target).
        response_context: Option<serde_json::Value>,
        /// Actor envelope, if the handler resolved one.
        actor: Option<Actor>,
    },
    /// Skip: do not persist a work item.
    Skip {
        /// Why processing was skipped.
        reason: SkipReason,
        /// Primary event ID, for logging the skip.
        ingress_event_id: String,
    },
}

/// Full result of parsing one webhook request, including any synchronous
/// response the platform demands.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// What Ingress should do with this event.
    pub outcome: ParseOutcome,
    /// Synchronous body to hand straight back to the caller, bypassing the
    /// router's default `{created/duplicate/ignored}` body.
    pub webhook_response: Option<WebhookResponse>,
}

impl ParseResult {
    /// Build a `Process` result with no synchronous override.
    #[must_use]
    pub fn process(
        work_item: WorkItem,
        idempotency_keys: Vec<String>,
        ingress_event_id: impl Into<String>,
    ) -> Self {
        Self {
            outcome: ParseOutcome::Process {
                work_item: Box::new(work_item),
                idempotency_keys,
                ingress_event_id: ingress_event_id.into(),
                response_context: None,
                actor: None,
            },
            webhook_response: None,
        }
    }

    /// Build a `Skip` result.
    #[must_use]
    pub fn skip(reason: SkipReason, ingress_event_id: impl Into<String>) -> Self {
        Self {
            outcome: ParseOutcome::Skip {
                reason,
                ingress_event_id: ingress_event_id.into(),
            },
            webhook_response: None,
        }
    }

    /// Attach a synchronous webhook response (builder-style).
    #[must_use]
    pub fn with_webhook_response(mut self, response: WebhookResponse) -> Self {
        self.webhook_response = Some(response);
        self
    }
}

/// Raw inbound webhook request handed to [`Plugin::parse_webhook`].
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Raw request body bytes.
    pub body: Vec<u8>,
    /// Lower-cased header map.
    pub headers: HashMap<String, String>,
    /// Query string parameters.
    pub query: HashMap<String, String>,
}

/// An already-decrypted plugin instance, handed to handlers so they never
/// see ciphertext.
#[derive(Debug, Clone)]
pub struct DecryptedPluginInstance {
    /// The plugin instance's opaque config, with sensitive fields
    /// decrypted in place.
    pub config: serde_json::Value,
}

/// The typed plugin handler contract (§6).
///
/// Implementations are expected to be cheap to construct and safe to share
/// across requests (`Send + Sync`); long-lived state belongs behind an
/// `Arc` inside the implementing type.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin type tag (e.g. `"discord"`, `"github"`), matched
    /// against the plugin instance's configured `type` by the Ingress
    /// Router before any parsing happens.
    fn plugin_type(&self) -> &str;

    /// Broad category, for admin UIs and trust policy.
    fn category(&self) -> PluginCategory;

    /// Field names within this plugin's config that must be decrypted via
    /// the pluggable secret decoder before use. Defaults to none.
    fn sensitive_fields(&self) -> &[&str] {
        &[]
    }

    /// Validate a plugin instance's configuration.
    async fn validate_config(&self, config: &serde_json::Value) -> ConfigValidation;

    /// Parse an inbound webhook request into a [`ParseResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ParseError`] if the body cannot be
    /// interpreted at all (§4.A "Parser throws -> 500").
    async fn parse_webhook(
        &self,
        request: &WebhookRequest,
        instance: &DecryptedPluginInstance,
    ) -> PluginResult<ParseResult>;

    /// Deliver an effect payload on the given channel.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::RetryableSend`] for transient failures and
    /// [`PluginError::TerminalSend`] for failures that will never succeed
    /// on retry.
    async fn post_response(
        &self,
        channel: &str,
        payload: &serde_json::Value,
    ) -> PluginResult<PostResponseOutcome>;

    /// Hook handlers this plugin registers, keyed by hook name. Defaults
    /// to none — a plugin with no `hooks` entry is simply never consulted
    /// by the Hook Pipeline.
    fn hook_names(&self) -> &[&str] {
        &[]
    }
}

/// Successful [`Plugin::post_response`] result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponseOutcome {
    /// Provider-assigned reference for this delivery (e.g. a message ID),
    /// used for reconciliation and idempotent replay.
    pub provider_ref: Option<String>,
    /// Whether the provider acknowledged the send, or delivery status is
    /// unknown (transport succeeded but ack was lost).
    pub acknowledged: bool,
}

/// Resolves a plugin instance's stable `type` tag to its loaded handler
/// (§4.A "Contract", §4.D step 2). Plugin loading itself — reading
/// manifests, sandboxing untrusted code — is an external collaborator
/// (§1 "Out of scope"); this seam only covers looking up an
/// already-loaded handler by type, shared by the Ingress Router and the
/// Effect Outbox.
pub trait PluginRegistry: Send + Sync {
    /// Look up the handler registered for `plugin_type`, if any.
    fn resolve(&self, plugin_type: &str) -> Option<std::sync::Arc<dyn Plugin>>;
}

/// A fixed, in-memory [`PluginRegistry`] keyed by [`Plugin::plugin_type`].
/// Sufficient for a process that loads its plugin set once at startup;
/// hot-reloading a plugin set is out of scope (§1 "Non-goals").
#[derive(Default, Clone)]
pub struct StaticPluginRegistry {
    handlers: std::collections::HashMap<String, std::sync::Arc<dyn Plugin>>,
}

impl StaticPluginRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, keyed by its own [`Plugin::plugin_type`]
    /// (builder-style). A later call with the same type replaces the
    /// earlier one.
    #[must_use]
    pub fn with_handler(mut self, handler: std::sync::Arc<dyn Plugin>) -> Self {
        self.handlers
            .insert(handler.plugin_type().to_string(), handler);
        self
    }
}

impl PluginRegistry for StaticPluginRegistry {
    fn resolve(&self, plugin_type: &str) -> Option<std::sync::Arc<dyn Plugin>> {
        self.handlers.get(plugin_type).cloned()
    }
}

/// Used by the Ingress Router to stamp an ingress event with a stable
/// reason code even when nothing went through `Plugin::parse_webhook`
/// (e.g. unknown plugin type).
pub fn work_item_id_or_none(outcome: &ParseOutcome) -> Option<WorkItemId> {
    match outcome {
        ParseOutcome::Process { work_item, .. } => Some(work_item.id),
        ParseOutcome::Skip { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PluginInstanceId, SessionKey};

    fn sample_work_item() -> WorkItem {
        WorkItem::new(
            PluginInstanceId::new(),
            SessionKey::new("chatsvc:1"),
            "chatsvc",
            "hi",
            serde_json::Value::Null,
        )
    }

    #[test]
    fn process_result_carries_work_item() {
        let result = ParseResult::process(sample_work_item(), vec!["k1".into()], "evt-1");
        match result.outcome {
            ParseOutcome::Process {
                idempotency_keys, ..
            } => assert_eq!(idempotency_keys, vec!["k1".to_string()]),
            ParseOutcome::Skip { .. } => panic!("expected Process"),
        }
    }

    #[test]
    fn skip_result_carries_reason() {
        let result = ParseResult::skip(SkipReason::ShouldProcessFalse, "evt-2");
        match result.outcome {
            ParseOutcome::Skip { reason, .. } => {
                assert_eq!(reason, SkipReason::ShouldProcessFalse);
            }
            ParseOutcome::Process { .. } => panic!("expected Skip"),
        }
    }

    #[test]
    fn work_item_id_or_none_extracts_id() {
        let item = sample_work_item();
        let id = item.id;
        let result = ParseResult::process(item, vec![], "evt-3");
        assert_eq!(work_item_id_or_none(&result.outcome), Some(id));

        let skip = ParseResult::skip(SkipReason::NoWorkItem, "evt-4");
        assert_eq!(work_item_id_or_none(&skip.outcome), None);
    }

    #[test]
    fn config_validation_helpers() {
        assert!(ConfigValidation::ok().valid);
        let invalid = ConfigValidation::invalid(vec!["bad field".into()]);
        assert!(!invalid.valid);
        assert_eq!(invalid.errors, vec!["bad field".to_string()]);
    }

    struct StubPlugin(&'static str);

    #[async_trait]
    impl Plugin for StubPlugin {
        fn plugin_type(&self) -> &str {
            self.0
        }

        fn category(&self) -> PluginCategory {
            PluginCategory::Messaging
        }

        async fn validate_config(&self, _config: &serde_json::Value) -> ConfigValidation {
            ConfigValidation::ok()
        }

        async fn parse_webhook(
            &self,
            _request: &WebhookRequest,
            _instance: &DecryptedPluginInstance,
        ) -> PluginResult<ParseResult> {
            Ok(ParseResult::skip(SkipReason::NoWorkItem, "stub"))
        }

        async fn post_response(
            &self,
            _channel: &str,
            _payload: &serde_json::Value,
        ) -> PluginResult<PostResponseOutcome> {
            Ok(PostResponseOutcome {
                provider_ref: None,
                acknowledged: true,
            })
        }
    }

    #[test]
    fn static_registry_resolves_by_plugin_type() {
        let registry = StaticPluginRegistry::new()
            .with_handler(std::sync::Arc::new(StubPlugin("discord")))
            .with_handler(std::sync::Arc::new(StubPlugin("github")));

        assert!(registry.resolve("discord").is_some());
        assert!(registry.resolve("github").is_some());
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn static_registry_later_registration_replaces_earlier() {
        let registry = StaticPluginRegistry::new()
            .with_handler(std::sync::Arc::new(StubPlugin("discord")))
            .with_handler(std::sync::Arc::new(StubPlugin("discord")));
        assert_eq!(registry.resolve("discord").unwrap().plugin_type(), "discord");
    }
}
