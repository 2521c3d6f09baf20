//! `routeWebhook` (§4.A): fetch the plugin instance, decrypt sensitive
//! config fields, delegate to the plugin handler, run the idempotency
//! algorithm, and admit accepted work into the Session Queue.

use std::sync::Arc;

use sqlx::PgPool;

use switchyard_audit::{AuditRecord, AuditSink};
use switchyard_core::{
    DecryptedPluginInstance, Envelope, ParseOutcome, Plugin, PluginError, PluginRegistry,
    PluginInstanceId, QueueKey, WebhookRequest, WorkItemId,
};
use switchyard_crypto::SecretDecoder;
use switchyard_events::{EventBus, PipelineEvent, PipelineEventKind};
use switchyard_hooks::{HookContext, HookDispatcher, HookName};
use switchyard_queue::{EnqueueRequest, SessionQueue};
use switchyard_storage::{plugins, routines, work_items};

use crate::error::IngressResult;

/// Envelope `event_type` tag stamped on every work item ingress admits, for
/// event-triggered routine matching (§4.E). Plugin handlers do not surface
/// a distinct event type of their own today — every accepted work item is
/// one inbox item as far as routines are concerned.
pub const WORK_ITEM_CREATED_EVENT_TYPE: &str = "work_item.created";

/// The outcome of one `routeWebhook` call, shaped for direct translation
/// into the HTTP response body (§6 "Webhook surface").
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// New work item persisted.
    Created {
        /// The newly created work item.
        work_item_id: WorkItemId,
    },
    /// Matched an existing idempotency key.
    Duplicate {
        /// The pre-existing work item.
        work_item_id: WorkItemId,
    },
    /// Accepted but not persisted (policy skip or plugin hook block).
    Ignored {
        /// Stable reason code.
        reason: &'static str,
    },
    /// Rejected before or during parsing.
    Rejected {
        /// Stable reason code.
        reason: &'static str,
    },
    /// The plugin handler preempted with its own synchronous response.
    PluginResponse {
        /// HTTP status the handler asked for.
        status: u16,
        /// Raw response body the handler asked for.
        body: String,
    },
}

/// Collaborators the Ingress Router needs to route one webhook request.
pub struct IngressRouter {
    pool: PgPool,
    plugins: Arc<dyn PluginRegistry>,
    decoder: Arc<dyn SecretDecoder>,
    hooks: Arc<HookDispatcher>,
    events: Arc<EventBus>,
    audit: Arc<dyn AuditSink>,
    queue: SessionQueue,
}

impl IngressRouter {
    /// Build a router over its collaborators.
    #[must_use]
    pub fn new(
        pool: PgPool,
        plugins: Arc<dyn PluginRegistry>,
        decoder: Arc<dyn SecretDecoder>,
        hooks: Arc<HookDispatcher>,
        events: Arc<EventBus>,
        audit: Arc<dyn AuditSink>,
        queue: SessionQueue,
    ) -> Self {
        Self {
            pool,
            plugins,
            decoder,
            hooks,
            events,
            audit,
            queue,
        }
    }

    /// Route one inbound webhook request (§4.A "Operations").
    ///
    /// # Errors
    ///
    /// Returns [`crate::IngressError`] only for storage/queue failures that
    /// are not part of the closed ingress-outcome vocabulary; every
    /// business-level outcome (duplicate, skip, reject) is carried in the
    /// returned [`RouteOutcome`] instead.
    pub async fn route_webhook(
        &self,
        plugin_type: &str,
        plugin_instance_id: PluginInstanceId,
        request: WebhookRequest,
    ) -> IngressResult<RouteOutcome> {
        let Some(handler) = self.plugins.resolve(plugin_type) else {
            return Ok(self.reject(plugin_instance_id, "unknown_plugin_type").await);
        };

        let instance = match plugins::get_plugin_instance(&self.pool, plugin_instance_id).await {
            Ok(instance) => instance,
            Err(switchyard_storage::StorageError::NotFound(_)) => {
                return Ok(self.reject(plugin_instance_id, "unknown_plugin_type").await);
            }
            Err(err) => return Err(err.into()),
        };

        if instance.plugin_type != plugin_type {
            return Ok(self.reject(plugin_instance_id, "plugin_type_mismatch").await);
        }

        if !instance.enabled {
            return Ok(self.skip(plugin_instance_id, None, "instance_disabled").await);
        }

        let decrypted = match self.decrypt_config(handler.as_ref(), &instance.config) {
            Ok(config) => DecryptedPluginInstance { config },
            Err(_) => return Ok(self.reject(plugin_instance_id, "parse_error").await),
        };

        let parsed = match handler.parse_webhook(&request, &decrypted).await {
            Ok(parsed) => parsed,
            Err(PluginError::ParseError(message)) => {
                tracing::warn!(plugin_type, %plugin_instance_id, error = %message, "webhook parse failed");
                return Ok(self.reject(plugin_instance_id, "parse_error").await);
            }
            Err(other) => {
                tracing::warn!(plugin_type, %plugin_instance_id, error = %other, "webhook parse failed");
                return Ok(self.reject(plugin_instance_id, "parse_error").await);
            }
        };

        if let Some(response) = &parsed.webhook_response {
            return Ok(RouteOutcome::PluginResponse {
                status: response.status,
                body: response.body.clone(),
            });
        }

        match parsed.outcome {
            ParseOutcome::Skip { reason, .. } => {
                let code = match reason {
                    switchyard_core::SkipReason::ShouldProcessFalse => "should_process_false",
                    switchyard_core::SkipReason::NoWorkItem => "no_work_item",
                    switchyard_core::SkipReason::InboundPolicyFiltered => {
                        "inbound_policy_filtered"
                    }
                };
                Ok(self.skip(plugin_instance_id, None, code).await)
            }
            ParseOutcome::Process {
                mut work_item,
                idempotency_keys,
                response_context,
                ..
            } => {
                let normalized = normalize_keys(&idempotency_keys);

                if let Some((matched_key, existing_id)) =
                    work_items::find_by_idempotency_keys(&self.pool, &normalized).await?
                {
                    self.emit(
                        PipelineEventKind::WebhookDuplicate,
                        plugin_instance_id,
                        Some(existing_id),
                        serde_json::json!({"status": "duplicate", "matchedKey": matched_key}),
                    )
                    .await;
                    return Ok(RouteOutcome::Duplicate {
                        work_item_id: existing_id,
                    });
                }

                let pre_create = self
                    .hooks
                    .dispatch(
                        HookContext::new(HookName::WorkItemPreCreate, plugin_instance_id)
                            .with_work_item(work_item.id)
                            .with_data(work_item.payload.clone()),
                    )
                    .await;

                if pre_create.blocked {
                    return Ok(self
                        .skip(plugin_instance_id, Some(work_item.id), "blocked_by_plugin_hook")
                        .await);
                }
                work_item.payload = pre_create.data;

                let agent_id = agent_id_for(&instance.config, plugin_type);
                let session_key = work_item.session_key.clone();
                let text = extract_text(&work_item.payload);

                let mut tx = self.pool.begin().await.map_err(switchyard_storage::StorageError::from)?;
                work_items::insert_work_item(&mut tx, &work_item).await?;
                work_items::insert_idempotency_keys(&mut tx, work_item.id, &normalized).await?;
                tx.commit().await.map_err(switchyard_storage::StorageError::from)?;

                let mut detail = serde_json::json!({"status": "accepted"});
                if let Some(context) = response_context {
                    detail["responseContext"] = context;
                }
                self.emit(
                    PipelineEventKind::WebhookAccepted,
                    plugin_instance_id,
                    Some(work_item.id),
                    detail,
                )
                .await;

                self.spawn_post_create(plugin_instance_id, work_item.id, work_item.payload.clone());

                let envelope_json = serde_json::to_value(Envelope::from_work_item(
                    &work_item,
                    WORK_ITEM_CREATED_EVENT_TYPE,
                ))
                .unwrap_or(serde_json::Value::Null);
                if let Err(err) = routines::push_event(&self.pool, &envelope_json).await {
                    tracing::warn!(error = %err, "failed to queue work item for routine evaluation");
                }

                let queue_key = QueueKey::new(&session_key, &agent_id);
                self.queue
                    .enqueue(EnqueueRequest {
                        queue_key,
                        session_key,
                        agent_id,
                        work_item_id: work_item.id,
                        text,
                        sender_name: None,
                    })
                    .await?;

                Ok(RouteOutcome::Created {
                    work_item_id: work_item.id,
                })
            }
        }
    }

    fn decrypt_config(
        &self,
        handler: &dyn Plugin,
        config: &serde_json::Value,
    ) -> Result<serde_json::Value, switchyard_crypto::SecretError> {
        let mut config = config.clone();
        if let Some(object) = config.as_object_mut() {
            for field in handler.sensitive_fields() {
                if let Some(serde_json::Value::String(stored)) = object.get(*field) {
                    let decoded = self.decoder.decode(field, stored)?;
                    object.insert((*field).to_string(), serde_json::Value::String(decoded));
                }
            }
        }
        Ok(config)
    }

    fn spawn_post_create(
        &self,
        plugin_instance_id: PluginInstanceId,
        work_item_id: WorkItemId,
        payload: serde_json::Value,
    ) {
        let hooks = Arc::clone(&self.hooks);
        tokio::spawn(async move {
            hooks
                .dispatch(
                    HookContext::new(HookName::WorkItemPostCreate, plugin_instance_id)
                        .with_work_item(work_item_id)
                        .with_data(payload),
                )
                .await;
        });
    }

    async fn reject(&self, plugin_instance_id: PluginInstanceId, reason: &'static str) -> RouteOutcome {
        self.emit(
            PipelineEventKind::WebhookRejected,
            plugin_instance_id,
            None,
            serde_json::json!({"status": format!("rejected({reason})")}),
        )
        .await;
        RouteOutcome::Rejected { reason }
    }

    async fn skip(
        &self,
        plugin_instance_id: PluginInstanceId,
        work_item_id: Option<WorkItemId>,
        reason: &'static str,
    ) -> RouteOutcome {
        let mut event = PipelineEvent::new(PipelineEventKind::WebhookSkipped)
            .with_plugin_instance(plugin_instance_id)
            .with_detail(serde_json::json!({"status": format!("skipped({reason})")}));
        if let Some(id) = work_item_id {
            event = event.with_work_item(id);
        }
        self.publish(event).await;
        RouteOutcome::Ignored { reason }
    }

    async fn emit(
        &self,
        kind: PipelineEventKind,
        plugin_instance_id: PluginInstanceId,
        work_item_id: Option<WorkItemId>,
        detail: serde_json::Value,
    ) {
        let mut event = PipelineEvent::new(kind)
            .with_plugin_instance(plugin_instance_id)
            .with_detail(detail);
        if let Some(id) = work_item_id {
            event = event.with_work_item(id);
        }
        self.publish(event).await;
    }

    async fn publish(&self, event: PipelineEvent) {
        self.events.publish(event.clone());
        let record = AuditRecord::from_event(&event, None);
        if let Err(err) = self.audit.record(record).await {
            tracing::warn!(error = %err, "failed to persist ingress audit record");
        }
    }
}

/// Normalize idempotency key aliases (§4.A algorithm step 1): trim, drop
/// empty, deduplicate preserving order.
fn normalize_keys(keys: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut normalized = Vec::with_capacity(keys.len());
    for key in keys {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// Resolve which agent a plugin instance's traffic routes to. Plugin
/// instance config carries an optional `agent_id` field for this; instances
/// that don't configure one route to an agent named after the plugin type.
fn agent_id_for(config: &serde_json::Value, plugin_type: &str) -> String {
    config
        .get("agent_id")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .unwrap_or_else(|| plugin_type.to_string())
}

/// Best-effort plain-text rendering of a work item's payload for the
/// Session Queue's coalescing buffer, which operates on display text rather
/// than structured payloads. Prefers a `text` field; falls back to the
/// whole payload rendered as JSON.
fn extract_text(payload: &serde_json::Value) -> String {
    payload
        .get("text")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .unwrap_or_else(|| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keys_trims_drops_empty_and_dedupes() {
        let keys = vec![
            " k1 ".to_string(),
            "k1".to_string(),
            "".to_string(),
            "  ".to_string(),
            "k2".to_string(),
        ];
        assert_eq!(normalize_keys(&keys), vec!["k1".to_string(), "k2".to_string()]);
    }

    #[test]
    fn agent_id_prefers_configured_value() {
        let config = serde_json::json!({"agent_id": "support-bot"});
        assert_eq!(agent_id_for(&config, "discord"), "support-bot");
    }

    #[test]
    fn agent_id_falls_back_to_plugin_type() {
        let config = serde_json::json!({});
        assert_eq!(agent_id_for(&config, "discord"), "discord");
    }

    #[test]
    fn extract_text_prefers_text_field() {
        let payload = serde_json::json!({"text": "hello"});
        assert_eq!(extract_text(&payload), "hello");
    }

    #[test]
    fn extract_text_falls_back_to_whole_payload() {
        let payload = serde_json::json!({"foo": "bar"});
        assert_eq!(extract_text(&payload), payload.to_string());
    }
}
