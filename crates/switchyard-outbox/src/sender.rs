//! Delivering one claimed effect row through its plugin (§4.D step 2).

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use switchyard_core::backoff::backoff_delay;
use switchyard_core::plugin::PluginError;
use switchyard_core::PluginRegistry;
use switchyard_storage::outbox::{self, EffectRow};
use switchyard_storage::plugins::get_plugin_instance;

use crate::error::EffectOutboxResult;

/// Deliver one claimed row and resolve it to a terminal or retry status.
pub async fn deliver(
    pool: &PgPool,
    registry: &dyn PluginRegistry,
    send_timeout: Duration,
    max_attempts: i32,
    row: EffectRow,
) -> EffectOutboxResult<()> {
    let instance = match get_plugin_instance(pool, row.plugin_instance_id).await {
        Ok(instance) => instance,
        Err(err) => {
            outbox::mark_failed(pool, row.id, &format!("plugin instance lookup failed: {err}"))
                .await?;
            return Ok(());
        }
    };

    let Some(plugin) = registry.resolve(&instance.plugin_type) else {
        outbox::mark_failed(
            pool,
            row.id,
            &format!("no handler registered for plugin type {}", instance.plugin_type),
        )
        .await?;
        return Ok(());
    };

    let send = tokio::time::timeout(
        send_timeout,
        plugin.post_response(&row.channel, &row.payload),
    )
    .await;

    match send {
        Err(_elapsed) => {
            outbox::mark_unknown(pool, row.id, "send timed out; acknowledgment lost").await?;
        }
        Ok(Ok(outcome)) => {
            if outcome.acknowledged {
                outbox::mark_sent(pool, row.id, outcome.provider_ref.as_deref()).await?;
            } else {
                outbox::mark_unknown(pool, row.id, "provider did not acknowledge delivery")
                    .await?;
            }
        }
        Ok(Err(PluginError::RetryableSend(message))) => {
            resolve_retryable(pool, &row, max_attempts, &message).await?;
        }
        Ok(Err(PluginError::TerminalSend(message))) => {
            outbox::mark_failed(pool, row.id, &message).await?;
        }
        Ok(Err(other)) => {
            outbox::mark_failed(pool, row.id, &other.to_string()).await?;
        }
    }

    Ok(())
}

async fn resolve_retryable(
    pool: &PgPool,
    row: &EffectRow,
    max_attempts: i32,
    message: &str,
) -> EffectOutboxResult<()> {
    if row.attempt_count < max_attempts {
        let delay = backoff_delay(u32::try_from(row.attempt_count).unwrap_or(u32::MAX));
        let next_attempt_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60));
        outbox::mark_retry(pool, row.id, next_attempt_at, message).await?;
    } else {
        outbox::mark_failed(pool, row.id, message).await?;
    }
    Ok(())
}
