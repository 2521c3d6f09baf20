//! The [`AuditSink`] trait and an in-memory implementation for tests and
//! single-process deployments. The durable Postgres-backed implementation
//! lives in `switchyard-storage`, which depends on this crate rather than
//! the other way around.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::entry::{AuditQuery, AuditRecord};
use crate::error::AuditResult;

/// Durable sink for [`AuditRecord`]s.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist a single record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Store`] if the backing store rejects
    /// the write.
    async fn record(&self, record: AuditRecord) -> AuditResult<()>;

    /// Query persisted records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Store`] if the backing store rejects
    /// the read.
    async fn query(&self, filter: &AuditQuery) -> AuditResult<Vec<AuditRecord>>;
}

/// An in-memory [`AuditSink`], for tests and for running without a
/// database configured.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    /// Construct an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> AuditResult<()> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn query(&self, filter: &AuditQuery) -> AuditResult<Vec<AuditRecord>> {
        let records = self.records.lock().await;
        let mut matched: Vec<AuditRecord> = records
            .iter()
            .rev()
            .filter(|r| {
                filter
                    .plugin_instance_id
                    .map_or(true, |id| r.plugin_instance_id == Some(id))
                    && filter.kind.as_deref().map_or(true, |k| r.kind == k)
                    && filter.since.map_or(true, |since| r.created_at >= since)
            })
            .cloned()
            .collect();

        if filter.limit > 0 {
            matched.truncate(filter.limit as usize);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::PluginInstanceId;
    use switchyard_events::{PipelineEvent, PipelineEventKind};

    fn sample(kind: PipelineEventKind, plugin: PluginInstanceId) -> AuditRecord {
        AuditRecord::from_event(&PipelineEvent::new(kind).with_plugin_instance(plugin), None)
    }

    #[tokio::test]
    async fn records_round_trip_newest_first() {
        let sink = InMemoryAuditSink::new();
        let plugin = PluginInstanceId::new();
        sink.record(sample(PipelineEventKind::Load, plugin))
            .await
            .unwrap();
        sink.record(sample(PipelineEventKind::HookReceipt, plugin))
            .await
            .unwrap();

        let all = sink.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, "hook");
        assert_eq!(all[1].kind, "load");
    }

    #[tokio::test]
    async fn query_filters_by_plugin_and_kind() {
        let sink = InMemoryAuditSink::new();
        let plugin_a = PluginInstanceId::new();
        let plugin_b = PluginInstanceId::new();
        sink.record(sample(PipelineEventKind::AutoDisable, plugin_a))
            .await
            .unwrap();
        sink.record(sample(PipelineEventKind::AutoDisable, plugin_b))
            .await
            .unwrap();

        let filter = AuditQuery {
            plugin_instance_id: Some(plugin_a),
            ..Default::default()
        };
        let matched = sink.query(&filter).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].plugin_instance_id, Some(plugin_a));
    }

    #[tokio::test]
    async fn query_respects_limit() {
        let sink = InMemoryAuditSink::new();
        let plugin = PluginInstanceId::new();
        for _ in 0..5 {
            sink.record(sample(PipelineEventKind::Load, plugin))
                .await
                .unwrap();
        }
        let filter = AuditQuery {
            limit: 2,
            ..Default::default()
        };
        assert_eq!(sink.query(&filter).await.unwrap().len(), 2);
    }
}
