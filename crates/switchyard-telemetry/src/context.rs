//! Request-scoped correlation IDs threaded through tracing spans, so a
//! work item's whole path through ingress, queue, dispatch, and outbox can
//! be filtered on one field.

use tracing::Span;
use uuid::Uuid;

/// A correlation context for one unit of work moving through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    component: String,
    correlation_id: Uuid,
    operation: Option<String>,
}

impl RequestContext {
    /// Start a new context for `component`, minting a fresh correlation id.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            correlation_id: Uuid::new_v4(),
            operation: None,
        }
    }

    /// Continue an existing correlation id (e.g. a work item's id), rather
    /// than minting a new one.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Record which operation this context covers (builder-style).
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The correlation id threaded through this context's span.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Build the `tracing` span this context describes. Entering it attaches
    /// `component`, `correlation_id`, and (if set) `operation` to every event
    /// recorded until the guard drops.
    #[must_use]
    pub fn span(&self) -> Span {
        match &self.operation {
            Some(operation) => tracing::info_span!(
                "request",
                component = %self.component,
                correlation_id = %self.correlation_id,
                operation = %operation,
            ),
            None => tracing::info_span!(
                "request",
                component = %self.component,
                correlation_id = %self.correlation_id,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_correlation_id_overrides_the_minted_one() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::new("ingress").with_correlation_id(id);
        assert_eq!(ctx.correlation_id(), id);
    }

    #[test]
    fn distinct_contexts_mint_distinct_ids() {
        let a = RequestContext::new("ingress");
        let b = RequestContext::new("ingress");
        assert_ne!(a.correlation_id(), b.correlation_id());
    }
}
