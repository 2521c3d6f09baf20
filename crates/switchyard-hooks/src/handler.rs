//! The async handler contract and its outcome type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::HookContext;

/// What a handler wants the pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    /// Continue to the next handler, optionally mutating `data`.
    Continue,
    /// Stop the chain here.
    Block,
}

/// What a handler returned (§4.F step 3).
#[derive(Debug, Clone)]
pub struct HookOutcome {
    /// Continue or block.
    pub action: HookAction,
    /// Mutations to shallow-merge into the running payload.
    pub data: serde_json::Value,
}

impl HookOutcome {
    /// Continue with no mutations.
    #[must_use]
    pub fn continue_() -> Self {
        Self {
            action: HookAction::Continue,
            data: serde_json::json!({}),
        }
    }

    /// Continue, merging the given mutations.
    #[must_use]
    pub fn continue_with(data: serde_json::Value) -> Self {
        Self {
            action: HookAction::Continue,
            data,
        }
    }

    /// Block the chain.
    #[must_use]
    pub fn block() -> Self {
        Self {
            action: HookAction::Block,
            data: serde_json::json!({}),
        }
    }
}

/// A handler threw instead of returning normally.
#[derive(Debug, Error)]
#[error("hook handler error: {0}")]
pub struct HookHandlerError(pub String);

/// A registered hook handler.
///
/// Implementations are expected to be cheap to share (`Send + Sync`);
/// long-lived state belongs behind an `Arc` inside the implementing type.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Run the handler body. Timeout enforcement is the dispatcher's job,
    /// not the handler's.
    async fn call(&self, context: &HookContext) -> Result<HookOutcome, HookHandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_with_carries_mutations() {
        let outcome = HookOutcome::continue_with(serde_json::json!({"x": 1}));
        assert_eq!(outcome.action, HookAction::Continue);
        assert_eq!(outcome.data, serde_json::json!({"x": 1}));
    }

    #[test]
    fn block_has_no_mutations() {
        let outcome = HookOutcome::block();
        assert_eq!(outcome.action, HookAction::Block);
    }
}
