//! The `unknown`-row reconciliation sweep (§4.D step 3).

use async_trait::async_trait;

use switchyard_storage::outbox::EffectRow;

/// Confirms delivery of an `unknown` effect by polling the provider
/// out-of-band. A `None` result means "still unconfirmed, try again next
/// sweep" — this trait never asserts delivery failed, since a provider
/// poll that errors or times out says nothing about the original send.
///
/// §4.D step 3 also names a second reconciliation path: a later ingress
/// event carrying the same `provider_ref` resolving an `unknown` row
/// directly, without waiting for the next sweep. That path is not wired
/// up in this build — the Ingress Router has no `provider_ref`-matching
/// logic, so [`switchyard_storage::outbox::reconcile_to_sent`] is only
/// ever called from this sweep. An `unknown` effect is reconciled solely
/// by [`EffectReconciler::check`] confirming it out-of-band.
#[async_trait]
pub trait EffectReconciler: Send + Sync {
    /// Poll the provider for confirmation that `row` was delivered.
    /// Returns the provider-assigned reference once confirmed.
    async fn check(&self, row: &EffectRow) -> Option<String>;
}

/// A reconciler that never confirms anything. With no ingress-side
/// `provider_ref` path wired up either, an effect behind this reconciler
/// can never leave `unknown` once it lands there.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReconciler;

#[async_trait]
impl EffectReconciler for NoopReconciler {
    async fn check(&self, _row: &EffectRow) -> Option<String> {
        None
    }
}
