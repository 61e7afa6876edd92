//! Async wrappers for the blocking dispatcher operations.

use std::sync::Arc;

use relaypool_types::{AccountRole, Lease, Outcome, ReconcileSummary, Result};

use super::Dispatcher;
use crate::error::AppError;

impl Dispatcher {
    pub async fn acquire_async(
        self: &Arc<Self>,
        action_type: String,
        role: Option<AccountRole>,
    ) -> Result<Lease> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || dispatcher.acquire(&action_type, role))
            .await
            .map_err(AppError::from)?
    }

    pub async fn report_async(self: &Arc<Self>, lease: Lease, outcome: Outcome) -> Result<()> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || dispatcher.report(&lease, outcome))
            .await
            .map_err(AppError::from)?
    }

    pub async fn release_async(self: &Arc<Self>, lease: Lease) -> Result<()> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || dispatcher.release(&lease))
            .await
            .map_err(AppError::from)?
    }

    pub async fn reconcile_async(self: &Arc<Self>) -> Result<ReconcileSummary> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || dispatcher.reconcile())
            .await
            .map_err(AppError::from)?
    }

    pub async fn reset_daily_counters_async(self: &Arc<Self>) -> Result<bool> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || dispatcher.reset_daily_counters())
            .await
            .map_err(AppError::from)?
    }
}
