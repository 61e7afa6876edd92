//! Async boundary consumed by front-ends and reporting surfaces.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaypool_types::{AccountFilter, AccountRole, AccountSummary, Lease, Outcome, Result};

use super::Dispatcher;
use crate::error::AppError;
use crate::export::ExportFormat;

/// The acquire/report contract of the dispatch manager.
///
/// Implementations give one authoritative answer per call and never retry
/// internally. Retry policy belongs to the caller.
#[async_trait]
pub trait DispatchService: Send + Sync {
    async fn acquire(&self, action_type: &str, role: Option<AccountRole>) -> Result<Lease>;

    async fn report(&self, lease: &Lease, outcome: Outcome) -> Result<()>;

    /// Return the reservation of a lease whose call was never attempted.
    async fn release(&self, lease: &Lease) -> Result<()>;

    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<AccountSummary>>;

    async fn export(
        &self,
        format: ExportFormat,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<String>;
}

#[async_trait]
impl DispatchService for Arc<Dispatcher> {
    async fn acquire(&self, action_type: &str, role: Option<AccountRole>) -> Result<Lease> {
        self.acquire_async(action_type.to_string(), role).await
    }

    async fn report(&self, lease: &Lease, outcome: Outcome) -> Result<()> {
        self.report_async(lease.clone(), outcome).await
    }

    async fn release(&self, lease: &Lease) -> Result<()> {
        self.release_async(lease.clone()).await
    }

    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<AccountSummary>> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || Dispatcher::list_accounts(&dispatcher, &filter))
            .await
            .map_err(AppError::from)?
    }

    async fn export(
        &self,
        format: ExportFormat,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<String> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || Dispatcher::export(&dispatcher, format, from, to))
            .await
            .map_err(AppError::from)?
    }
}
