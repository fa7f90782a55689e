//! Open-banking aggregator adapters

pub mod types;
pub mod belvo;

#[cfg(test)]
pub mod mock;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use types::LinkRequest;

/// Aggregator trait that all open-banking API clients implement.
///
/// Payloads are returned as raw JSON: callers either pass them through to the
/// client app unchanged or map the fields they need explicitly.
/// Every non-2xx answer surfaces as `AppError::Upstream`.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Aggregator ID (e.g., "belvo")
    fn id(&self) -> &'static str;

    /// List institutions (one page)
    async fn list_institutions(&self, page: u32, page_size: u32) -> Result<Value>;

    /// Get one institution by aggregator ID
    async fn get_institution(&self, institution_id: &str) -> Result<Value>;

    /// Register a new link with the given credentials
    async fn create_link(&self, request: &LinkRequest) -> Result<Value>;

    /// List accounts for a link
    async fn list_accounts(&self, link_id: &str) -> Result<Value>;

    /// Get one account by ID
    async fn get_account(&self, account_id: &str) -> Result<Value>;

    /// List transactions for an account of a link (single page)
    async fn list_transactions(
        &self,
        account_id: &str,
        link_id: &str,
        page_size: u32,
    ) -> Result<Value>;
}
