//! In-memory aggregator for service tests

use crate::aggregator::types::{page_results, LinkRequest};
use crate::aggregator::Aggregator;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Canned answer: `Ok(body)` or `Err((status, body))`
type Canned = std::result::Result<Value, (u16, Value)>;

#[derive(Default)]
pub struct MockAggregator {
    institutions: Mutex<Option<Canned>>,
    link: Mutex<Option<Canned>>,
    accounts: Mutex<HashMap<String, Canned>>,
    transactions: Mutex<HashMap<(String, String), Canned>>,
    link_requests: Mutex<Vec<LinkRequest>>,
    calls: Mutex<Vec<String>>,
}

fn answer(canned: Option<Canned>, what: &str) -> Result<Value> {
    match canned {
        Some(Ok(body)) => Ok(body),
        Some(Err((status, body))) => Err(AppError::Upstream { status, body }),
        None => Err(AppError::Upstream {
            status: 404,
            body: json!({ "detail": format!("{} not configured", what) }),
        }),
    }
}

impl MockAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_institutions(self, body: Value) -> Self {
        *self.institutions.lock() = Some(Ok(body));
        self
    }

    pub fn with_link(self, body: Value) -> Self {
        *self.link.lock() = Some(Ok(body));
        self
    }

    pub fn with_link_error(self, status: u16, body: Value) -> Self {
        *self.link.lock() = Some(Err((status, body)));
        self
    }

    pub fn with_account(self, account_id: &str, body: Value) -> Self {
        self.accounts.lock().insert(account_id.to_string(), Ok(body));
        self
    }

    pub fn with_transactions(self, account_id: &str, link_id: &str, body: Value) -> Self {
        self.transactions
            .lock()
            .insert((account_id.to_string(), link_id.to_string()), Ok(body));
        self
    }

    pub fn with_transactions_error(
        self,
        account_id: &str,
        link_id: &str,
        status: u16,
        body: Value,
    ) -> Self {
        self.transactions
            .lock()
            .insert((account_id.to_string(), link_id.to_string()), Err((status, body)));
        self
    }

    /// Link creation requests received so far
    pub fn link_requests(&self) -> Vec<LinkRequest> {
        self.link_requests.lock().clone()
    }

    /// Number of calls made to the named operation
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == operation).count()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().push(operation.to_string());
    }
}

#[async_trait]
impl Aggregator for MockAggregator {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn list_institutions(&self, _page: u32, _page_size: u32) -> Result<Value> {
        self.record("list_institutions");
        answer(self.institutions.lock().clone(), "institutions")
    }

    async fn get_institution(&self, institution_id: &str) -> Result<Value> {
        self.record("get_institution");
        let found = self
            .institutions
            .lock()
            .clone()
            .and_then(|canned| canned.ok())
            .map(|payload| page_results(&payload))
            .unwrap_or_default()
            .into_iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(institution_id));
        answer(found.map(Ok), "institution")
    }

    async fn create_link(&self, request: &LinkRequest) -> Result<Value> {
        self.record("create_link");
        self.link_requests.lock().push(request.clone());
        answer(self.link.lock().clone(), "link")
    }

    async fn list_accounts(&self, link_id: &str) -> Result<Value> {
        self.record("list_accounts");
        let accounts: Vec<Value> = self
            .accounts
            .lock()
            .values()
            .filter_map(|canned| canned.as_ref().ok())
            .filter(|account| account.get("link").and_then(Value::as_str) == Some(link_id))
            .cloned()
            .collect();
        Ok(json!({ "count": accounts.len(), "results": accounts }))
    }

    async fn get_account(&self, account_id: &str) -> Result<Value> {
        self.record("get_account");
        answer(self.accounts.lock().get(account_id).cloned(), "account")
    }

    async fn list_transactions(
        &self,
        account_id: &str,
        link_id: &str,
        _page_size: u32,
    ) -> Result<Value> {
        self.record("list_transactions");
        let key = (account_id.to_string(), link_id.to_string());
        match self.transactions.lock().get(&key).cloned() {
            Some(canned) => answer(Some(canned), "transactions"),
            None => Ok(json!({ "count": 0, "results": [] })),
        }
    }
}
