//! Belvo open-banking adapter

use crate::aggregator::types::LinkRequest;
use crate::aggregator::Aggregator;
use crate::config::AggregatorConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Belvo REST API client (Basic auth, single attempt per call)
pub struct BelvoClient {
    client: Client,
    base_url: Url,
    client_id: String,
    secret: String,
}

impl BelvoClient {
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Send an authenticated request and decode the JSON answer
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .basic_auth(&self.client_id, Some(&self.secret))
            .send()
            .await?;

        let status = response.status();
        let url = response.url().clone();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Belvo {} answered {}", url.path(), status.as_u16());
            return Err(AppError::upstream(status.as_u16(), &text));
        }

        debug!("Belvo {} answered {}", url.path(), status.as_u16());

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Aggregator for BelvoClient {
    fn id(&self) -> &'static str {
        "belvo"
    }

    async fn list_institutions(&self, page: u32, page_size: u32) -> Result<Value> {
        let url = self.endpoint("institutions/")?;
        let request = self
            .client
            .get(url)
            .query(&[("page", page), ("page_size", page_size)]);

        self.send(request).await
    }

    async fn get_institution(&self, institution_id: &str) -> Result<Value> {
        let url = self.endpoint(&format!(
            "institutions/{}/",
            urlencoding::encode(institution_id)
        ))?;
        self.send(self.client.get(url)).await
    }

    async fn create_link(&self, request: &LinkRequest) -> Result<Value> {
        let url = self.endpoint("links/")?;
        self.send(self.client.post(url).json(request)).await
    }

    async fn list_accounts(&self, link_id: &str) -> Result<Value> {
        let url = self.endpoint("accounts/")?;
        self.send(self.client.get(url).query(&[("link", link_id)]))
            .await
    }

    async fn get_account(&self, account_id: &str) -> Result<Value> {
        let url = self.endpoint(&format!("accounts/{}/", urlencoding::encode(account_id)))?;
        self.send(self.client.get(url)).await
    }

    async fn list_transactions(
        &self,
        account_id: &str,
        link_id: &str,
        page_size: u32,
    ) -> Result<Value> {
        let url = self.endpoint("transactions/")?;
        let page_size = page_size.to_string();
        let request = self.client.get(url).query(&[
            ("account", account_id),
            ("link", link_id),
            ("page_size", page_size.as_str()),
        ]);

        self.send(request).await
    }
}
