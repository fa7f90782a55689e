//! Institution Service
//!
//! Lists institutions from the aggregator and keeps the local catalogue in
//! sync. Payloads are returned to the caller unchanged.

use crate::aggregator::types::page_results;
use crate::db::sqlite::models::InstitutionRecord;
use crate::error::{AppError, Result};
use crate::state::AppState;
use serde_json::Value;
use tracing::{info, warn};

/// Institution service for business logic
pub struct InstitutionService;

impl InstitutionService {
    /// Fetch one page of institutions and upsert every usable record
    pub async fn list_institutions(state: &AppState, page: u32) -> Result<Value> {
        let page = page.max(1);
        let page_size = state.config.aggregator.institutions_page_size;
        info!("InstitutionService::list_institutions - page {} size {}", page, page_size);

        let payload = state.aggregator.list_institutions(page, page_size).await?;
        let records = Self::records_from_page(&payload);

        let stored = state.sqlite.upsert_institutions(&records)?;
        info!("Synced {} institutions from page {}", stored, page);

        Ok(payload)
    }

    /// Fetch a single institution by aggregator ID and upsert it
    pub async fn sync_institution(state: &AppState, institution_id: &str) -> Result<Value> {
        info!("InstitutionService::sync_institution - {}", institution_id);

        let payload = state.aggregator.get_institution(institution_id).await?;
        let record = InstitutionRecord::from_api(&payload).ok_or_else(|| {
            AppError::Validation(format!(
                "Institution '{}' has no id or name",
                institution_id
            ))
        })?;

        state.sqlite.upsert_institutions(std::slice::from_ref(&record))?;

        Ok(payload)
    }

    fn records_from_page(payload: &Value) -> Vec<InstitutionRecord> {
        page_results(payload)
            .iter()
            .filter_map(|item| {
                let record = InstitutionRecord::from_api(item);
                if record.is_none() {
                    warn!("Skipping institution without id or name: {}", item);
                }
                record
            })
            .collect()
    }
}
