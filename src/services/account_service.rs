//! Account Service
//!
//! Account listing for an institution and KPI lookup by bank name.

use crate::error::{AppError, Result};
use crate::services::kpi_service::{AccountSummary, KpiService};
use crate::services::link_service::LinkService;
use crate::state::AppState;
use serde_json::Value;
use tracing::info;

/// Account service for business logic
pub struct AccountService;

impl AccountService {
    /// Accounts of the institution's link, registering the link first if needed
    pub async fn accounts_for_institution(state: &AppState, institution_name: &str) -> Result<Value> {
        info!("AccountService::accounts_for_institution - {}", institution_name);

        let link = LinkService::ensure_link(state, institution_name).await?;
        state.aggregator.list_accounts(&link.id).await
    }

    /// ID of the institution's current link
    pub fn link_id_for_bank(state: &AppState, bank_name: &str) -> Result<String> {
        state
            .sqlite
            .get_current_link(bank_name)?
            .map(|link| link.id)
            .ok_or_else(|| AppError::NotFound(format!("No link registered for bank '{}'", bank_name)))
    }

    /// KPIs of an account reached through the bank's current link
    pub async fn account_kpis(
        state: &AppState,
        account_id: &str,
        bank_name: &str,
    ) -> Result<AccountSummary> {
        info!("AccountService::account_kpis - {} at {}", account_id, bank_name);

        let link_id = Self::link_id_for_bank(state, bank_name)?;
        KpiService::compute_kpis(state, account_id, &link_id).await
    }
}
