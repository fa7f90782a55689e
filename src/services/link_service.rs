//! Link Service
//!
//! Makes sure a usable aggregator link exists for an institution.
//! A stored link with status `valid` is reused as is; otherwise credentials
//! are synthesized from the institution's form schema and a new link is
//! registered with the aggregator.

use crate::aggregator::types::LinkRequest;
use crate::db::sqlite::models::LinkInfo;
use crate::error::{AppError, Result};
use crate::state::AppState;
use tracing::info;

/// Link registrar
pub struct LinkService;

impl LinkService {
    /// Return the institution's valid link, registering a new one if needed
    pub async fn ensure_link(state: &AppState, institution_name: &str) -> Result<LinkInfo> {
        info!("LinkService::ensure_link - {}", institution_name);

        let institution = state
            .sqlite
            .get_institution_by_name(institution_name)?
            .ok_or_else(|| {
                AppError::NotFound(format!("Institution '{}' not found", institution_name))
            })?;

        if let Some(existing) = state.sqlite.get_current_link(&institution.name)? {
            if existing.is_valid() {
                info!("Reusing valid link {} for {}", existing.id, institution.name);
                return Ok(existing);
            }
            info!(
                "Stored link {} for {} is {}, registering a new one",
                existing.id, institution.name, existing.status
            );
        }

        let credentials = state.credentials.synthesize(&institution)?;

        let request = LinkRequest {
            institution: institution.name.clone(),
            fetch_resources: institution.fetch_resources(),
            credentials,
        };

        // Upstream errors propagate before anything is written
        let response = state.aggregator.create_link(&request).await?;
        let link = LinkInfo::from_api(&response, &institution.name)?;

        state
            .sqlite
            .upsert_link(&link, Some(&request.credentials), &state.security)?;

        info!("Registered link {} ({}) for {}", link.id, link.status, institution.name);

        Ok(link)
    }
}
