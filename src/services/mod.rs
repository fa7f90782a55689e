//! Services Layer
//!
//! Business logic called by the HTTP handlers. Services take the shared
//! `AppState` and talk to the aggregator and the store; handlers only do
//! extraction and serialization.
//!
//! # Architecture
//!
//! ```text
//! Client app --> REST API --> Services --> Aggregator / SQLite
//! ```
//!
//! # Services
//!
//! - `AuthService` - Register, login, bearer authentication, logout
//! - `InstitutionService` - List institutions and sync the local catalogue
//! - `LinkService` - Ensure a valid aggregator link per institution
//! - `AccountService` - Accounts per institution, KPIs per bank
//! - `KpiService` - Account summaries from transaction feeds

pub mod account_service;
pub mod auth_service;
pub mod credentials;
pub mod institution_service;
pub mod kpi_service;
pub mod link_service;

pub use account_service::AccountService;
pub use auth_service::{AccessToken, AuthService};
pub use institution_service::InstitutionService;
pub use kpi_service::{AccountSummary, KpiService};
pub use link_service::LinkService;
