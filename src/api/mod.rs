//! REST API module
//!
//! Bearer-token protected endpoints over the services layer:
//! - Users (/register, /login, /logout)
//! - Institutions (/banks, /institutions/{id})
//! - Accounts and KPIs (/bank/{bank_id}/accounts, /account/{id}/kpis/{bank})

pub mod handlers;
mod server;
mod types;

pub use handlers::AuthUser;
pub use server::ApiServer;
