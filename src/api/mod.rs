pub mod areas;
pub mod auth;
pub mod contracts;
pub mod invoices;
pub mod meter_readings;
pub mod notifications;
pub mod payments;
pub mod reports;
pub mod rooms;
pub mod service_prices;
pub mod support_requests;
pub mod system_logs;
pub mod tenants;
pub mod users;

use crate::middleware::AppState;
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/users", users::routes())
        .nest("/areas", areas::routes())
        .nest("/rooms", rooms::routes())
        .nest("/tenants", tenants::routes())
        .nest("/contracts", contracts::routes())
        .nest("/service-prices", service_prices::routes())
        .nest("/meter-readings", meter_readings::routes())
        .nest("/invoices", invoices::routes())
        .nest("/payments", payments::routes())
        .nest("/notifications", notifications::routes())
        .nest("/support-requests", support_requests::routes())
        .nest("/reports", reports::routes())
        .nest("/system-logs", system_logs::routes())
}
