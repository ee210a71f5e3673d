use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Motel Billing API",
        version = "1.0.0",
        description = "Backend API for motel and boarding-house management: meter readings, invoices, payments and reminders"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "auth", description = "Login and current account"),
        (name = "users", description = "Account management"),
        (name = "areas", description = "Buildings and blocks grouping rooms"),
        (name = "rooms", description = "Rooms"),
        (name = "tenants", description = "Tenant profiles"),
        (name = "contracts", description = "Rental contracts"),
        (name = "service-prices", description = "Rent and utility price history"),
        (name = "meter-readings", description = "Electricity and water readings"),
        (name = "invoices", description = "Monthly invoices and reminders"),
        (name = "payments", description = "Payments against invoices"),
        (name = "notifications", description = "In-app notifications"),
        (name = "support-requests", description = "Tenant support tickets"),
        (name = "reports", description = "Revenue, debt and occupancy reports"),
        (name = "system-logs", description = "Audit trail")
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::register,
        crate::api::auth::me,
        // Users
        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::link_tenant,
        crate::api::users::lock_user,
        crate::api::users::unlock_user,
        // Areas
        crate::api::areas::list_areas,
        crate::api::areas::create_area,
        crate::api::areas::update_area,
        crate::api::areas::delete_area,
        // Rooms
        crate::api::rooms::list_rooms,
        crate::api::rooms::list_available_rooms,
        crate::api::rooms::create_room,
        crate::api::rooms::update_room,
        crate::api::rooms::delete_room,
        // Tenants
        crate::api::tenants::list_tenants,
        crate::api::tenants::get_tenant,
        crate::api::tenants::my_profile,
        crate::api::tenants::create_tenant,
        crate::api::tenants::update_tenant,
        crate::api::tenants::delete_tenant,
        // Contracts
        crate::api::contracts::list_contracts,
        crate::api::contracts::my_contracts,
        crate::api::contracts::create_contract,
        crate::api::contracts::extend_contract,
        crate::api::contracts::end_contract,
        // Service prices
        crate::api::service_prices::list_prices,
        crate::api::service_prices::create_price,
        crate::api::service_prices::update_price,
        crate::api::service_prices::delete_price,
        // Meter readings
        crate::api::meter_readings::submit_reading,
        crate::api::meter_readings::list_readings,
        // Invoices
        crate::api::invoices::generate_invoices,
        crate::api::invoices::list_invoices,
        crate::api::invoices::my_invoices,
        crate::api::invoices::update_status,
        crate::api::invoices::send_reminder,
        // Payments
        crate::api::payments::create_payment,
        crate::api::payments::list_invoice_payments,
        // Notifications
        crate::api::notifications::list_notifications,
        crate::api::notifications::mark_as_read,
        crate::api::notifications::create_notification,
        // Support requests
        crate::api::support_requests::list_support_requests,
        crate::api::support_requests::my_support_requests,
        crate::api::support_requests::create_support_request,
        crate::api::support_requests::update_support_request,
        // Reports
        crate::api::reports::revenue,
        crate::api::reports::revenue_year,
        crate::api::reports::debt,
        crate::api::reports::debt_detail,
        crate::api::reports::occupancy,
        crate::api::reports::invoice_summary,
        crate::api::reports::vacant,
        crate::api::reports::summary,
        // System logs
        crate::api::system_logs::list_logs,
    ),
    components(
        schemas(
            // Users
            crate::models::UserRole,
            crate::models::UserPublic,
            crate::models::LoginRequest,
            crate::models::CreateUserRequest,
            crate::models::RegisterRequest,
            crate::models::UpdateUserRequest,
            crate::models::LinkTenantRequest,
            crate::models::AuthResponse,
            // Property
            crate::models::Area,
            crate::models::AreaRequest,
            crate::models::RoomStatus,
            crate::models::Room,
            crate::models::RoomRequest,
            crate::models::Tenant,
            crate::models::TenantRequest,
            crate::models::ContractStatus,
            crate::models::Contract,
            crate::models::ContractDetail,
            crate::models::CreateContractRequest,
            crate::models::ExtendContractRequest,
            // Billing
            crate::models::ServicePrice,
            crate::models::ServicePriceRequest,
            crate::models::MeterReading,
            crate::models::SubmitReadingRequest,
            crate::models::SubmitReadingResponse,
            crate::models::InvoiceStatus,
            crate::models::Invoice,
            crate::models::InvoiceDetail,
            crate::models::UpdateInvoiceStatusRequest,
            crate::models::RemindRequest,
            crate::models::PeriodGenerationResult,
            crate::models::GenerateInvoicesResponse,
            crate::models::PaymentMethod,
            crate::models::Payment,
            crate::models::CreatePaymentRequest,
            crate::models::PaymentResponse,
            // Notifications & logs
            crate::models::NotificationResponse,
            crate::models::CreateNotificationRequest,
            crate::models::SystemLog,
            // Support
            crate::models::SupportStatus,
            crate::models::SupportRequest,
            crate::models::SupportRequestDetail,
            crate::models::CreateSupportRequest,
            crate::models::UpdateSupportRequest,
            // Reports
            crate::api::reports::RevenueReport,
            crate::api::reports::MonthRevenue,
            crate::api::reports::YearRevenueReport,
            crate::api::reports::DebtRow,
            crate::api::reports::DebtReport,
            crate::api::reports::OccupancyReport,
            crate::api::reports::InvoiceSummary,
            crate::api::reports::VacantRoom,
            crate::api::reports::VacantReport,
            crate::api::reports::DashboardSummary,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_billing_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/v1/meter-readings"));
        assert!(paths.contains_key("/api/v1/invoices/generate"));
        assert!(paths.contains_key("/api/v1/invoices/{id}/remind"));
        assert!(paths.contains_key("/api/v1/payments"));
        assert!(paths.contains_key("/api/v1/contracts/{id}/end"));
        assert!(paths.contains_key("/api/v1/support-requests/{id}"));
        assert!(paths.contains_key("/api/v1/users/{id}/tenant"));
        assert!(paths.contains_key("/api/v1/reports/summary"));
    }
}
