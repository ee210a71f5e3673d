pub mod auth_service;
pub mod billing_service;
pub mod log_service;
pub mod mail_service;
pub mod meter_service;
pub mod notification_service;
pub mod payment_service;
pub mod reminder_service;
pub mod sms_service;

pub use auth_service::{AuthService, NewUser};
pub use billing_service::BillingService;
pub use log_service::LogService;
pub use mail_service::{MailDelivery, MailService};
pub use meter_service::MeterService;
pub use notification_service::NotificationService;
pub use payment_service::PaymentService;
pub use reminder_service::{ReminderError, ReminderService};
pub use sms_service::{SmsDelivery, SmsService};
