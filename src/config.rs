use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_access_expiry: i64,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub mail_from: String,
    pub sms_enabled: bool,
    pub sms_api_url: Option<String>,
    pub sms_api_key: Option<String>,
    pub reminder_timeout_secs: u64,
    pub jobs_enabled: bool,
    pub invoice_job_hour: u32,
    pub due_reminder_hour: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_access_expiry: env::var("JWT_ACCESS_EXPIRY")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            smtp_host: non_blank(env::var("SMTP_HOST").ok()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            smtp_username: non_blank(env::var("SMTP_USERNAME").ok()),
            smtp_password: non_blank(env::var("SMTP_PASSWORD").ok()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Motel Billing <noreply@motel.local>".to_string()),
            sms_enabled: env::var("SMS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            sms_api_url: non_blank(env::var("SMS_API_URL").ok()),
            sms_api_key: non_blank(env::var("SMS_API_KEY").ok()),
            reminder_timeout_secs: env::var("REMINDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            jobs_enabled: env::var("JOBS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            invoice_job_hour: env::var("INVOICE_JOB_HOUR")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<u32>()
                .unwrap_or(1)
                .min(23),
            due_reminder_hour: env::var("DUE_REMINDER_HOUR")
                .unwrap_or_else(|_| "9".to_string())
                .parse::<u32>()
                .unwrap_or(9)
                .min(23),
        })
    }

    /// SMS goes out only when enabled and a gateway URL is set.
    pub fn sms_configured(&self) -> bool {
        self.sms_enabled && self.sms_api_url.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "postgres://localhost/motel_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_access_expiry: 3600,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            mail_from: "Motel Billing <noreply@motel.local>".to_string(),
            sms_enabled: false,
            sms_api_url: None,
            sms_api_key: None,
            reminder_timeout_secs: 10,
            jobs_enabled: false,
            invoice_job_hour: 1,
            due_reminder_hour: 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sms_requires_flag_and_url() {
        let mut config = Config::for_tests();
        assert!(!config.sms_configured());

        config.sms_enabled = true;
        assert!(!config.sms_configured());

        config.sms_api_url = Some("https://sms.example.com/send".to_string());
        assert!(config.sms_configured());
    }

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some("smtp.local".to_string())), Some("smtp.local".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
