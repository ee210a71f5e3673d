use crate::config::Config;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct SmsService {
    config: Config,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    phone: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsDelivery {
    Sent,
    /// Gateway not configured; the message was only logged.
    Skipped,
}

impl SmsService {
    pub fn new(config: Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.reminder_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build SMS client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.sms_configured()
    }

    pub async fn send(&self, phone: &str, text: &str) -> AppResult<SmsDelivery> {
        let url = match (&self.config.sms_api_url, self.config.sms_enabled) {
            (Some(url), true) => url,
            _ => {
                tracing::warn!("SMS gateway not configured. Message for {} not sent: {}", phone, text);
                return Ok(SmsDelivery::Skipped);
            }
        };

        let mut request = self.client.post(url).json(&GatewayRequest {
            phone,
            message: text,
        });
        if let Some(api_key) = &self.config.sms_api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Sms(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("SMS gateway error: {} - {}", status, body);
            return Err(AppError::Sms(format!("SMS gateway error: {}", status)));
        }

        tracing::info!("SMS sent to {}", phone);
        Ok(SmsDelivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_gateway_is_a_no_op() {
        let service = SmsService::new(Config::for_tests()).unwrap();
        assert!(!service.is_configured());

        let outcome = tokio_test::assert_ok!(service.send("0901234567", "hello").await);
        assert_eq!(outcome, SmsDelivery::Skipped);
    }

    #[tokio::test]
    async fn disabled_flag_wins_over_url() {
        let mut config = Config::for_tests();
        config.sms_api_url = Some("http://127.0.0.1:1/send".to_string());
        let service = SmsService::new(config).unwrap();

        let outcome = service.send("0901234567", "hello").await.unwrap();
        assert_eq!(outcome, SmsDelivery::Skipped);
    }

    #[tokio::test]
    async fn unreachable_gateway_surfaces_transport_error() {
        let mut config = Config::for_tests();
        config.sms_enabled = true;
        config.sms_api_url = Some("http://127.0.0.1:1/send".to_string());
        config.reminder_timeout_secs = 2;
        let service = SmsService::new(config).unwrap();

        let err = tokio_test::assert_err!(service.send("0901234567", "hello").await);
        assert!(matches!(err, AppError::Sms(_)));
    }
}
