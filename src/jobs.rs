//! Background jobs: nightly invoice generation and the morning payment-due nudge.
//!
//! Both loops sleep until the next wall-clock hour they are scheduled for (UTC),
//! run once and log the outcome. A failed run is retried on the next day's tick.

use std::time::Duration;

use chrono::{Days, NaiveDateTime, NaiveTime, Utc};
use sqlx::PgPool;

use crate::config::Config;
use crate::services::{BillingService, NotificationService};

/// First moment strictly after `now` that falls on `hour:00:00`.
pub fn next_run_after(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(at);

    if today > now {
        today
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(at))
            .unwrap_or(today)
    }
}

async fn sleep_until_hour(hour: u32) {
    let now = Utc::now().naive_utc();
    let next = next_run_after(now, hour);
    let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
    tracing::debug!(next_run = %next, "Job sleeping");
    tokio::time::sleep(wait).await;
}

pub async fn run_invoice_generation(pool: PgPool, hour: u32) {
    tracing::info!("Starting invoice generation job (daily at {:02}:00 UTC)", hour);

    loop {
        sleep_until_hour(hour).await;

        let today = Utc::now().date_naive();
        match BillingService::generate_recent(&pool, today).await {
            Ok(result) => tracing::info!(
                previous = result.previous.created,
                current = result.current.created,
                total = result.total,
                "Scheduled invoice generation completed"
            ),
            Err(e) => tracing::error!("Scheduled invoice generation failed: {}", e),
        }
    }
}

pub async fn run_payment_due_reminders(pool: PgPool, hour: u32) {
    tracing::info!("Starting payment-due reminder job (daily at {:02}:00 UTC)", hour);

    loop {
        sleep_until_hour(hour).await;

        let today = Utc::now().date_naive();
        match NotificationService::remind_payment_due(&pool, today).await {
            Ok(count) => tracing::info!(notified = count, "Payment-due reminders created"),
            Err(e) => tracing::error!("Payment-due reminders failed: {}", e),
        }
    }
}

/// Spawns the background jobs unless disabled in config.
pub fn spawn(pool: &PgPool, config: &Config) {
    if !config.jobs_enabled {
        tracing::info!("Background jobs disabled");
        return;
    }

    tokio::spawn(run_invoice_generation(pool.clone(), config.invoice_job_hour));
    tokio::spawn(run_payment_due_reminders(pool.clone(), config.due_reminder_hour));
}
