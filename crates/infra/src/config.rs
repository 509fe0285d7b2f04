use followup_scheduler_utils::create_random_secret;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Key that callers of the api have to provide in the `x-api-key` header
    pub api_key: String,
    /// Port for the application to run on
    pub port: usize,
    /// Endpoint that receives realtime events for owners. When it is not set
    /// the events are only logged.
    pub realtime_webhook_url: Option<String>,
    /// Sent along with every realtime event so that the receiver can verify the sender
    pub realtime_webhook_key: String,
    /// How long `ReminderSettings` are cached before they are read again
    pub settings_cache_ttl_millis: i64,
    /// How often the worker looks for due reminder jobs
    pub reminder_jobs_poll_interval_millis: u64,
    /// Maximum number of jobs claimed by the worker in one poll
    pub reminder_jobs_batch_size: usize,
    /// A claimed job is hidden from other workers for this long. If the worker
    /// dies before completing it, the job is delivered again afterwards.
    pub reminder_jobs_lease_millis: i64,
    /// Number of failed attempts before a job is moved to the dead letters
    pub reminder_jobs_max_attempts: i32,
    /// Base delay of the exponential retry backoff
    pub reminder_jobs_retry_base_millis: i64,
}

fn env_or_default<T: FromStr + std::fmt::Display + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default value: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let api_key = match std::env::var("FOLLOWUP_API_KEY") {
            Ok(key) => key,
            Err(_) => {
                info!("Did not find FOLLOWUP_API_KEY environment variable. Going to create one.");
                let key = create_random_secret(32);
                info!("Api key was generated and set to: {}", key);
                key
            }
        };
        let realtime_webhook_url = std::env::var("REALTIME_WEBHOOK_URL").ok();
        if realtime_webhook_url.is_none() {
            info!("Did not find REALTIME_WEBHOOK_URL environment variable. Realtime events will only be logged.");
        }
        let realtime_webhook_key = std::env::var("REALTIME_WEBHOOK_KEY").unwrap_or_default();

        Self {
            api_key,
            port: env_or_default("PORT", 5000),
            realtime_webhook_url,
            realtime_webhook_key,
            settings_cache_ttl_millis: env_or_default("SETTINGS_CACHE_TTL_SECS", 60_i64) * 1000,
            reminder_jobs_poll_interval_millis: env_or_default(
                "REMINDER_JOBS_POLL_INTERVAL_SECS",
                5_u64,
            ) * 1000,
            reminder_jobs_batch_size: env_or_default("REMINDER_JOBS_BATCH_SIZE", 100),
            reminder_jobs_lease_millis: env_or_default("REMINDER_JOBS_LEASE_SECS", 300_i64) * 1000,
            reminder_jobs_max_attempts: env_or_default("REMINDER_JOBS_MAX_ATTEMPTS", 3),
            reminder_jobs_retry_base_millis: env_or_default("REMINDER_JOBS_RETRY_BASE_SECS", 30_i64)
                * 1000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_falls_back_to_default_for_invalid_values() {
        std::env::set_var("FOLLOWUP_TEST_INVALID_NUMBER", "five");
        assert_eq!(env_or_default("FOLLOWUP_TEST_INVALID_NUMBER", 5), 5);
        std::env::set_var("FOLLOWUP_TEST_VALID_NUMBER", "7");
        assert_eq!(env_or_default("FOLLOWUP_TEST_VALID_NUMBER", 5), 7);
        assert_eq!(env_or_default("FOLLOWUP_TEST_MISSING_NUMBER", 5), 5);
    }
}
