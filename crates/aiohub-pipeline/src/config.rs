#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub admin_addr: Option<String>,
    pub drain_batch_size: i64,
    pub drain_interval_secs: u64,
    pub provider_timeout_secs: u64,
    pub stale_claim_secs: i64,
    pub default_max_retries: i32,
    pub migrate_on_startup: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let admin_addr = env_or_fallback("AIOHUB_ADMIN_ADDR", "ADMIN_ADDR")
            .and_then(|s| normalize_optional_addr(&s));

        let drain_batch_size = env_or_fallback("AIOHUB_DRAIN_BATCH_SIZE", "DRAIN_BATCH_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(25)
            .clamp(1, 500);

        // 0 disables the timer; drain cycles then only run via POST /drain.
        let drain_interval_secs = env_or_fallback("AIOHUB_DRAIN_INTERVAL_SECS", "DRAIN_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let provider_timeout_secs =
            env_or_fallback("AIOHUB_PROVIDER_TIMEOUT_SECS", "PROVIDER_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30)
                .clamp(1, 600);

        let stale_claim_secs = env_or_fallback("AIOHUB_STALE_CLAIM_SECS", "STALE_CLAIM_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(15 * 60);

        let default_max_retries = env_or_fallback("AIOHUB_MAX_RETRIES", "MAX_RETRIES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3)
            .clamp(0, 25);

        let migrate_on_startup = env_bool("AIOHUB_MIGRATE_ON_STARTUP").unwrap_or(false);

        Ok(Self {
            database_url,
            admin_addr,
            drain_batch_size,
            drain_interval_secs,
            provider_timeout_secs,
            stale_claim_secs,
            default_max_retries,
            migrate_on_startup,
        })
    }
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn normalize_optional_addr(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if matches!(v.to_lowercase().as_str(), "0" | "off" | "false" | "none") {
        return None;
    }
    Some(v.to_string())
}
