use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_seconds: i64,
    pub max_seconds: i64,
    pub jitter_pct: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_seconds: 2,
            max_seconds: 15 * 60,
            jitter_pct: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

/// Provider errors default to retryable; only errors that cannot be
/// fixed by waiting are terminal on first sight.
pub fn classify_error(code: &str) -> ErrorClass {
    match code {
        "TIMEOUT" | "RATE_LIMIT" | "PROVIDER_UNAVAILABLE" | "PROVIDER_5XX" => {
            ErrorClass::Retryable
        }
        "INVALID_INPUT" | "UNSUPPORTED_LANGUAGE" => ErrorClass::NonRetryable,
        _ => ErrorClass::Retryable,
    }
}

/// base * 2^(attempt-1), capped, with jitter in [-jitter_pct, +jitter_pct].
pub fn next_delay_seconds(attempt_no: i32, cfg: &RetryConfig, rng: &mut impl Rng) -> i64 {
    let attempt_no = attempt_no.max(1) as u32;
    let exp = attempt_no.saturating_sub(1);

    // 2^exp with overflow protection; the cap handles absurd exponents.
    let pow2 = 1_i64.checked_shl(exp).unwrap_or(i64::MAX);
    let mut delay = cfg.base_seconds.saturating_mul(pow2);

    if delay > cfg.max_seconds {
        delay = cfg.max_seconds;
    }

    let jitter_range = (delay as f64) * cfg.jitter_pct;
    let jitter = if jitter_range > 0.0 {
        rng.gen_range(-jitter_range..=jitter_range)
    } else {
        0.0
    };

    let jittered = (delay as f64 + jitter).round() as i64;
    jittered.clamp(0, cfg.max_seconds)
}
