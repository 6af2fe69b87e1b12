use std::time::Duration;

/// Delay to wait after failed attempt number `attempt` (1-based):
/// `initial * 2^(attempt - 1)`, without jitter.
pub fn backoff_delay(attempt: u32, initial: Duration) -> Duration {
    let attempt = attempt.max(1);

    // Cap the exponent to prevent overflow
    let exponent = (attempt - 1).min(16);

    initial.saturating_mul(2_u32.pow(exponent))
}
