// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use async_trait::async_trait;

/// Default outbound rate when a dispatch request does not specify one.
pub const DEFAULT_RATE_PER_MINUTE: i64 = 30;

/// Spacing enforced between consecutive send attempts for a requested rate.
///
/// A zero, negative, or absent rate falls back to the default, so a
/// malformed request can never disable pacing. Integer division floors the
/// spacing: 30/minute → 2000ms.
pub fn spacing_for_rate(rate_per_minute: Option<i64>) -> Duration {
    let rate = match rate_per_minute {
        Some(rate) if rate > 0 => rate as u64,
        _ => DEFAULT_RATE_PER_MINUTE as u64,
    };
    Duration::from_millis(60_000 / rate)
}

/// Suspension seam for the dispatch loop, so tests can observe pacing
/// without waiting it out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_follows_requested_rate() {
        assert_eq!(spacing_for_rate(Some(30)), Duration::from_millis(2000));
        assert_eq!(spacing_for_rate(Some(60)), Duration::from_millis(1000));
        assert_eq!(spacing_for_rate(Some(7)), Duration::from_millis(8571));
        assert_eq!(spacing_for_rate(Some(1)), Duration::from_millis(60_000));
    }

    #[test]
    fn invalid_rates_fall_back_to_default() {
        assert_eq!(spacing_for_rate(None), Duration::from_millis(2000));
        assert_eq!(spacing_for_rate(Some(0)), Duration::from_millis(2000));
        assert_eq!(spacing_for_rate(Some(-5)), Duration::from_millis(2000));
    }
}
