//! Retry scheduler: pure function mapping elapsed time since item creation
//! to the next attempt delay.

use std::time::Duration;

use rand::Rng;

/// 12-hour give-up horizon.
pub const GIVE_UP: Duration = Duration::from_secs(12 * 60 * 60);

const ONE_MINUTE: Duration = Duration::from_secs(60);
const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);
const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);
const TWENTY_MINUTES: Duration = Duration::from_secs(20 * 60);

/// Base delay before jitter, keyed off how long the item has existed. The
/// table is intentionally a step function, not exponential backoff: retry
/// cadence should coarsen as an item ages, but it need not keep growing
/// without bound the way a delivery-attempt-indexed backoff would.
#[must_use]
pub fn base_delay(since_created: Duration) -> Duration {
    if since_created < ONE_MINUTE {
        ONE_MINUTE
    } else if since_created < FIVE_MINUTES {
        FIVE_MINUTES
    } else if since_created < TEN_MINUTES {
        TEN_MINUTES
    } else {
        TWENTY_MINUTES
    }
}

/// `next_delay`: `base_delay` plus uniform jitter in `[0, jitter_bound)`.
/// Jitter decorrelates retry times across items after a process restart,
/// where many items' `since_created` values cluster together.
#[must_use]
pub fn next_delay(since_created: Duration, jitter_bound: Duration) -> Duration {
    let base = base_delay(since_created);
    if jitter_bound.is_zero() {
        return base;
    }
    let jitter_secs = rand::rng().random_range(0..jitter_bound.as_secs().max(1));
    base + Duration::from_secs(jitter_secs)
}

/// Whether an item has exceeded the give-up horizon.
#[must_use]
pub fn has_given_up(since_created: Duration, give_up: Duration) -> bool {
    since_created >= give_up
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_match_the_schedule_table() {
        assert_eq!(base_delay(Duration::from_secs(0)), ONE_MINUTE);
        assert_eq!(base_delay(Duration::from_secs(59)), ONE_MINUTE);
        assert_eq!(base_delay(Duration::from_secs(60)), FIVE_MINUTES);
        assert_eq!(base_delay(Duration::from_secs(299)), FIVE_MINUTES);
        assert_eq!(base_delay(Duration::from_secs(300)), TEN_MINUTES);
        assert_eq!(base_delay(Duration::from_secs(599)), TEN_MINUTES);
        assert_eq!(base_delay(Duration::from_secs(600)), TWENTY_MINUTES);
        assert_eq!(base_delay(Duration::from_secs(60 * 60)), TWENTY_MINUTES);
    }

    #[test]
    fn base_is_non_decreasing_in_elapsed_time() {
        let samples = [0, 30, 59, 60, 120, 299, 300, 500, 599, 600, 3600, 43_199];
        let mut last = Duration::ZERO;
        for secs in samples {
            let d = base_delay(Duration::from_secs(secs));
            assert!(d >= last, "base_delay regressed at {secs}s");
            last = d;
        }
    }

    #[test]
    fn zero_jitter_bound_returns_exact_base() {
        let d = next_delay(Duration::from_secs(0), Duration::ZERO);
        assert_eq!(d, ONE_MINUTE);
    }

    #[test]
    fn jitter_stays_within_bound() {
        for _ in 0..200 {
            let d = next_delay(Duration::from_secs(0), Duration::from_secs(60));
            assert!(d >= ONE_MINUTE);
            assert!(d < ONE_MINUTE + Duration::from_secs(60));
        }
    }

    #[test]
    fn give_up_horizon_is_twelve_hours() {
        assert_eq!(GIVE_UP, Duration::from_secs(12 * 60 * 60));
        assert!(!has_given_up(Duration::from_secs(43_199), GIVE_UP));
        assert!(has_given_up(Duration::from_secs(43_200), GIVE_UP));
    }
}
