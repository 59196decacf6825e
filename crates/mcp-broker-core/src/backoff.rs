//! Retry schedules for downstream startup and crash recovery.

use std::time::Duration;

/// Delays between startup attempts: the first attempt happens immediately,
/// then one wait from this table before each retry.
pub const STARTUP_DELAYS: [Duration; 3] = [
    Duration::from_secs(5),
    Duration::from_secs(15),
    Duration::from_secs(45),
];
pub const STARTUP_MAX_TRIES: u32 = 4;

const RECONNECT_BASE: Duration = Duration::from_secs(30);
const RECONNECT_CAP: Duration = Duration::from_secs(8 * 60);
pub const RECONNECT_MAX_TRIES: u32 = 5;

/// Delay before reconnect attempt `attempt` (1-based). Attempt 1 fires 5 s
/// after the crash is observed; every attempt after that backs off as
/// `30s * 2^(attempt-2)`, capped at 8 minutes.
pub fn reconnect_delay(attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::from_secs(5);
    }
    let factor = 1u64 << (attempt - 2).min(16);
    let scaled = RECONNECT_BASE.saturating_mul(factor as u32);
    scaled.min(RECONNECT_CAP)
}

/// Delay before startup attempt `attempt` (1-based); `None` once the
/// startup retry budget is exhausted.
pub fn startup_delay(attempt: u32) -> Option<Duration> {
    STARTUP_DELAYS.get((attempt as usize).checked_sub(1)?).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_schedule_matches_spec() {
        assert_eq!(reconnect_delay(1), Duration::from_secs(5));
        assert_eq!(reconnect_delay(2), Duration::from_secs(30));
        assert_eq!(reconnect_delay(3), Duration::from_secs(60));
        assert_eq!(reconnect_delay(4), Duration::from_secs(120));
        assert_eq!(reconnect_delay(5), Duration::from_secs(240));
    }

    #[test]
    fn reconnect_delay_caps_at_eight_minutes() {
        assert_eq!(reconnect_delay(20), Duration::from_secs(8 * 60));
    }

    #[test]
    fn startup_delay_has_three_gaps_for_four_tries() {
        assert_eq!(startup_delay(1), Some(Duration::from_secs(5)));
        assert_eq!(startup_delay(2), Some(Duration::from_secs(15)));
        assert_eq!(startup_delay(3), Some(Duration::from_secs(45)));
        assert_eq!(startup_delay(4), None);
    }
}
