// src/notify/quiet_hours.rs
use chrono::{DateTime, Local, Timelike};

use crate::alert::Priority;

/// Normal-priority delivery window, local time, `[start, end)`.
pub const NOTIFY_WINDOW_START_HOUR: u32 = 8;
pub const NOTIFY_WINDOW_END_HOUR: u32 = 20;

/// Quiet-hours gate.
/// - High priority always passes.
/// - Normal priority passes only inside 08:00–20:00 local time.
/// - Does not mutate anything; held-back alerts stay eligible later.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuietHours;

impl QuietHours {
    pub fn allows(&self, priority: Priority, now: DateTime<Local>) -> bool {
        match priority {
            Priority::High => true,
            Priority::Normal => {
                (NOTIFY_WINDOW_START_HOUR..NOTIFY_WINDOW_END_HOUR).contains(&now.hour())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 9, 6, h, m, 0).unwrap()
    }

    #[test]
    fn window_edges() {
        let q = QuietHours;
        assert!(!q.allows(Priority::Normal, at(7, 59)));
        assert!(q.allows(Priority::Normal, at(8, 0)));
        assert!(q.allows(Priority::Normal, at(19, 59)));
        assert!(!q.allows(Priority::Normal, at(20, 0)));
    }

    #[test]
    fn high_priority_ignores_window() {
        let q = QuietHours;
        assert!(q.allows(Priority::High, at(2, 0)));
        assert!(q.allows(Priority::High, at(23, 30)));
    }
}
