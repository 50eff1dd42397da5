use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Injectable wall clock so batch decisions can be pinned in tests.
#[derive(Clone)]
pub struct Clock {
    inner: ClockInner,
}

#[derive(Clone)]
enum ClockInner {
    System,
    Manual(Arc<RwLock<DateTime<Utc>>>),
}

impl Clock {
    pub fn system() -> Self {
        Clock {
            inner: ClockInner::System,
        }
    }

    /// A clock that only moves when `set` is called.
    pub fn manual(start: DateTime<Utc>) -> Self {
        Clock {
            inner: ClockInner::Manual(Arc::new(RwLock::new(start))),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match &self.inner {
            ClockInner::System => Utc::now(),
            ClockInner::Manual(t) => *t.read().expect("clock lock poisoned"),
        }
    }

    /// No-op on a system clock.
    pub fn set(&self, to: DateTime<Utc>) {
        if let ClockInner::Manual(t) = &self.inner {
            *t.write().expect("clock lock poisoned") = to;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_holds_and_advances() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = Clock::manual(start);
        assert_eq!(clock.now(), start);

        let later = start + chrono::Duration::seconds(90);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = Clock::system();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
