use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Wall clock of the practice: UTC shifted by a fixed offset (Moscow by default).
#[derive(Clone, Copy, Debug)]
pub struct BusinessClock {
    offset_minutes: i64,
}

impl BusinessClock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self { offset_minutes: utc_offset_minutes as i64 }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.local(Utc::now())
    }

    /// Wall-clock reading of a stored UTC instant.
    pub fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.naive_utc() + Duration::minutes(self.offset_minutes)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

impl Default for BusinessClock {
    fn default() -> Self { Self::new(180) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_shifts_wall_clock() {
        let utc = BusinessClock::new(0).now();
        let msk = BusinessClock::new(180).now();
        let diff = (msk - utc).num_minutes();
        assert!((179..=181).contains(&diff));
    }

    #[test]
    fn late_utc_evening_is_next_local_day() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T22:30:00Z").expect("ts").with_timezone(&Utc);
        assert_eq!(BusinessClock::new(180).local(at).date(), NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"));
        assert_eq!(BusinessClock::new(0).local(at).date(), NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"));
    }
}
