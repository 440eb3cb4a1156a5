//! Working hours resolution and the slot engine. Everything here is pure;
//! the database side lives in `db::schedule_service`.

pub mod clock;
pub mod slots;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;

use models::{master_schedule, schedule_settings, weekly_schedule};

use crate::timefmt::{hhmm_opt_serde, hhmm_serde};

pub use clock::BusinessClock;
pub use slots::{available_slots, BusyInterval, SlotRules};

/// Resolved hours of a single working date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkingDay {
    #[serde(skip)]
    pub date: NaiveDate,
    #[serde(with = "hhmm_serde")]
    pub start: NaiveTime,
    #[serde(with = "hhmm_serde")]
    pub end: NaiveTime,
    #[serde(with = "hhmm_opt_serde", skip_serializing_if = "Option::is_none")]
    pub break_start: Option<NaiveTime>,
    #[serde(with = "hhmm_opt_serde", skip_serializing_if = "Option::is_none")]
    pub break_end: Option<NaiveTime>,
}

impl WorkingDay {
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.break_start.zip(self.break_end)
    }
}

/// ISO weekday number, Monday = 1.
pub fn iso_weekday(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.weekday().number_from_monday() as i32
}

/// Master override first, then the weekly template, otherwise a day off.
pub fn resolve_day(
    date: NaiveDate,
    master: Option<&master_schedule::Model>,
    template: Option<&weekly_schedule::Model>,
    settings: &schedule_settings::Model,
) -> Option<WorkingDay> {
    if let Some(m) = master {
        if !m.is_working {
            return None;
        }
        return Some(WorkingDay {
            date,
            start: m.start_time,
            end: m.end_time,
            break_start: m.break_start_time,
            break_end: m.break_end_time,
        });
    }
    let t = template.filter(|t| t.is_working)?;
    let break_end = match (t.break_start_time, t.break_end_time) {
        (Some(bs), None) => Some(bs + Duration::minutes(settings.break_duration_minutes as i64)),
        (_, be) => be,
    };
    Some(WorkingDay {
        date,
        start: t.start_time,
        end: t.end_time,
        break_start: t.break_start_time,
        break_end: break_end.filter(|_| t.break_start_time.is_some()),
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn master_day_wins_over_template() {
        let date = d(2026, 3, 2);
        let day = resolve_day(date, Some(&master(date, true)), Some(&template(1, true)), &settings()).expect("working");
        assert_eq!((day.start, day.end), (t(10, 0), t(14, 0)));
        assert_eq!(day.break_window(), None);
    }

    #[test]
    fn master_day_off_closes_a_template_working_day() {
        let date = d(2026, 3, 2);
        assert!(resolve_day(date, Some(&master(date, false)), Some(&template(1, true)), &settings()).is_none());
    }

    #[test]
    fn template_used_when_no_master() {
        let day = resolve_day(d(2026, 3, 2), None, Some(&template(1, true)), &settings()).expect("working");
        assert_eq!(day.break_window(), Some((t(15, 0), t(15, 30))));
        assert!(resolve_day(d(2026, 3, 8), None, Some(&template(7, false)), &settings()).is_none());
        assert!(resolve_day(d(2026, 3, 8), None, None, &settings()).is_none());
    }

    #[test]
    fn open_ended_template_break_uses_break_duration() {
        let mut tpl = template(1, true);
        tpl.break_end_time = None;
        let mut s = settings();
        s.break_duration_minutes = 45;
        let day = resolve_day(d(2026, 3, 2), None, Some(&tpl), &s).expect("working");
        assert_eq!(day.break_window(), Some((t(15, 0), t(15, 45))));
    }

    #[test]
    fn weekday_numbering_is_iso() {
        assert_eq!(iso_weekday(d(2026, 3, 2)), 1);
        assert_eq!(iso_weekday(d(2026, 3, 8)), 7);
    }
}
