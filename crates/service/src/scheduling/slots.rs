use chrono::{NaiveTime, Timelike};

use super::WorkingDay;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Step between candidate starts and how far a session may run past closing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRules {
    pub step_minutes: i32,
    pub overrun_minutes: i32,
}

impl Default for SlotRules {
    fn default() -> Self { Self { step_minutes: 30, overrun_minutes: 30 } }
}

/// Time range held by an open booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

fn minutes(t: NaiveTime) -> i32 {
    (t.hour() * 60 + t.minute()) as i32
}

fn overlaps(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    !(a_end <= b_start || a_start >= b_end)
}

/// Free start times for a session of `duration_minutes` on `day`.
///
/// Slots never cross midnight: a candidate whose end would fall on the next day is dropped.
pub fn available_slots(
    day: &WorkingDay,
    duration_minutes: i32,
    busy: &[BusyInterval],
    rules: SlotRules,
    not_before: Option<NaiveTime>,
) -> Vec<NaiveTime> {
    let step = rules.step_minutes.max(1);
    let duration = duration_minutes.max(1);
    let latest_end = (minutes(day.end) + rules.overrun_minutes.max(0)).min(MINUTES_PER_DAY - 1);
    let floor = not_before.map(minutes);
    let pause = day.break_window().map(|(s, e)| (minutes(s), minutes(e)));
    let busy: Vec<(i32, i32)> = busy.iter().map(|b| (minutes(b.start), minutes(b.end))).collect();

    let mut out = Vec::new();
    let mut start = minutes(day.start);
    while start + duration <= latest_end {
        let end = start + duration;
        let skip = floor.is_some_and(|f| start < f)
            || pause.is_some_and(|(bs, be)| overlaps(start, end, bs, be))
            || busy.iter().any(|&(bs, be)| overlaps(start, end, bs, be));
        if !skip {
            if let Some(t) = NaiveTime::from_hms_opt((start / 60) as u32, (start % 60) as u32, 0) {
                out.push(t);
            }
        }
        start += step;
    }
    out
}
