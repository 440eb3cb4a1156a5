use chrono::{NaiveDate, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use service::scheduling::{available_slots, BusyInterval, SlotRules, WorkingDay};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn bench_slots(c: &mut Criterion) {
    let day = WorkingDay {
        date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        start: t(9, 0),
        end: t(22, 0),
        break_start: Some(t(15, 0)),
        break_end: Some(t(15, 30)),
    };
    let busy: Vec<BusyInterval> = (9..21).step_by(2).map(|h| BusyInterval { start: t(h, 0), end: t(h, 45) }).collect();
    let rules = SlotRules { step_minutes: 5, overrun_minutes: 30 };

    c.bench_function("available_slots_busy_day", |b| {
        b.iter(|| available_slots(black_box(&day), black_box(60), black_box(&busy), rules, None));
    });
}

criterion_group!(benches, bench_slots);
criterion_main!(benches);
