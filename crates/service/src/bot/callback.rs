//! Inline button payloads. Telegram caps `callback_data` at 64 bytes, so ids travel, not names.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu,
    Services,
    Service(i32),
    Date(i32, NaiveDate),
    Time(i32, NaiveDate, NaiveTime),
    MyBookings,
    Cancel(i32),
    OwnerMenu,
    OwnerToday,
    OwnerPending,
    Confirm(i32),
}

impl Callback {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let head = parts.next()?;
        let rest: Vec<&str> = parts.collect();
        let cb = match (head, rest.as_slice()) {
            ("menu", []) => Self::Menu,
            ("services", []) => Self::Services,
            ("svc", [id]) => Self::Service(id.parse().ok()?),
            ("date", [id, date]) => Self::Date(id.parse().ok()?, NaiveDate::parse_from_str(date, DATE_FMT).ok()?),
            ("time", [id, date, time]) => Self::Time(
                id.parse().ok()?,
                NaiveDate::parse_from_str(date, DATE_FMT).ok()?,
                NaiveTime::parse_from_str(time, TIME_FMT).ok()?,
            ),
            ("mine", []) => Self::MyBookings,
            ("cancel", [id]) => Self::Cancel(id.parse().ok()?),
            ("owner", []) => Self::OwnerMenu,
            ("owner", ["today"]) => Self::OwnerToday,
            ("owner", ["pending"]) => Self::OwnerPending,
            ("confirm", [id]) => Self::Confirm(id.parse().ok()?),
            _ => return None,
        };
        Some(cb)
    }

    pub fn owner_only(&self) -> bool {
        matches!(self, Self::OwnerMenu | Self::OwnerToday | Self::OwnerPending | Self::Confirm(_))
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Menu => f.write_str("menu"),
            Self::Services => f.write_str("services"),
            Self::Service(id) => write!(f, "svc:{id}"),
            Self::Date(id, date) => write!(f, "date:{id}:{}", date.format(DATE_FMT)),
            Self::Time(id, date, time) => write!(f, "time:{id}:{}:{}", date.format(DATE_FMT), time.format(TIME_FMT)),
            Self::MyBookings => f.write_str("mine"),
            Self::Cancel(id) => write!(f, "cancel:{id}"),
            Self::OwnerMenu => f.write_str("owner"),
            Self::OwnerToday => f.write_str("owner:today"),
            Self::OwnerPending => f.write_str("owner:pending"),
            Self::Confirm(id) => write!(f, "confirm:{id}"),
        }
    }
}
