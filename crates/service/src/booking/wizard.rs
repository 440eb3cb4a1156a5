//! Booking draft: Service → Date → Time → Client → Confirmation.
//!
//! The draft only moves forward when the previous step is filled, and
//! changing an earlier answer clears the answers that depend on it.

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use models::email_settings::{looks_like_email, MAX_EMAIL_LEN};

use super::phone::normalize_phone;
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Service,
    Date,
    Time,
    Client,
    Confirmation,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("choose a service first")]
    NoService,
    #[error("choose a date first")]
    NoDate,
    #[error("choose a time first")]
    NoTime,
    #[error("date is in the past")]
    DateInPast,
    #[error("date is more than {0} days ahead")]
    BeyondHorizon(i64),
    #[error("time {0} is not available")]
    SlotUnavailable(String),
    #[error("session would end after midnight")]
    PastMidnight,
    #[error("{0}")]
    Client(String),
    #[error("booking is not ready for confirmation")]
    NotReady,
}

impl From<WizardError> for ServiceError {
    fn from(e: WizardError) -> Self {
        match e {
            WizardError::SlotUnavailable(_) => ServiceError::Conflict(e.to_string()),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectedService {
    pub id: i32,
    pub name: String,
    pub duration_minutes: i32,
}

/// Raw contact form input.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClientInput {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated contact details; `phone` is already in `+7(XXX) XXX-XX-XX` form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientDetails {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

pub const MAX_NOTES_CHARS: usize = 2000;

impl ClientDetails {
    pub fn parse(input: ClientInput) -> Result<Self, WizardError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(WizardError::Client("name required".into()));
        }
        if name.chars().count() > 255 {
            return Err(WizardError::Client("name too long (max 255)".into()));
        }
        let phone = normalize_phone(&input.phone).map_err(WizardError::Client)?;
        let email = input.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        if let Some(e) = &email {
            if e.chars().count() > MAX_EMAIL_LEN {
                return Err(WizardError::Client(format!("email too long (max {MAX_EMAIL_LEN})")));
            }
            if !looks_like_email(e) {
                return Err(WizardError::Client("email is not valid".into()));
            }
        }
        let notes = input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
            return Err(WizardError::Client(format!("notes too long (max {MAX_NOTES_CHARS})")));
        }
        Ok(Self { name: name.to_string(), phone, email, notes })
    }
}

/// Everything needed to insert a booking row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    pub service: SelectedService,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub client: ClientDetails,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BookingDraft {
    service: Option<SelectedService>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    client: Option<ClientDetails>,
}

impl BookingDraft {
    pub fn new() -> Self { Self::default() }

    pub fn step(&self) -> Step {
        match (&self.service, &self.date, &self.time, &self.client) {
            (None, ..) => Step::Service,
            (Some(_), None, ..) => Step::Date,
            (Some(_), Some(_), None, _) => Step::Time,
            (Some(_), Some(_), Some(_), None) => Step::Client,
            _ => Step::Confirmation,
        }
    }

    pub fn service(&self) -> Option<&SelectedService> { self.service.as_ref() }
    pub fn date(&self) -> Option<NaiveDate> { self.date }
    pub fn time(&self) -> Option<NaiveTime> { self.time }

    /// Allowed from any step; clears the date and time.
    pub fn select_service(&mut self, service: SelectedService) {
        self.service = Some(service);
        self.date = None;
        self.time = None;
    }

    pub fn select_date(&mut self, date: NaiveDate, today: NaiveDate, horizon_days: i64) -> Result<(), WizardError> {
        if self.service.is_none() {
            return Err(WizardError::NoService);
        }
        if date < today {
            return Err(WizardError::DateInPast);
        }
        if date > today + Duration::days(horizon_days) {
            return Err(WizardError::BeyondHorizon(horizon_days));
        }
        self.date = Some(date);
        self.time = None;
        Ok(())
    }

    /// `available` is the slot list computed for the selected date.
    pub fn select_time(&mut self, start: NaiveTime, available: &[NaiveTime]) -> Result<(), WizardError> {
        if self.date.is_none() {
            return Err(WizardError::NoDate);
        }
        if !available.contains(&start) {
            return Err(WizardError::SlotUnavailable(start.format("%H:%M").to_string()));
        }
        self.time = Some(start);
        Ok(())
    }

    pub fn fill_client(&mut self, input: ClientInput) -> Result<(), WizardError> {
        if self.time.is_none() {
            return Err(WizardError::NoTime);
        }
        self.client = Some(ClientDetails::parse(input)?);
        Ok(())
    }

    /// Step one back, forgetting the answer of the step being left.
    pub fn back(&mut self) -> Step {
        match self.step() {
            Step::Service => {}
            Step::Date => self.service = None,
            Step::Time => self.date = None,
            Step::Client => self.time = None,
            Step::Confirmation => self.client = None,
        }
        self.step()
    }

    pub fn finish(self) -> Result<NewBooking, WizardError> {
        if self.step() != Step::Confirmation {
            return Err(WizardError::NotReady);
        }
        let (Some(service), Some(date), Some(start), Some(client)) = (self.service, self.date, self.time, self.client) else {
            return Err(WizardError::NotReady);
        };
        let end_minutes = (start.hour() * 60 + start.minute()) as i64 + service.duration_minutes as i64;
        if end_minutes >= 24 * 60 {
            return Err(WizardError::PastMidnight);
        }
        let end = start + Duration::minutes(service.duration_minutes as i64);
        Ok(NewBooking { service, date, start, end, client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::fixtures::{d, t};

    fn massage() -> SelectedService {
        SelectedService { id: 2, name: "Классический массаж".into(), duration_minutes: 60 }
    }

    fn client() -> ClientInput {
        ClientInput { name: " Анна ".into(), phone: "8 (999) 123-45-67".into(), email: Some("anna@example.ru".into()), notes: None }
    }

    #[test]
    fn happy_path_reaches_confirmation() {
        let today = d(2026, 3, 1);
        let mut draft = BookingDraft::new();
        assert_eq!(draft.step(), Step::Service);
        draft.select_service(massage());
        draft.select_date(d(2026, 3, 2), today, 60).expect("date");
        assert_eq!(draft.step(), Step::Time);
        draft.select_time(t(12, 0), &[t(12, 0), t(12, 30)]).expect("time");
        draft.fill_client(client()).expect("client");
        assert_eq!(draft.step(), Step::Confirmation);
        let booking = draft.finish().expect("finish");
        assert_eq!(booking.end, t(13, 0));
        assert_eq!(booking.client.name, "Анна");
        assert_eq!(booking.client.phone, "+7(999) 123-45-67");
    }

    #[test]
    fn steps_cannot_be_skipped() {
        let mut draft = BookingDraft::new();
        assert_eq!(draft.select_date(d(2026, 3, 2), d(2026, 3, 1), 60), Err(WizardError::NoService));
        draft.select_service(massage());
        assert_eq!(draft.select_time(t(12, 0), &[t(12, 0)]), Err(WizardError::NoDate));
        assert_eq!(draft.clone().finish(), Err(WizardError::NotReady));
    }

    #[test]
    fn date_window_is_enforced() {
        let mut draft = BookingDraft::new();
        draft.select_service(massage());
        let today = d(2026, 3, 10);
        assert_eq!(draft.select_date(d(2026, 3, 9), today, 60), Err(WizardError::DateInPast));
        assert_eq!(draft.select_date(d(2026, 5, 10), today, 60), Err(WizardError::BeyondHorizon(60)));
        assert!(draft.select_date(today, today, 60).is_ok());
    }

    #[test]
    fn changing_service_resets_later_answers() {
        let mut draft = BookingDraft::new();
        draft.select_service(massage());
        draft.select_date(d(2026, 3, 2), d(2026, 3, 1), 60).expect("date");
        draft.select_time(t(12, 0), &[t(12, 0)]).expect("time");
        draft.select_service(SelectedService { id: 1, name: "Access Bars".into(), duration_minutes: 90 });
        assert_eq!(draft.step(), Step::Date);
        assert_eq!(draft.time(), None);
    }

    #[test]
    fn unavailable_slot_is_a_conflict() {
        let mut draft = BookingDraft::new();
        draft.select_service(massage());
        draft.select_date(d(2026, 3, 2), d(2026, 3, 1), 60).expect("date");
        let err = draft.select_time(t(15, 0), &[t(12, 0)]).expect_err("taken");
        assert!(matches!(ServiceError::from(err), ServiceError::Conflict(_)));
    }

    #[test]
    fn back_walks_one_step() {
        let mut draft = BookingDraft::new();
        draft.select_service(massage());
        draft.select_date(d(2026, 3, 2), d(2026, 3, 1), 60).expect("date");
        assert_eq!(draft.back(), Step::Date);
        assert_eq!(draft.back(), Step::Service);
        assert_eq!(draft.back(), Step::Service);
    }

    #[test]
    fn client_details_are_validated() {
        let bad_email = ClientInput { email: Some("anna@".into()), ..client() };
        assert!(ClientDetails::parse(bad_email).is_err());
        let no_name = ClientInput { name: "  ".into(), ..client() };
        assert!(ClientDetails::parse(no_name).is_err());
        let long_notes = ClientInput { notes: Some("x".repeat(MAX_NOTES_CHARS + 1)), ..client() };
        assert!(ClientDetails::parse(long_notes).is_err());
        let long_email = ClientInput { email: Some(format!("{}@example.ru", "a".repeat(MAX_EMAIL_LEN))), ..client() };
        assert_eq!(
            ClientDetails::parse(long_email),
            Err(WizardError::Client(format!("email too long (max {MAX_EMAIL_LEN})")))
        );
        let double_at = ClientInput { email: Some("a@b@c.de".into()), ..client() };
        assert!(ClientDetails::parse(double_at).is_err());
        let blank_email = ClientInput { email: Some(" ".into()), ..client() };
        assert_eq!(ClientDetails::parse(blank_email).expect("ok").email, None);
    }
}
