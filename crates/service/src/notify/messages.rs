use models::booking::{self, BookingStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Admin,
    Client,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    NewBooking,
    ClientConfirmation,
    StatusUpdate,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::NewBooking => "new_booking",
            MessageKind::ClientConfirmation => "client_confirmation",
            MessageKind::StatusUpdate => "status_update",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub audience: Audience,
    pub booking_id: Option<i32>,
    /// E-mail address, when the audience has one.
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
}

const SIGNATURE: &str = "Гармония энергий";

pub fn status_text(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Confirmed => "подтверждена",
        BookingStatus::Cancelled => "отменена",
        BookingStatus::Completed => "завершена",
        BookingStatus::Pending => "обновлена",
    }
}

fn when(b: &booking::Model) -> String {
    format!(
        "{} {}-{}",
        b.booking_date.format("%d.%m.%Y"),
        b.start_time.format("%H:%M"),
        b.end_time.format("%H:%M")
    )
}

fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Admin notice about a fresh booking.
pub fn new_booking(b: &booking::Model, admin_email: &str) -> Message {
    let body = format!(
        "Новая запись на услугу!\n\nКлиент: {}\nТелефон: {}\nEmail: {}\n\nДата: {}\nУслуга: {}\n\nСтатус: {}\n\n---\n{}",
        b.client_name,
        b.client_phone,
        b.client_email.as_deref().unwrap_or("Не указано"),
        when(b),
        b.service_name,
        b.status.as_str(),
        SIGNATURE,
    );
    Message {
        kind: MessageKind::NewBooking,
        audience: Audience::Admin,
        booking_id: Some(b.id),
        recipient: non_empty(admin_email),
        subject: format!("Новая запись: {}", b.service_name),
        body,
    }
}

/// Sent to the client right after booking.
pub fn client_confirmation(b: &booking::Model) -> Message {
    let body = format!(
        "Здравствуйте, {}!\n\nВы записаны на «{}».\nДата и время: {}\n\nМы свяжемся с вами для подтверждения.\n\n---\n{}",
        b.client_name,
        b.service_name,
        when(b),
        SIGNATURE,
    );
    Message {
        kind: MessageKind::ClientConfirmation,
        audience: Audience::Client,
        booking_id: Some(b.id),
        recipient: b.client_email.as_deref().and_then(non_empty),
        subject: format!("Запись на {} принята", b.service_name),
        body,
    }
}

pub fn status_update(b: &booking::Model) -> Message {
    let text = status_text(b.status);
    Message {
        kind: MessageKind::StatusUpdate,
        audience: Audience::Client,
        booking_id: Some(b.id),
        recipient: b.client_email.as_deref().and_then(non_empty),
        subject: format!("Ваша запись {text}"),
        body: format!(
            "Здравствуйте, {}!\n\nВаша запись на «{}» ({}) {}.\n\n---\n{}",
            b.client_name,
            b.service_name,
            when(b),
            text,
            SIGNATURE,
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};

    pub fn booking(status: BookingStatus, email: Option<&str>) -> booking::Model {
        booking::Model {
            id: 11,
            service_id: Some(1),
            service_name: "Access Bars".into(),
            booking_date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"),
            start_time: NaiveTime::from_hms_opt(12, 0, 0).expect("time"),
            end_time: NaiveTime::from_hms_opt(13, 30, 0).expect("time"),
            client_name: "Анна".into(),
            client_phone: "+7(999) 123-45-67".into(),
            client_email: email.map(Into::into),
            notes: None,
            telegram_chat_id: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_texts() {
        assert_eq!(status_text(BookingStatus::Confirmed), "подтверждена");
        assert_eq!(status_text(BookingStatus::Cancelled), "отменена");
        assert_eq!(status_text(BookingStatus::Completed), "завершена");
        assert_eq!(status_text(BookingStatus::Pending), "обновлена");
    }

    #[test]
    fn admin_message_carries_booking_details() {
        let m = new_booking(&booking(BookingStatus::Pending, None), "admin@example.ru");
        assert_eq!(m.subject, "Новая запись: Access Bars");
        assert!(m.body.contains("02.03.2026 12:00-13:30"));
        assert!(m.body.contains("Email: Не указано"));
        assert_eq!(m.recipient.as_deref(), Some("admin@example.ru"));
    }

    #[test]
    fn client_messages_need_an_address() {
        assert_eq!(client_confirmation(&booking(BookingStatus::Pending, Some(" "))).recipient, None);
        let m = status_update(&booking(BookingStatus::Cancelled, Some("anna@example.ru")));
        assert_eq!(m.subject, "Ваша запись отменена");
        assert_eq!(m.audience, Audience::Client);
    }
}
