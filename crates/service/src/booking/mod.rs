//! Booking wizard and client contact normalisation.

pub mod phone;
pub mod wizard;

pub use wizard::{BookingDraft, ClientDetails, ClientInput, NewBooking, SelectedService, Step, WizardError};
