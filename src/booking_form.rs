use crate::{
    slot_grid::{self, is_service_time, is_weekend},
    types::{Booking, ContactMethod},
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

lazy_static! {
    static ref PHONE_PATTERN: Regex =
        Regex::new(r"^\+?[0-9(][0-9 ().-]{5,22}$").expect("phone pattern compiles");
}

fn default_hours() -> u32 {
    1
}

/// Booking request as submitted by the browser form. Date and time arrive as
/// the raw `YYYY-MM-DD` / `HH:MM` strings of the form inputs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookingForm {
    #[validate(length(min = 1, max = 200, message = "Please enter your name"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(regex(path = *PHONE_PATTERN, message = "Please enter a valid phone number"))]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Please choose a service"))]
    pub service: String,
    #[serde(default)]
    pub contact_method: ContactMethod,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default = "default_hours")]
    #[validate(range(min = 1, max = 8, message = "Bookings last between 1 and 8 hours"))]
    pub hours: u32,
    #[validate(length(min = 1, max = 500, message = "Please enter the service address"))]
    pub address: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub details: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub referral: Option<String>,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

impl BookingForm {
    fn trimmed(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.email,
            &mut self.phone,
            &mut self.service,
            &mut self.date,
            &mut self.time,
            &mut self.address,
            &mut self.details,
        ] {
            *field = field.trim().to_string();
        }
        self.referral = self
            .referral
            .map(|referral| referral.trim().to_string())
            .filter(|referral| !referral.is_empty());
        self
    }

    /// Checks every field and turns the form into a [`Booking`] created at
    /// `created`. All failing fields are reported together.
    pub fn into_booking(self, created: DateTime<Utc>) -> Result<Booking, ValidationErrors> {
        let form = self.trimmed();
        let mut errors = match form.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let date = if form.date.is_empty() {
            errors.add("date", field_error("required", "Please select a date"));
            None
        } else {
            match slot_grid::parse_date(&form.date) {
                Some(date) if is_weekend(date) => Some(date),
                Some(_) => {
                    errors.add(
                        "date",
                        field_error(
                            "weekend",
                            "Please select a Saturday or Sunday. Bookings are taken on weekends only",
                        ),
                    );
                    None
                }
                None => {
                    errors.add("date", field_error("format", "Dates use the YYYY-MM-DD format"));
                    None
                }
            }
        };

        let time = if form.time.is_empty() {
            errors.add("time", field_error("required", "Please select a time slot"));
            None
        } else {
            match slot_grid::parse_time(&form.time) {
                Some(time) if is_service_time(time) => Some(time),
                _ => {
                    errors.add(
                        "time",
                        field_error("service_hours", "Please select one of the offered time slots"),
                    );
                    None
                }
            }
        };

        match (date, time) {
            (Some(date), Some(time)) if errors.is_empty() => Ok(Booking {
                id: Uuid::new_v4(),
                service: form.service,
                name: form.name,
                phone: form.phone,
                email: form.email,
                contact_method: form.contact_method,
                date,
                time,
                hours: form.hours,
                address: form.address,
                special_requests: form.details,
                referral: form.referral,
                created,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::{date, time};
    use test_case::test_case;

    fn valid_form() -> BookingForm {
        BookingForm {
            name: " Grace Hopper ".into(),
            email: "grace@example.com".into(),
            phone: "(555) 123-4567".into(),
            service: "TV Mounting".into(),
            contact_method: ContactMethod::Text,
            date: "2026-10-17".into(),
            time: "10:00".into(),
            hours: 2,
            address: "1 Harbor Rd".into(),
            details: "65 inch screen".into(),
            referral: Some("  ".into()),
        }
    }

    #[test]
    fn test_valid_form_becomes_booking() {
        let created = Utc::now();
        let booking = valid_form().into_booking(created).unwrap();
        assert_eq!(booking.name, "Grace Hopper");
        assert_eq!(booking.date, date(2026, 10, 17));
        assert_eq!(booking.time, time(10));
        assert_eq!(booking.hours, 2);
        assert_eq!(booking.contact_method, ContactMethod::Text);
        assert_eq!(booking.special_requests, "65 inch screen");
        assert_eq!(booking.referral, None);
        assert_eq!(booking.created, created);
    }

    #[test]
    fn test_every_failing_field_is_reported() {
        let form = BookingForm {
            name: String::new(),
            email: "not-an-email".into(),
            phone: "call me".into(),
            date: "2026-10-16".into(),
            time: String::new(),
            hours: 12,
            ..valid_form()
        };
        let errors = form.into_booking(Utc::now()).unwrap_err();
        let fields = errors.field_errors();
        for field in ["name", "email", "phone", "date", "time", "hours"] {
            assert!(fields.contains_key(field), "missing error for {field}");
        }
        assert!(!fields.contains_key("address"));
        assert_eq!(fields["date"][0].code, "weekend");
        assert_eq!(fields["time"][0].code, "required");
    }

    #[test_case("", "required" ; "missing date")]
    #[test_case("2026/10/17", "format" ; "wrong format")]
    #[test_case("2026-10-20", "weekend" ; "tuesday")]
    fn test_date_errors(raw: &str, code: &str) {
        let form = BookingForm {
            date: raw.into(),
            ..valid_form()
        };
        let errors = form.into_booking(Utc::now()).unwrap_err();
        assert_eq!(errors.field_errors()["date"][0].code, code);
    }

    #[test_case("08:00" ; "before opening")]
    #[test_case("17:00" ; "after last slot")]
    #[test_case("10:30" ; "off the hour")]
    fn test_time_outside_grid(raw: &str) {
        let form = BookingForm {
            time: raw.into(),
            ..valid_form()
        };
        let errors = form.into_booking(Utc::now()).unwrap_err();
        assert_eq!(errors.field_errors()["time"][0].code, "service_hours");
    }

    #[test]
    fn test_form_defaults_from_json() {
        let form: BookingForm = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","phone":"5550102030",
                "service":"Yard Work","date":"2026-10-18","time":"09:00","address":"x"}"#,
        )
        .unwrap();
        assert_eq!(form.hours, 1);
        assert_eq!(form.contact_method, ContactMethod::Phone);
        assert_eq!(form.referral, None);
        assert!(form.into_booking(Utc::now()).is_ok());
    }
}
