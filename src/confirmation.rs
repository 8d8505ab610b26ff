//! Calendar (.ics), plain-text and owner email confirmations handed back to
//! the client after a booking is recorded.

use crate::types::Booking;
use chrono::{Duration, NaiveDateTime};
use icalendar::{Calendar, Component, EventLike};
use serde::Serialize;

const PRODID: &str = "-//MotionMan//Booking//EN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub ics_filename: String,
    pub ics: String,
    pub text_filename: String,
    pub text: String,
    /// Prefilled `mailto:` link to the owner, present when an owner address is configured.
    pub mailto: Option<String>,
}

impl Confirmation {
    pub fn for_booking(
        booking: &Booking,
        business_name: &str,
        owner_email: Option<&str>,
    ) -> Self {
        let stem = file_stem(booking, business_name);
        Self {
            ics_filename: format!("{stem}.ics"),
            ics: generate_ics(booking, business_name),
            text_filename: format!("{stem}.txt"),
            text: booking_text(booking),
            mailto: owner_email.map(|owner| owner_mailto(booking, business_name, owner)),
        }
    }
}

fn start(booking: &Booking) -> NaiveDateTime {
    booking.date.and_time(booking.time)
}

fn end(booking: &Booking) -> NaiveDateTime {
    start(booking) + Duration::hours(i64::from(booking.hours))
}

fn description(booking: &Booking) -> String {
    format!(
        "Service: {}\nClient: {}\nPhone: {}\nEmail: {}\nNotes: {}",
        booking.service, booking.name, booking.phone, booking.email, booking.special_requests
    )
}

/// Single-event calendar with floating (unzoned) start and end times.
pub fn generate_ics(booking: &Booking, business_name: &str) -> String {
    let mut event = icalendar::Event::new();
    event.uid(&format!(
        "mm-{}@motionman.local",
        booking.created.timestamp_millis()
    ));
    event.add_property(
        "DTSTAMP",
        &booking.created.format("%Y%m%dT%H%M%SZ").to_string(),
    );
    event.add_property("DTSTART", &start(booking).format("%Y%m%dT%H%M%S").to_string());
    event.add_property("DTEND", &end(booking).format("%Y%m%dT%H%M%S").to_string());
    event.summary(&format!("{} — {business_name} Booking", booking.service));
    event.description(&description(booking));

    let mut calendar = Calendar::new();
    calendar.push(event.done());
    let calendar = calendar.done();

    calendar
        .to_string()
        .lines()
        .filter(|line| *line != "CALSCALE:GREGORIAN")
        .map(|line| {
            if line.starts_with("PRODID:") {
                format!("PRODID:{PRODID}\r\n")
            } else {
                format!("{line}\r\n")
            }
        })
        .collect()
}

/// Plain-text duplicate for devices that do not accept .ics files.
pub fn booking_text(booking: &Booking) -> String {
    let mut text = format!(
        "Booking request\nService: {}\nClient: {}\nPhone: {}\nEmail: {}\nContact via: {}\nDate: {} {}\nDuration(hrs): {}\nAddress: {}\n",
        booking.service,
        booking.name,
        booking.phone,
        booking.email,
        booking.contact_method,
        booking.date.format("%Y-%m-%d"),
        booking.time.format("%H:%M"),
        booking.hours,
        booking.address,
    );
    if let Some(referral) = &booking.referral {
        text.push_str(&format!("Referral: {referral}\n"));
    }
    text.push_str(&format!("Notes:\n{}", booking.special_requests));
    text
}

/// Opens the client's mail program with the booking text addressed to `owner`.
pub fn owner_mailto(booking: &Booking, business_name: &str, owner: &str) -> String {
    let subject = format!("New booking request - {business_name}");
    format!(
        "mailto:{}?subject={}&body={}",
        owner.trim(),
        urlencoding::encode(&subject),
        urlencoding::encode(&booking_text(booking))
    )
}

fn slug(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

fn file_stem(booking: &Booking, business_name: &str) -> String {
    format!(
        "{}-{}-{}",
        slug(business_name).replace('-', ""),
        slug(&booking.service),
        booking.date.format("%Y-%m-%d")
    )
}
