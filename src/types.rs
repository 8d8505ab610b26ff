use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Serializes slot start times as `HH:MM`, the format the booking form submits.
pub mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format("%Y-%m-%d"),
            self.time.format(hour_minute::FORMAT)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Booked,
    Blocked,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Availability::Available => "available",
            Availability::Booked => "booked",
            Availability::Blocked => "blocked",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    #[default]
    Phone,
    Email,
    Text,
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContactMethod::Phone => "phone",
            ContactMethod::Email => "email",
            ContactMethod::Text => "text",
        };
        f.write_str(label)
    }
}

/// A confirmed reservation. Stored as a flat record; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub service: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub contact_method: ContactMethod,
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    pub hours: u32,
    pub address: String,
    pub special_requests: String,
    pub referral: Option<String>,
    pub created: DateTime<Utc>,
}

impl Booking {
    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.time)
    }

    /// The start slot followed by every continuation hour. Hours past midnight
    /// are dropped, the grid never reaches them.
    pub fn occupied_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.hours.max(1)).filter_map(move |offset| {
            NaiveTime::from_hms_opt(self.time.hour() + offset, self.time.minute(), 0)
                .map(|time| Slot::new(self.date, time))
        })
    }
}

/// A slot marked unavailable. `booking_id` is set when the block covers a
/// continuation hour of a multi-hour booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
}

impl Block {
    pub fn manual(slot: Slot) -> Self {
        Self {
            date: slot.date,
            time: slot.time,
            booking_id: None,
        }
    }

    pub fn derived(slot: Slot, booking_id: Uuid) -> Self {
        Self {
            date: slot.date,
            time: slot.time,
            booking_id: Some(booking_id),
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    pub availability: Availability,
}
