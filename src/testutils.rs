use crate::{
    backend::{KeyValueStore, StorageError},
    configuration::Configuration,
    types::{Booking, ContactMethod},
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use mockall::mock;
use std::{path::PathBuf, time::Duration};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "123";

mock! {
    pub Store {}

    impl KeyValueStore for Store {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
        fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestConfiguration {
    pub webhook_url: Option<String>,
    pub owner_email: Option<String>,
}

impl Configuration for TestConfiguration {
    fn business_name(&self) -> String {
        "Motion Man".into()
    }

    fn password(&self) -> String {
        TEST_PASSWORD.into()
    }

    fn port(&self) -> String {
        "0".into()
    }

    fn data_dir(&self) -> Option<PathBuf> {
        None
    }

    fn webhook_url(&self) -> Option<String> {
        self.webhook_url.clone()
    }

    fn notify_timeout(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn owner_email(&self) -> Option<String> {
        self.owner_email.clone()
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

pub fn booking_at(date: NaiveDate, time: NaiveTime, hours: u32) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        service: "Furniture Assembly".into(),
        name: "Ada Lovelace".into(),
        phone: "+1 555 010 2030".into(),
        email: "ada@example.com".into(),
        contact_method: ContactMethod::Email,
        date,
        time,
        hours,
        address: "12 Analytical Way".into(),
        special_requests: "Assemble two shelves".into(),
        referral: None,
        created: Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap(),
    }
}
