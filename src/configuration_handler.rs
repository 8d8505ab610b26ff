use crate::configuration::Configuration;
use clap::Parser;
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Weekend booking service")]
pub struct ConfigurationHandler {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: String,

    /// Password expected in the `x-admin-password` header of admin requests
    #[arg(long, env = "ADMIN_PASSWORD")]
    password: String,

    /// Directory bookings and blocks are persisted to. Kept in memory if absent
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Webhook receiving a form-encoded copy of every new booking
    #[arg(long, env = "BOOKING_ENDPOINT")]
    webhook_url: Option<String>,

    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value_t = 10)]
    notify_timeout_secs: u64,

    #[arg(long, env = "BUSINESS_NAME", default_value = "Motion Man")]
    business_name: String,

    /// Address offered to clients as a prefilled email fallback
    #[arg(long, env = "OWNER_EMAIL")]
    owner_email: Option<String>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn business_name(&self) -> String {
        self.business_name.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn port(&self) -> String {
        self.port.clone()
    }

    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone()
    }

    fn webhook_url(&self) -> Option<String> {
        self.webhook_url
            .clone()
            .filter(|endpoint| !endpoint.trim().is_empty())
    }

    fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    fn owner_email(&self) -> Option<String> {
        self.owner_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
    }
}
