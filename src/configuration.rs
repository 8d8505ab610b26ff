use std::{path::PathBuf, time::Duration};

pub trait Configuration: Clone + Send + Sync + 'static {
    fn business_name(&self) -> String;
    fn password(&self) -> String;
    fn port(&self) -> String;
    fn data_dir(&self) -> Option<PathBuf>;
    fn webhook_url(&self) -> Option<String>;
    fn notify_timeout(&self) -> Duration;
    fn owner_email(&self) -> Option<String>;
}
