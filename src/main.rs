use crate::{
    configuration::Configuration, configuration_handler::ConfigurationHandler,
    file_store::FileStore, http::create_app, local_store::MemoryStore,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod backend;
mod booking_form;
mod configuration;
mod configuration_handler;
mod confirmation;
mod file_store;
mod http;
mod ledger;
mod local_store;
mod notifier;
mod slot_grid;
#[cfg(test)]
mod testutils;
mod types;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("##########################");
    println!("# Weekend Booking Server #");
    println!("##########################");

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, "Failed to bind {address}");
            return;
        }
    };
    info!("Accessible at {address}");

    if configuration.webhook_url().is_none() {
        info!("No booking endpoint configured. Bookings are only stored locally");
    }

    let app = if let Some(data_dir) = configuration.data_dir() {
        match FileStore::new(&data_dir) {
            Ok(store) => {
                info!(path = %data_dir.display(), "Persisting bookings to data directory");
                create_app(store, configuration)
            }
            Err(err) => {
                error!(?err, path = %data_dir.display(), "Failed to open data directory");
                return;
            }
        }
    } else {
        warn!("No data directory configured. Bookings are lost on restart");
        create_app(MemoryStore::default(), configuration)
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
    }
}
