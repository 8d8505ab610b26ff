use crate::types::Booking;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of the best-effort webhook call made after a booking is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOutcome {
    NotConfigured,
    Delivered,
    Failed,
}

impl NotifyOutcome {
    pub fn status_message(&self) -> &'static str {
        match self {
            NotifyOutcome::NotConfigured => {
                "Booking saved. No owner notification is configured."
            }
            NotifyOutcome::Delivered => "Booking saved. The owner was notified.",
            NotifyOutcome::Failed => {
                "Booking saved locally. Notifying the owner failed, the booking is still recorded."
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    endpoint: Option<String>,
}

impl Notifier {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                error!(?err, "Failed to build notification client, using defaults");
                Client::new()
            });
        Self {
            client,
            endpoint: endpoint.filter(|endpoint| !endpoint.trim().is_empty()),
        }
    }

    /// Posts `booking` as a single form field `payload` holding its JSON.
    /// Form encoding keeps the request free of a CORS preflight.
    pub async fn notify(&self, booking: &Booking) -> NotifyOutcome {
        let Some(endpoint) = &self.endpoint else {
            return NotifyOutcome::NotConfigured;
        };

        let payload = match serde_json::to_string(booking) {
            Ok(payload) => payload,
            Err(err) => {
                error!(?err, "Failed to encode booking for notification");
                return NotifyOutcome::Failed;
            }
        };

        match self
            .client
            .post(endpoint)
            .form(&[("payload", payload)])
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!(slot = %booking.slot(), "Owner notified");
                NotifyOutcome::Delivered
            }
            Ok(response) => {
                warn!(status = %response.status(), "Notification endpoint rejected booking");
                NotifyOutcome::Failed
            }
            Err(err) => {
                warn!(?err, "Notification request failed");
                NotifyOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::{booking_at, date, time};
    use axum::{extract::State, http::StatusCode, routing::post, Form, Router};
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };
    use tokio::task::JoinHandle;

    type Received = Arc<Mutex<Vec<String>>>;

    async fn receive(
        State(received): State<Received>,
        Form(fields): Form<HashMap<String, String>>,
    ) -> StatusCode {
        match fields.get("payload") {
            Some(payload) => {
                received.lock().unwrap().push(payload.clone());
                StatusCode::OK
            }
            None => StatusCode::BAD_REQUEST,
        }
    }

    async fn spawn_hook() -> (JoinHandle<()>, String, Received) {
        let received = Received::default();
        let app = Router::new()
            .route("/hook", post(receive))
            .route("/broken", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (server, format!("http://{address}"), received)
    }

    #[tokio::test]
    async fn test_not_configured() {
        let booking = booking_at(date(2026, 10, 17), time(10), 1);
        for endpoint in [None, Some(String::new()), Some("  ".into())] {
            let notifier = Notifier::new(endpoint, Duration::from_secs(1));
            assert_eq!(notifier.notify(&booking).await, NotifyOutcome::NotConfigured);
        }
    }

    #[tokio::test]
    async fn test_delivered_payload() {
        let (server, base_url, received) = spawn_hook().await;
        let booking = booking_at(date(2026, 10, 17), time(10), 2);
        let notifier = Notifier::new(Some(format!("{base_url}/hook")), Duration::from_secs(2));

        assert_eq!(notifier.notify(&booking).await, NotifyOutcome::Delivered);

        let received = received.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        let delivered: Booking = serde_json::from_str(&received[0]).unwrap();
        assert_eq!(delivered, booking);
        server.abort();
    }

    #[tokio::test]
    async fn test_rejected_and_unreachable() {
        let (server, base_url, _) = spawn_hook().await;
        let booking = booking_at(date(2026, 10, 18), time(9), 1);

        let notifier = Notifier::new(Some(format!("{base_url}/broken")), Duration::from_secs(2));
        assert_eq!(notifier.notify(&booking).await, NotifyOutcome::Failed);
        server.abort();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed = listener.local_addr().unwrap();
        drop(listener);
        let notifier = Notifier::new(Some(format!("http://{closed}/hook")), Duration::from_secs(2));
        assert_eq!(notifier.notify(&booking).await, NotifyOutcome::Failed);
    }
}
