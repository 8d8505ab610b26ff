use crate::backend::KeyValueStore;
use crate::booking_form::BookingForm;
use crate::configuration::Configuration;
use crate::confirmation::Confirmation;
use crate::ledger::{LedgerError, SlotLedger};
use crate::notifier::{NotifyOutcome, Notifier};
use crate::slot_grid::{self, Weekend};
use crate::types::{hour_minute, Availability, Block, Booking, SlotStatus};
use axum::body::Body;
use axum::extract::{Path, Query, Request};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const DEFAULT_WEEKENDS: usize = 4;
const MAX_WEEKENDS: usize = 12;
const MAX_SKIPPED_WEEKENDS: usize = 520;

pub struct AppState<S, C> {
    pub ledger: SlotLedger<S>,
    pub notifier: Notifier,
    pub configuration: C,
}

impl<S, C: Clone> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            notifier: self.notifier.clone(),
            configuration: self.configuration.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WeekendsQuery {
    count: Option<usize>,
    skip: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AvailabilityQuery {
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AvailabilityResponse {
    date: String,
    time: String,
    availability: Availability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotRequest {
    date: NaiveDate,
    #[serde(with = "hour_minute")]
    time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeleteBookingRequest {
    index: usize,
}

#[derive(Debug, Clone, Serialize)]
struct BookingResponse {
    booking: Booking,
    notification: NotifyOutcome,
    message: &'static str,
    confirmation: Confirmation,
}

type HandlerError = (StatusCode, String);

fn ledger_error(err: LedgerError) -> HandlerError {
    let status = match &err {
        LedgerError::NotWeekend(_) | LedgerError::OffGrid(_) => StatusCode::BAD_REQUEST,
        LedgerError::AlreadyBlocked(_)
        | LedgerError::NotBlocked(_)
        | LedgerError::SlotUnavailable { .. } => StatusCode::CONFLICT,
        LedgerError::BookingNotFound(_) | LedgerError::NothingToExport => StatusCode::NOT_FOUND,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(?err, "Ledger operation failed");
    } else {
        warn!(%err, "Ledger operation rejected");
    }
    (status, err.to_string())
}

pub fn create_app<S: KeyValueStore, C: Configuration>(store: S, configuration: C) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        ledger: SlotLedger::new(store),
        notifier: Notifier::new(configuration.webhook_url(), configuration.notify_timeout()),
        configuration,
    };

    let public = Router::new()
        .route("/weekends", get(get_weekends::<S, C>))
        .route("/availability", get(get_availability::<S, C>))
        .route("/schedule/:date", get(get_schedule::<S, C>))
        .route("/book", post(book::<S, C>));

    let admin = Router::new()
        .route("/bookings", get(get_bookings::<S, C>))
        .route("/blocks", get(get_blocks::<S, C>))
        .route("/block", post(block_slot::<S, C>))
        .route("/unblock", post(unblock_slot::<S, C>))
        .route("/delete_booking", post(delete_booking::<S, C>))
        .route("/clear", post(clear_bookings::<S, C>))
        .route("/export", get(export_bookings::<S, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<S, C>,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(cors)
}

async fn admin_auth<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let provided = request
        .headers()
        .get("x-admin-password")
        .map(|auth_header| auth_header.to_str().unwrap_or("").to_string());

    match provided {
        Some(password) if password == state.configuration.password() => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected admin request with wrong password");
            Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
        }
        None => Err((StatusCode::UNAUTHORIZED, "Missing credentials".to_string())),
    }
}

async fn get_weekends<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Query(query): Query<WeekendsQuery>,
) -> Json<Vec<Weekend>> {
    let count = query.count.unwrap_or(DEFAULT_WEEKENDS).min(MAX_WEEKENDS);
    let skip = query.skip.unwrap_or(0).min(MAX_SKIPPED_WEEKENDS);
    Json(state.ledger.upcoming_weekends(count, skip).collect())
}

async fn get_availability<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, HandlerError> {
    let availability = state
        .ledger
        .availability_of(&query.date, &query.time)
        .map_err(ledger_error)?;
    Ok(Json(AvailabilityResponse {
        date: query.date,
        time: query.time,
        availability,
    }))
}

async fn get_schedule<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<SlotStatus>>, HandlerError> {
    let Some(date) = slot_grid::parse_date(&date) else {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("'{date}' is not a YYYY-MM-DD date"),
        ));
    };
    if !slot_grid::is_weekend(date) {
        return Err(ledger_error(LedgerError::NotWeekend(date)));
    }
    state
        .ledger
        .day_schedule(date)
        .map(Json)
        .map_err(ledger_error)
}

async fn book<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Json(form): Json<BookingForm>,
) -> Response {
    let booking = match form.into_booking(Utc::now()) {
        Ok(booking) => booking,
        Err(errors) => {
            info!(%errors, "Rejected booking form");
            return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
        }
    };

    if let Err(err) = state.ledger.record_booking(booking.clone()) {
        return ledger_error(err).into_response();
    }

    let notification = state.notifier.notify(&booking).await;
    let confirmation = Confirmation::for_booking(
        &booking,
        &state.configuration.business_name(),
        state.configuration.owner_email().as_deref(),
    );

    Json(BookingResponse {
        booking,
        notification,
        message: notification.status_message(),
        confirmation,
    })
    .into_response()
}

async fn get_bookings<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
) -> Result<Json<Vec<Booking>>, HandlerError> {
    state.ledger.bookings().map(Json).map_err(ledger_error)
}

async fn get_blocks<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
) -> Result<Json<Vec<Block>>, HandlerError> {
    state.ledger.blocks().map(Json).map_err(ledger_error)
}

async fn block_slot<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Json(slot): Json<SlotRequest>,
) -> Result<Json<Block>, HandlerError> {
    state
        .ledger
        .record_block(slot.date, slot.time)
        .map(Json)
        .map_err(ledger_error)
}

async fn unblock_slot<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Json(slot): Json<SlotRequest>,
) -> Result<(StatusCode, String), HandlerError> {
    state
        .ledger
        .remove_block(slot.date, slot.time)
        .map_err(ledger_error)?;
    Ok((StatusCode::OK, "Slot unblocked successfully".to_string()))
}

async fn delete_booking<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<DeleteBookingRequest>,
) -> Result<Json<Booking>, HandlerError> {
    state
        .ledger
        .delete_booking(request.index)
        .map(Json)
        .map_err(ledger_error)
}

async fn clear_bookings<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
) -> Result<(StatusCode, String), HandlerError> {
    let removed = state.ledger.clear_bookings().map_err(ledger_error)?;
    Ok((StatusCode::OK, format!("Removed {removed} bookings")))
}

async fn export_bookings<S: KeyValueStore, C: Configuration>(
    State(state): State<AppState<S, C>>,
) -> Result<impl IntoResponse, HandlerError> {
    let csv = state.ledger.export_csv().map_err(ledger_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"bookings.csv\"",
            ),
        ],
        csv,
    ))
}
