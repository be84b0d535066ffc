use crate::api::{with_request_id, AppState};
use crate::database::booking_repository::Booking;
use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::{get_request_id_from_headers, json_error_response};
use crate::services::booking::BookingDetails;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    payload: Result<Json<CreateBookingBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return json_error_response(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
                get_request_id_from_headers(&headers),
            )
            .into_response();
        }
    };

    match state
        .bookings
        .create_booking(body.property_id, body.start_date, body.end_date, user.user_id)
        .await
    {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(e) => with_request_id(&headers)(e).into_response(),
    }
}

/// GET /api/bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    state
        .bookings
        .list_bookings(user.user_id)
        .await
        .map(Json)
        .map_err(with_request_id(&headers))
}

/// GET /api/bookings/{booking_id}
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<BookingDetails>, AppError> {
    state
        .bookings
        .get_booking(booking_id, user.user_id)
        .await
        .map(Json)
        .map_err(with_request_id(&headers))
}
