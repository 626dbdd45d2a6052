//! Booking handlers

use crate::dto::{ApiResponse, BookingListParams, CreateBookingRequest, TransitionRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::{models::BookingAction, traits::PaginatedResponse, AppError};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Request a booking
///
/// POST /api/v1/bookings
#[instrument(skip(state, user, req))]
pub async fn create_booking(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Booking validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let booking = state
        .bookings
        .create_booking(user.user_id, req.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(booking)))
}

/// Bookings the caller made, or bookings of the caller's items with `role=owner`
///
/// GET /api/v1/bookings
pub async fn list_bookings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<BookingListParams>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination();
    let (bookings, total) = state
        .bookings
        .list_bookings(user.user_id, &query.filter(), &pagination)
        .await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(bookings, total, &pagination)))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let booking = state
        .bookings
        .get_booking(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Lifecycle action: confirm, reject, activate, complete or cancel
///
/// POST /api/v1/bookings/{id}/{action}
#[instrument(skip(state, user, body))]
pub async fn transition(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, String)>,
    body: Option<web::Json<TransitionRequest>>,
) -> Result<HttpResponse, AppError> {
    let (booking_id, action) = path.into_inner();
    let action = BookingAction::from_str(&action)
        .ok_or_else(|| AppError::NotFound(format!("Booking action {}", action)))?;

    let body = body.map(web::Json::into_inner).unwrap_or_default();
    body.validate()?;

    let booking = state
        .bookings
        .transition(user.user_id, booking_id, action, body.reason)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("", web::get().to(list_bookings))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/{action}", web::post().to(transition)),
    );
}
