//! Favorites and notifications

use crate::dto::{ApiResponse, CountResponse, NotificationParams};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::AppError;
use uuid::Uuid;

/// Saved items, newest first
///
/// GET /api/v1/favorites
pub async fn list_favorites(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let items = state.activity.list_favorites(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

/// POST /api/v1/favorites/{item_id}
pub async fn add_favorite(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .activity
        .add_favorite(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/v1/favorites/{item_id}
pub async fn remove_favorite(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .activity
        .remove_favorite(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<NotificationParams>,
) -> Result<HttpResponse, AppError> {
    let notifications = state
        .activity
        .list_notifications(user.user_id, query.unread_only, &query.pagination())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(notifications)))
}

/// POST /api/v1/notifications/{id}/read
pub async fn mark_notification_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .activity
        .mark_notification_read(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let count = state.activity.mark_all_notifications_read(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(CountResponse { count })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/favorites")
            .route("", web::get().to(list_favorites))
            .route("/{item_id}", web::post().to(add_favorite))
            .route("/{item_id}", web::delete().to(remove_favorite)),
    )
    .service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/read-all", web::post().to(mark_all_read))
            .route("/{id}/read", web::post().to(mark_notification_read)),
    );
}
