//! Reports and admin moderation
//!
//! Filing a report is open to every member. Everything under `/admin`
//! requires the admin role; non-admins get 403.

use crate::dto::{ApiResponse, CreateReportRequest, ReportListParams, ResolveReportRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rentshare_auth::{AdminUser, AuthenticatedUser};
use rentshare_core::{traits::PaginatedResponse, AppError};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// POST /api/v1/reports
#[instrument(skip(state, user, req))]
pub async fn file_report(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateReportRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Report validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let report = state
        .moderation
        .file_report(user.user_id, req.target_type, req.target_id, &req.reason)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(report)))
}

/// GET /api/v1/admin/reports
pub async fn list_reports(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<ReportListParams>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination();
    let (reports, total) = state
        .moderation
        .list_reports(query.status_filter(), &pagination)
        .await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(
        reports,
        total,
        &pagination,
    )))
}

/// POST /api/v1/admin/reports/{id}/resolve
#[instrument(skip(state, admin, req))]
pub async fn resolve_report(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    req: web::Json<ResolveReportRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let req = req.into_inner();
    let report = state
        .moderation
        .resolve_report(admin.user_id, path.into_inner(), req.status, req.note)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// POST /api/v1/admin/items/{id}/suspend
pub async fn suspend_item(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item = state
        .moderation
        .suspend_item(admin.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(item, "Item suspended")))
}

/// POST /api/v1/admin/items/{id}/reinstate
pub async fn reinstate_item(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item = state
        .moderation
        .reinstate_item(admin.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(item, "Item reinstated")))
}

/// POST /api/v1/admin/users/{id}/suspend
pub async fn suspend_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .moderation
        .suspend_profile(admin.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(profile, "User suspended")))
}

/// POST /api/v1/admin/users/{id}/reinstate
pub async fn reinstate_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .moderation
        .reinstate_profile(admin.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(profile, "User reinstated")))
}

/// DELETE /api/v1/admin/reviews/{id}
pub async fn delete_review(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .moderation
        .delete_review(admin.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/admin/stats
pub async fn dashboard_stats(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let stats = state.moderation.dashboard_stats().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/reports", web::post().to(file_report)).service(
        web::scope("/admin")
            .route("/reports", web::get().to(list_reports))
            .route("/reports/{id}/resolve", web::post().to(resolve_report))
            .route("/items/{id}/suspend", web::post().to(suspend_item))
            .route("/items/{id}/reinstate", web::post().to(reinstate_item))
            .route("/users/{id}/suspend", web::post().to(suspend_user))
            .route("/users/{id}/reinstate", web::post().to(reinstate_user))
            .route("/reviews/{id}", web::delete().to(delete_review))
            .route("/stats", web::get().to(dashboard_stats)),
    );
}
