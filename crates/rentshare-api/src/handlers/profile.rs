//! Own profile and public member pages

use super::item::content_type;
use crate::dto::{ApiResponse, PaginationParams, PublicProfile, ReviewsResponse, UpdateProfileRequest};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::AppError;
use rentshare_storage::Bucket;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// PUT /api/v1/profile
#[instrument(skip(state, user, req))]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let profile = state
        .accounts
        .update_profile(user.user_id, req.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

/// Replace the caller's avatar; the request body is the raw image
///
/// POST /api/v1/profile/avatar
#[instrument(skip(state, user, req, body), fields(size = body.len()))]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let content_type = content_type(&req)?;
    let profile = state
        .accounts
        .upload_avatar(user.user_id, &content_type, body)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let profile = state.accounts.get_profile(user_id).await?;
    let rating = state.reviews.user_rating(user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PublicProfile::new(&profile, rating))))
}

/// GET /api/v1/users/{id}/items
pub async fn user_items(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let (items, total) = state
        .items
        .list_items_by_owner(path.into_inner(), &query.pagination())
        .await?;
    Ok(HttpResponse::Ok().json(query.paginate(items, total)))
}

/// Reviews written about a member
///
/// GET /api/v1/users/{id}/reviews
pub async fn user_reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let (reviews, total) = state
        .reviews
        .list_reviews_for_user(user_id, &query.pagination())
        .await?;
    let summary = state.reviews.user_rating(user_id).await?;

    Ok(HttpResponse::Ok().json(ReviewsResponse {
        summary,
        reviews: query.paginate(reviews, total),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .route("", web::put().to(update_profile))
            .service(
                web::resource("/avatar")
                    .app_data(web::PayloadConfig::new(Bucket::Avatars.max_bytes()))
                    .route(web::post().to(upload_avatar)),
            ),
    )
    .service(
        web::scope("/users")
            .route("/{id}", web::get().to(get_user))
            .route("/{id}/items", web::get().to(user_items))
            .route("/{id}/reviews", web::get().to(user_reviews)),
    );
}
