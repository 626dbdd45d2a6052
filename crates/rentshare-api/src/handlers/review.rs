//! Review handlers

use crate::dto::{ApiResponse, CreateReviewRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::AppError;
use tracing::instrument;
use validator::Validate;

/// Review a completed booking
///
/// POST /api/v1/reviews
#[instrument(skip(state, user, req))]
pub async fn create_review(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let review = state
        .reviews
        .create_review(user.user_id, req.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(review)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/reviews", web::post().to(create_review));
}
