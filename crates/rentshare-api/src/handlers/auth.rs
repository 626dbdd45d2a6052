//! Authentication handlers

use crate::dto::{ApiResponse, LoginRequest, RegisterRequest};
use crate::state::AppState;
use actix_web::{cookie::Cookie, web, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::AppError;
use rentshare_services::Session;
use tracing::{debug, instrument, warn};
use validator::Validate;

fn session_cookie(session: &Session) -> Cookie<'static> {
    Cookie::build("token", session.token.clone())
        .path("/")
        .http_only(true)
        .max_age(actix_web::cookie::time::Duration::seconds(session.expires_in))
        .finish()
}

/// Create an account and sign in
///
/// POST /api/v1/auth/register
#[instrument(skip(state, req))]
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Register validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let req = req.into_inner();
    let session = state
        .accounts
        .register(&req.email, &req.password, req.full_name)
        .await?;

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&session))
        .json(ApiResponse::success(session)))
}

/// Login endpoint
///
/// POST /api/v1/auth/login
#[instrument(skip(state, req))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Login validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let session = state.accounts.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session))
        .json(ApiResponse::success(session)))
}

/// Clear the session cookie
///
/// POST /api/v1/auth/logout
pub async fn logout(user: AuthenticatedUser) -> HttpResponse {
    debug!(user_id = %user.user_id, "User logged out");

    let cookie = Cookie::build("token", "")
        .path("/")
        .http_only(true)
        .max_age(actix_web::cookie::time::Duration::seconds(0))
        .finish();

    HttpResponse::NoContent().cookie(cookie).finish()
}

/// Get the caller's own profile
///
/// GET /api/v1/auth/me
#[instrument(skip(state, user))]
pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = state.accounts.get_profile(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}
