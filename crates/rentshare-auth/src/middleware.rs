//! Actix-web request extractors for authenticated members and admins

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use rentshare_core::error::AppError;
use rentshare_core::models::UserRole;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Extract the bearer token from the Authorization header, falling back to
/// a cookie named "token"
fn extract_token_from_request(req: &HttpRequest) -> Option<String> {
    if let Some(auth_header) = req.headers().get("Authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    req.cookie("token").map(|c| c.value().to_string())
}

/// Caller identified by a valid access token
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use rentshare_auth::AuthenticatedUser;
///
/// async fn me(user: AuthenticatedUser) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({ "id": user.user_id }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    fn authenticate(req: &HttpRequest) -> Result<Self, AppError> {
        let jwt_service = req
            .app_data::<web::Data<Arc<JwtService>>>()
            .map(|service| service.get_ref().clone())
            .ok_or_else(|| {
                warn!("JwtService not found in app data");
                AppError::Unauthorized("Authentication service not configured".to_string())
            })?;

        let token = extract_token_from_request(req).ok_or_else(|| {
            debug!("No authentication token found in request");
            AppError::Unauthorized("No authentication token provided".to_string())
        })?;

        let claims = jwt_service.validate_token(&token)?;
        debug!(user_id = %claims.sub, role = %claims.role, "User authenticated");

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
            claims,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::authenticate(req).map_err(Into::into))
    }
}

/// Caller holding the admin role; anyone else gets 403
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl std::ops::Deref for AdminUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = AuthenticatedUser::authenticate(req).and_then(|user| {
            if user.is_admin() {
                debug!(user_id = %user.user_id, "Admin access granted");
                Ok(AdminUser(user))
            } else {
                warn!(user_id = %user.user_id, "Member attempted admin access");
                Err(AppError::Forbidden)
            }
        });

        ready(result.map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new("test-secret-key-12345", 3600))
    }

    fn token_for(jwt: &JwtService, user_id: Uuid, role: UserRole) -> String {
        jwt.create_token(&Claims::new(user_id, "user@example.com", role))
            .unwrap()
    }

    #[actix_web::test]
    async fn test_bearer_token_authenticates() {
        let jwt = jwt();
        let id = Uuid::new_v4();
        let token = token_for(&jwt, id, UserRole::Member);

        let app = test::init_service(App::new().app_data(web::Data::new(jwt)).route(
            "/me",
            web::get().to(move |user: AuthenticatedUser| async move {
                assert_eq!(user.user_id, id);
                assert_eq!(user.email, "user@example.com");
                "OK"
            }),
        ))
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_missing_and_invalid_tokens_are_401() {
        let app = test::init_service(App::new().app_data(web::Data::new(jwt())).route(
            "/me",
            web::get().to(|_user: AuthenticatedUser| async { "OK" }),
        ))
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", "Bearer invalid.token.here"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn test_admin_extractor() {
        let jwt = jwt();
        let admin_token = token_for(&jwt, Uuid::new_v4(), UserRole::Admin);
        let member_token = token_for(&jwt, Uuid::new_v4(), UserRole::Member);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(jwt))
                .route("/admin", web::get().to(|_admin: AdminUser| async { "OK" })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", format!("Bearer {}", admin_token)))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", format!("Bearer {}", member_token)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);
    }
}
