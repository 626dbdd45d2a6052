//! End-to-end handler tests over in-memory repositories
//!
//! Every test builds the full `/api/v1` app with the in-memory repositories
//! from `rentshare_services::testing`, so no database or Redis is needed.

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use chrono::{Duration, SecondsFormat, Utc};
    use rentshare_api::{configure, health_check, AppState, Repositories};
    use rentshare_auth::JwtService;
    use rentshare_cache::CacheLayer;
    use rentshare_core::{
        models::{Profile, UserRole},
        pricing::PricingPolicy,
        traits::Repository,
    };
    use rentshare_services::testing::*;
    use rentshare_storage::{FileStorage, InMemoryObjectStore};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct TestContext {
        state: web::Data<AppState>,
        jwt: Arc<JwtService>,
        profiles: Arc<InMemoryProfileRepository>,
    }

    fn context() -> TestContext {
        let profiles = Arc::new(InMemoryProfileRepository::default());
        let conversations = Arc::new(InMemoryConversationRepository::default());
        let repos = Repositories {
            profiles: profiles.clone(),
            items: Arc::new(InMemoryItemRepository::default()),
            categories: Arc::new(InMemoryCategoryRepository::default()),
            images: Arc::new(InMemoryItemImageRepository::default()),
            bookings: Arc::new(InMemoryBookingRepository::default()),
            reviews: Arc::new(InMemoryReviewRepository::default()),
            messages: Arc::new(InMemoryMessageRepository::new(conversations.clone())),
            conversations,
            favorites: Arc::new(InMemoryFavoriteRepository::default()),
            notifications: Arc::new(InMemoryNotificationRepository::default()),
            reports: Arc::new(InMemoryReportRepository::default()),
        };
        let jwt = Arc::new(JwtService::new("api-test-secret", 3600));
        let cache = Arc::new(CacheLayer::in_memory(1000, std::time::Duration::from_secs(60)));
        let files = FileStorage::new(
            Arc::new(InMemoryObjectStore::new()),
            "https://files.example.com",
        );

        TestContext {
            state: web::Data::new(AppState::new(
                repos,
                cache,
                jwt.clone(),
                files,
                PricingPolicy::default(),
            )),
            jwt,
            profiles,
        }
    }

    macro_rules! app {
        ($ctx:expr) => {
            test::init_service(
                App::new()
                    .app_data($ctx.state.clone())
                    .app_data(web::Data::new($ctx.jwt.clone()))
                    .route("/health", web::get().to(health_check))
                    .service(web::scope("/api/v1").configure(configure)),
            )
            .await
        };
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    /// Register a member; evaluates to (token, user id)
    macro_rules! register {
        ($app:expr, $email:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/v1/auth/register")
                .set_json(json!({
                    "email": $email,
                    "password": "correct-horse-battery",
                    "full_name": "Test Member"
                }))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);

            let body: Value = test::read_body_json(resp).await;
            (
                body["data"]["token"].as_str().unwrap().to_string(),
                body["data"]["profile"]["id"].as_str().unwrap().to_string(),
            )
        }};
    }

    /// List an item; evaluates to its id
    macro_rules! create_item {
        ($app:expr, $token:expr, $title:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/v1/items")
                .insert_header(bearer(&$token))
                .set_json(json!({
                    "title": $title,
                    "description": "Cordless, two batteries",
                    "daily_rate": "15.00",
                    "security_deposit": "50.00"
                }))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);

            let body: Value = test::read_body_json(resp).await;
            body["data"]["id"].as_str().unwrap().to_string()
        }};
    }

    #[actix_web::test]
    async fn test_health_check() {
        let ctx = context();
        let app = app!(ctx);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_register_login_and_me() {
        let ctx = context();
        let app = app!(ctx);
        let (token, id) = register!(app, "ana@example.com");

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"], id.as_str());
        assert!(body["data"].get("password_hash").is_none());

        // duplicate email
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({"email": "ana@example.com", "password": "another-password"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({"email": "ana@example.com", "password": "wrong-password"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({"email": "ana@example.com", "password": "correct-horse-battery"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_protected_route_needs_token() {
        let ctx = context();
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer("not-a-jwt"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_create_and_search_items() {
        let ctx = context();
        let app = app!(ctx);
        let (token, _) = register!(app, "owner@example.com");

        let item_id = create_item!(app, token, "Power drill");
        create_item!(app, token, "Camping tent");

        let req = test::TestRequest::get().uri("/api/v1/items?q=drill").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let hits = body["data"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], item_id.as_str());
        assert_eq!(body["pagination"]["total"], 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/items/{}", item_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["title"], "Power drill");
        assert!(body["data"]["images"].as_array().unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri("/api/v1/items?category=no-such-category")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_only_owner_can_edit_item() {
        let ctx = context();
        let app = app!(ctx);
        let (owner, _) = register!(app, "owner@example.com");
        let (other, _) = register!(app, "other@example.com");
        let item_id = create_item!(app, owner, "Ladder");

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/items/{}", item_id))
            .insert_header(bearer(&other))
            .set_json(json!({"title": "Mine now"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/items/{}", item_id))
            .insert_header(bearer(&owner))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_booking_flow_and_conflict() {
        let ctx = context();
        let app = app!(ctx);
        let (owner, _) = register!(app, "owner@example.com");
        let (renter, _) = register!(app, "renter@example.com");
        let (late, _) = register!(app, "late@example.com");
        let item_id = create_item!(app, owner, "Kayak");

        let start = Utc::now() + Duration::days(2);
        let end = start + Duration::days(3);
        let window = json!({
            "item_id": item_id,
            "start_date": start,
            "end_date": end
        });

        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&renter))
            .set_json(&window)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let booking_id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["status"], "pending");
        // 3 days at 15.00 + 50.00 deposit + 10% fee on 45.00
        assert_eq!(body["data"]["total_amount"], "99.50");

        // the renter cannot confirm their own request
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/bookings/{}/confirm", booking_id))
            .insert_header(bearer(&renter))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/bookings/{}/confirm", booking_id))
            .insert_header(bearer(&owner))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "confirmed");

        // overlapping request after confirmation
        let req = test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&late))
            .set_json(&window)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/v1/items/{}/availability?start={}&end={}",
                item_id,
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end.to_rfc3339_opts(SecondsFormat::Secs, true)
            ))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["available"], false);

        // outsiders cannot see the booking
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/bookings/{}", booking_id))
            .insert_header(bearer(&late))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/bookings/{}/teleport", booking_id))
            .insert_header(bearer(&owner))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_admin_routes_reject_members() {
        let ctx = context();
        let app = app!(ctx);
        let (member, _) = register!(app, "member@example.com");

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/stats")
            .insert_header(bearer(&member))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let admin = Profile {
            role: UserRole::Admin,
            ..Profile::new("admin@example.com", "unused")
        };
        ctx.profiles.create(&admin).await.unwrap();
        let admin_token = ctx.jwt.create_token_for_profile(&admin).unwrap();

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/stats")
            .insert_header(bearer(&admin_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_report_and_resolve() {
        let ctx = context();
        let app = app!(ctx);
        let (owner, _) = register!(app, "owner@example.com");
        let (member, _) = register!(app, "member@example.com");
        let item_id = create_item!(app, owner, "Suspicious lamp");

        let req = test::TestRequest::post()
            .uri("/api/v1/reports")
            .insert_header(bearer(&member))
            .set_json(json!({"target_type": "item", "target_id": item_id, "reason": "counterfeit"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let report_id = body["data"]["id"].as_str().unwrap().to_string();

        let admin = Profile {
            role: UserRole::Admin,
            ..Profile::new("admin@example.com", "unused")
        };
        ctx.profiles.create(&admin).await.unwrap();
        let admin_token = ctx.jwt.create_token_for_profile(&admin).unwrap();

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/reports")
            .insert_header(bearer(&admin_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/admin/items/{}/suspend", item_id))
            .insert_header(bearer(&admin_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        // suspended items disappear for everyone but the owner
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/items/{}", item_id))
            .insert_header(bearer(&member))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/admin/reports/{}/resolve", report_id))
            .insert_header(bearer(&admin_token))
            .set_json(json!({"status": "resolved", "note": "listing suspended"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "resolved");
    }

    #[actix_web::test]
    async fn test_image_upload_rejects_non_images() {
        let ctx = context();
        let app = app!(ctx);
        let (owner, _) = register!(app, "owner@example.com");
        let item_id = create_item!(app, owner, "Bike");

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/items/{}/images", item_id))
            .insert_header(bearer(&owner))
            .insert_header(("Content-Type", "application/pdf"))
            .set_payload("%PDF-1.7")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/items/{}/images", item_id))
            .insert_header(bearer(&owner))
            .insert_header(("Content-Type", "image/png"))
            .set_payload(&b"\x89PNG\r\n\x1a\n"[..])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["is_primary"], true);
    }

    #[actix_web::test]
    async fn test_messaging_and_notifications() {
        let ctx = context();
        let app = app!(ctx);
        let (ana, _) = register!(app, "ana@example.com");
        let (ben, ben_id) = register!(app, "ben@example.com");

        let req = test::TestRequest::post()
            .uri("/api/v1/conversations")
            .insert_header(bearer(&ana))
            .set_json(json!({"participant_id": ben_id}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let conversation_id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/conversations/{}/messages", conversation_id))
            .insert_header(bearer(&ana))
            .set_json(json!({"content": "Is the kayak free next weekend?"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/api/v1/conversations/unread")
            .insert_header(bearer(&ben))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["unread"], 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/notifications?unread_only=true")
            .insert_header(bearer(&ben))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/conversations/{}/read", conversation_id))
            .insert_header(bearer(&ben))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["count"], 1);

        // empty messages fail validation
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/conversations/{}/messages", conversation_id))
            .insert_header(bearer(&ben))
            .set_json(json!({"content": ""}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_favorites() {
        let ctx = context();
        let app = app!(ctx);
        let (owner, _) = register!(app, "owner@example.com");
        let (fan, _) = register!(app, "fan@example.com");
        let item_id = create_item!(app, owner, "Projector");

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri(&format!("/api/v1/favorites/{}", item_id))
                .insert_header(bearer(&fan))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/favorites")
            .insert_header(bearer(&fan))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }
}
