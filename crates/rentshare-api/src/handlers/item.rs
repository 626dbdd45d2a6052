//! Item, category and item image handlers

use crate::dto::{
    ApiResponse, AvailabilityResponse, CreateItemRequest, ItemStatusRequest, PaginationParams,
    ReviewsResponse, SearchParams, UpdateItemRequest, WindowParams,
};
use crate::state::AppState;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::{traits::PaginatedResponse, AppError};
use rentshare_storage::Bucket;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Content type of an upload request
pub(crate) fn content_type(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| AppError::UnsupportedMediaType("missing Content-Type".to_string()))
}

/// Search listings
///
/// GET /api/v1/items
#[instrument(skip(state, query))]
pub async fn search_items(
    state: web::Data<AppState>,
    query: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let category_id = match query.category.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => Some(state.items.category_by_slug(slug).await?.id),
        None => None,
    };
    let search = query.to_search(category_id);
    debug!(?search, "Item search");

    let page = state.items.search_items(&search).await?;
    let pagination = search.pagination();
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(page.items, page.total, &pagination)))
}

/// Create a listing owned by the caller
///
/// POST /api/v1/items
#[instrument(skip(state, user, req))]
pub async fn create_item(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateItemRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Item validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let item = state
        .items
        .create_item(user.user_id, req.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(item)))
}

/// Item details with images
///
/// GET /api/v1/items/{id}
pub async fn get_item(
    state: web::Data<AppState>,
    user: Option<AuthenticatedUser>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let details = state
        .items
        .get_item(path.into_inner(), user.map(|u| u.user_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(details)))
}

/// PUT /api/v1/items/{id}
#[instrument(skip(state, user, req))]
pub async fn update_item(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let item = state
        .items
        .update_item(path.into_inner(), user.user_id, req.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(item)))
}

/// DELETE /api/v1/items/{id}
#[instrument(skip(state, user))]
pub async fn delete_item(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.items.delete_item(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Hide or re-list an item
///
/// PUT /api/v1/items/{id}/status
pub async fn set_item_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<ItemStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let item = state
        .items
        .set_item_status(path.into_inner(), user.user_id, req.status)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(item)))
}

/// GET /api/v1/items/{id}/availability?start=..&end=..
pub async fn check_availability(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<WindowParams>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let range = query.range()?;
    let available = state
        .bookings
        .check_availability(item_id, &range, query.exclude)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AvailabilityResponse {
        item_id,
        start: range.start,
        end: range.end,
        available,
    })))
}

/// GET /api/v1/items/{id}/quote?start=..&end=..&delivery=true
pub async fn quote(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<WindowParams>,
) -> Result<HttpResponse, AppError> {
    let range = query.range()?;
    let breakdown = state
        .bookings
        .quote(path.into_inner(), &range, query.delivery)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(breakdown)))
}

/// GET /api/v1/items/{id}/reviews
pub async fn item_reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let (reviews, total) = state
        .reviews
        .list_reviews_for_item(item_id, &query.pagination())
        .await?;
    let summary = state.reviews.item_rating(item_id).await?;

    Ok(HttpResponse::Ok().json(ReviewsResponse {
        summary,
        reviews: query.paginate(reviews, total),
    }))
}

// ==================== Images ====================

/// GET /api/v1/items/{id}/images
pub async fn list_images(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let images = state.items.list_images(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(images)))
}

/// Upload an image; the request body is the raw file
///
/// POST /api/v1/items/{id}/images
#[instrument(skip(state, user, req, body), fields(size = body.len()))]
pub async fn upload_image(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let content_type = content_type(&req)?;
    let image = state
        .items
        .add_image(path.into_inner(), user.user_id, &content_type, body)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(image)))
}

/// DELETE /api/v1/items/{id}/images/{image_id}
pub async fn delete_image(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (item_id, image_id) = path.into_inner();
    state
        .items
        .delete_image(item_id, image_id, user.user_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PUT /api/v1/items/{id}/images/{image_id}/primary
pub async fn set_primary_image(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (item_id, image_id) = path.into_inner();
    state
        .items
        .set_primary_image(item_id, image_id, user.user_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

// ==================== Categories ====================

/// GET /api/v1/categories
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let categories = state.items.list_categories().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(categories)))
}

/// GET /api/v1/categories/{slug}
pub async fn get_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let category = state.items.category_by_slug(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(category)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/items")
            .route("", web::get().to(search_items))
            .route("", web::post().to(create_item))
            .route("/{id}", web::get().to(get_item))
            .route("/{id}", web::put().to(update_item))
            .route("/{id}", web::delete().to(delete_item))
            .route("/{id}/status", web::put().to(set_item_status))
            .route("/{id}/availability", web::get().to(check_availability))
            .route("/{id}/quote", web::get().to(quote))
            .route("/{id}/reviews", web::get().to(item_reviews))
            .service(
                web::resource("/{id}/images")
                    .app_data(web::PayloadConfig::new(Bucket::ItemImages.max_bytes()))
                    .route(web::get().to(list_images))
                    .route(web::post().to(upload_image)),
            )
            .route("/{id}/images/{image_id}", web::delete().to(delete_image))
            .route(
                "/{id}/images/{image_id}/primary",
                web::put().to(set_primary_image),
            ),
    )
    .service(
        web::scope("/categories")
            .route("", web::get().to(list_categories))
            .route("/{slug}", web::get().to(get_category)),
    );
}
