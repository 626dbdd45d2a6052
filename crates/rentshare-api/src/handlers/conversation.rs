//! Conversation and message handlers

use crate::dto::{
    ApiResponse, CountResponse, PaginationParams, SendMessageRequest, StartConversationRequest,
    UnreadResponse,
};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rentshare_auth::AuthenticatedUser;
use rentshare_core::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// GET /api/v1/conversations
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let conversations = state.messaging.list_conversations(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(conversations)))
}

/// Open (or reopen) a conversation with another member
///
/// POST /api/v1/conversations
#[instrument(skip(state, user, req))]
pub async fn start_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<StartConversationRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation = state
        .messaging
        .start_conversation(user.user_id, req.participant_id, req.item_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(conversation)))
}

/// GET /api/v1/conversations/unread
pub async fn unread_count(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let unread = state.messaging.unread_count(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UnreadResponse { unread })))
}

/// GET /api/v1/conversations/{id}/messages
pub async fn list_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .messaging
        .list_messages(user.user_id, path.into_inner(), &query.pagination())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(messages)))
}

/// POST /api/v1/conversations/{id}/messages
#[instrument(skip(state, user, req))]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let message = state
        .messaging
        .send_message(user.user_id, path.into_inner(), &req.content)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(message)))
}

/// POST /api/v1/conversations/{id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let count = state
        .messaging
        .mark_read(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(CountResponse { count })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/conversations")
            .route("", web::get().to(list_conversations))
            .route("", web::post().to(start_conversation))
            .route("/unread", web::get().to(unread_count))
            .route("/{id}/messages", web::get().to(list_messages))
            .route("/{id}/messages", web::post().to(send_message))
            .route("/{id}/read", web::post().to(mark_read)),
    );
}
