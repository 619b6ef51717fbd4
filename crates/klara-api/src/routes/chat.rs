use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use klara_types::{ChatQueryRequest, ChatQueryResponse};

use crate::{error::ApiResult, middleware::logging::forwarded_client_ip, state::AppState};

/// Handle a chat query.
///
/// Validates, deduplicates, resolves the conversation, calls the upstream
/// model (or the fallback responder) and persists the exchange.
pub async fn chat_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatQueryRequest>,
) -> ApiResult<Json<ChatQueryResponse>> {
    let client_ip = forwarded_client_ip(&headers);
    let response = state.chat.handle(request, client_ip).await?;
    Ok(Json(response))
}
