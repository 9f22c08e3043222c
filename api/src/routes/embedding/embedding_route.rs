//! POST /api/embedding: embedding vector for a text.

use std::sync::Arc;

use ai_llm_service::EmbeddingVector;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};

use crate::{
    app::app_state::AppState, error_handler::AppResult,
    routes::embedding::embedding_request::EmbeddingQuery,
};

/// Handler: POST /api/embedding
///
/// # Example
/// ```bash
/// curl -X POST 'http://127.0.0.1:8080/api/embedding?text=hello'
/// ```
pub async fn embedding(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EmbeddingQuery>, QueryRejection>,
) -> AppResult<Json<EmbeddingVector>> {
    let Query(q) = query?;
    Ok(Json(state.context.embed(&q.text).await?))
}
