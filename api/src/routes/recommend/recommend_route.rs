//! POST /api/recommend: movie recommendation from a fixed prompt template.

use std::sync::Arc;

use axum::extract::{Query, State, rejection::QueryRejection};

use crate::{
    app::app_state::AppState, error_handler::AppResult,
    routes::recommend::recommend_request::RecommendQuery,
};

/// Handler: POST /api/recommend
///
/// # Example
/// ```bash
/// curl -X POST 'http://127.0.0.1:8080/api/recommend?type=comedy&year=2020&lang=English'
/// ```
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> AppResult<String> {
    let Query(q) = query?;
    let answer = state.context.recommend(&q.kind, &q.year, &q.lang).await?;
    Ok(answer.text)
}
