use serde::Deserialize;

/// Query of `POST /api/embedding`.
#[derive(Debug, Deserialize)]
pub struct EmbeddingQuery {
    pub text: String,
}
