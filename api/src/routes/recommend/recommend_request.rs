use serde::Deserialize;

/// Query of `POST /api/recommend`.
#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    /// Genre, e.g. "comedy".
    #[serde(rename = "type")]
    pub kind: String,
    /// Approximate release year; kept as text since it is only interpolated.
    pub year: String,
    /// Spoken language, e.g. "English".
    pub lang: String,
}
