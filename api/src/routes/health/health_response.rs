use ai_llm_service::health_service::HealthStatus;
use serde::Serialize;

/// Response payload for /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when every backend probe passed, "degraded" otherwise.
    pub status: &'static str,
    pub memory_enabled: bool,
    /// Live conversations in memory.
    pub conversations: usize,
    pub backends: Vec<HealthStatus>,
}
