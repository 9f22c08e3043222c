pub mod ollama_service;
pub mod open_ai_service;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_server;
