pub mod embedding_request;
pub mod embedding_route;
