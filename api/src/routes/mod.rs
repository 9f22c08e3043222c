pub mod ask;
pub mod embedding;
pub mod health;
pub mod recommend;
