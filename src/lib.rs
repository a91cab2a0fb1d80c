pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod indexer;
pub mod models;
pub mod preferences;
pub mod proxy;
pub mod rag;
pub mod recommend;
