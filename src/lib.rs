// Re-export modules for testing
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod handlers;
pub mod models;
pub mod nutrition;
pub mod recipes;
pub mod repository;
pub mod schema;

// Re-export endpoint wiring for integration tests
pub use crate::handlers::{configure, health::health};
