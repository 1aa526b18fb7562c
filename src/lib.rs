pub mod config;
pub mod db;
pub mod error;
pub mod error_pages;
pub mod filters;
pub mod form_utils;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod server;
pub mod services;
pub mod state;
pub mod xsrf;

/// Application version from Cargo.toml (single source of truth)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
