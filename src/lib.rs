//! LibRent Library Rental Management Server
//!
//! A REST JSON API for a book rental service: catalog, borrowing lifecycle,
//! and monetary settlement through an external checkout gateway.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod stripe;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
