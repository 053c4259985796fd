//! scene_directory Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod store;

pub use config::Config;
pub use domain::{DomainError, OperationContext};
pub use error::{AppError, AppResult, ResultStatus};
