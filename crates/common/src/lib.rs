//! Newsroom Common Library
//!
//! Shared code for the newsroom backend including:
//! - Database models, the article store, and the repository
//! - The role-gated article workflow engine
//! - Role- and filter-scoped article projections
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Upload storage
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod projection;
pub mod uploads;
pub mod workflow;

// Re-export commonly used types
pub use auth::{Actor, JwtManager};
pub use config::AppConfig;
pub use db::{ArticleStore, DbPool, Repository};
pub use errors::{AppError, Result};
pub use projection::ArticleProjector;
pub use workflow::{ApprovalPolicy, WorkflowEngine};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
