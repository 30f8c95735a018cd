//! Adiwiyata ML - Rust библиотека

pub mod types;
pub mod error;
pub mod config;
pub mod sources;
pub mod preprocessing;
pub mod pipeline;
pub mod models;
pub mod analysis;
pub mod api;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
