pub mod config;
pub mod error;
pub mod identity;
pub mod access;
pub mod client;

pub use config::AuthConfig;
pub use error::{AppError, AppResult};
