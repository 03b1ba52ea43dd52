//! Picstore core library
//!
//! Shared foundation for the picstore upload gateway: configuration, the unified
//! `AppError` type with its HTTP/error-code metadata, object-key generation, and
//! the domain models used by the derivation pipeline (size specs, picture maps,
//! pending writes, request outcomes).

pub mod config;
pub mod error;
pub mod keys;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel, UserMessage};
