//! Customs PACT 2025 backend.
//!
//! Serves the conference site's write paths:
//! - Participant registration, numbered `TCP2025-0001`, `TCP2025-0002`, ...
//! - Contact messages and newsletter signups
//! - Staff review of registrations, messages and subscriptions

pub mod api;
pub mod config;
pub mod error;
pub mod forms;

pub use config::Config;
pub use error::ApiError;
