//! tideline-core library.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at module seams, each mapped to an
//!   [`error::ErrorCode`]; `anyhow::Result` for configuration loading.
//! - **Logging**: `tracing` macros (`info!` for stage summaries, `debug!` for
//!   per-item decisions, `warn!` for swallowed failures).

pub mod config;
pub mod context;
pub mod error;
pub mod favorites;
pub mod financial;
pub mod identity;
pub mod lock;
pub mod model;
pub mod normalize;
pub mod offers;
pub mod profiles;
pub mod store;
