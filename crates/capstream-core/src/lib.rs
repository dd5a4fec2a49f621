//! capstream-core — shared types, errors, and configuration.
//!
//! Everything the codec, recorder, and converter crates have in common:
//! frame/resolution types, the error taxonomy, and [`RecorderConfig`].

pub mod config;
pub mod errors;
pub mod types;

pub use config::RecorderConfig;
pub use errors::{CodecError, RecorderError};
pub use types::*;
