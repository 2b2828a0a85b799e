//! Utility modules

pub mod error;

pub use error::{ConfigError, RenderError, RenderResult};
