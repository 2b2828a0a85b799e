//! Error types for rendering and configuration.
//!
//! Normalizers never fail; the only fallible surfaces are the math renderer
//! seam and configuration loading.

use std::fmt;

/// Error reported by a [`MathRenderer`](crate::pipeline::MathRenderer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The input could not be parsed as math.
    Syntax {
        message: String,
        position: Option<usize>,
    },
    /// A control word the renderer does not know.
    UnknownCommand { name: String },
    /// Failure reported by an external typesetting engine.
    Backend { message: String },
    /// Nothing to render.
    EmptyInput,
    /// The renderer panicked; the panic was contained.
    Panicked { message: String },
}

impl RenderError {
    pub fn syntax(message: impl Into<String>, position: Option<usize>) -> Self {
        RenderError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn unknown_command(name: impl Into<String>) -> Self {
        RenderError::UnknownCommand { name: name.into() }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        RenderError::Backend {
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Syntax {
                message,
                position: Some(p),
            } => write!(f, "Parse error at position {}: {}", p, message),
            RenderError::Syntax {
                message,
                position: None,
            } => write!(f, "Parse error: {}", message),
            RenderError::UnknownCommand { name } => {
                write!(f, "Undefined control sequence: \\{}", name)
            }
            RenderError::Backend { message } => write!(f, "Renderer error: {}", message),
            RenderError::EmptyInput => write!(f, "Empty input"),
            RenderError::Panicked { message } => write!(f, "Renderer panicked: {}", message),
        }
    }
}

impl std::error::Error for RenderError {}

/// Result type for renderer calls
pub type RenderResult<T> = Result<T, RenderError>;

/// Invalid or unreadable engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value the engine cannot work with.
    Invalid { field: String, message: String },
    /// The configuration document could not be parsed.
    Parse { message: String },
    /// IO error (for file operations)
    Io { message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ConfigError::Parse {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { field, message } => {
                write!(f, "Invalid config value for '{}': {}", field, message)
            }
            ConfigError::Parse { message } => write!(f, "Config parse error: {}", message),
            ConfigError::Io { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io {
            message: err.to_string(),
        }
    }
}
