//! Math renderer backends.
//!
//! - [`LintRenderer`]: table-driven validator, always available
//! - [`KatexRenderer`]: KaTeX through the `katex` crate (feature `katex`)

pub mod lint;

#[cfg(feature = "katex")]
pub mod katex;

pub use lint::LintRenderer;

#[cfg(feature = "katex")]
pub use self::katex::KatexRenderer;
