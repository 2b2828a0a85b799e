//! # WebTeX
//!
//! Detects LaTeX math embedded in HTML text, repairs the malformations
//! found in the wild, and renders it in place with a graceful fallback.
//!
//! ## Quick start
//!
//! ```
//! use webtex::{Document, Engine};
//!
//! let mut doc = Document::new();
//! let p = doc.create_element("p");
//! let t = doc.create_text("Euler: $e^{i\\pi} + 1 = 0$");
//! doc.append_child(p, t);
//! let root = doc.root();
//! doc.append_child(root, p);
//!
//! let mut engine: Engine = Engine::default();
//! let summary = engine.render(&mut doc, root);
//! assert_eq!(summary.applied, 1);
//!
//! assert_eq!(webtex::simplify("rac{1}{2}"), "\\frac{1}{2}");
//! ```
//!
//! ## Layout
//!
//! - [`normalize`]: pure string-rewriting passes and the fixed [`simplify`] chain
//! - [`extract`]: finds delimited math in text nodes
//! - [`pipeline`]: strict attempt, tolerant attempt, text fallback
//! - [`mutate`]: splices containers into the document and restores them
//! - [`engine`]: activation, batching and the processed side-table

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod extract;
pub mod mutate;
pub mod normalize;
pub mod pipeline;
pub mod renderer;
pub mod utils;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{DelimiterConfig, EngineConfig};
pub use diagnostics::{DiagnosticRecord, DiagnosticSink, LogSink, MemorySink, NullSink};
pub use engine::{Batch, Engine, RenderSummary, Step};
pub use extract::{extract, find_matches, Delimiter, MathSpan};
pub use normalize::{simplify, simplify_with_trace, PassTrace};
pub use pipeline::{
    MathRenderer, RenderMethod, RenderOptions, RenderOutcome, RenderPipeline, RendererState,
};
pub use renderer::LintRenderer;
pub use utils::error::{ConfigError, RenderError, RenderResult};
pub use webtex_dom::{Document, NodeId, NodeKind};
