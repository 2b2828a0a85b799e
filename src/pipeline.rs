//! Render pipeline: normalize, strict attempt, tolerant attempt, text fallback.
//!
//! Per span the pipeline moves through
//! `Extracted -> Normalized -> StrictAttempt -> {Rendered | FallbackAttempt}`
//! and `FallbackAttempt -> {Rendered | TextFallback}`. The counters in
//! [`RendererState`] belong to one [`RenderPipeline`] value, so independent
//! engines never share them.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

use crate::diagnostics::{DiagnosticRecord, DiagnosticSink, NullSink};
use crate::normalize::simplify;
use crate::utils::error::{RenderError, RenderResult};

/// Options passed to a [`MathRenderer`] for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub display_mode: bool,
    /// Reject anything the backend would merely warn about.
    pub strict: bool,
}

/// A math typesetting backend.
///
/// Implementations return markup on success. The pipeline only looks at
/// success versus failure and the error's message.
pub trait MathRenderer {
    fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String>;
}

impl<T: MathRenderer + ?Sized> MathRenderer for &T {
    fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String> {
        (**self).render(tex, opts)
    }
}

impl<T: MathRenderer + ?Sized> MathRenderer for Box<T> {
    fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String> {
        (**self).render(tex, opts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMethod {
    Strict,
    FallbackSimplified,
    FallbackText,
    Empty,
}

impl RenderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMethod::Strict => "strict",
            RenderMethod::FallbackSimplified => "fallbackSimplified",
            RenderMethod::FallbackText => "fallbackText",
            RenderMethod::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    /// The original text the error refers to.
    pub tex: String,
}

/// Final result of running one span through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutcome {
    pub method: RenderMethod,
    /// Present iff the span rendered.
    pub markup: Option<String>,
    /// The last renderer error, if any attempt failed.
    pub error: Option<ErrorInfo>,
}

impl RenderOutcome {
    pub fn success(&self) -> bool {
        self.markup.is_some()
    }

    pub fn stage(&self) -> Stage {
        if self.success() {
            Stage::Rendered
        } else {
            Stage::TextFallback
        }
    }
}

/// Pipeline states a span passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracted,
    Normalized,
    StrictAttempt,
    FallbackAttempt,
    Rendered,
    TextFallback,
}

/// Counters for one activation. Reset only when the engine is re-enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererState {
    pub total_attempts: u64,
    pub strict_successes: u64,
    pub fallback_successes: u64,
}

impl RendererState {
    pub fn failures(&self) -> u64 {
        self.total_attempts - self.strict_successes - self.fallback_successes
    }
}

pub struct RenderPipeline<R> {
    renderer: R,
    sink: Box<dyn DiagnosticSink>,
    state: RendererState,
}

impl<R: MathRenderer> RenderPipeline<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_sink(renderer, Box::new(NullSink))
    }

    pub fn with_sink(renderer: R, sink: Box<dyn DiagnosticSink>) -> Self {
        Self {
            renderer,
            sink,
            state: RendererState::default(),
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = RendererState::default();
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run one extracted span to a terminal state.
    ///
    /// Counts exactly one attempt no matter how many tiers were tried.
    pub fn process(&mut self, raw_text: &str, display_mode: bool) -> RenderOutcome {
        self.state.total_attempts += 1;
        transition(raw_text, Stage::Extracted);

        let normalized = simplify(raw_text);
        if normalized.is_empty() {
            return RenderOutcome {
                method: RenderMethod::Empty,
                markup: None,
                error: None,
            };
        }
        transition(&normalized, Stage::Normalized);

        transition(&normalized, Stage::StrictAttempt);
        let strict_err = match self.attempt(&normalized, display_mode, true) {
            Ok(markup) => {
                self.state.strict_successes += 1;
                transition(&normalized, Stage::Rendered);
                return RenderOutcome {
                    method: RenderMethod::Strict,
                    markup: Some(markup),
                    error: None,
                };
            }
            Err(e) => e,
        };
        self.report(raw_text, &strict_err);

        // Same normalized text, only the strictness changes.
        transition(&normalized, Stage::FallbackAttempt);
        match self.attempt(&normalized, display_mode, false) {
            Ok(markup) => {
                self.state.fallback_successes += 1;
                transition(&normalized, Stage::Rendered);
                RenderOutcome {
                    method: RenderMethod::FallbackSimplified,
                    markup: Some(markup),
                    error: Some(error_info(raw_text, &strict_err)),
                }
            }
            Err(e) => {
                self.report(raw_text, &e);
                transition(raw_text, Stage::TextFallback);
                RenderOutcome {
                    method: RenderMethod::FallbackText,
                    markup: None,
                    error: Some(error_info(raw_text, &e)),
                }
            }
        }
    }

    fn attempt(&self, tex: &str, display_mode: bool, strict: bool) -> RenderResult<String> {
        let opts = RenderOptions {
            display_mode,
            strict,
        };
        catch_unwind(AssertUnwindSafe(|| self.renderer.render(tex, &opts))).unwrap_or_else(
            |payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(RenderError::Panicked { message })
            },
        )
    }

    fn report(&self, raw_text: &str, err: &RenderError) {
        self.sink
            .record(DiagnosticRecord::now(raw_text, err.to_string()));
    }
}

fn error_info(raw_text: &str, err: &RenderError) -> ErrorInfo {
    ErrorInfo {
        message: err.to_string(),
        tex: raw_text.to_string(),
    }
}

fn transition(tex: &str, stage: Stage) {
    log::trace!(target: "webtex::pipeline", "{:?}: {:?}", stage, tex);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::Arc;

    use crate::diagnostics::MemorySink;

    /// Succeeds or fails per tier, recording every call.
    struct Scripted {
        strict_ok: bool,
        tolerant_ok: bool,
        calls: RefCell<Vec<(String, bool)>>,
    }

    impl Scripted {
        fn new(strict_ok: bool, tolerant_ok: bool) -> Self {
            Self {
                strict_ok,
                tolerant_ok,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MathRenderer for Scripted {
        fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String> {
            self.calls.borrow_mut().push((tex.to_string(), opts.strict));
            let ok = if opts.strict { self.strict_ok } else { self.tolerant_ok };
            if ok {
                Ok(format!("<m>{}</m>", tex))
            } else {
                Err(RenderError::syntax("scripted failure", None))
            }
        }
    }

    struct Panicking;

    impl MathRenderer for Panicking {
        fn render(&self, _tex: &str, _opts: &RenderOptions) -> RenderResult<String> {
            panic!("backend exploded")
        }
    }

    #[test]
    fn test_strict_success() {
        let mut p = RenderPipeline::new(Scripted::new(true, true));
        let out = p.process("x^2", false);
        assert_eq!(out.method, RenderMethod::Strict);
        assert_eq!(out.markup.as_deref(), Some("<m>x^2</m>"));
        assert_eq!(p.state().strict_successes, 1);
        assert_eq!(p.renderer().calls.borrow().len(), 1);
    }

    #[test]
    fn test_fallback_reuses_normalized_text() {
        let mut p = RenderPipeline::new(Scripted::new(false, true));
        let out = p.process(r"\sqrt{\pi", true);
        assert_eq!(out.method, RenderMethod::FallbackSimplified);
        let calls = p.renderer().calls.borrow().clone();
        assert_eq!(
            calls,
            vec![(r"\sqrt{\pi}".to_string(), true), (r"\sqrt{\pi}".to_string(), false)]
        );
        assert_eq!(p.state().fallback_successes, 1);
    }

    #[test]
    fn test_text_fallback_keeps_original() {
        let sink = Arc::new(MemorySink::new());
        let mut p = RenderPipeline::with_sink(Scripted::new(false, false), Box::new(sink.clone()));
        let out = p.process(r"\sqrt{\pi", false);
        assert_eq!(out.method, RenderMethod::FallbackText);
        assert!(!out.success());
        assert_eq!(out.stage(), Stage::TextFallback);
        assert_eq!(out.error.unwrap().tex, r"\sqrt{\pi");
        assert_eq!(sink.len(), 2);
        assert_eq!(p.state().total_attempts, 1);
        assert_eq!(p.state().failures(), 1);
    }

    #[test]
    fn test_panic_is_contained() {
        let mut p = RenderPipeline::new(Panicking);
        let out = p.process("x", false);
        assert_eq!(out.method, RenderMethod::FallbackText);
        assert!(out.error.unwrap().message.contains("backend exploded"));
    }

    #[test]
    fn test_attempts_count_once_per_span() {
        let mut p = RenderPipeline::new(Scripted::new(false, true));
        for _ in 0..3 {
            p.process("a+b", false);
        }
        assert_eq!(p.state().total_attempts, 3);
        assert_eq!(p.state().fallback_successes, 3);
        p.reset();
        assert_eq!(p.state(), RendererState::default());
    }
}
