//! The engine: activation state, batching and the processed side-table.
//!
//! A host calls [`Engine::render`] with a subtree, or drives a [`Batch`] one
//! span at a time with [`Engine::step`] so it can yield between expressions.
//! Every container the engine produces is recorded in a side-table and
//! carries the processed class, so re-rendering a subtree never picks up
//! its own output.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fxhash::FxHashSet;
use serde::Serialize;
use webtex_dom::{Document, NodeId};

use crate::config::EngineConfig;
use crate::diagnostics::DiagnosticSink;
use crate::extract::{extract, MathSpan};
use crate::mutate;
use crate::pipeline::{MathRenderer, RenderMethod, RenderPipeline, RendererState};
use crate::renderer::LintRenderer;
use crate::utils::error::ConfigError;

/// Pending spans of one render request.
#[derive(Debug)]
pub struct Batch {
    queue: VecDeque<MathSpan>,
    alive: Arc<AtomicBool>,
}

impl Batch {
    fn new(spans: Vec<MathSpan>) -> Self {
        Self {
            queue: spans.into(),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared flag; storing `false` stops the batch before its next mutation.
    pub fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }

    pub fn cancel(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &MathSpan> {
        self.queue.iter()
    }
}

/// Result of one [`Engine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Applied {
        container: NodeId,
        method: RenderMethod,
    },
    /// The span's node went away or changed; nothing was written.
    Skipped,
    Cancelled,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub applied: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub state: RendererState,
}

pub struct Engine<R = LintRenderer> {
    config: EngineConfig,
    pipeline: RenderPipeline<R>,
    enabled: bool,
    processed: FxHashSet<NodeId>,
}

impl Default for Engine<LintRenderer> {
    fn default() -> Self {
        Self::new(LintRenderer)
    }
}

impl<R: MathRenderer> Engine<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            config: EngineConfig::default(),
            pipeline: RenderPipeline::new(renderer),
            enabled: true,
            processed: FxHashSet::default(),
        }
    }

    pub fn with_config(renderer: R, config: EngineConfig) -> Result<Self, ConfigError> {
        Self::from_parts(config, RenderPipeline::new(renderer))
    }

    pub fn with_sink(
        renderer: R,
        config: EngineConfig,
        sink: Box<dyn DiagnosticSink>,
    ) -> Result<Self, ConfigError> {
        Self::from_parts(config, RenderPipeline::with_sink(renderer, sink))
    }

    pub fn from_parts(config: EngineConfig, pipeline: RenderPipeline<R>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            pipeline,
            enabled: true,
            processed: FxHashSet::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> RendererState {
        self.pipeline.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_processed(&self, id: NodeId) -> bool {
        self.processed.contains(&id)
    }

    /// Turn the engine on or off for `doc`.
    ///
    /// Disabling restores every container to its original text. Enabling
    /// after a disable starts a fresh activation with zeroed counters.
    pub fn set_enabled(&mut self, doc: &mut Document, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.pipeline.reset();
            log::debug!(target: "webtex::engine", "enabled");
        } else {
            let restored = self.restore(doc);
            log::debug!(target: "webtex::engine", "disabled, restored {} container(s)", restored);
        }
    }

    /// Extract the spans below `root` into a batch. Empty while disabled.
    ///
    /// Containers the page has since removed are dropped from the side-table
    /// first; a re-attached one is still skipped through its class.
    pub fn begin(&mut self, doc: &Document, root: NodeId) -> Batch {
        self.processed.retain(|id| doc.is_attached(*id));
        if !self.enabled {
            return Batch::new(Vec::new());
        }
        Batch::new(extract(doc, root, &self.config, &self.processed))
    }

    /// Render and splice the next span of `batch`.
    pub fn step(&mut self, doc: &mut Document, batch: &mut Batch) -> Step {
        if !batch.is_alive() {
            batch.queue.clear();
            return Step::Cancelled;
        }
        let Some(span) = batch.queue.pop_front() else {
            return Step::Finished;
        };
        if !doc.is_attached(span.source_node) {
            return Step::Skipped;
        }

        let outcome = self.pipeline.process(&span.raw_text, span.display_mode);
        log::debug!(
            target: "webtex::engine",
            "{} -> {}",
            span.match_text,
            outcome.method.as_str()
        );

        if !batch.is_alive() {
            batch.queue.clear();
            return Step::Cancelled;
        }
        let Some(applied) = mutate::apply(doc, &span, &outcome, &self.config) else {
            return Step::Skipped;
        };
        self.processed.insert(applied.container);

        // Remaining spans of the replaced node are stale; rescan what followed.
        batch.queue.retain(|s| s.source_node != span.source_node);
        if let Some(after) = applied.after {
            for next in extract(doc, after, &self.config, &self.processed)
                .into_iter()
                .rev()
            {
                batch.queue.push_front(next);
            }
        }

        Step::Applied {
            container: applied.container,
            method: outcome.method,
        }
    }

    /// Render everything below `root`.
    pub fn render(&mut self, doc: &mut Document, root: NodeId) -> RenderSummary {
        let mut batch = self.begin(doc, root);
        self.drive(doc, &mut batch)
    }

    /// Run `batch` to completion or cancellation.
    pub fn drive(&mut self, doc: &mut Document, batch: &mut Batch) -> RenderSummary {
        let mut summary = RenderSummary::default();
        loop {
            match self.step(doc, batch) {
                Step::Applied { .. } => summary.applied += 1,
                Step::Skipped => summary.skipped += 1,
                Step::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
                Step::Finished => break,
            }
        }
        summary.state = self.state();
        log::debug!(
            target: "webtex::engine",
            "batch done: {} applied, {} skipped",
            summary.applied,
            summary.skipped
        );
        summary
    }

    /// Undo every container in `doc`; returns how many were restored.
    pub fn restore(&mut self, doc: &mut Document) -> usize {
        let root = doc.root();
        let restored = mutate::restore_all(doc, root, &self.config);
        self.processed.clear();
        restored
    }
}
