//! End-to-end tests: extraction, rendering tiers and DOM mutation

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use webtex::{
    Document, Engine, EngineConfig, LintRenderer, MathRenderer, MemorySink, NodeId, RenderError,
    RenderOptions, RenderResult, RendererState, Step,
};

type CallLog = Rc<RefCell<Vec<(String, RenderOptions)>>>;

/// Fails strict mode on `bad`, every mode on `broken`.
struct Flaky {
    calls: CallLog,
}

impl Flaky {
    fn new() -> (Self, CallLog) {
        let calls = CallLog::default();
        (
            Self {
                calls: Rc::clone(&calls),
            },
            calls,
        )
    }
}

impl MathRenderer for Flaky {
    fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String> {
        self.calls.borrow_mut().push((tex.to_string(), *opts));
        if tex.contains("broken") || (opts.strict && tex.contains("bad")) {
            return Err(RenderError::syntax(format!("cannot render {}", tex), Some(0)));
        }
        Ok(format!("<m>{}</m>", tex))
    }
}

fn paragraph(doc: &mut Document, text: &str) -> NodeId {
    let p = doc.create_element("p");
    let t = doc.create_text(text);
    doc.append_child(p, t);
    let root = doc.root();
    doc.append_child(root, p);
    p
}

fn containers(doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|id| doc.has_class(*id, "webtex-processed"))
        .collect()
}

// ============================================================================
// Fallback behaviour
// ============================================================================

mod fallback {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_command_falls_back_to_text() {
        let text = r"The value $\invalidcommand{x}$ is undefined.";
        let mut doc = Document::new();
        let p = paragraph(&mut doc, text);

        let sink = Arc::new(MemorySink::new());
        let mut engine =
            Engine::with_sink(LintRenderer, EngineConfig::default(), Box::new(Arc::clone(&sink)))
                .unwrap();
        let summary = engine.render(&mut doc, NodeId::ROOT);

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.state.failures(), 1);
        assert_eq!(doc.text_content(p), text);

        let found = containers(&doc);
        assert_eq!(found.len(), 1);
        assert!(doc.has_class(found[0], "webtex-fallback"));
        assert_eq!(doc.attr(found[0], "data-webtex-method"), Some("fallbackText"));
        assert_eq!(doc.text_content(found[0]), r"$\invalidcommand{x}$");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.tex == r"\invalidcommand{x}"));
        assert!(sink.to_json().contains("\"tex\""));
    }

    #[test]
    fn test_one_failure_does_not_stop_siblings() {
        let (renderer, _) = Flaky::new();
        let mut doc = Document::new();
        paragraph(&mut doc, "$x_{bad}$, $y^{broken}$ and $z^2$");
        let mut engine = Engine::new(renderer);
        let summary = engine.render(&mut doc, NodeId::ROOT);

        assert_eq!(summary.applied, 3);
        assert_eq!(
            summary.state,
            RendererState {
                total_attempts: 3,
                strict_successes: 1,
                fallback_successes: 1,
            }
        );
        let methods: Vec<_> = containers(&doc)
            .into_iter()
            .map(|id| doc.attr(id, "data-webtex-method").unwrap_or_default().to_string())
            .collect();
        assert_eq!(methods, vec!["fallbackSimplified", "fallbackText", "strict"]);
    }

    #[test]
    fn test_failing_renderer_never_loses_text() {
        let (renderer, _) = Flaky::new();
        let text = r"$\sqrt{broken}$ then $$broken_1$$ and \(broken^2\)";
        let mut doc = Document::new();
        let p = paragraph(&mut doc, text);
        let mut engine = Engine::new(renderer);
        engine.render(&mut doc, NodeId::ROOT);
        assert_eq!(doc.text_content(p), text);
        assert_eq!(engine.state().failures(), 3);
    }
}

// ============================================================================
// Renderer calls
// ============================================================================

mod calls {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_mode_follows_delimiter() {
        let (renderer, calls) = Flaky::new();
        let mut doc = Document::new();
        paragraph(&mut doc, r"$$a+b$$ and \(c+d\)");
        Engine::new(renderer).render(&mut doc, NodeId::ROOT);

        let seen: Vec<(String, bool)> = calls
            .borrow()
            .iter()
            .map(|(tex, opts)| (tex.clone(), opts.display_mode))
            .collect();
        assert_eq!(
            seen,
            vec![("a+b".to_string(), true), ("c+d".to_string(), false)]
        );
    }

    #[test]
    fn test_multiline_display_keeps_line_starts() {
        let (renderer, calls) = Flaky::new();
        let mut doc = Document::new();
        paragraph(&mut doc, "$$\nx = 1\nu = 2\n$$ and $$\na^2 = b\ne^{i\\pi} = -1\n$$");
        let summary = Engine::new(renderer).render(&mut doc, NodeId::ROOT);
        assert_eq!(summary.state.strict_successes, 2);

        let seen: Vec<String> = calls.borrow().iter().map(|(tex, _)| tex.clone()).collect();
        assert_eq!(
            seen,
            vec![
                "x = 1\nu = 2".to_string(),
                "a^2 = b\ne^{i\\pi} = -1".to_string(),
            ]
        );
    }

    #[test]
    fn test_renderer_sees_normalized_text() {
        let (renderer, calls) = Flaky::new();
        let mut doc = Document::new();
        paragraph(&mut doc, r"$\frac{\pi^{2}{6}$");
        Engine::new(renderer).render(&mut doc, NodeId::ROOT);
        assert_eq!(calls.borrow()[0].0, r"\frac{\pi^{2}}{6}");
    }

    #[test]
    fn test_engines_keep_separate_counters() {
        let mut doc = Document::new();
        paragraph(&mut doc, "$x_1$ and $y_2$");
        let mut first: Engine = Engine::default();
        let second: Engine = Engine::default();
        first.render(&mut doc, NodeId::ROOT);
        assert_eq!(first.state().total_attempts, 2);
        assert_eq!(second.state(), RendererState::default());
    }
}

// ============================================================================
// Walk and mutation
// ============================================================================

mod walk {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_excluded_regions_untouched() {
        let mut doc = Document::new();
        let root = doc.root();
        for (tag, attr) in [
            ("pre", None),
            ("p", Some(("class", "note webtex-ignore"))),
            ("div", Some(("contenteditable", "true"))),
        ] {
            let el = doc.create_element(tag);
            if let Some((key, value)) = attr {
                doc.set_attr(el, key, value);
            }
            let t = doc.create_text("$x_1$");
            doc.append_child(el, t);
            doc.append_child(root, el);
        }
        let p = paragraph(&mut doc, "$x_2$");

        let mut engine: Engine = Engine::default();
        let summary = engine.render(&mut doc, root);
        assert_eq!(summary.applied, 1);
        assert_eq!(containers(&doc).len(), 1);
        assert_eq!(doc.parent(containers(&doc)[0]), Some(p));
    }

    #[test]
    fn test_rendering_twice_finds_nothing_new() {
        let mut doc = Document::new();
        paragraph(&mut doc, r"$x_1$ and $\invalidcommand{y}$ and $$z$$");
        let mut engine: Engine = Engine::default();
        assert_eq!(engine.render(&mut doc, NodeId::ROOT).applied, 3);
        let html = doc.inner_html(doc.root());

        assert_eq!(engine.render(&mut doc, NodeId::ROOT).applied, 0);
        assert_eq!(doc.inner_html(doc.root()), html);
        assert_eq!(engine.state().total_attempts, 3);
    }

    #[test]
    fn test_detached_node_skipped_mid_batch() {
        let mut doc = Document::new();
        paragraph(&mut doc, "$x_1$");
        let second = paragraph(&mut doc, "$x_2$");
        let mut engine: Engine = Engine::default();
        let mut batch = engine.begin(&doc, doc.root());
        assert_eq!(batch.remaining(), 2);

        assert!(matches!(
            engine.step(&mut doc, &mut batch),
            Step::Applied { .. }
        ));
        doc.detach(second);
        assert_eq!(engine.step(&mut doc, &mut batch), Step::Skipped);
        assert_eq!(engine.step(&mut doc, &mut batch), Step::Finished);
    }

    #[test]
    fn test_step_rescans_trailing_text() {
        let mut doc = Document::new();
        paragraph(&mut doc, "$x_1$ then $x_2$");
        let mut engine: Engine = Engine::default();
        let mut batch = engine.begin(&doc, doc.root());

        let Step::Applied { container, .. } = engine.step(&mut doc, &mut batch) else {
            panic!("first span not applied");
        };
        let pending: Vec<_> = batch.pending().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].match_text, "$x_2$");
        assert_eq!(pending[0].start_offset, 6);
        assert_eq!(doc.text(pending[0].source_node), Some(" then $x_2$"));
        assert!(engine.is_processed(container));
    }

    #[test]
    fn test_restore_round_trip() {
        let text = r"Let $x_1$ and $$\sum_{i=1}^{n} i$$ be given, \(y^2\).";
        let mut doc = Document::new();
        let p = paragraph(&mut doc, text);
        let mut engine: Engine = Engine::default();
        engine.render(&mut doc, NodeId::ROOT);
        assert_eq!(containers(&doc).len(), 3);

        assert_eq!(engine.restore(&mut doc), 3);
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), text);
        assert_eq!(engine.render(&mut doc, NodeId::ROOT).applied, 3);
    }
}
