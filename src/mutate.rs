//! DOM mutation: splice render results into the document and undo them.

use webtex_dom::{Document, NodeId};

use crate::config::EngineConfig;
use crate::extract::MathSpan;
use crate::pipeline::{RenderMethod, RenderOutcome};

/// What [`apply`] put into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub container: NodeId,
    /// Text node holding whatever followed the span, if anything did.
    pub after: Option<NodeId>,
}

/// Replace the matched region of `span` with a container for `outcome`.
///
/// Returns `None` without touching the document when the span is stale:
/// its node was detached or its text no longer holds the match.
pub fn apply(
    doc: &mut Document,
    span: &MathSpan,
    outcome: &RenderOutcome,
    config: &EngineConfig,
) -> Option<Applied> {
    let node = span.source_node;
    if !doc.is_attached(node) {
        log::trace!(target: "webtex::mutate", "node {} detached, skipping", node.0);
        return None;
    }
    let text = doc.text(node)?;
    if text.get(span.start_offset..span.end_offset) != Some(span.match_text.as_str()) {
        log::trace!(target: "webtex::mutate", "node {} changed since extraction", node.0);
        return None;
    }
    let before = text[..span.start_offset].to_string();
    let after = text[span.end_offset..].to_string();

    let container = build_container(doc, span, outcome, config);

    let mut replacements = Vec::with_capacity(3);
    if !before.is_empty() {
        replacements.push(doc.create_text(before));
    }
    replacements.push(container);
    let after = (!after.is_empty()).then(|| doc.create_text(after));
    replacements.extend(after);

    if !doc.replace_with(node, &replacements) {
        return None;
    }
    Some(Applied { container, after })
}

fn build_container(
    doc: &mut Document,
    span: &MathSpan,
    outcome: &RenderOutcome,
    config: &EngineConfig,
) -> NodeId {
    let container = doc.create_element("span");
    doc.add_class(container, &config.processed_class);
    let mode_class = if span.display_mode {
        &config.display_class
    } else {
        &config.inline_class
    };
    doc.add_class(container, mode_class);
    doc.set_attr(container, &config.source_attr, span.match_text.as_str());
    doc.set_attr(container, &config.method_attr, outcome.method.as_str());

    let child = match &outcome.markup {
        Some(markup) => doc.create_raw(markup.as_str()),
        None => {
            if outcome.method == RenderMethod::FallbackText {
                doc.add_class(container, &config.fallback_class);
            }
            if let Some(err) = &outcome.error {
                doc.set_attr(container, &config.error_attr, err.message.as_str());
            }
            doc.create_text(span.match_text.as_str())
        }
    };
    doc.append_child(container, child);
    container
}

/// Put the original text back in place of `container`.
///
/// Returns `false` when `container` is not one of ours or is detached.
pub fn restore(doc: &mut Document, container: NodeId, config: &EngineConfig) -> bool {
    if !doc.has_class(container, &config.processed_class) {
        return false;
    }
    let Some(source) = doc.attr(container, &config.source_attr).map(str::to_string) else {
        return false;
    };
    let Some(parent) = doc.parent(container) else {
        return false;
    };
    let text = doc.create_text(source);
    if !doc.replace_with(container, &[text]) {
        return false;
    }
    doc.merge_adjacent_text(parent);
    true
}

/// Restore every container below `root`; returns how many were restored.
pub fn restore_all(doc: &mut Document, root: NodeId, config: &EngineConfig) -> usize {
    let containers: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|id| doc.has_class(*id, &config.processed_class))
        .collect();
    containers
        .into_iter()
        .filter(|id| restore(doc, *id, config))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Delimiter;
    use crate::pipeline::ErrorInfo;

    fn setup(text: &str) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t);
        let root = doc.root();
        doc.append_child(root, p);
        (doc, p, t)
    }

    fn span(node: NodeId, text: &str, start: usize, end: usize) -> MathSpan {
        MathSpan {
            raw_text: text[start + 1..end - 1].to_string(),
            display_mode: false,
            source_node: node,
            match_text: text[start..end].to_string(),
            start_offset: start,
            end_offset: end,
            delimiter: Delimiter::Dollar,
        }
    }

    fn rendered() -> RenderOutcome {
        RenderOutcome {
            method: RenderMethod::Strict,
            markup: Some("<b>x</b>".to_string()),
            error: None,
        }
    }

    #[test]
    fn test_apply_splits_text() {
        let text = "a $x$ b";
        let (mut doc, p, t) = setup(text);
        let config = EngineConfig::default();
        let applied = apply(&mut doc, &span(t, text, 2, 5), &rendered(), &config).unwrap();
        assert_eq!(doc.children(p).len(), 3);
        assert_eq!(
            doc.inner_html(p),
            "a <span class=\"webtex-processed webtex-inline\" data-webtex-source=\"$x$\" \
             data-webtex-method=\"strict\"><b>x</b></span> b"
        );
        assert_eq!(doc.text(applied.after.unwrap()), Some(" b"));
    }

    #[test]
    fn test_fallback_keeps_match_text() {
        let text = r"$\frac{1}{$";
        let (mut doc, p, t) = setup(text);
        let config = EngineConfig::default();
        let outcome = RenderOutcome {
            method: RenderMethod::FallbackText,
            markup: None,
            error: Some(ErrorInfo {
                message: "Expected '}'".to_string(),
                tex: r"\frac{1}{".to_string(),
            }),
        };
        let applied = apply(&mut doc, &span(t, text, 0, text.len()), &outcome, &config).unwrap();
        assert_eq!(doc.text_content(p), text);
        assert!(doc.has_class(applied.container, "webtex-fallback"));
        assert_eq!(doc.attr(applied.container, "data-webtex-error"), Some("Expected '}'"));
        assert_eq!(applied.after, None);
    }

    #[test]
    fn test_stale_span_skipped() {
        let text = "a $x$ b";
        let (mut doc, p, t) = setup(text);
        let config = EngineConfig::default();
        doc.set_text(t, "changed");
        assert_eq!(apply(&mut doc, &span(t, text, 2, 5), &rendered(), &config), None);
        doc.detach(t);
        assert_eq!(apply(&mut doc, &span(t, text, 2, 5), &rendered(), &config), None);
        assert!(doc.children(p).is_empty());
    }

    #[test]
    fn test_restore_rebuilds_single_text_node() {
        let text = "a $x$ b";
        let (mut doc, p, t) = setup(text);
        let config = EngineConfig::default();
        apply(&mut doc, &span(t, text, 2, 5), &rendered(), &config).unwrap();
        assert_eq!(restore_all(&mut doc, NodeId::ROOT, &config), 1);
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), text);
    }
}
