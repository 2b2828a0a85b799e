//! Expression extraction: locate delimiter-bounded math in document text.
//!
//! [`find_matches`] works on a single string; [`extract`] walks a document
//! subtree and runs it over every eligible text node.

use fxhash::FxHashSet;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use webtex_dom::{Document, NodeId, NodeKind};

use crate::config::EngineConfig;
use crate::normalize::commands::DISPLAY_ENVIRONMENTS;
use crate::normalize::scan::is_escaped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// `$$...$$`
    DoubleDollar,
    /// `\[...\]`
    Bracket,
    /// `$\begin{env}...\end{env}$`, may span lines
    InlineEnvironment,
    /// `$...$`
    Dollar,
    /// `\(...\)`
    Paren,
}

/// A delimiter-bounded candidate found in one string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub delimiter: Delimiter,
    pub display_mode: bool,
    /// Content between the delimiters, entity-decoded and trimmed.
    pub raw_text: String,
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset just past the closing delimiter.
    pub end: usize,
}

/// A located occurrence of math in a text node of a [`Document`].
///
/// Offsets are byte offsets into the node's text at extraction time. Once the
/// node has been replaced the span is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathSpan {
    pub raw_text: String,
    pub display_mode: bool,
    #[serde(serialize_with = "serialize_node")]
    pub source_node: NodeId,
    /// The full original substring, delimiters included.
    pub match_text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub delimiter: Delimiter,
}

fn serialize_node<S: Serializer>(id: &NodeId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u32(id.0)
}

// =============================================================================
// Inline heuristic
// =============================================================================

lazy_static! {
    static ref CONTROL_WORD: Regex = Regex::new(r"\\[a-zA-Z]").unwrap();
    static ref SCRIPTED_LETTER: Regex = Regex::new(r"[a-zA-Z][_^]").unwrap();
    static ref DISPLAY_ENV_INSIDE: Regex =
        Regex::new(r"\\begin\{(?:align|equation|gather|multline)\*?\}").unwrap();
}

const MATH_SYMBOLS: &str = "=+-*/<>|^_≤≥≠∞∂∇∆Ω∈∉⊂⊃∪∩∀∃∑∏∫√±";

/// Whether inline `$...$` content is plausibly math rather than prose that
/// happens to sit between two dollar signs.
pub fn looks_like_math(content: &str) -> bool {
    if CONTROL_WORD.is_match(content) || SCRIPTED_LETTER.is_match(content) {
        return true;
    }
    if content.contains(['{', '}', '[', ']', '(', ')']) {
        return true;
    }
    if content.chars().any(|c| MATH_SYMBOLS.contains(c)) {
        return true;
    }
    let has_letter = content.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = content.chars().any(|c| c.is_ascii_digit());
    if has_letter && has_digit {
        return true;
    }
    // a lone variable like `$n$`
    content.len() == 1 && has_letter
}

// =============================================================================
// Entity decoding
// =============================================================================

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
    ("&nbsp;", '\u{a0}'),
];

/// Decode the handful of entities that show up in scraped math.
///
/// Numeric entities decode only when well-formed, semicolon-terminated and
/// naming a Unicode scalar value. Anything else passes through unchanged.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copy_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }
        out.push_str(&s[copy_start..i]);
        let rest = &s[i..];
        if let Some((name, ch)) = NAMED_ENTITIES.iter().find(|(n, _)| rest.starts_with(n)) {
            out.push(*ch);
            i += name.len();
        } else if let Some((ch, len)) = numeric_entity(rest) {
            out.push(ch);
            i += len;
        } else {
            out.push('&');
            i += 1;
        }
        copy_start = i;
    }
    out.push_str(&s[copy_start..]);
    out
}

/// Parse `&#123;` or `&#x7B;` at the start of `s`.
fn numeric_entity(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let (digits, radix, prefix) = match body.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16, 3),
        None => (body, 10, 2),
    };
    let max_digits = if radix == 16 { 6 } else { 7 };
    let len = digits
        .bytes()
        .take(max_digits + 1)
        .take_while(|b| b.is_ascii_hexdigit() && (radix == 16 || b.is_ascii_digit()))
        .count();
    if len == 0 || len > max_digits || digits.as_bytes().get(len) != Some(&b';') {
        return None;
    }
    let value = u32::from_str_radix(&digits[..len], radix).ok()?;
    let ch = char::from_u32(value)?;
    Some((ch, prefix + len + 1))
}

// =============================================================================
// String scanning
// =============================================================================

/// Find every math span in `text`, ordered by position.
///
/// Delimiter families are tried in precedence order (`$$`, `\[`, inline
/// environments, `$`, `\(`); a later family never claims text already
/// covered by an earlier one.
pub fn find_matches(text: &str, config: &EngineConfig) -> Vec<Match> {
    let delims = &config.delimiters;
    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<Match> = Vec::new();

    let scanners: [(bool, fn(&str, usize) -> Option<Candidate>); 5] = [
        (delims.double_dollar, scan_double_dollar),
        (delims.bracket, scan_bracket),
        (delims.inline_environment, scan_inline_environment),
        (delims.dollar, scan_dollar),
        (delims.paren, scan_paren),
    ];

    for (enabled, scan) in scanners {
        if !enabled {
            continue;
        }
        let mut i = 0usize;
        while i < text.len() {
            if let Some(&(_, end)) = taken.iter().find(|(s, e)| *s <= i && i < *e) {
                i = end;
                continue;
            }
            if !text.is_char_boundary(i) {
                i += 1;
                continue;
            }
            let Some(c) = scan(text, i) else {
                i += 1;
                continue;
            };
            if overlaps(&taken, c.start, c.end) {
                i += 1;
                continue;
            }
            let raw = decode_entities(&text[c.content.0..c.content.1]);
            let raw = raw.trim();
            if raw.is_empty() {
                i = c.end;
                continue;
            }
            if c.delimiter == Delimiter::Dollar && config.inline_heuristic {
                let currency = text[c.end..].starts_with(|ch: char| ch.is_ascii_digit());
                if currency || !looks_like_math(raw) {
                    i += 1;
                    continue;
                }
            }
            let display_mode = c.display_mode
                || (c.delimiter == Delimiter::Dollar && DISPLAY_ENV_INSIDE.is_match(raw));
            taken.push((c.start, c.end));
            found.push(Match {
                delimiter: c.delimiter,
                display_mode,
                raw_text: raw.to_string(),
                start: c.start,
                end: c.end,
            });
            i = c.end;
        }
    }

    found.sort_by_key(|m| m.start);
    found
}

struct Candidate {
    delimiter: Delimiter,
    display_mode: bool,
    start: usize,
    end: usize,
    content: (usize, usize),
}

fn overlaps(taken: &[(usize, usize)], start: usize, end: usize) -> bool {
    taken.iter().any(|(s, e)| start < *e && *s < end)
}

/// Next unescaped occurrence of `pat` at or after `from`.
fn find_unescaped(text: &str, pat: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(rel) = text.get(pos..)?.find(pat) {
        let at = pos + rel;
        if !is_escaped(bytes, at) {
            return Some(at);
        }
        pos = at + 1;
    }
    None
}

fn scan_double_dollar(text: &str, i: usize) -> Option<Candidate> {
    let bytes = text.as_bytes();
    if !text[i..].starts_with("$$") || is_escaped(bytes, i) {
        return None;
    }
    let close = find_unescaped(text, "$$", i + 2)?;
    Some(Candidate {
        delimiter: Delimiter::DoubleDollar,
        display_mode: true,
        start: i,
        end: close + 2,
        content: (i + 2, close),
    })
}

fn scan_bracket(text: &str, i: usize) -> Option<Candidate> {
    let bytes = text.as_bytes();
    if !text[i..].starts_with("\\[") || is_escaped(bytes, i) {
        return None;
    }
    let close = find_unescaped(text, "\\]", i + 2)?;
    Some(Candidate {
        delimiter: Delimiter::Bracket,
        display_mode: true,
        start: i,
        end: close + 2,
        content: (i + 2, close),
    })
}

fn scan_paren(text: &str, i: usize) -> Option<Candidate> {
    let bytes = text.as_bytes();
    if !text[i..].starts_with("\\(") || is_escaped(bytes, i) {
        return None;
    }
    let close = find_unescaped(text, "\\)", i + 2)?;
    if text[i + 2..close].contains('\n') {
        return None;
    }
    Some(Candidate {
        delimiter: Delimiter::Paren,
        display_mode: false,
        start: i,
        end: close + 2,
        content: (i + 2, close),
    })
}

/// A single `$` that is not escaped and not part of a `$$` pair.
fn is_lone_dollar(bytes: &[u8], i: usize) -> bool {
    bytes.get(i) == Some(&b'$')
        && !is_escaped(bytes, i)
        && bytes.get(i + 1) != Some(&b'$')
        && (i == 0 || bytes[i - 1] != b'$')
}

fn scan_dollar(text: &str, i: usize) -> Option<Candidate> {
    let bytes = text.as_bytes();
    if !is_lone_dollar(bytes, i) {
        return None;
    }
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return None,
            b'\\' => j += 2,
            b'$' => {
                if bytes.get(j + 1) == Some(&b'$') {
                    return None;
                }
                return Some(Candidate {
                    delimiter: Delimiter::Dollar,
                    display_mode: false,
                    start: i,
                    end: j + 1,
                    content: (i + 1, j),
                });
            }
            _ => j += 1,
        }
    }
    None
}

fn scan_inline_environment(text: &str, i: usize) -> Option<Candidate> {
    let bytes = text.as_bytes();
    if !is_lone_dollar(bytes, i) {
        return None;
    }
    let inner = i + 1 + (text[i + 1..].len() - text[i + 1..].trim_start().len());
    let rest = text[inner..].strip_prefix("\\begin{")?;
    let name_len = rest.find('}')?;
    let name = &rest[..name_len];
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'*') {
        return None;
    }
    let end_tag = format!("\\end{{{}}}", name);
    let end_at = text[inner..].find(&end_tag)? + inner + end_tag.len();
    let close = end_at + (text[end_at..].len() - text[end_at..].trim_start().len());
    if !is_lone_dollar(bytes, close) {
        return None;
    }
    Some(Candidate {
        delimiter: Delimiter::InlineEnvironment,
        display_mode: DISPLAY_ENVIRONMENTS.contains(name),
        start: i,
        end: close + 1,
        content: (i + 1, close),
    })
}

// =============================================================================
// Document walk
// =============================================================================

/// Whether `id` is an element whose subtree must not be scanned.
pub fn is_excluded_element(
    doc: &Document,
    id: NodeId,
    config: &EngineConfig,
    processed: &FxHashSet<NodeId>,
) -> bool {
    let Some(tag) = doc.tag_name(id) else {
        return false;
    };
    processed.contains(&id)
        || config.is_ignored_tag(tag)
        || doc.has_class(id, &config.ignore_class)
        || doc.has_class(id, &config.processed_class)
        || doc.has_class(id, &config.fallback_class)
}

/// `Some(true)` / `Some(false)` when `id` sets editability, `None` to inherit.
fn editable_override(doc: &Document, id: NodeId) -> Option<bool> {
    let value = doc.attr(id, "contenteditable")?;
    Some(!value.trim().eq_ignore_ascii_case("false"))
}

fn inherited_editable(doc: &Document, id: NodeId) -> bool {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .find_map(|a| editable_override(doc, a))
        .unwrap_or(false)
}

/// Collect every math span below `root`, in document order.
///
/// Subtrees under ignored tags, ignore/processed/fallback markers, nodes in
/// `processed`, and user-editable regions are skipped. The same checks apply
/// to the ancestors of `root`.
pub fn extract(
    doc: &Document,
    root: NodeId,
    config: &EngineConfig,
    processed: &FxHashSet<NodeId>,
) -> Vec<MathSpan> {
    if !doc.contains(root) {
        return Vec::new();
    }
    let blocked = std::iter::once(root)
        .chain(doc.ancestors(root))
        .any(|a| is_excluded_element(doc, a, config, processed));
    if blocked || inherited_editable(doc, root) {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut stack: Vec<NodeId> = vec![root];
    while let Some(id) = stack.pop() {
        if processed.contains(&id) {
            continue;
        }
        match doc.kind(id) {
            NodeKind::Text(text) => {
                spans.extend(find_matches(text, config).into_iter().map(|m| MathSpan {
                    match_text: text[m.start..m.end].to_string(),
                    raw_text: m.raw_text,
                    display_mode: m.display_mode,
                    source_node: id,
                    start_offset: m.start,
                    end_offset: m.end,
                    delimiter: m.delimiter,
                }));
            }
            NodeKind::Element { .. } => {
                if id != root
                    && (is_excluded_element(doc, id, config, processed)
                        || editable_override(doc, id) == Some(true))
                {
                    continue;
                }
                stack.extend(doc.children(id).iter().rev().copied());
            }
            NodeKind::Document => stack.extend(doc.children(id).iter().rev().copied()),
            NodeKind::Raw(_) | NodeKind::Comment(_) => {}
        }
    }
    log::trace!(target: "webtex::extract", "{} span(s) under node {}", spans.len(), root.0);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(text: &str) -> Vec<(Delimiter, bool, String)> {
        find_matches(text, &EngineConfig::default())
            .into_iter()
            .map(|m| (m.delimiter, m.display_mode, m.raw_text))
            .collect()
    }

    #[test]
    fn test_all_delimiters_in_order() {
        let found = matches(r"a $$x^2$$ b \[y\] c $z_1$ d \(w+1\)");
        assert_eq!(
            found,
            vec![
                (Delimiter::DoubleDollar, true, "x^2".to_string()),
                (Delimiter::Bracket, true, "y".to_string()),
                (Delimiter::Dollar, false, "z_1".to_string()),
                (Delimiter::Paren, false, "w+1".to_string()),
            ]
        );
    }

    #[test]
    fn test_offsets_cover_delimiters() {
        let text = "see $a+b$ here";
        let m = &find_matches(text, &EngineConfig::default())[0];
        assert_eq!(&text[m.start..m.end], "$a+b$");
        assert!(m.start < m.end && m.end <= text.len());
    }

    #[test]
    fn test_inline_does_not_cross_newline() {
        assert!(matches("$a +\n b$").is_empty());
    }

    #[test]
    fn test_escaped_dollar_inside_inline() {
        assert_eq!(
            matches(r"$\$5 + x$"),
            vec![(Delimiter::Dollar, false, r"\$5 + x".to_string())]
        );
        assert!(matches(r"\$x + y\$").is_empty());
    }

    #[test]
    fn test_currency_is_not_math() {
        assert!(matches("it costs $5 and $10 today").is_empty());
        assert!(matches("between $ and $ signs").is_empty());
    }

    #[test]
    fn test_heuristic_can_be_disabled() {
        let config = EngineConfig {
            inline_heuristic: false,
            ..Default::default()
        };
        assert_eq!(find_matches("between $ and $ signs", &config).len(), 1);
    }

    #[test]
    fn test_empty_capture_dropped() {
        assert!(matches("$$ $$ and \\(  \\)").is_empty());
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            matches("$a &lt; b$"),
            vec![(Delimiter::Dollar, false, "a < b".to_string())]
        );
        assert_eq!(decode_entities("&#x3B1;&#945;&amp;&bogus;&#xZZ;"), "αα&&bogus;&#xZZ;");
    }

    #[test]
    fn test_inline_environment_promoted() {
        let found = matches("$\\begin{align} a &= b \\\\\n c &= d \\end{align}$");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, Delimiter::InlineEnvironment);
        assert!(found[0].1);

        let found = matches(r"$\begin{pmatrix} 1 & 2 \end{pmatrix}$");
        assert_eq!(found[0].0, Delimiter::InlineEnvironment);
        assert!(!found[0].1);
    }

    #[test]
    fn test_double_dollar_claims_its_text() {
        let found = matches("$$a$b$$ and $c_1$");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].2, "a$b");
        assert_eq!(found[1].2, "c_1");
    }

    #[test]
    fn test_heuristic() {
        for s in [r"\alpha", "x_1", "f(x)", "a=b", "2x", "n", "x ≤ y"] {
            assert!(looks_like_math(s), "{:?}", s);
        }
        for s in ["and", "hello world", "5"] {
            assert!(!looks_like_math(s), "{:?}", s);
        }
    }

    fn page(doc: &mut Document, tag: &str, text: &str) -> (NodeId, NodeId) {
        let el = doc.create_element(tag);
        let t = doc.create_text(text);
        doc.append_child(el, t);
        let root = doc.root();
        doc.append_child(root, el);
        (el, t)
    }

    #[test]
    fn test_walk_skips_ignored_regions() {
        let mut doc = Document::new();
        let config = EngineConfig::default();
        let (_, keep) = page(&mut doc, "p", "$x_1$");
        page(&mut doc, "code", "$x_2$");
        let (ignored, _) = page(&mut doc, "div", "$x_3$");
        doc.add_class(ignored, "webtex-ignore");
        let (editable, _) = page(&mut doc, "div", "$x_4$");
        doc.set_attr(editable, "contenteditable", "true");
        let (not_editable, inner) = page(&mut doc, "div", "$x_5$");
        doc.set_attr(not_editable, "contenteditable", "false");

        let spans = extract(&doc, doc.root(), &config, &FxHashSet::default());
        let nodes: Vec<NodeId> = spans.iter().map(|s| s.source_node).collect();
        assert_eq!(nodes, vec![keep, inner]);
        assert_eq!(spans[0].match_text, "$x_1$");
    }

    #[test]
    fn test_walk_checks_root_ancestors() {
        let mut doc = Document::new();
        let (pre, _) = page(&mut doc, "pre", "");
        let span = doc.create_element("span");
        let t = doc.create_text("$x_1$");
        doc.append_child(span, t);
        doc.append_child(pre, span);
        let spans = extract(&doc, span, &EngineConfig::default(), &FxHashSet::default());
        assert!(spans.is_empty());
    }

    #[test]
    fn test_walk_honors_side_table() {
        let mut doc = Document::new();
        let (p, _) = page(&mut doc, "p", "$x_1$");
        let mut processed = FxHashSet::default();
        processed.insert(p);
        assert!(extract(&doc, doc.root(), &EngineConfig::default(), &processed).is_empty());
    }
}
