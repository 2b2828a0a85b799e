//! `\text{}` wrapper judgment: keep real labels, unwrap math in disguise.

use super::commands::is_element;
use super::scan::{control_word, matching_brace, skip_ws};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextVerdict {
    Keep,
    Unwrap,
}

/// Decide what to do with the content of one `\text{}` group.
pub fn judge_text(content: &str) -> TextVerdict {
    let c = content.trim();
    if c.is_empty() || is_label_like(c) {
        return TextVerdict::Keep;
    }
    if c.contains(['\\', '^', '_', '→']) || c.contains("->") {
        return TextVerdict::Unwrap;
    }
    if is_plain_expression(c) {
        return TextVerdict::Unwrap;
    }
    TextVerdict::Keep
}

fn is_label_like(c: &str) -> bool {
    let letters = c.trim_end_matches(['\'', '*']);
    let marks = &c[letters.len()..];
    if matches!(c, "e^{+}" | "e^{-}" | "e^+" | "e^-") {
        return true;
    }
    if is_element(letters) && !marks.contains('*') {
        return true;
    }
    !letters.is_empty() && letters.chars().all(|ch| ch.is_ascii_alphabetic())
}

/// ASCII digits/letters/operators with at least one digit or operator and
/// no multi-letter word.
fn is_plain_expression(c: &str) -> bool {
    let allowed = |ch: char| ch.is_ascii_alphanumeric() || ch == ' ' || "+-=*/().,<>|!".contains(ch);
    if !c.chars().all(allowed) {
        return false;
    }
    let has_math = c.chars().any(|ch| ch.is_ascii_digit() || "+-=*/<>|!".contains(ch));
    let mut run = 0usize;
    let mut longest = 0usize;
    for ch in c.chars() {
        if ch.is_ascii_alphabetic() {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    has_math && longest < 2
}

/// Apply [`judge_text`] to every `\text{}` group until nothing changes.
pub fn unwrap_text_groups(input: &str) -> String {
    let mut cur = input.to_string();
    loop {
        let next = unwrap_once(&cur);
        if next == cur {
            return next;
        }
        cur = next;
    }
}

fn unwrap_once(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        let Some((name, end)) = control_word(bytes, i) else {
            i += 2;
            continue;
        };
        let open = skip_ws(bytes, end);
        if name != "text" || bytes.get(open) != Some(&b'{') {
            i = end;
            continue;
        }
        let Some(close) = matching_brace(bytes, open) else {
            i = end;
            continue;
        };
        let content = &input[open + 1..close];
        if judge_text(content) == TextVerdict::Unwrap {
            out.push_str(&input[last..i]);
            let content = content.trim();
            if ends_with_control_word(&out) && content.starts_with(|c: char| c.is_ascii_alphabetic()) {
                out.push(' ');
            }
            out.push_str(content);
            if ends_with_control_word(content)
                && input[close + 1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                out.push(' ');
            }
            last = close + 1;
        }
        i = close + 1;
    }
    out.push_str(&input[last..]);
    out
}

fn ends_with_control_word(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut j = bytes.len();
    while j > 0 && bytes[j - 1].is_ascii_alphabetic() {
        j -= 1;
    }
    j < bytes.len() && j > 0 && bytes[j - 1] == b'\\'
}
