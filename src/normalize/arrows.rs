//! Arrow and limit typo fixes.

use lazy_static::lazy_static;
use regex::Regex;

use super::commands::is_text_command;
use super::scan::{command_groups, control_word, matching_brace, skip_ws, within};

lazy_static! {
    /// A lone `o` standing in for `\to` (the backslash-t got eaten).
    static ref LONE_O: Regex = Regex::new(r"(^|\s)o(\s)").unwrap();
}

pub fn fix_arrows(input: &str) -> String {
    let s = replace_bare_word(input, "infty", r"\infty");
    let s = replace_bare_word(&s, "lim", r"\lim");
    let s = fix_limit_subscripts(&s);
    to_rightarrow(&s)
}

/// Prefix `word` with a backslash where it stands alone outside text groups.
pub fn replace_bare_word(input: &str, word: &str, replacement: &str) -> String {
    if !input.contains(word) {
        return input.to_string();
    }
    let bytes = input.as_bytes();
    let text_groups = command_groups(bytes, is_text_command);
    let mut out = String::with_capacity(input.len() + 4);
    let mut last = 0usize;
    let mut from = 0usize;

    while let Some(rel) = input[from..].find(word) {
        let at = from + rel;
        let end = at + word.len();
        from = end;
        let before_ok = at == 0 || !(bytes[at - 1].is_ascii_alphabetic() || bytes[at - 1] == b'\\');
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphabetic();
        if before_ok && after_ok && !within(&text_groups, at) {
            out.push_str(&input[last..at]);
            out.push_str(replacement);
            last = end;
        }
    }
    out.push_str(&input[last..]);
    out
}

/// Byte ranges of `\lim_{...}` subscript groups (including braces).
fn limit_subscripts(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
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
        if name.starts_with("lim") {
            let mut q = skip_ws(bytes, end);
            if bytes.get(q) == Some(&b'\\') && control_word(bytes, q).map(|(n, _)| n) == Some("limits") {
                q = skip_ws(bytes, q + "\\limits".len());
            }
            if bytes.get(q) == Some(&b'_') {
                let open = skip_ws(bytes, q + 1);
                if let Some(close) = matching_brace(bytes, open) {
                    out.push((open, close));
                }
            }
        }
        i = end;
    }
    out
}

/// `\lim_{x o \infty}` -> `\lim_{x \to \infty}`.
pub fn fix_limit_subscripts(input: &str) -> String {
    let ranges = limit_subscripts(input.as_bytes());
    if ranges.is_empty() {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 4);
    let mut last = 0usize;
    for (open, close) in ranges {
        out.push_str(&input[last..=open]);
        let inner = &input[open + 1..close];
        out.push_str(&LONE_O.replace_all(inner, "${1}\\to${2}"));
        last = close;
    }
    out.push_str(&input[last..]);
    out
}

/// `\to` -> `\rightarrow`, except in limit subscripts where `\to` reads better.
pub fn to_rightarrow(input: &str) -> String {
    let bytes = input.as_bytes();
    let limits = limit_subscripts(bytes);
    let mut out = String::with_capacity(input.len() + 16);
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        match control_word(bytes, i) {
            Some(("to", end)) => {
                if !within(&limits, i) {
                    out.push_str(&input[last..i]);
                    out.push_str("\\rightarrow");
                    last = end;
                }
                i = end;
            }
            Some((_, end)) => i = end,
            None => i += 2,
        }
    }
    out.push_str(&input[last..]);
    out
}
