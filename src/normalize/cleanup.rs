//! Incomplete-command cleanup.

use super::commands::arity;
use super::scan::{control_word, finish, matching_brace, skip_ws};

pub fn cleanup_incomplete(input: &str) -> String {
    let s = fill_missing_arguments(input);
    fill_empty_scripts(&s)
}

/// Whether `i` is a place where an argument can no longer start.
fn is_argument_end(bytes: &[u8], i: usize) -> bool {
    match bytes.get(i) {
        None => true,
        Some(b'}') | Some(b'&') | Some(b'$') | Some(b'^') | Some(b'_') => true,
        Some(b'\\') => matches!(bytes.get(i + 1), Some(b'\\') | Some(b')') | Some(b']')),
        _ => false,
    }
}

/// `\sqrt` or `\text` with no argument left -> `\sqrt{}` / `\text{}`.
pub fn fill_missing_arguments(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len() + 8);
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
        let want = arity(name);
        if want == 0 || name == "begin" || name == "end" {
            i = end;
            continue;
        }

        let mut p = end;
        if bytes.get(p) == Some(&b'[') {
            if let Some(close) = bytes[p..].iter().position(|b| *b == b']') {
                p += close + 1;
            }
        }
        let mut have = 0usize;
        while have < want {
            let q = skip_ws(bytes, p);
            match bytes.get(q) {
                Some(b'{') => match matching_brace(bytes, q) {
                    Some(c) => {
                        p = c + 1;
                        have += 1;
                    }
                    None => break,
                },
                _ => break,
            }
        }
        if have < want && is_argument_end(bytes, skip_ws(bytes, p)) {
            out.push_str(&input[last..p]);
            for _ in have..want {
                out.push_str("{}");
            }
            last = p;
        }
        i = end;
    }
    out.push_str(&input[last..]);
    out
}

/// A `^`/`_` with nothing after it gets a thin-space argument.
pub fn fill_empty_scripts(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 8);
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                out.push(b'\\');
                if i + 1 < bytes.len() {
                    out.push(bytes[i + 1]);
                }
                i += 2;
                continue;
            }
            b @ (b'^' | b'_') => {
                let q = skip_ws(bytes, i + 1);
                let dangling = match bytes.get(q) {
                    None | Some(b'}') | Some(b'&') | Some(b'$') => true,
                    Some(b'\\') => matches!(bytes.get(q + 1), Some(b'\\') | Some(b')') | Some(b']')),
                    _ => false,
                };
                out.push(b);
                if dangling {
                    out.extend_from_slice(b"{\\,}");
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    finish(out, input)
}
