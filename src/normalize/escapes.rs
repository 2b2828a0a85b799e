//! Recovery of commands whose backslash was eaten by a string-escape layer.
//!
//! `"\frac"` written inside a JavaScript or JSON string literal arrives as a
//! form feed followed by `rac`; `"\text"` arrives as a tab followed by
//! `ext`. This pass maps the control character back to its letter when the
//! result spells a known command (for whitespace characters, one of a fixed
//! list of longer words), and turns double-escaped `\\alpha` back into
//! `\alpha`.

use phf::phf_set;

use super::commands::is_known_command;
use super::scan::finish;

/// Words a tab, carriage return or line feed may have been eaten from.
///
/// Whitespace is also real layout in multi-line math, so only stems long
/// enough not to be an ordinary line start qualify (`\nu` and `\ne` do not).
static WHITESPACE_ESCAPES: phf::Set<&'static str> = phf_set! {
    // tab
    "text", "textbf", "textit", "textrm", "textsf", "texttt", "times", "theta",
    "tilde", "tanh", "textstyle", "triangle",
    // carriage return
    "rightarrow", "right", "rangle", "rfloor", "rceil", "rvert", "rVert",
    "rightharpoonup", "rightleftharpoons",
    // line feed
    "nabla", "neq", "notin", "nolimits", "nonumber", "newline", "nexists",
    "nleq", "ngeq", "nmid", "nparallel", "nsubseteq",
};

fn escape_letter(b: u8) -> Option<u8> {
    match b {
        0x0c => Some(b'f'),
        0x08 => Some(b'b'),
        0x0b => Some(b'v'),
        b'\t' => Some(b't'),
        b'\r' => Some(b'r'),
        b'\n' => Some(b'n'),
        _ => None,
    }
}

/// Control characters that never occur in real text are always restored.
fn always_restore(b: u8) -> bool {
    matches!(b, 0x0c | 0x08 | 0x0b)
}

pub fn recover_escapes(input: &str) -> String {
    let restored = restore_control_chars(input);
    collapse_double_escapes(&restored)
}

/// Map `\x0c rac` to `\frac`, `\t ext` to `\text` and so on.
pub fn restore_control_chars(input: &str) -> String {
    let bytes = input.as_bytes();
    if !bytes.iter().any(|b| escape_letter(*b).is_some()) {
        return input.to_string();
    }
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 4);
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        let Some(letter) = escape_letter(b) else {
            out.push(b);
            i += 1;
            continue;
        };

        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
            j += 1;
        }
        let mut word = Vec::with_capacity(j - i);
        word.push(letter);
        word.extend_from_slice(&bytes[i + 1..j]);
        let known = std::str::from_utf8(&word)
            .map(|w| {
                if always_restore(b) {
                    is_known_command(w)
                } else {
                    WHITESPACE_ESCAPES.contains(w)
                }
            })
            .unwrap_or(false);

        // a stray backslash before the control char already marks a command
        let has_slash = out.last() == Some(&b'\\');
        if known || (always_restore(b) && j > i + 1) {
            if !has_slash {
                out.push(b'\\');
            }
            out.extend_from_slice(&word);
            i = j;
            continue;
        }
        if always_restore(b) {
            // lone control char with nothing to attach to
            i += 1;
            continue;
        }
        out.push(b);
        i += 1;
    }

    finish(out, input)
}

/// Turn `\\alpha` into `\alpha` when `alpha` is a known command and the
/// string has no alignment environment where `\\` is a row break.
pub fn collapse_double_escapes(input: &str) -> String {
    if input.contains("\\begin{") || !input.contains("\\\\") {
        return input.to_string();
    }
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'\\') {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
                j += 1;
            }
            let known = std::str::from_utf8(&bytes[i + 2..j])
                .map(|w| !w.is_empty() && is_known_command(w))
                .unwrap_or(false);
            if known {
                out.push(b'\\');
                out.extend_from_slice(&bytes[i + 2..j]);
            } else {
                out.extend_from_slice(&bytes[i..j]);
            }
            i = j;
            continue;
        }
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            out.push(bytes[i]);
            out.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    finish(out, input)
}
