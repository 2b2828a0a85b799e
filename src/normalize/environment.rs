//! Environment flattening for per-expression rendering.

use lazy_static::lazy_static;
use regex::Regex;

use super::scan::{control_word, matching_brace, skip_ws};

lazy_static! {
    static ref EQUATION_ENV: Regex = Regex::new(r"\\(?:begin|end)\s*\{equation\*?\}").unwrap();
    static ref ALIGN_ENV: Regex = Regex::new(r"\\(begin|end)\s*\{(?:align|eqnarray)\*?\}").unwrap();
    static ref GATHER_ENV: Regex = Regex::new(r"\\(begin|end)\s*\{gather\*?\}").unwrap();
    static ref LABEL: Regex = Regex::new(r"\\label\s*\{[^{}]*\}").unwrap();
}

/// Strip `equation` wrappers, map `align`/`gather` to their inner forms and
/// rewrite `matrix` (both LaTeX and plain TeX) to `array`.
pub fn flatten_environments(input: &str) -> String {
    let s = EQUATION_ENV.replace_all(input, "");
    let s = LABEL.replace_all(&s, "");
    let s = ALIGN_ENV.replace_all(&s, r"\${1}{aligned}");
    let s = GATHER_ENV.replace_all(&s, r"\${1}{gathered}");
    let s = matrix_to_array(&s);
    plain_matrix_to_array(&s)
}

/// `\begin{matrix}a & b\end{matrix}` -> `\begin{array}{cc}a & b\end{array}`.
pub fn matrix_to_array(input: &str) -> String {
    const BEGIN: &str = "\\begin{matrix}";
    const END: &str = "\\end{matrix}";

    let mut out = String::with_capacity(input.len() + 8);
    let mut rest = input;
    while let Some(start) = rest.find(BEGIN) {
        let body_start = start + BEGIN.len();
        let Some(body_len) = matching_end(&rest[body_start..], BEGIN, END) else {
            break;
        };
        let body = &rest[body_start..body_start + body_len];
        out.push_str(&rest[..start]);
        out.push_str(&format!(
            "\\begin{{array}}{{{}}}{}\\end{{array}}",
            column_spec(body),
            matrix_to_array(body)
        ));
        rest = &rest[body_start + body_len + END.len()..];
    }
    out.push_str(rest);
    out
}

fn matching_end(body: &str, begin: &str, end: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = 0usize;
    while i < body.len() {
        let tail = &body[i..];
        if tail.starts_with(begin) {
            depth += 1;
            i += begin.len();
            continue;
        }
        if tail.starts_with(end) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += end.len();
            continue;
        }
        i += tail.chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Plain TeX `\matrix{a & b \cr c & d}`.
pub fn plain_matrix_to_array(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len() + 16);
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
        if name != "matrix" || bytes.get(open) != Some(&b'{') {
            i = end;
            continue;
        }
        let Some(close) = matching_brace(bytes, open) else {
            i = end;
            continue;
        };
        let body = input[open + 1..close].replace("\\cr", "\\\\");
        let body = body.trim_end().trim_end_matches("\\\\").trim();
        out.push_str(&input[last..i]);
        out.push_str(&format!(
            "\\begin{{array}}{{{}}}{}\\end{{array}}",
            column_spec(body),
            body
        ));
        last = close + 1;
        i = close + 1;
    }
    out.push_str(&input[last..]);
    out
}

/// One centered column per cell of the widest row.
fn column_spec(body: &str) -> String {
    let bytes = body.as_bytes();
    let mut depth = 0i32;
    let mut cols = 1usize;
    let mut widest = 1usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'\\') && depth == 0 => {
                widest = widest.max(cols);
                cols = 1;
                i += 2;
                continue;
            }
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'&' if depth == 0 => cols += 1,
            _ => {}
        }
        i += 1;
    }
    "c".repeat(widest.max(cols))
}
