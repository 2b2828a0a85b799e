//! Empty-group canonicalization.

use super::commands::arity;
use super::scan::{finish, is_escaped, matching_open_brace, skip_ws};

/// Collapse redundant `{}` runs.
///
/// - A run followed (after whitespace) by `^`/`_` keeps exactly one `{}`.
/// - A run directly after `\cmd` or `\cmd{..}` keeps as many groups as the
///   command still needs (at least one for a bare control word, which the
///   group separates from what follows).
/// - A `{}` right after `^`/`_` is the script argument and stays.
/// - Anything else is deleted.
///
/// Runs to a fixpoint, so the result is stable under re-application.
pub fn collapse_empty_groups(input: &str) -> String {
    let mut cur = input.to_string();
    loop {
        let next = collapse_once(&cur);
        if next == cur {
            return next;
        }
        cur = next;
    }
}

fn collapse_once(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            out.push(bytes[i]);
            out.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        if !is_empty_group(bytes, i) {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let mut run = 0usize;
        let mut j = i;
        while is_empty_group(bytes, j) {
            run += 1;
            j += 2;
        }

        let after = skip_ws(bytes, j);
        let keep = if matches!(bytes.get(after), Some(b'^') | Some(b'_')) {
            j = after;
            1
        } else if matches!(last_significant(&out), Some(b'^') | Some(b'_')) {
            1
        } else {
            match owner_demand(&out) {
                Some(need) => need.min(run),
                None => 0,
            }
        };

        for _ in 0..keep {
            out.extend_from_slice(b"{}");
        }
        i = j;
    }

    finish(out, input)
}

fn is_empty_group(bytes: &[u8], i: usize) -> bool {
    bytes.get(i) == Some(&b'{') && bytes.get(i + 1) == Some(&b'}')
}

fn last_significant(out: &[u8]) -> Option<u8> {
    out.iter().rev().find(|b| !b.is_ascii_whitespace()).copied()
}

/// How many more `{}` the command that ends `out` still accepts.
fn owner_demand(out: &[u8]) -> Option<usize> {
    let mut end = out.len();
    let mut groups = 0usize;
    loop {
        if end == 0 {
            return None;
        }
        match out[end - 1] {
            b'}' if !is_escaped(out, end - 1) => {
                let open = matching_open_brace(&out[..end], end - 1)?;
                groups += 1;
                end = open;
            }
            b']' if !is_escaped(out, end - 1) => {
                let open = out[..end - 1].iter().rposition(|b| *b == b'[')?;
                end = open;
            }
            _ => break,
        }
    }

    let mut start = end;
    while start > 0 && out[start - 1].is_ascii_alphabetic() {
        start -= 1;
    }
    if start == end || start == 0 || out[start - 1] != b'\\' || is_escaped(out, start - 1) {
        return None;
    }
    let name = std::str::from_utf8(&out[start..end]).ok()?;
    let want = arity(name);
    if groups == 0 {
        Some(want.max(1))
    } else {
        Some(want.saturating_sub(groups))
    }
}

#[cfg(test)]
mod tests {
    use super::collapse_empty_groups;

    #[test]
    fn test_keeps_one_before_script() {
        assert_eq!(collapse_empty_groups("{}{}{}^{A}"), "{}^{A}");
        assert_eq!(collapse_empty_groups("{}{} _{Z}"), "{}_{Z}");
    }

    #[test]
    fn test_deletes_stray_groups() {
        assert_eq!(collapse_empty_groups("a{}{}b"), "ab");
        assert_eq!(collapse_empty_groups("a{{}}b"), "ab");
    }

    #[test]
    fn test_keeps_command_arguments() {
        assert_eq!(collapse_empty_groups(r"\text{}"), r"\text{}");
        assert_eq!(collapse_empty_groups(r"\frac{}{}{}"), r"\frac{}{}");
        assert_eq!(collapse_empty_groups(r"\frac{a}{}"), r"\frac{a}{}");
        assert_eq!(collapse_empty_groups(r"\frac{a}{b}{}"), r"\frac{a}{b}");
        assert_eq!(collapse_empty_groups(r"\alpha{}x"), r"\alpha{}x");
        assert_eq!(collapse_empty_groups(r"\sqrt[3]{}"), r"\sqrt[3]{}");
    }

    #[test]
    fn test_script_argument_kept() {
        assert_eq!(collapse_empty_groups("x^{}"), "x^{}");
    }

    #[test]
    fn test_escaped_braces_untouched() {
        assert_eq!(collapse_empty_groups(r"\{\}"), r"\{\}");
    }

    #[test]
    fn test_nuclear_equation() {
        let input = r"{}^{A}\text{N} \rightarrow {}{}{}^{A-4}_{Z-2}\text{N'} + {}{}^{4}_{2}\text{He}";
        assert_eq!(
            collapse_empty_groups(input),
            r"{}^{A}\text{N} \rightarrow {}^{A-4}_{Z-2}\text{N'} + {}^{4}_{2}\text{He}"
        );
    }
}
