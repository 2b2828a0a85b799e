//! Brace, `\left`/`\right` and environment balancing.

use super::scan::{control_word, finish, matching_brace, skip_ws};

/// Balance a TeX string.
///
/// - Stray `}` at depth zero are deleted, missing `}` are appended.
/// - Escaped `\{`, `\}` and `\\` are not group delimiters.
/// - A dangling backslash at the end of input is dropped.
/// - Unmatched `\end{..}` are dropped and missing ones appended.
/// - Unmatched `\left`/`\right` are demoted to their bare delimiter, or
///   stripped when no delimiter follows.
pub fn balance(input: &str) -> String {
    let braced = balance_braces(input);
    let envs = balance_environments(&braced);
    balance_left_right(&envs)
}

/// The brace-only part of [`balance`].
pub fn balance_braces(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 4);
    let mut depth = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 >= bytes.len() {
                    // dangling escape
                    break;
                }
                out.push(b'\\');
                out.push(bytes[i + 1]);
                i += 2;
                continue;
            }
            b'{' => {
                depth += 1;
                out.push(b'{');
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    out.push(b'}');
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    out.extend(std::iter::repeat(b'}').take(depth));
    finish(out, input)
}

// =============================================================================
// Environments
// =============================================================================

struct EnvToken {
    start: usize,
    end: usize,
    name: String,
    begin: bool,
}

fn env_tokens(bytes: &[u8]) -> Vec<EnvToken> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        match control_word(bytes, i) {
            Some((word @ ("begin" | "end"), end)) => {
                let open = skip_ws(bytes, end);
                if let Some(close) = matching_brace(bytes, open) {
                    let name = String::from_utf8_lossy(&bytes[open + 1..close]).into_owned();
                    out.push(EnvToken {
                        start: i,
                        end: close + 1,
                        name,
                        begin: word == "begin",
                    });
                    i = close + 1;
                } else {
                    i = end;
                }
            }
            Some((_, end)) => i = end,
            None => i += 2,
        }
    }
    out
}

/// Drop unmatched `\end{..}` and close environments left open.
pub fn balance_environments(input: &str) -> String {
    let bytes = input.as_bytes();
    let tokens = env_tokens(bytes);
    if tokens.is_empty() {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len() + 16);
    let mut stack: Vec<String> = Vec::new();
    let mut last = 0usize;

    for tok in tokens {
        out.push_str(&input[last..tok.start]);
        last = tok.end;
        if tok.begin {
            stack.push(tok.name);
            out.push_str(&input[tok.start..tok.end]);
            continue;
        }
        if let Some(pos) = stack.iter().rposition(|n| *n == tok.name) {
            // close anything opened inside and left dangling
            while stack.len() > pos + 1 {
                if let Some(inner) = stack.pop() {
                    out.push_str(&format!("\\end{{{}}}", inner));
                }
            }
            stack.pop();
            out.push_str(&input[tok.start..tok.end]);
        }
    }
    out.push_str(&input[last..]);
    while let Some(name) = stack.pop() {
        out.push_str(&format!("\\end{{{}}}", name));
    }
    out
}

// =============================================================================
// \left / \right
// =============================================================================

const NAMED_DELIMITERS: &[&str] = &[
    "lfloor", "rfloor", "lceil", "rceil", "langle", "rangle", "lvert", "rvert", "lVert",
    "rVert", "vert", "Vert", "backslash", "uparrow", "downarrow", "Uparrow", "Downarrow",
    "updownarrow",
];

/// End offset of the delimiter following `\left`/`\right`, if any.
fn delimiter_end(bytes: &[u8], i: usize) -> Option<usize> {
    let j = skip_ws(bytes, i);
    match *bytes.get(j)? {
        b'(' | b')' | b'[' | b']' | b'.' | b'|' | b'/' | b'<' | b'>' => Some(j + 1),
        b'\\' => match bytes.get(j + 1)? {
            b'{' | b'}' | b'|' => Some(j + 2),
            _ => {
                let (name, end) = control_word(bytes, j)?;
                NAMED_DELIMITERS.contains(&name).then_some(end)
            }
        },
        _ => None,
    }
}

struct Fence {
    start: usize,
    word_end: usize,
    delim_end: Option<usize>,
    left: bool,
    depth: usize,
}

fn fences(bytes: &[u8]) -> Vec<Fence> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\\' => {
                if let Some((word, end)) = control_word(bytes, i) {
                    if word == "left" || word == "right" {
                        let delim_end = delimiter_end(bytes, end);
                        out.push(Fence {
                            start: i,
                            word_end: end,
                            delim_end,
                            left: word == "left",
                            depth,
                        });
                        i = delim_end.unwrap_or(end);
                        continue;
                    }
                    i = end;
                    continue;
                }
                i += 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out
}

/// Demote or strip `\left`/`\right` tokens that have no partner in the same
/// brace group.
pub fn balance_left_right(input: &str) -> String {
    let bytes = input.as_bytes();
    let fences = fences(bytes);
    if fences.is_empty() {
        return input.to_string();
    }

    let mut matched = vec![false; fences.len()];
    let mut stack: Vec<usize> = Vec::new();
    for (idx, f) in fences.iter().enumerate() {
        if f.delim_end.is_none() {
            continue;
        }
        // lefts opened in a group that has since closed can never match
        while let Some(&top) = stack.last() {
            if fences[top].depth > f.depth {
                stack.pop();
            } else {
                break;
            }
        }
        if f.left {
            stack.push(idx);
        } else if let Some(&top) = stack.last() {
            if fences[top].depth == f.depth {
                stack.pop();
                matched[top] = true;
                matched[idx] = true;
            }
        }
    }

    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;
    for (idx, f) in fences.iter().enumerate() {
        if matched[idx] {
            continue;
        }
        out.push_str(&input[last..f.start]);
        match f.delim_end {
            Some(end) => {
                let delim = input[f.word_end..end].trim_start();
                if delim != "." {
                    out.push_str(delim);
                }
                last = end;
            }
            None => last = f.word_end,
        }
    }
    out.push_str(&input[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::{balance, balance_environments, balance_left_right};

    #[test]
    fn test_appends_missing_closers() {
        assert_eq!(balance(r"\sqrt{\pi"), r"\sqrt{\pi}");
        assert_eq!(balance(r"\sqrt{\pi + \frac{1}{2"), r"\sqrt{\pi + \frac{1}{2}}");
    }

    #[test]
    fn test_deletes_stray_closers() {
        assert_eq!(balance("a}b{c}}"), "ab{c}");
    }

    #[test]
    fn test_text_content_preserved() {
        assert_eq!(balance(r"x + \text{hello world"), r"x + \text{hello world}");
    }

    #[test]
    fn test_escaped_braces_ignored() {
        assert_eq!(balance(r"\{a\}"), r"\{a\}");
        assert_eq!(balance(r"a\\}"), r"a\\");
        assert_eq!(balance(r"x\"), "x");
    }

    #[test]
    fn test_left_right_pairs() {
        assert_eq!(balance(r"\left( x \right)"), r"\left( x \right)");
        assert_eq!(balance(r"\left( x"), "( x");
        assert_eq!(balance(r"x \right)"), "x )");
        assert_eq!(balance(r"\left. x"), " x");
        assert_eq!(balance(r"\left\langle x"), r"\langle x");
        assert_eq!(balance(r"a \left b"), "a  b");
    }

    #[test]
    fn test_left_right_respects_groups() {
        assert_eq!(
            balance_left_right(r"{\left( a} \right)"),
            "{( a} )"
        );
        assert_eq!(
            balance_left_right(r"\left\{ \frac{a}{b} \right."),
            r"\left\{ \frac{a}{b} \right."
        );
    }

    #[test]
    fn test_environments() {
        assert_eq!(
            balance_environments(r"\begin{aligned} a &= b"),
            r"\begin{aligned} a &= b\end{aligned}"
        );
        assert_eq!(balance_environments(r"a \end{cases}"), "a ");
        assert_eq!(
            balance_environments(r"\begin{cases}\begin{array}{c} x \end{cases}"),
            r"\begin{cases}\begin{array}{c} x \end{array}\end{cases}"
        );
    }
}
