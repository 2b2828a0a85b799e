//! Fraction command repair.

use super::commands::{arity, is_text_command};
use super::scan::{command_groups, control_word, finish, matching_brace, skip_ws, token_end, within};

const FRACTIONS: &[&str] = &["frac", "dfrac", "tfrac", "cfrac"];

/// Repair `\frac` typos and missing argument braces.
pub fn repair_fractions(input: &str) -> String {
    let renamed = fix_rac_typos(input);
    repair_frac_args(&renamed)
}

/// Restore `\frac` written as `rac`, `frac` or `\rac`.
pub fn fix_rac_typos(input: &str) -> String {
    let bytes = input.as_bytes();
    if !input.contains("rac") {
        return input.to_string();
    }
    let text_groups = command_groups(bytes, is_text_command);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 8);
    let mut i = 0usize;

    while i < bytes.len() {
        if !bytes[i..].starts_with(b"rac") || within(&text_groups, i) {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next_is_letter = bytes.get(i + 3).map_or(false, |b| b.is_ascii_alphabetic());
        let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
        let prev2 = if i > 1 { Some(bytes[i - 2]) } else { None };

        let rewrite = !next_is_letter
            && match prev {
                None => true,
                Some(b'\\') => true,
                Some(b'f') => !matches!(prev2, Some(b) if b == b'\\' || b.is_ascii_alphabetic()),
                Some(b) => !b.is_ascii_alphabetic(),
            };
        if !rewrite {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        match prev {
            Some(b'f') => {
                out.pop();
            }
            Some(b'\\') => {
                out.pop();
            }
            _ => {}
        }
        out.extend_from_slice(b"\\frac");
        i += 3;
    }

    finish(out, input)
}

/// Brace every fraction argument, filling a missing one with `{}`.
pub fn repair_frac_args(input: &str) -> String {
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
        if !FRACTIONS.contains(&name) {
            i = end;
            continue;
        }
        out.push_str(&input[last..end]);
        let (num, den, consumed) = parse_frac_args(input, end);
        out.push('{');
        out.push_str(&repair_frac_args(&num));
        out.push_str("}{");
        out.push_str(&repair_frac_args(&den));
        out.push('}');
        last = consumed;
        i = consumed;
    }
    out.push_str(&input[last.min(input.len())..]);
    out
}

fn parse_frac_args(s: &str, pos: usize) -> (String, String, usize) {
    let bytes = s.as_bytes();

    // \frac27 -> {2}{7}
    if bytes.get(pos).map_or(false, u8::is_ascii_digit)
        && bytes.get(pos + 1).map_or(false, u8::is_ascii_digit)
    {
        let mut j = pos + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        return (s[pos..pos + 1].to_string(), s[pos + 1..j].to_string(), j);
    }

    let (num, after_num) = parse_arg(s, pos);
    let (num, den, end) = match num {
        Some(num) => {
            let (den, after_den) = parse_arg(s, after_num);
            match den {
                Some(den) => (num, den, after_den),
                None => match split_scripted_numerator(&num) {
                    Some((n, d)) => (n, d, after_num),
                    None => (num, String::new(), after_num),
                },
            }
        }
        None => (String::new(), String::new(), after_num),
    };
    (num, den, end)
}

/// Parse one argument at `pos`. `None` means the argument is missing.
fn parse_arg(s: &str, pos: usize) -> (Option<String>, usize) {
    let bytes = s.as_bytes();
    let q = skip_ws(bytes, pos);
    match bytes.get(q) {
        None | Some(b'}') | Some(b'&') | Some(b'^') | Some(b'_') | Some(b'$') => (None, pos),
        Some(b'{') => match matching_brace(bytes, q) {
            Some(c) => (Some(unwrap_double(&s[q + 1..c]).to_string()), c + 1),
            None => (Some(s[q + 1..].to_string()), s.len()),
        },
        Some(b'\\') => {
            if s[q..].starts_with("\\\\") {
                return (None, pos);
            }
            let end = match control_word(bytes, q) {
                Some((name, end)) => command_end(bytes, end, arity(name)),
                None => match token_end(bytes, q) {
                    Some(e) => e,
                    None => return (None, pos),
                },
            };
            (Some(s[q..end].to_string()), end)
        }
        Some(_) => match token_end(bytes, q) {
            Some(e) => (Some(s[q..e].to_string()), e),
            None => (None, pos),
        },
    }
}

/// Extend a command token over its optional `[..]` and `n` brace groups.
fn command_end(bytes: &[u8], mut end: usize, n: usize) -> usize {
    if n > 0 && bytes.get(end) == Some(&b'[') {
        if let Some(close) = bytes[end..].iter().position(|b| *b == b']') {
            end += close + 1;
        }
    }
    for _ in 0..n {
        let q = skip_ws(bytes, end);
        match bytes.get(q) {
            Some(b'{') => match matching_brace(bytes, q) {
                Some(c) => end = c + 1,
                None => break,
            },
            _ => break,
        }
    }
    end
}

fn unwrap_double(content: &str) -> &str {
    let bytes = content.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'{' && matching_brace(bytes, 0) == Some(bytes.len() - 1) {
        &content[1..content.len() - 1]
    } else {
        content
    }
}

/// `\pi^{2}{6}` is a numerator that swallowed its denominator: split it
/// after the script group.
fn split_scripted_numerator(num: &str) -> Option<(String, String)> {
    let bytes = num.as_bytes();
    let mut depth = 0i32;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'^' | b'_' if depth == 0 => {
                let open = skip_ws(bytes, i + 1);
                if bytes.get(open) == Some(&b'{') {
                    let close = matching_brace(bytes, open)?;
                    let rest = skip_ws(bytes, close + 1);
                    if bytes.get(rest) == Some(&b'{') {
                        let den = unwrap_double(num[rest..].trim_end());
                        return Some((num[..close + 1].to_string(), den.to_string()));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
