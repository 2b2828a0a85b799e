//! Byte-level scanning helpers shared by the normalizer passes.
//!
//! All positions are byte offsets into UTF-8 strings. Every helper only ever
//! stops on ASCII bytes, so returned offsets are always on char boundaries.

/// Whether the byte at `i` is preceded by an odd number of backslashes.
pub fn is_escaped(bytes: &[u8], i: usize) -> bool {
    let mut n = 0usize;
    let mut j = i;
    while j > 0 && bytes[j - 1] == b'\\' {
        n += 1;
        j -= 1;
    }
    n % 2 == 1
}

/// Read the control word starting at the backslash at `i`.
///
/// Returns the command name (letters only, without the backslash) and the
/// offset just past it. Control symbols like `\{` are not words.
pub fn control_word(bytes: &[u8], i: usize) -> Option<(&str, usize)> {
    if bytes.get(i) != Some(&b'\\') {
        return None;
    }
    let start = i + 1;
    let mut j = start;
    while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
        j += 1;
    }
    if j == start {
        return None;
    }
    std::str::from_utf8(&bytes[start..j]).ok().map(|s| (s, j))
}

/// Offset of the `}` matching the `{` at `open`, ignoring escaped braces.
pub fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset of the `{` matching the `}` at `close`, scanning backwards.
pub fn matching_open_brace(bytes: &[u8], close: usize) -> Option<usize> {
    if bytes.get(close) != Some(&b'}') {
        return None;
    }
    let mut depth = 0i32;
    let mut i = close as isize;
    while i >= 0 {
        let idx = i as usize;
        if !is_escaped(bytes, idx) {
            match bytes[idx] {
                b'}' => depth += 1,
                b'{' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        i -= 1;
    }
    None
}

pub fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// End of a single TeX argument token starting at `i`: a brace group, a
/// control sequence, or one (possibly multi-byte) character.
pub fn token_end(bytes: &[u8], i: usize) -> Option<usize> {
    let b = *bytes.get(i)?;
    match b {
        b'{' => matching_brace(bytes, i).map(|c| c + 1),
        b'\\' => match control_word(bytes, i) {
            Some((_, end)) => Some(end),
            None if i + 1 < bytes.len() => Some(i + 1 + utf8_len(bytes[i + 1])),
            None => None,
        },
        b'}' | b'^' | b'_' | b'&' => None,
        _ => Some(i + utf8_len(b)),
    }
}

pub fn utf8_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xff => 4,
        _ => 1,
    }
}

/// Byte ranges `(open, close)` of every `\name{...}` group whose command
/// satisfies `is_text`, including the braces.
pub fn command_groups(bytes: &[u8], is_text: impl Fn(&str) -> bool) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Some((name, end)) = control_word(bytes, i) {
                let open = skip_ws(bytes, end);
                if is_text(name) && bytes.get(open) == Some(&b'{') {
                    if let Some(close) = matching_brace(bytes, open) {
                        out.push((open, close));
                        i = close + 1;
                        continue;
                    }
                }
                i = end;
                continue;
            }
            i += 2;
            continue;
        }
        i += 1;
    }
    out
}

/// Whether `pos` lies inside one of the `(open, close)` ranges.
pub fn within(ranges: &[(usize, usize)], pos: usize) -> bool {
    ranges.iter().any(|(o, c)| pos > *o && pos < *c)
}

/// Rebuild a string from bytes, falling back to `input` if the buffer is not
/// valid UTF-8.
pub fn finish(out: Vec<u8>, input: &str) -> String {
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::{command_groups, control_word, is_escaped, matching_brace, token_end};

    #[test]
    fn test_matching_brace_skips_escapes() {
        let s = br"{a\}b{c}}d";
        assert_eq!(matching_brace(s, 0), Some(8));
        assert_eq!(matching_brace(b"{a", 0), None);
    }

    #[test]
    fn test_control_word() {
        assert_eq!(control_word(br"\frac{1}", 0), Some(("frac", 5)));
        assert_eq!(control_word(br"\{", 0), None);
        assert!(is_escaped(br"a\{", 2));
        assert!(!is_escaped(br"a\\{", 3));
    }

    #[test]
    fn test_token_end() {
        assert_eq!(token_end(br"\pi x", 0), Some(3));
        assert_eq!(token_end(b"{ab}c", 0), Some(4));
        assert_eq!(token_end(b"x", 0), Some(1));
        assert_eq!(token_end(b"^2", 0), None);
        assert_eq!(token_end("é".as_bytes(), 0), Some(2));
    }

    #[test]
    fn test_command_groups() {
        let s = br"a\text{x{y}}b\mathrm {z}";
        assert_eq!(command_groups(s, |n| n == "text"), vec![(6, 11)]);
    }
}
