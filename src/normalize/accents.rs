//! Text-mode accent to math-mode accent conversion.

use super::commands::is_text_command;
use super::scan::{command_groups, control_word, matching_brace};

fn math_accent(symbol: u8) -> Option<&'static str> {
    Some(match symbol {
        b'\'' => "acute",
        b'`' => "grave",
        b'^' => "hat",
        b'~' => "tilde",
        b'=' => "bar",
        b'.' => "dot",
        b'"' => "ddot",
        b'u' => "breve",
        b'v' => "check",
        _ => return None,
    })
}

/// `\'{e}` -> `\acute{e}`, `\"o` -> `\ddot{o}`, also for double-escaped
/// `\\'{e}`. Text-mode groups keep their accents.
pub fn convert_accents(input: &str) -> String {
    let bytes = input.as_bytes();
    let text_groups = command_groups(bytes, is_text_command);
    let mut out = String::with_capacity(input.len() + 16);
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if let Some(&(_, close)) = text_groups.iter().find(|(o, _)| *o == i) {
            i = close + 1;
            continue;
        }
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        // \\' is a double-escaped accent, \\\ is a row break before a command
        let (prefix, at) = if bytes.get(i + 1) == Some(&b'\\') {
            match bytes.get(i + 2) {
                Some(b) if math_accent(*b).is_some() => (2, i + 2),
                _ => {
                    i += 2;
                    continue;
                }
            }
        } else {
            (1, i + 1)
        };
        let Some(&symbol) = bytes.get(at) else {
            break;
        };
        let Some(accent) = math_accent(symbol) else {
            i = match control_word(bytes, i + prefix - 1) {
                Some((_, end)) => end,
                None => i + prefix + 1,
            };
            continue;
        };
        if symbol.is_ascii_alphabetic() {
            // \u and \v only count when they are the whole control word
            let word_len = control_word(bytes, at - 1).map_or(0, |(w, _)| w.len());
            if word_len != 1 || bytes.get(at + 1) != Some(&b'{') {
                i = at + word_len.max(1);
                continue;
            }
        }

        let arg_start = at + 1;
        let (arg, arg_end) = match bytes.get(arg_start) {
            Some(b'{') => match matching_brace(bytes, arg_start) {
                Some(close) => (input[arg_start..=close].to_string(), close + 1),
                None => {
                    i = arg_start;
                    continue;
                }
            },
            Some(b) if b.is_ascii_alphabetic() => {
                (format!("{{{}}}", *b as char), arg_start + 1)
            }
            _ => {
                i = arg_start;
                continue;
            }
        };
        out.push_str(&input[last..i]);
        out.push('\\');
        out.push_str(accent);
        out.push_str(&dotless(&arg));
        last = arg_end;
        i = arg_end;
    }
    out.push_str(&input[last..]);
    out
}

fn dotless(arg: &str) -> String {
    match arg {
        "{\\i}" => "{\\imath}".to_string(),
        "{\\j}" => "{\\jmath}".to_string(),
        _ => arg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::convert_accents;

    #[test]
    fn test_symbol_accents() {
        assert_eq!(convert_accents(r"\'{e}"), r"\acute{e}");
        assert_eq!(convert_accents(r"\~{n} + \^{x}"), r"\tilde{n} + \hat{x}");
        assert_eq!(convert_accents(r"\={a}\.{b}\`{c}"), r"\bar{a}\dot{b}\grave{c}");
        assert_eq!(convert_accents(r#"\"{o}"#), r"\ddot{o}");
    }

    #[test]
    fn test_letter_accents() {
        assert_eq!(convert_accents(r"\u{a} \v{c}"), r"\breve{a} \check{c}");
        assert_eq!(convert_accents(r"\vec{v} \upsilon"), r"\vec{v} \upsilon");
    }

    #[test]
    fn test_double_escaped_and_braceless() {
        assert_eq!(convert_accents(r"\\'{e}"), r"\acute{e}");
        assert_eq!(convert_accents(r"\'e"), r"\acute{e}");
        assert_eq!(convert_accents(r"\'{\i}"), r"\acute{\imath}");
    }

    #[test]
    fn test_spacing_and_text_untouched() {
        assert_eq!(convert_accents(r"a\,b\;c"), r"a\,b\;c");
        assert_eq!(convert_accents(r#"\text{na\"ive}"#), r#"\text{na\"ive}"#);
        assert_eq!(convert_accents(r"a \\ b"), r"a \\ b");
    }
}
