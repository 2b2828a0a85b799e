//! Derivative notation.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::commands::is_text_command;
use super::scan::{command_groups, within};

lazy_static! {
    static ref LEIBNIZ: Regex = Regex::new(
        r"\\frac\s*\{\s*d(\^\{?[0-9]+\}?)?\s*([a-zA-Z])?\s*\}\s*\{\s*d\s*([a-zA-Z])(\^\{?[0-9]+\}?)?\s*\}"
    )
    .unwrap();
}

pub fn normalize_derivatives(input: &str) -> String {
    let s = leibniz_fractions(input);
    upright_differentials(&s)
}

/// `\frac{d}{dx}` -> `{\frac{\mathrm{d}}{\mathrm{d}x}}`.
pub fn leibniz_fractions(input: &str) -> String {
    LEIBNIZ
        .replace_all(input, |caps: &Captures| {
            let order = caps.get(1).map_or("", |m| m.as_str());
            let func = caps.get(2).map_or("", |m| m.as_str());
            let var = &caps[3];
            let var_order = caps.get(4).map_or("", |m| m.as_str());
            format!(
                "{{\\frac{{\\mathrm{{d}}{}{}}}{{\\mathrm{{d}}{}{}}}}}",
                order, func, var, var_order
            )
        })
        .into_owned()
}

/// Bare `dx`, `dy`, `dz`, `dt` -> `\mathrm{d}x` unless used as a function call.
pub fn upright_differentials(input: &str) -> String {
    let bytes = input.as_bytes();
    let text_groups = command_groups(bytes, is_text_command);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 16);
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            // copy the whole control word so `\dx`-like names are left alone
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
                j += 1;
            }
            let j = if j == i + 1 { (i + 2).min(bytes.len()) } else { j };
            out.extend_from_slice(&bytes[i..j]);
            i = j;
            continue;
        }
        let is_differential = bytes[i] == b'd'
            && matches!(bytes.get(i + 1), Some(b'x' | b'y' | b'z' | b't'))
            && (i == 0 || !bytes[i - 1].is_ascii_alphabetic())
            && !matches!(bytes.get(i + 2), Some(b) if b.is_ascii_alphabetic() || *b == b'(')
            && !within(&text_groups, i);
        if is_differential {
            out.extend_from_slice(b"\\mathrm{d}");
            out.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::{leibniz_fractions, normalize_derivatives, upright_differentials};

    #[test]
    fn test_leibniz() {
        assert_eq!(
            leibniz_fractions(r"\frac{d}{dx} f"),
            r"{\frac{\mathrm{d}}{\mathrm{d}x}} f"
        );
        assert_eq!(
            leibniz_fractions(r"\frac{dy}{dx}"),
            r"{\frac{\mathrm{d}y}{\mathrm{d}x}}"
        );
        assert_eq!(
            leibniz_fractions(r"\frac{d^2y}{dx^2}"),
            r"{\frac{\mathrm{d}^2y}{\mathrm{d}x^2}}"
        );
    }

    #[test]
    fn test_differentials() {
        assert_eq!(upright_differentials(r"\int f dx"), r"\int f \mathrm{d}x");
        assert_eq!(upright_differentials("dx(t)"), "dx(t)");
        assert_eq!(upright_differentials("index"), "index");
        assert_eq!(upright_differentials(r"\text{dx}"), r"\text{dx}");
    }

    #[test]
    fn test_already_normalized_is_stable() {
        let s = r"{\frac{\mathrm{d}}{\mathrm{d}x}} \int \mathrm{d}t";
        assert_eq!(normalize_derivatives(s), s);
    }
}
