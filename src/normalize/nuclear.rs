//! Nuclear and particle notation canonicalization.
//!
//! Every isotope form is rewritten to `{}^{A}_{Z}\text{X}`: an empty base,
//! the mass number as superscript, the atomic number as subscript and the
//! element in text mode.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::commands::{is_element, is_text_command};
use super::scan::{command_groups, control_word, matching_brace, skip_ws};

lazy_static! {
    static ref BAR_NU: Regex = Regex::new(r"\\bar\s*(?:\{\s*\\nu\s*\}|\\nu)([^a-zA-Z]|$)").unwrap();
    static ref NEUTRINO_TEXT: Regex =
        Regex::new(r"\\text\s*\{\s*(anti-?neutrino|neutrino)\s*\}").unwrap();
    static ref BARE_CHARGE: Regex = Regex::new(r"\^([+-])([^0-9a-zA-Z{]|$)").unwrap();
    static ref NUC_NUMBER: Regex = Regex::new(r"^(?:[0-9]+|[AZN](?:\s*[+-]\s*[0-9]+)?)$").unwrap();
}

/// Commands after which a script has no base of its own.
const NON_BASE_COMMANDS: &[&str] = &[
    "rightarrow", "to", "longrightarrow", "Rightarrow", "Longrightarrow", "leftarrow",
    "longleftarrow", "leftrightarrow", "rightleftharpoons", "implies", "quad", "qquad", "pm",
    "mp", "times", "cdot",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Nuclide {
    mass: String,
    atomic: Option<String>,
    extra: Option<String>,
    element: String,
    excited: bool,
}

impl Nuclide {
    fn render(&self) -> String {
        let mut out = format!("{{}}^{{{}}}", self.mass);
        if let Some(z) = &self.atomic {
            out.push_str(&format!("_{{{}}}", z));
        }
        out.push_str(&format!("\\text{{{}}}", self.element));
        if let Some(x) = &self.extra {
            out.push_str(&format!("_{{{}}}", x));
        }
        if self.excited {
            out.push_str("^{*}");
        }
        out
    }
}

/// Run every nuclear/particle canonicalization in order.
pub fn canonicalize_nuclear(input: &str) -> String {
    let s = rewrite_text_wrapped(input);
    let s = rewrite_bare(&s);
    let s = canonicalize_charges(&s);
    canonicalize_neutrinos(&s)
}

/// `e^-` -> `e^{-}`, `\beta^+` -> `\beta^{+}`.
pub fn canonicalize_charges(input: &str) -> String {
    BARE_CHARGE.replace_all(input, "^{$1}$2").into_owned()
}

/// `\bar{\nu}` and `\text{antineutrino}` -> `\overline{\nu}`.
pub fn canonicalize_neutrinos(input: &str) -> String {
    let s = BAR_NU.replace_all(input, r"\overline{\nu}$1");
    NEUTRINO_TEXT
        .replace_all(&s, |caps: &Captures| {
            if caps[1].starts_with("anti") {
                r"\overline{\nu}".to_string()
            } else {
                r"\nu".to_string()
            }
        })
        .into_owned()
}

// =============================================================================
// \text{...} wrapped forms
// =============================================================================

/// Rewrite `\text{_Z^A X}`, `\text{{Z-2}^{A-4} N'}`, `\text{e^-}` and friends.
pub fn rewrite_text_wrapped(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
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
        if name != "text" || bytes.get(open) != Some(&b'{') {
            i = end;
            continue;
        }
        let Some(close) = matching_brace(bytes, open) else {
            i = end;
            continue;
        };
        let content = input[open + 1..close].trim();
        if let Some(rewritten) = rewrite_text_content(content) {
            out.push_str(&input[last..i]);
            out.push_str(&rewritten);
            last = close + 1;
        }
        i = close + 1;
    }
    out.push_str(&input[last..]);
    out
}

fn rewrite_text_content(content: &str) -> Option<String> {
    if let Some(charge) = electron_charge(content) {
        return Some(format!("e^{{{}}}", charge));
    }
    let (nuclide, end) = parse_nuclide(content, 0, true)?;
    (end == content.len()).then(|| nuclide.render())
}

fn electron_charge(content: &str) -> Option<&'static str> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.as_str() {
        "e^-" | "e^{-}" | "e-" => Some("-"),
        "e^+" | "e^{+}" | "e+" => Some("+"),
        _ => None,
    }
}

// =============================================================================
// Bare forms
// =============================================================================

/// Rewrite isotope forms that appear outside `\text{}`.
pub fn rewrite_bare(input: &str) -> String {
    let bytes = input.as_bytes();
    let text_groups = command_groups(bytes, is_text_command);
    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if text_groups.iter().any(|(o, c)| i > *o && i <= *c) {
            i += 1;
            continue;
        }
        let b = bytes[i];
        if b == b'\\' {
            i += match control_word(bytes, i) {
                Some((_, end)) => end - i,
                None => 2,
            };
            continue;
        }
        let candidate = match b {
            b'{' if bytes.get(i + 1) == Some(&b'}') => true,
            b'{' | b'^' | b'_' => !has_base(bytes, i),
            b'Z' => i == 0 || !is_word_byte(bytes[i - 1]),
            _ => false,
        };
        if candidate {
            if let Some((nuclide, end)) = parse_nuclide(input, i, false) {
                out.push_str(&input[last..i]);
                out.push_str(&nuclide.render());
                last = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&input[last..]);
    out
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'\\' | b'^' | b'_' | b'}')
}

/// Whether a script starting at `i` already has something to attach to.
fn has_base(bytes: &[u8], i: usize) -> bool {
    let Some(j) = bytes[..i].iter().rposition(|b| !b.is_ascii_whitespace()) else {
        return false;
    };
    match bytes[j] {
        b'+' | b'-' | b'=' | b'(' | b'<' | b'>' | b',' | b'&' | b'|' | b'[' | b'{' | b';' => false,
        b if b.is_ascii_alphabetic() => {
            let mut start = j;
            while start > 0 && bytes[start - 1].is_ascii_alphabetic() {
                start -= 1;
            }
            if start > 0 && bytes[start - 1] == b'\\' {
                let name = std::str::from_utf8(&bytes[start..=j]).unwrap_or("");
                !NON_BASE_COMMANDS.contains(&name)
            } else {
                true
            }
        }
        _ => true,
    }
}

// =============================================================================
// Nuclide parser
// =============================================================================

/// Parse one isotope starting at `start`. In text mode the atomic number may
/// be a bare digit run and the element need not be a known symbol.
fn parse_nuclide(s: &str, start: usize, in_text: bool) -> Option<(Nuclide, usize)> {
    let bytes = s.as_bytes();
    let mut p = start;
    let mut pre_sub: Option<String> = None;
    // bare `Z^A N` outside text: `Z^2 N` is a product, not an isotope
    let mut letter_mass_only = false;

    if s[p..].starts_with("{}") {
        p += 2;
    } else if bytes.get(p) == Some(&b'{') {
        let close = matching_brace(bytes, p)?;
        let inner = s[p + 1..close].trim();
        if !NUC_NUMBER.is_match(inner) {
            return None;
        }
        pre_sub = Some(inner.to_string());
        p = close + 1;
    } else if bytes.get(p).map_or(false, |b| b.is_ascii_alphanumeric()) {
        let mut j = p;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || matches!(bytes[j], b'+' | b'-')) {
            j += 1;
        }
        let token = &s[p..j];
        let allowed = NUC_NUMBER.is_match(token) && (in_text || token.starts_with('Z'));
        if !allowed || bytes.get(j) != Some(&b'^') {
            return None;
        }
        pre_sub = Some(token.to_string());
        letter_mass_only = !in_text;
        p = j;
    }

    let mut mass: Option<String> = None;
    let mut subs: Vec<String> = Vec::new();
    loop {
        let q = skip_ws(bytes, p);
        match bytes.get(q) {
            Some(b'^') if mass.is_none() => {
                let (arg, end) = script_arg(s, q + 1)?;
                mass = Some(arg);
                p = end;
                // ^{A}{Z}X: the underscore went missing
                if pre_sub.is_none() && subs.is_empty() && bytes.get(p) == Some(&b'{') {
                    if let Some(close) = matching_brace(bytes, p) {
                        let inner = s[p + 1..close].trim();
                        if !inner.is_empty() && NUC_NUMBER.is_match(inner) {
                            subs.push(inner.to_string());
                            p = close + 1;
                        }
                    }
                }
            }
            Some(b'_') if subs.len() < 2 => {
                let (arg, end) = script_arg(s, q + 1)?;
                subs.push(arg);
                p = end;
            }
            _ => break,
        }
    }
    let mass = mass?;
    let letter_mass = mass.starts_with(|c: char| c.is_ascii_alphabetic());
    if mass.is_empty() || (letter_mass_only && !letter_mass) {
        return None;
    }

    let mut subs = subs.into_iter();
    let atomic = pre_sub.or_else(|| subs.next());
    let extra = subs.next().filter(|x| Some(x) != atomic.as_ref());

    let (element, excited, end) = parse_element(s, p, in_text)?;
    Some((
        Nuclide {
            mass,
            atomic,
            extra,
            element,
            excited,
        },
        end,
    ))
}

/// Argument of `^`/`_` at `i`: a brace group, a digit run or one letter.
fn script_arg(s: &str, i: usize) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    let q = skip_ws(bytes, i);
    match *bytes.get(q)? {
        b'{' => {
            let close = matching_brace(bytes, q)?;
            Some((s[q + 1..close].trim().to_string(), close + 1))
        }
        b if b.is_ascii_digit() => {
            let mut j = q;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            Some((s[q..j].to_string(), j))
        }
        b if b.is_ascii_alphabetic() => Some((s[q..q + 1].to_string(), q + 1)),
        _ => None,
    }
}

/// Element symbol at `i`, optionally wrapped in `\text{}`, with trailing
/// primes kept and a trailing `*` split off as an excitation marker.
fn parse_element(s: &str, i: usize, in_text: bool) -> Option<(String, bool, usize)> {
    let bytes = s.as_bytes();
    let q = skip_ws(bytes, i);
    if let Some((name, end)) = control_word(bytes, q) {
        let open = skip_ws(bytes, end);
        if name != "text" || bytes.get(open) != Some(&b'{') {
            return None;
        }
        let close = matching_brace(bytes, open)?;
        let (element, excited) = element_word(s[open + 1..close].trim(), true)?;
        let mut end = close + 1;
        // \text{X}^{*} already carries its marker
        let excited = excited || s[end..].starts_with("^{*}");
        if s[end..].starts_with("^{*}") {
            end += 4;
        }
        return Some((element, excited, end));
    }

    let mut j = q;
    while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
        j += 1;
    }
    while j < bytes.len() && matches!(bytes[j], b'\'' | b'*') {
        j += 1;
    }
    if j == q {
        return None;
    }
    let (element, excited) = element_word(&s[q..j], in_text)?;
    Some((element, excited, j))
}

fn element_word(word: &str, lenient: bool) -> Option<(String, bool)> {
    let (word, excited) = match word.strip_suffix('*') {
        Some(w) => (w, true),
        None => (word, false),
    };
    let letters = word.trim_end_matches('\'');
    let mut chars = letters.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() || letters.len() > 3 || !chars.all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    if !lenient && !is_element(letters) {
        return None;
    }
    Some((word.to_string(), excited))
}

#[cfg(test)]
mod tests {
    use super::{canonicalize_charges, canonicalize_neutrinos, canonicalize_nuclear, rewrite_bare};

    #[test]
    fn test_text_wrapped_forms() {
        assert_eq!(canonicalize_nuclear(r"\text{_Z^A X}"), r"{}^{A}_{Z}\text{X}");
        assert_eq!(canonicalize_nuclear(r"\text{^A_Z X}"), r"{}^{A}_{Z}\text{X}");
        assert_eq!(
            canonicalize_nuclear(r"\text{{Z-2}^{A-4} N'}"),
            r"{}^{A-4}_{Z-2}\text{N'}"
        );
        assert_eq!(canonicalize_nuclear(r"\text{_2^4 He}"), r"{}^{4}_{2}\text{He}");
        assert_eq!(canonicalize_nuclear(r"\text{{}^{A}N}"), r"{}^{A}\text{N}");
        assert_eq!(canonicalize_nuclear(r"\text{_Z^A \text{X}}"), r"{}^{A}_{Z}\text{X}");
    }

    #[test]
    fn test_bare_forms() {
        assert_eq!(canonicalize_nuclear(r"Z^A N"), r"{}^{A}_{Z}\text{N}");
        assert_eq!(
            canonicalize_nuclear(r"{Z-2}^{A-4} N"),
            r"{}^{A-4}_{Z-2}\text{N}"
        );
        assert_eq!(canonicalize_nuclear(r"_2^4 He"), r"{}^{4}_{2}\text{He}");
        assert_eq!(
            canonicalize_nuclear(r"\rightarrow ^{A}_{Z}\text{N}"),
            r"\rightarrow {}^{A}_{Z}\text{N}"
        );
        assert_eq!(canonicalize_nuclear(r"{}^{4}_{2}He"), r"{}^{4}_{2}\text{He}");
    }

    #[test]
    fn test_bare_product_with_numeric_power_untouched() {
        assert_eq!(canonicalize_nuclear(r"\frac{Z^2 N}{A}"), r"\frac{Z^2 N}{A}");
        assert_eq!(
            canonicalize_nuclear(r"\sigma \propto Z^2 N"),
            r"\sigma \propto Z^2 N"
        );
        assert_eq!(canonicalize_nuclear(r"Z^{12} C"), r"Z^{12} C");
        assert_eq!(canonicalize_nuclear(r"Z^{A-4} N"), r"{}^{A-4}_{Z}\text{N}");
        assert_eq!(canonicalize_nuclear(r"\text{Z^{4} He}"), r"{}^{4}_{Z}\text{He}");
    }

    #[test]
    fn test_scripts_with_base_untouched() {
        assert_eq!(rewrite_bare(r"x^{2}_{1} N"), r"x^{2}_{1} N");
        assert_eq!(rewrite_bare(r"e^{-x^2}"), r"e^{-x^2}");
        assert_eq!(rewrite_bare(r"2^3 N"), r"2^3 N");
    }

    #[test]
    fn test_missing_underscore_and_stacked_subscripts() {
        assert_eq!(canonicalize_nuclear(r"^{A}{Z}\text{N}"), r"{}^{A}_{Z}\text{N}");
        assert_eq!(
            canonicalize_nuclear(r"{}^{A}_{Z}_{Z}\text{N}"),
            r"{}^{A}_{Z}\text{N}"
        );
        assert_eq!(
            canonicalize_nuclear(r"{}^{A}_{Z}_{x}\text{N}"),
            r"{}^{A}_{Z}\text{N}_{x}"
        );
    }

    #[test]
    fn test_excited_state() {
        assert_eq!(canonicalize_nuclear(r"\text{_Z^A X*}"), r"{}^{A}_{Z}\text{X}^{*}");
    }

    #[test]
    fn test_particles() {
        assert_eq!(canonicalize_nuclear(r"\text{e^-}"), r"e^{-}");
        assert_eq!(canonicalize_charges(r"e^- + e^+"), r"e^{-} + e^{+}");
        assert_eq!(canonicalize_charges(r"e^{-1}"), r"e^{-1}");
        assert_eq!(canonicalize_neutrinos(r"\bar{\nu}_e"), r"\overline{\nu}_e");
        assert_eq!(canonicalize_neutrinos(r"+ \bar\nu"), r"+ \overline{\nu}");
        assert_eq!(canonicalize_neutrinos(r"\text{antineutrino}"), r"\overline{\nu}");
        assert_eq!(canonicalize_neutrinos(r"\text{neutrino}"), r"\nu");
    }

    #[test]
    fn test_canonical_form_is_stable() {
        let canonical = r"{}^{A}\text{N} \rightarrow {}^{A}_{Z+1}\text{N'} + e^{-} + \overline{\nu}";
        assert_eq!(canonicalize_nuclear(canonical), canonical);
    }
}
