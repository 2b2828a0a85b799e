//! Unicode math symbol substitution.

use phf::phf_map;

use super::commands::is_text_command;
use super::scan::command_groups;

static SYMBOL_MAP: phf::Map<char, &'static str> = phf_map! {
    // lowercase greek
    'α' => "\\alpha", 'β' => "\\beta", 'γ' => "\\gamma", 'δ' => "\\delta",
    'ε' => "\\epsilon", 'ϵ' => "\\epsilon", 'ζ' => "\\zeta", 'η' => "\\eta",
    'θ' => "\\theta", 'ϑ' => "\\vartheta", 'ι' => "\\iota", 'κ' => "\\kappa",
    'λ' => "\\lambda", 'μ' => "\\mu", 'µ' => "\\mu", 'ν' => "\\nu", 'ξ' => "\\xi",
    'π' => "\\pi", 'ϖ' => "\\varpi", 'ρ' => "\\rho", 'ϱ' => "\\varrho",
    'σ' => "\\sigma", 'ς' => "\\varsigma", 'τ' => "\\tau", 'υ' => "\\upsilon",
    'φ' => "\\varphi", 'ϕ' => "\\phi", 'χ' => "\\chi", 'ψ' => "\\psi", 'ω' => "\\omega",
    // uppercase greek
    'Γ' => "\\Gamma", 'Δ' => "\\Delta", 'Θ' => "\\Theta", 'Λ' => "\\Lambda",
    'Ξ' => "\\Xi", 'Π' => "\\Pi", 'Σ' => "\\Sigma", 'Υ' => "\\Upsilon",
    'Φ' => "\\Phi", 'Ψ' => "\\Psi", 'Ω' => "\\Omega",
    // operators and relations
    '×' => "\\times", '÷' => "\\div", '±' => "\\pm", '∓' => "\\mp", '·' => "\\cdot",
    '⋅' => "\\cdot", '∗' => "\\ast", '−' => "-", '–' => "-", '≤' => "\\leq",
    '≥' => "\\geq", '≠' => "\\neq", '≈' => "\\approx", '≡' => "\\equiv",
    '∼' => "\\sim", '≃' => "\\simeq", '≅' => "\\cong", '∝' => "\\propto",
    '≪' => "\\ll", '≫' => "\\gg", '∈' => "\\in", '∉' => "\\notin", '∋' => "\\ni",
    '⊂' => "\\subset", '⊃' => "\\supset", '⊆' => "\\subseteq", '⊇' => "\\supseteq",
    '∪' => "\\cup", '∩' => "\\cap", '∧' => "\\wedge", '∨' => "\\vee", '¬' => "\\neg",
    '⊕' => "\\oplus", '⊗' => "\\otimes", '∘' => "\\circ", '•' => "\\bullet",
    '⊥' => "\\perp", '∥' => "\\parallel", '∣' => "\\mid",
    // big operators and calculus
    '∑' => "\\sum", '∏' => "\\prod", '∫' => "\\int", '∬' => "\\iint",
    '∭' => "\\iiint", '∮' => "\\oint", '√' => "\\sqrt", '∂' => "\\partial",
    '∇' => "\\nabla", '∞' => "\\infty",
    // logic and sets
    '∀' => "\\forall", '∃' => "\\exists", '∄' => "\\nexists", '∅' => "\\emptyset",
    '∴' => "\\therefore", '∵' => "\\because", '∠' => "\\angle",
    'ℝ' => "\\mathbb{R}", 'ℕ' => "\\mathbb{N}", 'ℤ' => "\\mathbb{Z}",
    'ℚ' => "\\mathbb{Q}", 'ℂ' => "\\mathbb{C}", 'ℏ' => "\\hbar", 'ℓ' => "\\ell",
    'ℵ' => "\\aleph",
    // arrows
    '→' => "\\rightarrow", '←' => "\\leftarrow", '↔' => "\\leftrightarrow",
    '⇒' => "\\Rightarrow", '⇐' => "\\Leftarrow", '⇔' => "\\Leftrightarrow",
    '↑' => "\\uparrow", '↓' => "\\downarrow", '↦' => "\\mapsto",
    '⟶' => "\\longrightarrow", '⟵' => "\\longleftarrow", '⇌' => "\\rightleftharpoons",
    // delimiters and dots
    '⟨' => "\\langle", '⟩' => "\\rangle", '⌊' => "\\lfloor", '⌋' => "\\rfloor",
    '⌈' => "\\lceil", '⌉' => "\\rceil", '…' => "\\ldots", '⋯' => "\\cdots",
    '⋮' => "\\vdots", '⋱' => "\\ddots", '′' => "'", '″' => "''",
    // vulgar fractions
    '½' => "\\frac{1}{2}", '⅓' => "\\frac{1}{3}", '⅔' => "\\frac{2}{3}",
    '¼' => "\\frac{1}{4}", '¾' => "\\frac{3}{4}", '⅕' => "\\frac{1}{5}",
    '⅖' => "\\frac{2}{5}", '⅗' => "\\frac{3}{5}", '⅘' => "\\frac{4}{5}",
    '⅙' => "\\frac{1}{6}", '⅚' => "\\frac{5}{6}", '⅛' => "\\frac{1}{8}",
    '⅜' => "\\frac{3}{8}", '⅝' => "\\frac{5}{8}", '⅞' => "\\frac{7}{8}",
    // misc
    '°' => "^{\\circ}", '\u{a0}' => " ", '\u{2009}' => "\\,", '\u{200b}' => "",
};

static SUPERSCRIPTS: phf::Map<char, char> = phf_map! {
    '⁰' => '0', '¹' => '1', '²' => '2', '³' => '3', '⁴' => '4', '⁵' => '5',
    '⁶' => '6', '⁷' => '7', '⁸' => '8', '⁹' => '9', '⁺' => '+', '⁻' => '-',
    'ⁿ' => 'n', 'ⁱ' => 'i',
};

static SUBSCRIPTS: phf::Map<char, char> = phf_map! {
    '₀' => '0', '₁' => '1', '₂' => '2', '₃' => '3', '₄' => '4', '₅' => '5',
    '₆' => '6', '₇' => '7', '₈' => '8', '₉' => '9', '₊' => '+', '₋' => '-',
    'ₙ' => 'n', 'ᵢ' => 'i',
};

/// Map Unicode math characters to commands and wrap whatever is left in
/// `\text{}`. Text-mode groups are left alone.
pub fn substitute_unicode(input: &str) -> String {
    if input.is_ascii() {
        return input.to_string();
    }
    let text_groups = command_groups(input.as_bytes(), is_text_command);
    let in_text = |pos: usize| text_groups.iter().any(|(o, c)| pos > *o && pos < *c);

    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        if ch.is_ascii() || in_text(pos) {
            if ch.is_ascii_alphabetic() && ends_with_control_word(&out) && !in_text(pos) {
                out.push(' ');
            }
            out.push(ch);
            continue;
        }

        if let Some(script) = collect_script(ch, &mut chars) {
            out.push_str(&script);
            continue;
        }

        if let Some(rep) = SYMBOL_MAP.get(&ch) {
            out.push_str(rep);
            continue;
        }

        let mut run = String::new();
        run.push(ch);
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii() || SYMBOL_MAP.contains_key(&next) || SUPERSCRIPTS.contains_key(&next)
                || SUBSCRIPTS.contains_key(&next)
            {
                break;
            }
            run.push(next);
            chars.next();
        }
        out.push_str("\\text{");
        out.push_str(&run);
        out.push('}');
    }
    out
}

/// Merge a run of super- or subscript characters into one script group.
fn collect_script(
    first: char,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Option<String> {
    let (table, op) = if SUPERSCRIPTS.contains_key(&first) {
        (&SUPERSCRIPTS, '^')
    } else if SUBSCRIPTS.contains_key(&first) {
        (&SUBSCRIPTS, '_')
    } else {
        return None;
    };
    let mut body = String::new();
    body.push(*table.get(&first)?);
    while let Some(&(_, next)) = chars.peek() {
        match table.get(&next) {
            Some(c) => {
                body.push(*c);
                chars.next();
            }
            None => break,
        }
    }
    Some(format!("{}{{{}}}", op, body))
}

fn ends_with_control_word(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut j = bytes.len();
    while j > 0 && bytes[j - 1].is_ascii_alphabetic() {
        j -= 1;
    }
    j < bytes.len() && j > 0 && bytes[j - 1] == b'\\'
}
