//! Static command tables shared by the normalizer passes and the lint renderer.

use phf::{phf_map, phf_set};

/// Number of mandatory brace arguments for commands that take them.
pub static COMMAND_ARITY: phf::Map<&'static str, u8> = phf_map! {
    "frac" => 2, "dfrac" => 2, "tfrac" => 2, "cfrac" => 2, "binom" => 2,
    "dbinom" => 2, "tbinom" => 2, "stackrel" => 2, "overset" => 2, "underset" => 2,
    "sqrt" => 1, "text" => 1, "mathrm" => 1, "mathbf" => 1, "mathit" => 1,
    "mathcal" => 1, "mathbb" => 1, "mathsf" => 1, "mathtt" => 1, "mathfrak" => 1,
    "boldsymbol" => 1, "operatorname" => 1, "textrm" => 1, "textbf" => 1,
    "textit" => 1, "textsf" => 1, "texttt" => 1, "mbox" => 1,
    "overline" => 1, "underline" => 1, "overbrace" => 1, "underbrace" => 1,
    "hat" => 1, "widehat" => 1, "bar" => 1, "vec" => 1, "dot" => 1, "ddot" => 1,
    "tilde" => 1, "widetilde" => 1, "acute" => 1, "grave" => 1, "breve" => 1,
    "check" => 1, "overrightarrow" => 1, "overleftarrow" => 1, "pmb" => 1,
    "begin" => 1, "end" => 1, "color" => 1, "phantom" => 1, "boxed" => 1,
};

/// Commands whose argument is typeset in text mode.
pub static TEXT_COMMANDS: phf::Set<&'static str> = phf_set! {
    "text", "textrm", "textbf", "textit", "textsf", "texttt", "mbox",
    "mathrm", "operatorname",
};

/// Environments the renderer accepts.
pub static ENVIRONMENTS: phf::Set<&'static str> = phf_set! {
    "aligned", "alignedat", "gathered", "array", "matrix", "pmatrix", "bmatrix",
    "Bmatrix", "vmatrix", "Vmatrix", "smallmatrix", "cases", "rcases", "split",
    "align", "align*", "equation", "equation*", "gather", "gather*", "multline",
    "multline*", "darray", "subarray", "CD",
};

/// Environments that only make sense in display mode.
pub static DISPLAY_ENVIRONMENTS: phf::Set<&'static str> = phf_set! {
    "align", "align*", "equation", "equation*", "gather", "gather*", "multline",
    "multline*", "eqnarray", "eqnarray*",
};

/// Environments whose rows are separated by `&` cells.
pub static ALIGNMENT_ENVIRONMENTS: phf::Set<&'static str> = phf_set! {
    "aligned", "alignedat", "array", "matrix", "pmatrix", "bmatrix", "Bmatrix",
    "vmatrix", "Vmatrix", "smallmatrix", "cases", "rcases", "split", "align",
    "align*", "darray", "subarray", "eqnarray", "eqnarray*", "CD",
};

/// Zero-argument symbols and operators.
pub static SYMBOLS: phf::Set<&'static str> = phf_set! {
    // greek
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta",
    "theta", "vartheta", "iota", "kappa", "lambda", "mu", "nu", "xi", "pi",
    "varpi", "rho", "varrho", "sigma", "varsigma", "tau", "upsilon", "phi",
    "varphi", "chi", "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi",
    "Pi", "Sigma", "Upsilon", "Phi", "Psi", "Omega", "digamma", "varkappa",
    // relations
    "leq", "le", "geq", "ge", "neq", "ne", "approx", "equiv", "sim", "simeq",
    "cong", "propto", "ll", "gg", "subset", "supset", "subseteq", "supseteq",
    "in", "notin", "ni", "perp", "parallel", "mid", "nmid", "prec", "succ",
    "preceq", "succeq", "models", "vdash", "dashv", "asymp", "doteq", "leqslant",
    "geqslant", "lesssim", "gtrsim", "coloneqq",
    // operators
    "pm", "mp", "times", "div", "cdot", "ast", "star", "circ", "bullet", "oplus",
    "ominus", "otimes", "oslash", "odot", "cup", "cap", "wedge", "vee", "land",
    "lor", "lnot", "neg", "setminus", "sqcup", "sqcap", "uplus", "amalg", "dagger",
    "ddagger", "wr",
    // big operators
    "sum", "prod", "coprod", "int", "iint", "iiint", "oint", "bigcup", "bigcap",
    "bigoplus", "bigotimes", "bigvee", "bigwedge", "bigsqcup",
    // arrows
    "to", "gets", "rightarrow", "leftarrow", "Rightarrow", "Leftarrow",
    "leftrightarrow", "Leftrightarrow", "longrightarrow", "longleftarrow",
    "Longrightarrow", "Longleftarrow", "longleftrightarrow", "Longleftrightarrow",
    "mapsto", "longmapsto", "uparrow", "downarrow", "Uparrow", "Downarrow",
    "updownarrow", "nearrow", "searrow", "swarrow", "nwarrow", "rightleftharpoons",
    "leftrightharpoons", "hookrightarrow", "hookleftarrow", "implies", "iff",
    "impliedby", "xrightarrow", "xleftarrow",
    // misc
    "infty", "partial", "nabla", "forall", "exists", "nexists", "emptyset",
    "varnothing", "ell", "hbar", "hslash", "Re", "Im", "aleph", "wp", "angle",
    "triangle", "prime", "cdots", "ldots", "vdots", "ddots", "dots",
    "dotsb", "dotsc", "surd", "top", "bot", "flat", "sharp", "natural", "clubsuit",
    "diamondsuit", "heartsuit", "spadesuit", "checkmark", "therefore", "because",
    "square", "blacksquare", "Box", "diamond", "lozenge", "imath", "jmath",
    // functions
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan",
    "sinh", "cosh", "tanh", "coth", "log", "ln", "lg", "exp", "lim", "liminf",
    "limsup", "sup", "inf", "max", "min", "arg", "det", "dim", "gcd", "hom",
    "ker", "deg", "Pr",
    // delimiters
    "left", "right", "big", "Big", "bigg", "Bigg", "bigl", "bigr", "Bigl", "Bigr",
    "biggl", "biggr", "middle", "langle", "rangle", "lfloor", "rfloor", "lceil",
    "rceil", "lvert", "rvert", "lVert", "rVert", "vert", "Vert", "backslash",
    // spacing and layout
    "quad", "qquad", "displaystyle", "textstyle", "scriptstyle", "limits",
    "nolimits", "cr", "newline", "hline", "not", "nonumber", "notag",
    "mathstrut", "over", "choose",
};

/// Every command name the renderer understands.
pub fn is_known_command(name: &str) -> bool {
    COMMAND_ARITY.contains_key(name) || SYMBOLS.contains(name)
}

pub fn arity(name: &str) -> usize {
    COMMAND_ARITY.get(name).copied().unwrap_or(0) as usize
}

pub fn is_text_command(name: &str) -> bool {
    TEXT_COMMANDS.contains(name)
}

/// Chemical element symbols, plus the placeholder letters textbook decay
/// equations use for an unspecified nucleus.
pub fn is_element(s: &str) -> bool {
    ELEMENTS.contains(s)
}

static ELEMENTS: phf::Set<&'static str> = phf_set! {
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si",
    "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni",
    "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb",
    "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe",
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho",
    "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np",
    "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg",
    "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
    // generic placeholders used in textbook decay equations
    "X", "Z", "A",
};

#[cfg(test)]
mod tests {
    use super::{arity, is_element, is_known_command, is_text_command};

    #[test]
    fn test_tables() {
        assert_eq!(arity("frac"), 2);
        assert_eq!(arity("alpha"), 0);
        assert!(is_known_command("rightarrow"));
        assert!(!is_known_command("invalidcommand"));
        assert!(is_text_command("text"));
        assert!(is_element("He"));
        assert!(!is_element("Hx"));
    }
}
