//! Integration tests for the normalization chain

use pretty_assertions::assert_eq;
use webtex::normalize::{balance, collapse_empty_groups, simplify, simplify_with_trace};

// ============================================================================
// Worked scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rac_typo() {
        assert_eq!(simplify("rac{1}{2}"), r"\frac{1}{2}");
    }

    #[test]
    fn test_scripted_numerator_missing_brace() {
        assert_eq!(simplify(r"\frac{\pi^{2}{6}"), r"\frac{\pi^{2}}{6}");
    }

    #[test]
    fn test_nuclear_text_wrapper() {
        assert_eq!(simplify(r"\text{_Z^A X}"), r"{}^{A}_{Z}\text{X}");
    }

    #[test]
    fn test_decay_equation_empty_groups() {
        let input = r"{}^{A}\text{N} \rightarrow {}{}{}^{A-4}_{Z-2}\text{N'} + {}{}^{4}_{2}\text{He}";
        assert_eq!(
            simplify(input),
            r"{}^{A}\text{N} \rightarrow {}^{A-4}_{Z-2}\text{N'} + {}^{4}_{2}\text{He}"
        );
    }

    #[test]
    fn test_missing_closing_brace() {
        assert_eq!(simplify(r"\sqrt{\pi"), r"\sqrt{\pi}");
    }
}

// ============================================================================
// Chain behaviour
// ============================================================================

mod chain {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_group_kept_before_script() {
        assert_eq!(collapse_empty_groups("{}{}{}^{A}"), "{}^{A}");
    }

    #[test]
    fn test_unterminated_text_keeps_content() {
        let out = simplify(r"x + \text{hello world");
        assert!(out.contains(r"\text{hello world}"), "{}", out);
    }

    #[test]
    fn test_balance_never_leaves_stray_closers() {
        assert_eq!(balance("}}a{b"), "a{b}");
    }

    #[test]
    fn test_unicode_and_arrows() {
        assert_eq!(simplify("x → ∞"), r"x \rightarrow \infty");
        assert_eq!(simplify(r"A \to B"), r"A \rightarrow B");
    }

    #[test]
    fn test_limit_typo() {
        assert_eq!(simplify("lim_{x o infty} f(x)"), r"\lim_{x \to \infty} f(x)");
    }

    #[test]
    fn test_equation_wrapper_removed() {
        assert_eq!(simplify(r"\begin{equation*}x\end{equation*}"), "x");
    }

    #[test]
    fn test_text_accent_becomes_math_accent() {
        assert_eq!(simplify(r"\'{e} + \~{n}"), r"\acute{e} + \tilde{n}");
    }

    #[test]
    fn test_double_escaped_commands() {
        assert_eq!(simplify(r"\\alpha + \\beta"), r"\alpha + \beta");
    }

    #[test]
    fn test_dangling_integral_limit() {
        assert_eq!(simplify(r"\int_{0}^"), r"\int_{0}^{\,}");
    }

    #[test]
    fn test_line_breaks_are_not_swallowed_backslashes() {
        assert_eq!(simplify("a = b\ne^{x}"), "a = b\ne^{x}");
        assert_eq!(simplify("x = 1\nu = 2"), "x = 1\nu = 2");
        assert_eq!(simplify("a \neq b"), r"a \neq b");
    }

    #[test]
    fn test_numeric_power_is_not_an_isotope() {
        assert_eq!(simplify(r"\frac{Z^2 N}{A}"), r"\frac{Z^2 N}{A}");
        assert_eq!(simplify(r"\sigma \propto Z^2 N"), r"\sigma \propto Z^2 N");
        assert_eq!(simplify(r"Z^A N"), r"{}^{A}_{Z}\text{N}");
    }

    #[test]
    fn test_already_clean_input_unchanged() {
        for tex in [
            r"\frac{a}{b}",
            r"e^{i\pi} + 1 = 0",
            r"\sum_{n=1}^{\infty} \frac{1}{n^2}",
            r"{}^{4}_{2}\text{He}",
        ] {
            assert_eq!(simplify(tex), tex);
        }
    }

    #[test]
    fn test_simplify_is_idempotent_on_scenarios() {
        for tex in [
            "rac{1}{2}",
            r"\frac{\pi^{2}{6}",
            r"\text{_Z^A X}",
            r"\sqrt{\pi",
            r"x^{\sqrt} + \int_{a}^",
            r"\text{x+1}\alpha",
        ] {
            let once = simplify(tex);
            assert_eq!(simplify(&once), once, "input {:?}", tex);
        }
    }

    #[test]
    fn test_trace_ends_with_simplify_round() {
        let trace = simplify_with_trace("rac{1}{2}");
        let last = trace.last().map(|t| t.output.clone());
        assert_eq!(last.as_deref(), Some(r"\frac{1}{2}"));
        assert!(trace.iter().any(|t| t.pass == "fractions" && t.changed));
    }
}
