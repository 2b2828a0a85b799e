//! LaTeX normalization and repair.
//!
//! Every pass is a pure `&str -> String` function and can be called on its
//! own. [`simplify`] applies them in a fixed order:
//!
//! 1. brace balancing and empty-group canonicalization
//! 2. escape recovery
//! 3. fraction repair
//! 4. nuclear notation (first pass)
//! 5. environment flattening
//! 6. arrow and limit typos
//! 7. derivative notation
//! 8. `\text{}` judgment
//! 9. nuclear notation (second pass, for math exposed by step 8)
//! 10. incomplete-command cleanup
//! 11. Unicode substitution
//! 12. accent conversion
//! 13. brace balancing and empty-group canonicalization

pub mod accents;
pub mod arrows;
pub mod braces;
pub mod cleanup;
pub mod commands;
pub mod derivative;
pub mod environment;
pub mod escapes;
pub mod fraction;
pub mod groups;
pub mod nuclear;
pub mod scan;
pub mod text;
pub mod unicode;

use serde::Serialize;

pub use accents::convert_accents;
pub use arrows::fix_arrows;
pub use braces::balance;
pub use cleanup::cleanup_incomplete;
pub use derivative::normalize_derivatives;
pub use environment::flatten_environments;
pub use escapes::recover_escapes;
pub use fraction::repair_fractions;
pub use groups::collapse_empty_groups;
pub use nuclear::canonicalize_nuclear;
pub use text::{judge_text, unwrap_text_groups, TextVerdict};
pub use unicode::substitute_unicode;

/// Upper bound on chain re-runs while looking for a fixpoint.
const MAX_ROUNDS: usize = 8;

/// One named normalizer pass.
#[derive(Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// The chain, in application order.
pub const PASSES: &[Pass] = &[
    Pass { name: "balance", apply: balance },
    Pass { name: "collapse-empty-groups", apply: collapse_empty_groups },
    Pass { name: "recover-escapes", apply: recover_escapes },
    Pass { name: "fractions", apply: repair_fractions },
    Pass { name: "nuclear", apply: canonicalize_nuclear },
    Pass { name: "environments", apply: flatten_environments },
    Pass { name: "arrows", apply: fix_arrows },
    Pass { name: "derivatives", apply: normalize_derivatives },
    Pass { name: "text-groups", apply: unwrap_text_groups },
    Pass { name: "nuclear", apply: canonicalize_nuclear },
    Pass { name: "cleanup", apply: cleanup_incomplete },
    Pass { name: "unicode", apply: substitute_unicode },
    Pass { name: "accents", apply: convert_accents },
    Pass { name: "balance", apply: balance },
    Pass { name: "collapse-empty-groups", apply: collapse_empty_groups },
];

/// Output of one pass, for tracing.
#[derive(Debug, Clone, Serialize)]
pub struct PassTrace {
    pub pass: &'static str,
    pub output: String,
    pub changed: bool,
}

/// Normalize a raw math string into something a strict renderer accepts.
///
/// The chain is re-run until its output stops changing, so
/// `simplify(&simplify(s)) == simplify(s)`.
pub fn simplify(tex: &str) -> String {
    let mut cur = simplify_once(tex);
    for round in 1..MAX_ROUNDS {
        let next = simplify_once(&cur);
        if next == cur {
            log::trace!(target: "webtex::normalize", "fixpoint after {} round(s)", round);
            return next;
        }
        cur = next;
    }
    log::debug!(target: "webtex::normalize", "no fixpoint after {} rounds: {:?}", MAX_ROUNDS, tex);
    cur
}

fn simplify_once(tex: &str) -> String {
    let out = PASSES
        .iter()
        .fold(tex.to_string(), |acc, pass| (pass.apply)(&acc));
    out.trim().to_string()
}

/// Run the chain once, recording every intermediate result.
pub fn simplify_with_trace(tex: &str) -> Vec<PassTrace> {
    let mut cur = tex.to_string();
    PASSES
        .iter()
        .map(|pass| {
            let next = (pass.apply)(&cur);
            let changed = next != cur;
            cur = next;
            PassTrace {
                pass: pass.name,
                output: cur.clone(),
                changed,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{simplify, simplify_with_trace, PASSES};

    #[test]
    fn test_chain_order_is_fixed() {
        let names: Vec<&str> = PASSES.iter().map(|p| p.name).collect();
        assert_eq!(names.first(), Some(&"balance"));
        assert_eq!(names.last(), Some(&"collapse-empty-groups"));
        let text = names.iter().position(|n| *n == "text-groups").unwrap();
        assert_eq!(names[text - 1], "derivatives");
        assert_eq!(names[text + 1], "nuclear");
    }

    #[test]
    fn test_trace_reports_changes() {
        let trace = simplify_with_trace(r"\sqrt{\pi");
        assert_eq!(trace.len(), PASSES.len());
        assert!(trace[0].changed);
        assert_eq!(trace.last().unwrap().output, r"\sqrt{\pi}");
    }

    #[test]
    fn test_plain_math_unchanged() {
        assert_eq!(simplify(r"x^2 + y^2 = z^2"), r"x^2 + y^2 = z^2");
        assert_eq!(simplify(r"\int_0^1 x \, \mathrm{d}x"), r"\int_0^1 x \, \mathrm{d}x");
    }
}
