//! KaTeX backend.

use crate::pipeline::{MathRenderer, RenderOptions};
use crate::utils::error::{RenderError, RenderResult};

/// Renders with KaTeX. Strict attempts throw on the first error; tolerant
/// attempts let KaTeX draw the offending part in its error color.
#[derive(Debug, Default, Clone, Copy)]
pub struct KatexRenderer;

impl MathRenderer for KatexRenderer {
    fn render(&self, tex: &str, opts: &RenderOptions) -> RenderResult<String> {
        if tex.trim().is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let katex_opts = katex::Opts::builder()
            .display_mode(opts.display_mode)
            .throw_on_error(opts.strict)
            .output_type(katex::OutputType::Html)
            .build()
            .map_err(|e| RenderError::backend(format!("KaTeX options error: {}", e)))?;
        katex::render_with_opts(tex, &katex_opts).map_err(|e| {
            let message = e.to_string();
            if message.contains("ParseError") {
                RenderError::syntax(message, None)
            } else {
                RenderError::backend(message)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_fraction() {
        let html = KatexRenderer
            .render(r"\frac{1}{2}", &RenderOptions { display_mode: false, strict: true })
            .unwrap();
        assert!(html.contains("katex"));
    }

    #[test]
    fn test_strict_rejects_unknown_command() {
        let err = KatexRenderer
            .render(r"\notacommand", &RenderOptions { display_mode: false, strict: true })
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
