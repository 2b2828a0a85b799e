//! WASM bindings for webtex
//!
//! Exposes the normalizer and the extractor to the browser glue, which owns
//! the live DOM and calls KaTeX itself.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::extract::find_matches;
use crate::normalize::{simplify, simplify_with_trace};
use crate::pipeline::{MathRenderer, RenderOptions};
use crate::renderer::LintRenderer;

/// Extraction options (exposed to WASM)
#[derive(Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Require inline `$...$` content to look like math
    #[serde(default = "default_true")]
    pub inline_heuristic: bool,
    /// Recognize `$...$` at all
    #[serde(default = "default_true")]
    pub dollar: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            inline_heuristic: true,
            dollar: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Result of a guarded call
#[derive(Serialize)]
pub struct CallResult<T> {
    pub output: Option<T>,
    pub success: bool,
    pub error: Option<String>,
}

/// Safely serialize a value to JsValue, returning `null` on failure.
fn to_js_value<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        let error_obj: CallResult<()> = CallResult {
            output: None,
            success: false,
            error: Some(format!("Serialization error: {}", e)),
        };
        serde_wasm_bindgen::to_value(&error_obj).unwrap_or(JsValue::NULL)
    })
}

/// Run `f`, turning a panic into an error result.
fn guarded<T: Serialize>(f: impl FnOnce() -> T) -> JsValue {
    let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(output) => CallResult {
            output: Some(output),
            success: true,
            error: None,
        },
        Err(e) => {
            let message = if let Some(s) = e.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = e.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown error (check browser console for details)".to_string()
            };
            CallResult {
                output: None,
                success: false,
                error: Some(message),
            }
        }
    };
    to_js_value(&result)
}

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Normalize raw math (without delimiters) for a strict renderer.
#[wasm_bindgen(js_name = "simplify")]
pub fn simplify_wasm(input: &str) -> String {
    std::panic::catch_unwind(|| simplify(input)).unwrap_or_else(|_| input.to_string())
}

/// Normalize and report every pass's output.
#[wasm_bindgen(js_name = "simplifyWithTrace")]
pub fn simplify_with_trace_wasm(input: &str) -> JsValue {
    guarded(|| simplify_with_trace(input))
}

/// Find delimited math in a plain text string.
#[wasm_bindgen(js_name = "extractMath")]
pub fn extract_math_wasm(text: &str, options: JsValue) -> JsValue {
    let opts: ExtractOptions = serde_wasm_bindgen::from_value(options).unwrap_or_default();
    let mut config = EngineConfig::default();
    config.inline_heuristic = opts.inline_heuristic;
    config.delimiters.dollar = opts.dollar;
    guarded(|| find_matches(text, &config))
}

/// Check normalized math the way the strict tier would.
#[wasm_bindgen(js_name = "lintMath")]
pub fn lint_math_wasm(tex: &str, display_mode: bool, strict: bool) -> JsValue {
    let opts = RenderOptions {
        display_mode,
        strict,
    };
    guarded(|| LintRenderer.render(tex, &opts).map_err(|e| e.to_string()))
}

/// Get version information
#[wasm_bindgen(js_name = "getVersion")]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
