//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::utils::error::ConfigError;

/// Delimiter families the extractor looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimiterConfig {
    /// `$$...$$`
    pub double_dollar: bool,
    /// `\[...\]`
    pub bracket: bool,
    /// `$\begin{env}...\end{env}$`
    pub inline_environment: bool,
    /// `$...$`
    pub dollar: bool,
    /// `\(...\)`
    pub paren: bool,
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self {
            double_dollar: true,
            bracket: true,
            inline_environment: true,
            dollar: true,
            paren: true,
        }
    }
}

/// Configuration shared by the extractor, mutator and engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Elements whose subtrees are never scanned.
    pub ignored_tags: Vec<String>,
    /// Class marking subtrees the page wants left alone.
    pub ignore_class: String,
    /// Class on every container the engine produces.
    pub processed_class: String,
    /// Extra class on containers holding the inert text fallback.
    pub fallback_class: String,
    pub inline_class: String,
    pub display_class: String,
    /// Attribute holding the original matched text, used by restore.
    pub source_attr: String,
    /// Attribute holding the last renderer error of a fallback container.
    pub error_attr: String,
    /// Attribute recording which render tier produced the container.
    pub method_attr: String,
    pub delimiters: DelimiterConfig,
    /// Require inline `$...$` content to look like math.
    pub inline_heuristic: bool,
}

pub const DEFAULT_IGNORED_TAGS: &[&str] = &[
    "script", "style", "textarea", "pre", "code", "noscript", "input", "select", "button",
    "option", "kbd", "samp", "math", "svg",
];

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignored_tags: DEFAULT_IGNORED_TAGS.iter().map(|t| t.to_string()).collect(),
            ignore_class: "webtex-ignore".to_string(),
            processed_class: "webtex-processed".to_string(),
            fallback_class: "webtex-fallback".to_string(),
            inline_class: "webtex-inline".to_string(),
            display_class: "webtex-display".to_string(),
            source_attr: "data-webtex-source".to_string(),
            error_attr: "data-webtex-error".to_string(),
            method_attr: "data-webtex-method".to_string(),
            delimiters: DelimiterConfig::default(),
            inline_heuristic: true,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `WEBTEX_IGNORED_TAGS` (comma-separated) and
    /// `WEBTEX_INLINE_HEURISTIC` (`0`/`false` to disable).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(tags) = std::env::var("WEBTEX_IGNORED_TAGS") {
            let tags: Vec<String> = tags
                .split(',')
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if !tags.is_empty() {
                config.ignored_tags = tags;
            }
        }
        if let Ok(flag) = std::env::var("WEBTEX_INLINE_HEURISTIC") {
            config.inline_heuristic = !matches!(flag.trim(), "0" | "false" | "off");
        }
        config
    }

    /// Parse a TOML document; missing keys keep their defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations whose markers could not be recognized again.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let markers = [
            ("ignore_class", &self.ignore_class),
            ("processed_class", &self.processed_class),
            ("fallback_class", &self.fallback_class),
            ("inline_class", &self.inline_class),
            ("display_class", &self.display_class),
            ("source_attr", &self.source_attr),
            ("error_attr", &self.error_attr),
            ("method_attr", &self.method_attr),
        ];
        for (field, value) in markers {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
            if value.contains(char::is_whitespace) {
                return Err(ConfigError::invalid(field, "must be a single token"));
            }
        }
        if self.processed_class == self.ignore_class {
            return Err(ConfigError::invalid(
                "processed_class",
                "must differ from ignore_class",
            ));
        }
        Ok(())
    }

    pub fn is_ignored_tag(&self, tag: &str) -> bool {
        self.ignored_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
