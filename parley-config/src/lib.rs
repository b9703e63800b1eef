//! Loader for Parley configuration with YAML + environment overlays.
//!
//! Sources are merged in order: optional YAML file(s) or inline snippets,
//! then `PARLEY__`-prefixed environment variables (`__` separates nesting,
//! e.g. `PARLEY__LLM__MODEL`). String values then go through recursive
//! `${VAR}` expansion before being deserialized. Every field has a default,
//! so an empty source set yields a usable [`ParleyConfig`].
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const ENV_EXPANSION_PASSES: usize = 8;

/// Fallback environment variable for the Gemini key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_CONFIG_FILE: &str = "parley.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub version: Option<String>,
    pub llm: LlmSettings,
    pub speech: SpeechSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    /// Usually `"${GEMINI_API_KEY}"`; never commit a literal key.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub retries: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: "gemini-1.5-pro-002".into(),
            api_key: None,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout_secs: 60,
            retries: 1,
        }
    }
}

impl LlmSettings {
    /// The configured key, or `GEMINI_API_KEY` when the configured value is
    /// absent, blank, or an unexpanded placeholder.
    ///
    /// ```
    /// use parley_config::LlmSettings;
    ///
    /// let settings = LlmSettings {
    ///     api_key: Some("from-file".into()),
    ///     ..LlmSettings::default()
    /// };
    /// assert_eq!(settings.resolved_api_key().as_deref(), Some("from-file"));
    /// ```
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains("${"));
        match configured {
            Some(k) => Some(k.to_string()),
            None => std::env::var(GEMINI_API_KEY_ENV)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackendKind {
    #[default]
    Espeak,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub backend: SpeechBackendKind,
    pub binary: String,
    pub locale: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            backend: SpeechBackendKind::Espeak,
            binary: "espeak-ng".into(),
            locale: "en-US".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    #[default]
    Text,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSetting {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub title: String,
    pub greeting: String,
    pub mode: ModeSetting,
    pub voice: VoiceSetting,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            title: "Parley Personal AI".into(),
            greeting: "Hi boss, how can I help you?".into(),
            mode: ModeSetting::Text,
            voice: VoiceSetting::Female,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormatSetting,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormatSetting::Text,
            filter: "info".into(),
            dir: None,
        }
    }
}

/// Expand `$VAR`/`${VAR}` references in every string of the tree.
fn expand_env(node: &mut Value) {
    match node {
        Value::String(text) if text.contains('$') => *text = expand_placeholders(text),
        Value::Array(items) => items.iter_mut().for_each(expand_env),
        Value::Object(fields) => fields.values_mut().for_each(expand_env),
        _ => {}
    }
}

/// Re-expand until the text stops changing, at most `ENV_EXPANSION_PASSES`
/// times. Each reference is resolved on its own: undefined variables stay
/// as written and defined ones around them still expand.
fn expand_placeholders(text: &str) -> String {
    let mut current = text.to_owned();
    for _ in 0..ENV_EXPANSION_PASSES {
        let expanded =
            shellexpand::env_with_context_no_errors(&current, |name| std::env::var(name).ok());
        if expanded == current.as_str() {
            break;
        }
        current = expanded.into_owned();
    }
    current
}

/// Locate a config file: `./parley.yaml`, then `<config_dir>/parley/parley.yaml`.
pub fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("parley").join(DEFAULT_CONFIG_FILE))
        .filter(|p| p.is_file())
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ParleyConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ParleyConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ParleyConfigLoader {
    /// Start with `PARLEY__` environment overrides only.
    ///
    /// ```
    /// use parley_config::ParleyConfigLoader;
    ///
    /// let config = ParleyConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.llm.model, "gemini-1.5-pro-002");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be missing, for env-only setups.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use parley_config::{ModeSetting, ParleyConfigLoader, SpeechBackendKind};
    ///
    /// let cfg = ParleyConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// ui:
    ///   mode: voice
    /// speech:
    ///   backend: none
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.ui.mode, ModeSetting::Voice);
    /// assert_eq!(cfg.speech.backend, SpeechBackendKind::None);
    /// assert_eq!(cfg.speech.locale, "en-US");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Environment variables are added last so they win over files.
    pub fn load(self) -> Result<ParleyConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PARLEY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut tree: Value = cfg.try_deserialize()?;
        expand_env(&mut tree);
        serde_json::from_value(tree).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
