use anyhow::{Context as _, Result, bail};
use clap::{Parser, ValueEnum};
use parley_chat::{Mode, Session, VoicePreference};
use parley_common::observability::{LogConfig, LogFormat};
use parley_config::{
    LlmProvider, LlmSettings, LogFormatSetting, ModeSetting, ParleyConfig, ParleyConfigLoader,
    SpeechBackendKind, SpeechSettings, UiSettings, VoiceSetting, discover_config_file,
};
use parley_llm::{gemini::GeminiClient, traits::LlmClient};
use parley_speech::{EspeakSynth, SilentSynth, SpeechSynth};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Chat with Gemini from the terminal, optionally out loud")]
pub struct Cli {
    /// YAML config file. Defaults to ./parley.yaml or the user config dir.
    #[arg(long, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model name, overriding `llm.model`.
    #[arg(long)]
    pub model: Option<String>,

    /// Initial mode.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Initial voice preference.
    #[arg(long, value_enum)]
    pub voice: Option<VoiceArg>,

    /// Send one message, print the reply and exit.
    #[arg(long, value_name = "TEXT")]
    pub once: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Text,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VoiceArg {
    Female,
    Male,
}

/// The config file in effect: `--config`/`PARLEY_CONFIG`, else a discovered one.
pub fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(discover_config_file)
}

/// Load configuration (file, then `PARLEY__*` env) and apply CLI overrides.
pub fn load_config(cli: &Cli) -> Result<ParleyConfig> {
    let mut loader = ParleyConfigLoader::new();
    if let Some(path) = config_path(cli) {
        loader = loader.with_file(&path);
    }
    let mut cfg = loader.load().context("loading configuration")?;
    apply_overrides(&mut cfg, cli);
    Ok(cfg)
}

pub fn apply_overrides(cfg: &mut ParleyConfig, cli: &Cli) {
    if let Some(model) = &cli.model {
        cfg.llm.model = model.clone();
    }
    if let Some(mode) = cli.mode {
        cfg.ui.mode = match mode {
            ModeArg::Text => ModeSetting::Text,
            ModeArg::Voice => ModeSetting::Voice,
        };
    }
    if let Some(voice) = cli.voice {
        cfg.ui.voice = match voice {
            VoiceArg::Female => VoiceSetting::Female,
            VoiceArg::Male => VoiceSetting::Male,
        };
    }
}

pub fn log_config(cfg: &ParleyConfig, emit_stderr: bool) -> LogConfig {
    LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr,
        format: match cfg.logging.format {
            LogFormatSetting::Text => LogFormat::Text,
            LogFormatSetting::Json => LogFormat::Json,
        },
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    }
}

/// Fresh session seeded from the `ui` section. A configured Voice mode
/// starts without the voice prompt, since the voice is already known.
pub fn initial_session(ui: &UiSettings) -> Session {
    let mode = match ui.mode {
        ModeSetting::Text => Mode::Text,
        ModeSetting::Voice => Mode::Voice,
    };
    let voice = match ui.voice {
        VoiceSetting::Female => VoicePreference::Female,
        VoiceSetting::Male => VoicePreference::Male,
    };
    Session::new(ui.greeting.clone())
        .with_mode(mode)
        .with_voice_preference(voice)
}

pub fn build_llm_client(cfg: &LlmSettings) -> Result<Arc<dyn LlmClient + Send + Sync>> {
    match cfg.provider {
        LlmProvider::Gemini => {
            let Some(api_key) = cfg.resolved_api_key() else {
                bail!(
                    "no Gemini API key: set llm.api_key in the config file or {}",
                    parley_config::GEMINI_API_KEY_ENV
                );
            };
            let client = GeminiClient::with_endpoint(&api_key, cfg.model.clone(), &cfg.endpoint)?
                .with_timeout(Duration::from_secs(cfg.timeout_secs))
                .with_retries(cfg.retries);
            Ok(Arc::new(client))
        }
    }
}

pub fn build_speech(cfg: &SpeechSettings) -> Arc<dyn SpeechSynth + Send + Sync> {
    match cfg.backend {
        SpeechBackendKind::Espeak => Arc::new(EspeakSynth::new(&cfg.binary, &cfg.locale)),
        SpeechBackendKind::None => Arc::new(SilentSynth),
    }
}
