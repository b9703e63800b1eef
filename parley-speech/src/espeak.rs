//! `espeak-ng` backend.
//!
//! The catalog comes from `espeak-ng --voices=<lang>` (language voices) and
//! `espeak-ng --voices=variant` (voice variants). Both listings carry an
//! `Age/Gender` column, which becomes the structured gender hint. Variants
//! are spoken as `<locale>+<variant>`, e.g. `en-us+f3`.

use crate::voice::{Utterance, Voice, VoiceGender};
use crate::SpeechSynth;
use async_trait::async_trait;
use parley_common::{ParleyError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct EspeakSynth {
    binary: String,
    locale: String,
}

impl EspeakSynth {
    pub fn new(binary: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            locale: locale.into(),
        }
    }

    /// espeak voice name for a locale tag: `en-US` becomes `en-us`.
    fn base_voice(lang: &str) -> String {
        lang.trim().to_ascii_lowercase().replace('_', "-")
    }

    async fn list(&self, filter: &str) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(format!("--voices={filter}"))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ParleyError::Speech(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(ParleyError::Speech(format!(
                "{} --voices={filter} exited with {}",
                self.binary, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn parse_gender(age_gender: &str) -> Option<VoiceGender> {
    match age_gender.rsplit('/').next() {
        Some("F") => Some(VoiceGender::Female),
        Some("M") => Some(VoiceGender::Male),
        _ => None,
    }
}

/// Parse `espeak-ng --voices` output. Rows whose language column is
/// `variant` become `<base_voice>+<variant>` selectors.
pub(crate) fn parse_voice_list(listing: &str, base_voice: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let [_pty, language, age_gender, name, file, ..] = cols.as_slice() else {
                return None;
            };
            let gender = parse_gender(age_gender);
            let display = name.replace('_', " ");

            if *language == "variant" {
                let stem = file.trim_start_matches("!v/");
                Some(Voice::new(
                    display,
                    format!("{base_voice}+{stem}"),
                    base_voice,
                    gender,
                ))
            } else {
                Some(Voice::new(display, *language, *language, gender))
            }
        })
        .collect()
}

#[async_trait]
impl SpeechSynth for EspeakSynth {
    async fn voices(&self) -> Result<Vec<Voice>> {
        let base = Self::base_voice(&self.locale);
        let language = base.split('-').next().unwrap_or("en").to_string();

        let mut voices = parse_voice_list(&self.list(&language).await?, &base);
        voices.extend(parse_voice_list(&self.list("variant").await?, &base));
        tracing::debug!(count = voices.len(), locale = %self.locale, "espeak.voices");
        Ok(voices)
    }

    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        let selector = utterance
            .voice
            .as_ref()
            .map(|v| v.identifier.clone())
            .unwrap_or_else(|| Self::base_voice(&utterance.lang));

        let mut child = Command::new(&self.binary)
            .arg("-v")
            .arg(&selector)
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ParleyError::Speech(format!("failed to start {}: {e}", self.binary)))?;

        tracing::info!(voice = %selector, chars = utterance.text.len(), "espeak.speak");

        // Hand over the whole text before returning; dropping stdin closes it
        // so espeak sees EOF. Playback then continues even if we exit.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(utterance.text.as_bytes())
                .await
                .map_err(|e| ParleyError::Speech(format!("failed to feed {}: {e}", self.binary)))?;
        }

        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(out) if out.status.success() => tracing::debug!("espeak.done"),
                Ok(out) => tracing::warn!(
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr),
                    "espeak.failed"
                ),
                Err(e) => tracing::warn!(error = %e, "espeak.wait_failed"),
            }
        });

        Ok(())
    }

    fn backend_name(&self) -> &str {
        "espeak"
    }
}
