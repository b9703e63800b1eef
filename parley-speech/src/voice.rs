/// Gender hint attached to a synthesizer voice, also used as the user's
/// voice preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceGender {
    Female,
    Male,
}

impl VoiceGender {
    /// Substring looked for in voice names that carry no structured hint.
    /// Case-sensitive, so `"Female"` never satisfies `"Male"`.
    pub fn name_marker(self) -> &'static str {
        match self {
            VoiceGender::Female => "Female",
            VoiceGender::Male => "Male",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VoiceGender::Female => "female",
            VoiceGender::Male => "male",
        }
    }
}

/// One entry of a synthesizer's voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Human-readable name, e.g. `"Google UK English Female"`.
    pub name: String,
    /// Backend-specific selector passed back when speaking.
    pub identifier: String,
    pub language: String,
    pub gender: Option<VoiceGender>,
}

impl Voice {
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        language: impl Into<String>,
        gender: Option<VoiceGender>,
    ) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            language: language.into(),
            gender,
        }
    }

    fn matches(&self, preference: VoiceGender) -> bool {
        match self.gender {
            Some(gender) => gender == preference,
            None => self.name.contains(preference.name_marker()),
        }
    }
}

/// Text plus the parameters a synthesizer needs to vocalize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    /// BCP 47 locale tag, e.g. `"en-US"`.
    pub lang: String,
    /// `None` leaves voice choice to the backend's default.
    pub voice: Option<Voice>,
}

/// Pick the first voice in catalog order that fits `preference`.
///
/// A structured gender hint decides when present; otherwise the voice
/// name must contain `"Female"` or `"Male"`. Returns `None` when nothing
/// fits, in which case the backend's default voice is used.
///
/// ```
/// use parley_speech::{select_voice, Voice, VoiceGender};
///
/// let voices = vec![
///     Voice::new("Google US English", "us", "en-US", None),
///     Voice::new("Google UK English Female", "uk-f", "en-GB", None),
///     Voice::new("Google UK English Male", "uk-m", "en-GB", None),
/// ];
/// assert_eq!(select_voice(&voices, VoiceGender::Female).unwrap().identifier, "uk-f");
/// assert_eq!(select_voice(&voices, VoiceGender::Male).unwrap().identifier, "uk-m");
/// ```
pub fn select_voice(voices: &[Voice], preference: VoiceGender) -> Option<&Voice> {
    voices.iter().find(|voice| voice.matches(preference))
}
