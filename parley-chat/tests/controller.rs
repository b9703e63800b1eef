use async_trait::async_trait;
use parley_chat::{
    ChatOutcome, ConversationController, DEFAULT_GREETING, Mode, Role, Session, Turn,
    VoicePreference,
};
use parley_common::{ParleyError, Result};
use parley_llm::traits::{LlmClient, LlmResponse};
use parley_speech::{SpeechSynth, Utterance, Voice, VoiceGender};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays scripted replies and records every prompt it receives.
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn replying(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::default(),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ParleyError::Llm("script exhausted".into())));
        next.map(LlmResponse::text)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Records utterances instead of playing them.
struct RecordingSynth {
    catalog: Vec<Voice>,
    spoken: Mutex<Vec<Utterance>>,
}

impl RecordingSynth {
    fn with_catalog(catalog: Vec<Voice>) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            spoken: Mutex::default(),
        })
    }

    fn browser_like() -> Arc<Self> {
        Self::with_catalog(vec![
            Voice::new("Google US English", "us", "en-US", None),
            Voice::new("Google UK English Female", "uk-female", "en-GB", None),
            Voice::new("Google UK English Male", "uk-male", "en-GB", None),
        ])
    }

    fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynth for RecordingSynth {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.catalog.clone())
    }

    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        self.spoken.lock().unwrap().push(utterance.clone());
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "recording"
    }
}

/// Synthesizer whose every call fails.
struct BrokenSynth;

#[async_trait]
impl SpeechSynth for BrokenSynth {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Err(ParleyError::Speech("no audio device".into()))
    }

    async fn speak(&self, _utterance: &Utterance) -> Result<()> {
        Err(ParleyError::Speech("no audio device".into()))
    }

    fn backend_name(&self) -> &str {
        "broken"
    }
}

fn controller(llm: Arc<ScriptedLlm>, synth: Arc<RecordingSynth>) -> ConversationController {
    ConversationController::new(Session::default(), llm, synth)
}

#[tokio::test]
async fn greeting_then_hello_scenario() {
    let llm = ScriptedLlm::replying(vec![Ok("Hi there!".into())]);
    let synth = RecordingSynth::browser_like();
    let mut c = controller(llm.clone(), synth.clone());

    let outcome = c.ask("hello").await;

    assert_eq!(outcome, Some(ChatOutcome::Success("Hi there!".into())));
    assert_eq!(
        c.session().transcript(),
        &[
            Turn::bot(DEFAULT_GREETING),
            Turn::user("hello"),
            Turn::bot("Hi there!"),
        ]
    );
    assert_eq!(c.session().pending_input(), "");
    assert!(!c.session().is_busy());
    assert_eq!(llm.prompts(), vec!["hello".to_string()]);
    assert!(synth.spoken().is_empty(), "text mode must stay silent");
}

#[tokio::test]
async fn each_success_adds_exactly_one_user_bot_pair() {
    let inputs = ["a", "  padded  ", "multi\nline", "ünïcödé"];
    let llm = ScriptedLlm::replying(inputs.iter().map(|i| Ok(format!("re: {i}"))).collect());
    let mut c = controller(llm.clone(), RecordingSynth::browser_like());

    for (n, input) in inputs.iter().enumerate() {
        let before = c.session().transcript().len();
        c.ask(input).await;
        let transcript = c.session().transcript();
        assert_eq!(transcript.len(), before + 2, "after send #{n}");
        assert_eq!(transcript[before].speaker(), Role::User);
        assert_eq!(transcript[before].text(), *input);
        assert_eq!(transcript[before + 1].speaker(), Role::Bot);
        assert_eq!(c.session().pending_input(), "");
        assert!(!c.session().is_busy());
    }
    // Prompts go out raw, with no history attached.
    assert_eq!(llm.prompts(), inputs.to_vec());
}

#[tokio::test]
async fn whitespace_only_input_is_a_no_op() {
    let llm = ScriptedLlm::replying(vec![Ok("unused".into())]);
    let mut c = controller(llm.clone(), RecordingSynth::browser_like());

    for blank in ["", "   ", "\t\n", " \r\n "] {
        let outcome = c.ask(blank).await;
        assert!(outcome.is_none());
        assert_eq!(c.session().transcript().len(), 1);
        assert_eq!(c.session().pending_input(), blank);
        assert!(!c.session().is_busy());
    }
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn failed_call_leaves_transcript_and_clears_input() {
    let llm = ScriptedLlm::replying(vec![Err(ParleyError::Llm("network down".into()))]);
    let synth = RecordingSynth::browser_like();
    let mut c = controller(llm, synth.clone());
    c.toggle_mode(Mode::Voice);

    let outcome = c.ask("hello").await;

    assert!(matches!(outcome, Some(ChatOutcome::Failure { .. })));
    assert_eq!(c.session().transcript().len(), 1);
    assert_eq!(c.session().pending_input(), "");
    assert!(!c.session().is_busy());
    assert!(synth.spoken().is_empty());
}

#[tokio::test]
async fn voice_mode_speaks_reply_once_with_preferred_voice() {
    let llm = ScriptedLlm::replying(vec![Ok("ok".into())]);
    let synth = RecordingSynth::browser_like();
    let mut c = controller(llm, synth.clone());
    c.toggle_mode(Mode::Voice);
    assert!(c.session().show_voice_popup());
    c.select_voice(VoicePreference::Female);

    c.ask("test").await;

    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "ok");
    assert_eq!(spoken[0].lang, "en-US");
    assert_eq!(
        spoken[0].voice.as_ref().map(|v| v.identifier.as_str()),
        Some("uk-female")
    );
}

#[tokio::test]
async fn male_preference_never_picks_a_female_voice() {
    let llm = ScriptedLlm::replying(vec![Ok("ok".into())]);
    let synth = RecordingSynth::with_catalog(vec![
        Voice::new("Google UK English Female", "uk-female", "en-GB", None),
        Voice::new("espeak m2", "en-us+m2", "en-us", Some(VoiceGender::Male)),
    ]);
    let mut c = controller(llm, synth.clone()).with_locale("en-GB");
    c.toggle_mode(Mode::Voice);
    c.select_voice(VoicePreference::Male);

    c.ask("test").await;

    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].lang, "en-GB");
    assert_eq!(spoken[0].voice.as_ref().unwrap().identifier, "en-us+m2");
}

#[tokio::test]
async fn no_matching_voice_falls_back_to_backend_default() {
    let llm = ScriptedLlm::replying(vec![Ok("ok".into())]);
    let synth = RecordingSynth::with_catalog(vec![Voice::new("Daniel", "d", "en-GB", None)]);
    let mut c = controller(llm, synth.clone());
    c.toggle_mode(Mode::Voice);
    c.select_voice(VoicePreference::Female);

    c.ask("test").await;

    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert!(spoken[0].voice.is_none());
}

#[tokio::test]
async fn speech_failures_do_not_disturb_the_session() {
    let llm = ScriptedLlm::replying(vec![Ok("ok".into())]);
    let mut c = ConversationController::new(Session::default(), llm, Arc::new(BrokenSynth));
    c.toggle_mode(Mode::Voice);
    c.select_voice(VoicePreference::Male);

    let outcome = c.ask("test").await;

    assert_eq!(outcome, Some(ChatOutcome::Success("ok".into())));
    assert_eq!(c.session().transcript().len(), 3);
    assert!(!c.session().is_busy());
}

#[tokio::test]
async fn switching_back_to_text_silences_replies() {
    let llm = ScriptedLlm::replying(vec![Ok("one".into()), Ok("two".into())]);
    let synth = RecordingSynth::browser_like();
    let mut c = controller(llm, synth.clone());

    c.toggle_mode(Mode::Voice);
    c.select_voice(VoicePreference::Female);
    c.ask("first").await;
    c.toggle_mode(Mode::Text);
    c.ask("second").await;

    let spoken: Vec<String> = synth.spoken().into_iter().map(|u| u.text).collect();
    assert_eq!(spoken, vec!["one".to_string()]);
    assert_eq!(c.session().transcript().len(), 5);
}
