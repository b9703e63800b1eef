//! Terminal-independent UI state: the chat session plus everything the
//! screen needs (caret, scroll offset, rendered transcript, spinner).
//!
//! Key presses and chat completions are applied here and reported back as
//! [`Action`]s, so the actor in `tui.rs` only does I/O.
use crate::{
    command::{Command, HELP, parse_command},
    styles,
    transcript::{TranscriptLine, render_turn},
    view::ViewSnap,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parley_chat::{ChatOutcome, PendingSend, SendRefusal, Session, SpeakRequest, VoicePreference};
use ratatui::style::Style;

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Work the actor must carry out after a state change.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Dispatch(PendingSend),
    Quit,
}

pub struct UiState {
    session: Session,
    title: String,

    input_cursor: usize,
    lines: Vec<TranscriptLine>,
    rendered_turns: usize,
    scroll: usize,
    status: Option<String>,

    spin_idx: usize,
    dirty: bool,
}

impl UiState {
    pub fn new(session: Session, title: impl Into<String>) -> Self {
        let mut state = Self {
            session,
            title: title.into(),
            input_cursor: 0,
            lines: Vec::new(),
            rendered_turns: 0,
            scroll: 0,
            status: None,
            spin_idx: 0,
            dirty: true,
        };
        state.sync_transcript();
        state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn snapshot(&self) -> ViewSnap {
        ViewSnap {
            title: self.title.clone(),
            mode: self.session.mode().label(),
            voice: self.session.voice_preference().label(),
            input: self.session.pending_input().to_string(),
            input_cursor: self.input_cursor,
            lines: self.lines.clone(),
            scroll: self.scroll,
            busy: self.session.is_busy(),
            spinner: self.spinner(),
            show_voice_popup: self.session.show_voice_popup(),
            status: self.status.clone(),
        }
    }

    fn spinner(&self) -> &'static str {
        if self.session.is_busy() {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    pub fn step_spinner(&mut self) {
        if self.session.is_busy() {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
    }

    /// Apply a finished remote call. Returns the speech to start, if any.
    pub fn complete(&mut self, pending: PendingSend, outcome: ChatOutcome) -> Option<SpeakRequest> {
        self.status = match &outcome {
            ChatOutcome::Success(_) => None,
            ChatOutcome::Failure { .. } => Some("× Request failed (see log)".into()),
        };
        let speak = self.session.complete_send(pending, outcome);
        self.input_cursor = 0;
        self.sync_transcript();
        self.dirty = true;
        speak
    }

    /// Show a transient error in the status bar.
    pub fn report_error(&mut self, msg: impl Into<String>) {
        self.status = Some(format!("× {}", msg.into()));
        self.dirty = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        self.dirty = true;
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('q'), KeyModifiers::CONTROL) => return Some(Action::Quit),
            _ if self.session.show_voice_popup() => self.handle_popup_key(key.code),
            (KeyCode::Char('t'), KeyModifiers::CONTROL) => {
                let target = self.session.mode().other();
                self.session.toggle_mode(target);
            }
            (KeyCode::PageUp, _) => self.scroll = self.scroll.saturating_add(5),
            (KeyCode::PageDown, _) => self.scroll = self.scroll.saturating_sub(5),
            (KeyCode::Up, _) => self.scroll = self.scroll.saturating_add(1),
            (KeyCode::Down, _) => self.scroll = self.scroll.saturating_sub(1),
            (KeyCode::Enter, _) => return self.submit(),
            (KeyCode::Left, _) => self.cursor_left(),
            (KeyCode::Right, _) => self.cursor_right(),
            (KeyCode::Home, _) => self.input_cursor = 0,
            (KeyCode::End, _) => self.input_cursor = self.session.pending_input().len(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Esc, _) => {
                self.session.pending_input_mut().clear();
                self.input_cursor = 0;
            }
            (KeyCode::Char(ch), _) => self.insert_char(ch),
            _ => {}
        }
        None
    }

    // The prompt is modal: only a voice choice closes it.
    fn handle_popup_key(&mut self, code: KeyCode) {
        let choice = match code {
            KeyCode::Char('f' | 'F' | '1') => VoicePreference::Female,
            KeyCode::Char('m' | 'M' | '2') => VoicePreference::Male,
            // Keep whatever was chosen before.
            KeyCode::Enter | KeyCode::Esc => self.session.voice_preference(),
            _ => return,
        };
        self.session.select_voice(choice);
    }

    fn submit(&mut self) -> Option<Action> {
        let line = self.session.pending_input().trim().to_string();
        if line.starts_with('/') {
            self.session.pending_input_mut().clear();
            self.input_cursor = 0;
            return self.run_command(parse_command(&line));
        }

        match self.session.begin_send() {
            Ok(pending) => {
                self.status = None;
                Some(Action::Dispatch(pending))
            }
            Err(SendRefusal::Busy) => {
                self.status = Some("Still waiting for the previous reply".into());
                None
            }
            Err(SendRefusal::EmptyInput) => None,
        }
    }

    fn run_command(&mut self, cmd: Command) -> Option<Action> {
        match cmd {
            Command::Quit => return Some(Action::Quit),
            Command::Mode(mode) => {
                self.session.toggle_mode(mode);
                self.push_note(format!("Mode: {}", mode.label()), styles::SYSTEM);
            }
            Command::Voice(pref) => {
                self.session.select_voice(pref);
                self.push_note(format!("Voice: {}", pref.label()), styles::SYSTEM);
            }
            Command::Help => {
                self.push_note("Commands:", styles::LABEL);
                for (usage, what) in HELP {
                    self.push_note(format!("  {usage:<20} {what}"), styles::VALUE);
                }
                self.push_note("", Style::default());
            }
            Command::Unknown(s) => {
                self.push_note(format!("× Unknown command: {s}"), styles::ERROR);
                self.push_note("Try `/help`.", styles::DIM);
                self.push_note("", Style::default());
            }
        }
        None
    }

    fn push_note(&mut self, text: impl Into<String>, style: Style) {
        self.lines.push(TranscriptLine::new(text, style));
        self.scroll = 0;
        self.dirty = true;
    }

    /// Append lines for turns not yet rendered and snap to the bottom.
    fn sync_transcript(&mut self) {
        let turns = &self.session.transcript()[self.rendered_turns..];
        if turns.is_empty() {
            return;
        }
        self.lines.extend(turns.iter().flat_map(render_turn));
        self.rendered_turns = self.session.transcript().len();
        self.scroll = 0;
    }

    fn cursor_left(&mut self) {
        let input = self.session.pending_input();
        if let Some((idx, _)) = input[..self.input_cursor].char_indices().next_back() {
            self.input_cursor = idx;
        }
    }

    fn cursor_right(&mut self) {
        let input = self.session.pending_input();
        if let Some(ch) = input[self.input_cursor..].chars().next() {
            self.input_cursor += ch.len_utf8();
        }
    }

    fn insert_char(&mut self, ch: char) {
        let cursor = self.input_cursor;
        self.session.pending_input_mut().insert(cursor, ch);
        self.input_cursor += ch.len_utf8();
    }

    fn backspace(&mut self) {
        let cursor = self.input_cursor;
        let input = self.session.pending_input_mut();
        if let Some((prev, _)) = input[..cursor].char_indices().next_back() {
            input.drain(prev..cursor);
            self.input_cursor = prev;
        }
    }

    fn delete(&mut self) {
        let cursor = self.input_cursor;
        let input = self.session.pending_input_mut();
        if let Some(ch) = input[cursor..].chars().next() {
            input.drain(cursor..cursor + ch.len_utf8());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_chat::{DEFAULT_GREETING, Mode, Role};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_str(state: &mut UiState, text: &str) {
        for ch in text.chars() {
            assert_eq!(state.handle_key(key(KeyCode::Char(ch))), None);
        }
    }

    fn ui() -> UiState {
        UiState::new(Session::default(), "Parley Personal AI")
    }

    fn texts(state: &UiState) -> Vec<String> {
        state.lines().iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn greeting_is_rendered_on_start() {
        let state = ui();
        assert_eq!(
            texts(&state),
            vec![
                "← [Parley]".to_string(),
                format!("  {DEFAULT_GREETING}"),
                String::new(),
            ]
        );
    }

    #[test]
    fn enter_dispatches_and_completion_renders_both_turns() {
        let mut state = ui();
        type_str(&mut state, "hello");

        let Some(Action::Dispatch(pending)) = state.handle_key(key(KeyCode::Enter)) else {
            panic!("expected dispatch");
        };
        assert!(state.session().is_busy());
        assert_eq!(state.session().pending_input(), "hello");

        let speak = state.complete(pending, ChatOutcome::Success("Hi there!".into()));
        assert!(speak.is_none());
        assert_eq!(state.session().pending_input(), "");
        let speakers: Vec<Role> = state
            .session()
            .transcript()
            .iter()
            .map(|t| t.speaker())
            .collect();
        assert_eq!(speakers, [Role::Bot, Role::User, Role::Bot]);
        assert!(texts(&state).contains(&"  Hi there!".to_string()));
        assert_eq!(state.scroll(), 0);
    }

    #[test]
    fn enter_while_busy_is_refused_and_keeps_input() {
        let mut state = ui();
        type_str(&mut state, "one");
        assert!(state.handle_key(key(KeyCode::Enter)).is_some());
        type_str(&mut state, " more");
        assert_eq!(state.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(state.session().pending_input(), "one more");
        assert!(state.status().is_some());
    }

    #[test]
    fn blank_enter_does_nothing() {
        let mut state = ui();
        type_str(&mut state, "   ");
        assert_eq!(state.handle_key(key(KeyCode::Enter)), None);
        assert!(!state.session().is_busy());
        assert_eq!(state.session().transcript().len(), 1);
    }

    #[test]
    fn failure_sets_status_without_adding_lines() {
        let mut state = ui();
        type_str(&mut state, "hello");
        let Some(Action::Dispatch(pending)) = state.handle_key(key(KeyCode::Enter)) else {
            panic!("expected dispatch");
        };
        let before = state.lines().len();
        state.complete(
            pending,
            ChatOutcome::Failure {
                reason: "down".into(),
            },
        );
        assert_eq!(state.lines().len(), before);
        assert!(state.status().is_some());
        assert!(!state.session().is_busy());
    }

    #[test]
    fn ctrl_t_opens_voice_prompt_which_captures_keys() {
        let mut state = ui();
        state.handle_key(ctrl('t'));
        assert_eq!(state.session().mode(), Mode::Voice);
        assert!(state.session().show_voice_popup());

        // Typing is swallowed until a voice is picked.
        state.handle_key(key(KeyCode::Char('x')));
        assert_eq!(state.session().pending_input(), "");
        assert!(state.session().show_voice_popup());

        state.handle_key(key(KeyCode::Char('2')));
        assert!(!state.session().show_voice_popup());
        assert_eq!(state.session().voice_preference(), VoicePreference::Male);

        state.handle_key(ctrl('t'));
        assert_eq!(state.session().mode(), Mode::Text);
        assert!(!state.session().show_voice_popup());
    }

    #[test]
    fn voice_mode_completion_requests_speech() {
        let mut state = ui();
        state.handle_key(ctrl('t'));
        state.handle_key(key(KeyCode::Char('f')));
        type_str(&mut state, "test");
        let Some(Action::Dispatch(pending)) = state.handle_key(key(KeyCode::Enter)) else {
            panic!("expected dispatch");
        };
        let speak = state.complete(pending, ChatOutcome::Success("ok".into()));
        assert_eq!(
            speak,
            Some(SpeakRequest {
                text: "ok".into(),
                preference: VoicePreference::Female,
            })
        );
    }

    #[test]
    fn slash_commands_change_mode_and_voice() {
        let mut state = ui();
        type_str(&mut state, "/voice male");
        assert_eq!(state.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(state.session().voice_preference(), VoicePreference::Male);
        assert_eq!(state.session().pending_input(), "");

        type_str(&mut state, "/voice");
        state.handle_key(key(KeyCode::Enter));
        assert_eq!(state.session().mode(), Mode::Voice);
        assert!(state.session().show_voice_popup());
        state.handle_key(key(KeyCode::Esc));
        assert!(!state.session().show_voice_popup());
        assert_eq!(state.session().voice_preference(), VoicePreference::Male);

        type_str(&mut state, "/mode text");
        state.handle_key(key(KeyCode::Enter));
        assert_eq!(state.session().mode(), Mode::Text);
        assert_eq!(state.session().transcript().len(), 1);
    }

    #[test]
    fn quit_via_command_and_ctrl_keys() {
        let mut state = ui();
        type_str(&mut state, "/quit");
        assert_eq!(state.handle_key(key(KeyCode::Enter)), Some(Action::Quit));
        assert_eq!(state.handle_key(ctrl('c')), Some(Action::Quit));
        assert_eq!(state.handle_key(ctrl('q')), Some(Action::Quit));
    }

    #[test]
    fn unknown_command_prints_hint() {
        let mut state = ui();
        type_str(&mut state, "/bogus");
        state.handle_key(key(KeyCode::Enter));
        assert!(texts(&state).iter().any(|l| l.contains("Unknown command: /bogus")));
    }

    #[test]
    fn editing_respects_char_boundaries() {
        let mut state = ui();
        type_str(&mut state, "héllo");
        state.handle_key(key(KeyCode::Home));
        state.handle_key(key(KeyCode::Right));
        state.handle_key(key(KeyCode::Right));
        state.handle_key(key(KeyCode::Backspace));
        assert_eq!(state.session().pending_input(), "hllo");
        state.handle_key(key(KeyCode::Delete));
        assert_eq!(state.session().pending_input(), "hlo");
        state.handle_key(key(KeyCode::End));
        state.handle_key(key(KeyCode::Left));
        type_str(&mut state, "é");
        assert_eq!(state.session().pending_input(), "hléo");
        state.handle_key(key(KeyCode::Esc));
        assert_eq!(state.session().pending_input(), "");
    }

    #[test]
    fn scrolling_and_auto_scroll() {
        let mut state = ui();
        state.handle_key(key(KeyCode::PageUp));
        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.scroll(), 6);
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.scroll(), 5);

        type_str(&mut state, "hello");
        let Some(Action::Dispatch(pending)) = state.handle_key(key(KeyCode::Enter)) else {
            panic!("expected dispatch");
        };
        state.complete(pending, ChatOutcome::Success("hi".into()));
        assert_eq!(state.scroll(), 0);
    }

    #[test]
    fn spinner_only_moves_while_busy() {
        let mut state = ui();
        state.step_spinner();
        assert_eq!(state.snapshot().spinner, " ");
        type_str(&mut state, "x");
        state.handle_key(key(KeyCode::Enter));
        state.step_spinner();
        assert_eq!(state.snapshot().spinner, BRAILLE_FRAMES[1]);
        assert!(state.snapshot().busy);
    }
}
