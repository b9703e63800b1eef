use crate::styles;
use parley_chat::{Role, Turn};
use ratatui::style::Style;

#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptLine {
    pub text: String,
    pub style: Style,
}

impl TranscriptLine {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Display lines for one turn: a speaker header, indented body, blank spacer.
pub fn render_turn(turn: &Turn) -> Vec<TranscriptLine> {
    let (header, header_style, body) = match turn.speaker() {
        Role::User => ("→ [You]", styles::USER_HEADER, styles::USER_TEXT),
        Role::Bot => ("← [Parley]", styles::BOT_HEADER, styles::BOT_TEXT),
    };

    let mut out = vec![TranscriptLine::new(header, header_style)];
    out.extend(
        turn.text()
            .lines()
            .map(|line| TranscriptLine::new(format!("  {line}"), body)),
    );
    out.push(TranscriptLine::new("", Style::default()));
    out
}
