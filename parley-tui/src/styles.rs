//! Palette for the chat screen. Speakers get one hue each: the header
//! line is bold, the body plain.
use ratatui::style::{Color, Modifier, Style};

const YOU: Color = Color::Cyan;
const PARLEY: Color = Color::LightGreen;

pub const USER_HEADER: Style = Style::new().fg(YOU).add_modifier(Modifier::BOLD);
pub const USER_TEXT: Style = Style::new().fg(YOU);
pub const BOT_HEADER: Style = Style::new().fg(PARLEY).add_modifier(Modifier::BOLD);
pub const BOT_TEXT: Style = Style::new().fg(PARLEY);

pub const TITLE: Style = Style::new().fg(YOU).add_modifier(Modifier::BOLD);
pub const LABEL: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
pub const VALUE: Style = Style::new().fg(Color::White);
pub const DIM: Style = Style::new().fg(Color::DarkGray);
/// Local notes such as `/help` output and mode changes.
pub const SYSTEM: Style = Style::new().fg(Color::Gray);
/// Highlighted option in the voice chooser.
pub const SELECTED: Style = Style::new()
    .fg(Color::Black)
    .bg(PARLEY)
    .add_modifier(Modifier::BOLD);
pub const ERROR: Style = Style::new().fg(Color::Red).add_modifier(Modifier::BOLD);
