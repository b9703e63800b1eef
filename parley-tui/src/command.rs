use parley_chat::{Mode, VoicePreference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mode(Mode),             // /text | /voice | /mode text|voice
    Voice(VoicePreference), // /voice female|male
    Help,                   // /help
    Quit,                   // /quit or /exit
    Unknown(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Command::Unknown(trimmed.to_string());
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let arg = parts
        .next()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty());

    match (verb, arg.as_deref()) {
        ("/text", None) => Command::Mode(Mode::Text),
        ("/voice", None) => Command::Mode(Mode::Voice),
        ("/voice", Some(choice)) => match parse_voice(choice) {
            Some(pref) => Command::Voice(pref),
            None => Command::Unknown(trimmed.to_string()),
        },
        ("/mode", Some("text")) => Command::Mode(Mode::Text),
        ("/mode", Some("voice")) => Command::Mode(Mode::Voice),
        ("/help", _) => Command::Help,
        ("/quit" | "/exit", _) => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

fn parse_voice(choice: &str) -> Option<VoicePreference> {
    match choice {
        "female" | "f" => Some(VoicePreference::Female),
        "male" | "m" => Some(VoicePreference::Male),
        _ => None,
    }
}

pub const HELP: &[(&str, &str)] = &[
    ("/text", "switch to Text mode"),
    ("/voice", "switch to Voice mode and pick a voice"),
    ("/mode text|voice", "switch mode"),
    ("/voice female|male", "set the voice preference"),
    ("/help", "show this list"),
    ("/quit", "exit"),
    ("Ctrl-T", "toggle Text/Voice"),
    ("PgUp/PgDn", "scroll the transcript"),
];
