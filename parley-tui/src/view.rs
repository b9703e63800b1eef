use crate::{styles, transcript::TranscriptLine};
use anyhow::Result;
use ratatui::{
    Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use textwrap::wrap;

/// Everything one frame needs, copied out of the UI state.
pub struct ViewSnap {
    pub title: String,
    pub mode: &'static str,
    pub voice: &'static str,
    pub input: String,
    pub input_cursor: usize,
    pub lines: Vec<TranscriptLine>,
    pub scroll: usize,
    pub busy: bool,
    pub spinner: &'static str,
    pub show_voice_popup: bool,
    pub status: Option<String>,
}

pub fn draw<B: Backend>(term: &mut Terminal<B>, snap: &ViewSnap) -> Result<()> {
    term.draw(|frame| {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled(format!(" {} ", snap.title), styles::TITLE),
            Span::styled(" mode: ", styles::DIM),
            Span::styled(snap.mode, styles::LABEL),
            Span::styled(format!(" ({} voice)", snap.voice), styles::DIM),
        ]))
        .wrap(Wrap { trim: true });
        frame.render_widget(header, layout[0]);

        // Transcript, bottom-anchored; `scroll` counts rows up from the end.
        let visible_h = layout[1].height.saturating_sub(2) as usize;
        let content_width = layout[1].width.saturating_sub(2) as usize;
        let wrapped = wrap_transcript(&snap.lines, content_width);
        let (start, end) = visible_window(wrapped.len(), visible_h, snap.scroll);

        let items: Vec<ListItem> = wrapped[start..end]
            .iter()
            .map(|(text, style)| ListItem::new(Line::from(Span::styled(text.clone(), *style))))
            .collect();
        let body =
            List::new(items).block(Block::default().borders(Borders::ALL).title(" Transcript "));
        frame.render_widget(body, layout[1]);

        let input_title = if snap.busy {
            " Message (waiting for reply) "
        } else {
            " Message "
        };
        let input_box = Paragraph::new(snap.input.clone())
            .block(Block::default().borders(Borders::ALL).title(input_title));
        frame.render_widget(Clear, layout[2]);
        frame.render_widget(input_box, layout[2]);

        let status_line = Line::from(vec![
            Span::raw(" "),
            Span::styled(snap.spinner, styles::LABEL),
            Span::raw(" "),
            match (&snap.status, snap.busy) {
                (_, true) => Span::styled("Thinking…", styles::LABEL),
                (Some(msg), false) => Span::styled(msg.clone(), styles::ERROR),
                (None, false) => Span::styled("Ready", styles::SYSTEM),
            },
        ]);
        let status = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::ALL).title(" Status "));
        frame.render_widget(status, layout[3]);

        if snap.show_voice_popup {
            let popup = popup_area(area, 36, 7);
            frame.render_widget(Clear, popup);
            frame.render_widget(voice_popup(snap.voice), popup);
        } else {
            let caret_x = layout[2].x + 1 + visual_caret_col(&snap.input, snap.input_cursor);
            frame.set_cursor_position(Position {
                x: caret_x.min(layout[2].right().saturating_sub(2)),
                y: layout[2].y + 1,
            });
        }
    })?;

    Ok(())
}

fn voice_popup(current: &'static str) -> Paragraph<'static> {
    let option = |key: &'static str, name: &'static str| {
        let style = if name == current {
            styles::SELECTED
        } else {
            styles::VALUE
        };
        Span::styled(format!(" [{key}] {name} "), style)
    };
    Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            option("f", "female"),
            Span::raw("   "),
            option("m", "male"),
        ]),
        Line::from(""),
        Line::from(Span::styled("press f/1 or m/2", styles::DIM)),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Choose a voice "),
    )
}

/// Rows `[start, end)` of a `total`-row transcript shown in a `height`-row
/// window scrolled `scroll` rows up from the bottom.
fn visible_window(total: usize, height: usize, scroll: usize) -> (usize, usize) {
    let scroll = scroll.min(total.saturating_sub(height));
    let end = total - scroll;
    (end.saturating_sub(height), end)
}

/// Centered rectangle of at most `width` x `height` inside `area`.
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn visual_caret_col(input: &str, cursor: usize) -> u16 {
    use unicode_width::UnicodeWidthStr;
    UnicodeWidthStr::width(&input[..cursor]) as u16
}

fn wrap_transcript(lines: &[TranscriptLine], width: usize) -> Vec<(String, Style)> {
    let effective_width = width.max(1);
    let mut out = Vec::new();

    for entry in lines {
        let style = entry.style;
        for raw_line in entry.text.split('\n') {
            let segments = wrap(raw_line, effective_width);
            if segments.is_empty() {
                out.push((String::new(), style));
            } else {
                out.extend(segments.into_iter().map(|seg| (seg.into_owned(), style)));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn snap() -> ViewSnap {
        ViewSnap {
            title: "Parley Personal AI".into(),
            mode: "Voice",
            voice: "male",
            input: "hello".into(),
            input_cursor: 5,
            lines: vec![TranscriptLine::new("Hi boss", Style::default())],
            scroll: 0,
            busy: false,
            spinner: " ",
            show_voice_popup: false,
            status: None,
        }
    }

    fn screen(snap: &ViewSnap) -> String {
        let mut term = Terminal::new(TestBackend::new(60, 16)).unwrap();
        draw(&mut term, snap).unwrap();
        term.backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn header_shows_title_and_mode() {
        let out = screen(&snap());
        assert!(out.contains("Parley Personal AI"));
        assert!(out.contains("Voice"));
        assert!(out.contains("Hi boss"));
        assert!(out.contains("Ready"));
        assert!(!out.contains("Choose a voice"));
    }

    #[test]
    fn busy_and_popup_are_rendered() {
        let mut s = snap();
        s.busy = true;
        s.show_voice_popup = true;
        let out = screen(&s);
        assert!(out.contains("Thinking"));
        assert!(out.contains("Choose a voice"));
        assert!(out.contains("[m] male"));
    }

    #[test]
    fn status_message_shown_when_idle() {
        let mut s = snap();
        s.status = Some("request failed".into());
        assert!(screen(&s).contains("request failed"));
    }

    #[test]
    fn window_clamps_scroll() {
        assert_eq!(visible_window(10, 4, 0), (6, 10));
        assert_eq!(visible_window(10, 4, 3), (3, 7));
        assert_eq!(visible_window(10, 4, 99), (0, 4));
        assert_eq!(visible_window(2, 4, 5), (0, 2));
    }

    #[test]
    fn popup_is_centered_and_clipped() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(popup_area(area, 20, 4), Rect::new(10, 3, 20, 4));
        assert_eq!(popup_area(area, 80, 20), area);
    }

    #[test]
    fn wrapping_splits_long_and_multiline_entries() {
        let lines = vec![
            TranscriptLine::new("aaaa bbbb", Style::default()),
            TranscriptLine::new("x\n\ny", Style::default()),
            TranscriptLine::new("", Style::default()),
        ];
        let texts: Vec<String> = wrap_transcript(&lines, 4)
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(texts, ["aaaa", "bbbb", "x", "", "y", ""]);
    }
}
