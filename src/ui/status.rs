//! Status bar with step position, keybindings and state badges

use crate::theme::Theme;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// What the status bar reports about the viewer
#[derive(Debug, Clone, Copy)]
pub struct StatusInfo<'a> {
    pub message: &'a str,
    pub current_step: usize,
    pub total_steps: usize,
    pub is_playing: bool,
    /// The program has finished: the control stack is empty
    pub is_done: bool,
    pub animate: bool,
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, area: Rect, info: StatusInfo<'_>, theme: &Theme) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let bar = Style::default().bg(theme.highlight_bg);
    let left_spans = vec![
        Span::styled(
            format!(" Step {}/{} ", info.current_step + 1, info.total_steps.max(1)),
            Style::default()
                .bg(theme.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", bar.fg(theme.comment)),
        Span::styled(format!(" {} ", info.message), bar.fg(theme.fg)),
    ];

    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(bar)
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(theme.comment).fg(Color::Black);
    let desc_style = bar.fg(theme.fg);
    let sep_style = bar.fg(theme.comment);

    let mut right_spans = Vec::new();
    let keys: [(&str, &str); 7] = [
        (" ←/→ ", " step "),
        (" ⎵ ", " play "),
        (" t ", " truncate "),
        (" s ", " stacks "),
        (" p ", " palette "),
        (" a ", if info.animate { " animate:on " } else { " animate:off " }),
        ("q", " quit "),
    ];
    for (i, (key, desc)) in keys.into_iter().enumerate() {
        if i > 0 {
            right_spans.push(Span::styled("│", sep_style));
            right_spans.push(Span::styled(" ", desc_style));
        }
        right_spans.push(Span::styled(key, key_style));
        right_spans.push(Span::styled(desc, desc_style));
    }

    let badge = |text: &'static str, color: Color| {
        Span::styled(
            text,
            Style::default()
                .bg(color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
    };
    let is_at_end = info.current_step + 1 >= info.total_steps;
    let indicator = if info.is_playing {
        Some(badge(" ▶ PLAYING ", theme.secondary))
    } else if info.is_done {
        Some(badge(" DONE ", theme.success))
    } else if is_at_end {
        Some(badge(" END ", theme.error))
    } else if info.current_step == 0 {
        Some(badge(" START ", theme.success))
    } else {
        None
    };
    if let Some(indicator) = indicator {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(indicator);
    }

    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(bar)
            .alignment(Alignment::Right),
        layout[1],
    );
}
