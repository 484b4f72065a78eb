//! UI rendering functions.

use std::path::Path;
use std::time::Duration;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::exchange::{DetailLevel, ExchangeState, GenerationResult, Tone};
use crate::form::{FormField, GoalForm};

/// Maximum length for single-line path and status displays.
pub const STATUS_ITEM_MAX_LEN: usize = 48;

const GOAL_PLACEHOLDER: &str =
    "e.g., Create a prompt that teaches Python DSA concepts step-by-step with code examples";

const PRO_TIPS: [&str; 4] = [
    "Test prompts with your favorite AI model (Claude, GPT, Gemini)",
    "Modify tone/detail and regenerate for variations",
    "Combine elements from multiple prompts for custom results",
    "Save working prompts for reuse across projects",
];

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Formats a duration as M:SS (under 1 hour) or H:MM:SS (1+ hours).
pub fn format_elapsed(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Truncates a string to the given maximum length in characters, appending "..." if truncated.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    // Replace newlines with spaces for single-line display
    let single_line: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();

    if single_line.chars().count() <= max_len {
        single_line
    } else {
        let head: String = single_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Contract a path by replacing the home directory with `~` for display.
pub fn contract_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Results pane content before the first generation.
pub fn welcome_lines() -> Vec<Line<'static>> {
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::DarkGray);
    vec![
        Line::from(Span::styled("⚡ Instant Generation", heading)),
        Line::from(Span::styled("   Get optimized prompts in seconds", muted)),
        Line::raw(""),
        Line::from(Span::styled("🎯 Highly Specific", heading)),
        Line::from(Span::styled("   Customized for your exact use case", muted)),
        Line::raw(""),
        Line::from(Span::styled("🔄 Reusable", heading)),
        Line::from(Span::styled("   Works across all AI models", muted)),
    ]
}

pub fn in_flight_lines() -> Vec<Line<'static>> {
    vec![Line::from(Span::styled(
        "✨ Crafting your perfect prompts...",
        Style::default().fg(Color::Yellow),
    ))]
}

/// Results pane content for a successful generation.
pub fn result_lines(result: &GenerationResult) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "✓ Prompts generated!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
    ];

    let title_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let content_style = Style::default().fg(Color::White);

    for (i, prompt) in result.prompts().iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("Prompt {}: {}", i + 1, prompt.title),
            title_style,
        )));
        for content_line in prompt.content.lines() {
            lines.push(Line::from(Span::styled(
                content_line.to_string(),
                content_style,
            )));
        }
        lines.push(Line::raw(""));
    }

    lines.push(Line::from(Span::styled(
        "─".repeat(35),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "💡 Pro Tips",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )));
    for tip in PRO_TIPS {
        lines.push(Line::raw(format!("- {}", tip)));
    }
    lines
}

/// Results pane content for a failed generation.
pub fn error_lines(message: &str) -> Vec<Line<'static>> {
    message
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Red))))
        .collect()
}

/// Append `text` to the lines being built, starting a new line at each `\n`.
fn push_text(
    lines: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
    text: &str,
    style: Style,
) {
    let mut parts = text.split('\n');
    if let Some(first) = parts.next()
        && !first.is_empty()
    {
        current.push(Span::styled(first.to_string(), style));
    }
    for part in parts {
        lines.push(Line::from(std::mem::take(current)));
        if !part.is_empty() {
            current.push(Span::styled(part.to_string(), style));
        }
    }
}

/// Goal text as display lines, with a block cursor when focused.
pub fn goal_lines(form: &GoalForm, focused: bool) -> Vec<Line<'static>> {
    if form.goal.is_empty() && !focused {
        return vec![Line::from(Span::styled(
            GOAL_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let text_style = Style::default().fg(Color::White);
    let cursor_style = Style::default().fg(Color::Black).bg(Color::White);
    let (before, after) = form.split_at_cursor();

    let mut lines = Vec::new();
    let mut current = Vec::new();
    push_text(&mut lines, &mut current, before, text_style);

    if focused {
        match after.chars().next() {
            Some(c) if c != '\n' => {
                current.push(Span::styled(c.to_string(), cursor_style));
                push_text(&mut lines, &mut current, &after[c.len_utf8()..], text_style);
            }
            _ => {
                current.push(Span::styled(" ", cursor_style));
                push_text(&mut lines, &mut current, after, text_style);
            }
        }
    } else {
        push_text(&mut lines, &mut current, after, text_style);
    }

    lines.push(Line::from(current));
    lines
}

fn selector_line<T: Copy + PartialEq>(
    options: &[T],
    selected: T,
    label: impl Fn(T) -> &'static str,
    focused: bool,
) -> Line<'static> {
    let selected_style = if focused {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    };
    let other_style = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    for (i, option) in options.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        let style = if *option == selected {
            selected_style
        } else {
            other_style
        };
        spans.push(Span::styled(format!(" {} ", label(*option)), style));
    }
    Line::from(spans)
}

fn field_block(title: &'static str, focused: bool) -> Block<'static> {
    let (border_style, border_type) = if focused {
        (Style::default().fg(Color::Cyan), BorderType::Thick)
    } else {
        (Style::default().fg(Color::DarkGray), BorderType::Rounded)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(Line::from(format!(" {} ", title)).left_aligned())
}

fn draw_form(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.form;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    // Goal input, scrolled so the cursor line stays visible
    let goal_focused = form.focus == FormField::Goal;
    let lines = goal_lines(form, goal_focused);
    let inner_height = rows[0].height.saturating_sub(2);
    let inner_width = rows[0].width.saturating_sub(2);
    let cursor_line = form.split_at_cursor().0.matches('\n').count();
    let through_cursor = lines
        .get(..=cursor_line.min(lines.len().saturating_sub(1)))
        .map(|head| {
            Paragraph::new(head.to_vec())
                .wrap(Wrap { trim: false })
                .line_count(inner_width) as u16
        })
        .unwrap_or(0);
    let goal_scroll = through_cursor.saturating_sub(inner_height);

    let goal = Paragraph::new(lines)
        .block(field_block("What do you want your AI to do?", goal_focused))
        .wrap(Wrap { trim: false })
        .scroll((goal_scroll, 0));
    f.render_widget(goal, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(36),
            Constraint::Length(32),
        ])
        .split(rows[1]);

    let tone_focused = form.focus == FormField::Tone;
    let tone = Paragraph::new(selector_line(&Tone::ALL, form.tone, |t| t.label(), tone_focused))
        .block(field_block("Tone", tone_focused));
    f.render_widget(tone, columns[0]);

    let detail_focused = form.focus == FormField::Detail;
    let detail = Paragraph::new(selector_line(
        &DetailLevel::ALL,
        form.detail,
        |d| d.label(),
        detail_focused,
    ))
    .block(field_block("Detail Level", detail_focused));
    f.render_widget(detail, columns[1]);

    let button_focused = form.focus == FormField::GenerateButton;
    let button_style = if app.is_in_flight() {
        Style::default().fg(Color::DarkGray)
    } else if button_focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD)
    };
    let button = Paragraph::new(Line::from(Span::styled(
        " 🚀 Generate Perfect Prompts ",
        button_style,
    )))
    .centered()
    .block(field_block("", button_focused));
    f.render_widget(button, columns[2]);
}

fn status_text(app: &App) -> String {
    match app.state {
        ExchangeState::InFlight => {
            let frame = SPINNER_FRAMES[(app.frame_count / 4) as usize % SPINNER_FRAMES.len()];
            let elapsed = app
                .run_start_time
                .map(|t| format_elapsed(t.elapsed()))
                .unwrap_or_default();
            format!("{} {} {}", frame, app.state.label(), elapsed)
        }
        ExchangeState::Succeeded => match app.last_run_duration {
            Some(d) => format!("{} {}", app.state.label(), format_elapsed(d)),
            None => app.state.label().to_string(),
        },
        ExchangeState::Idle | ExchangeState::Failed => app.state.label().to_string(),
    }
}

/// Draw the main UI.
pub fn draw_ui(f: &mut Frame, app: &mut App) {
    // Increment frame counter for animations
    app.frame_count = app.frame_count.wrapping_add(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),  // Title
            Constraint::Length(10), // Form (goal + selector row)
            Constraint::Min(0),     // Results (flexible)
            Constraint::Length(3),  // Command panel
        ])
        .split(f.area());

    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "✨ Golden Prompt Generator",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Transform your ideas into perfectly optimized AI prompts",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    f.render_widget(header, chunks[0]);

    draw_form(f, app, chunks[1]);

    // Update main pane dimensions for scroll calculations
    app.main_pane_height = chunks[2].height.saturating_sub(2);
    app.main_pane_width = chunks[2].width;

    let session = app.session_id.as_deref().unwrap_or("no session");
    let mut output_block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.state.border_type())
        .border_style(Style::default().fg(app.state.pulsing_color(app.frame_count)))
        .title(Line::from(format!(" {} ", session)).left_aligned())
        .title(Line::from(format!(" {} ", app.model)).right_aligned());

    // Bottom title: log location (left), config status (right)
    let log_display = match (&app.logging_error, &app.log_directory) {
        (Some(error), _) => Some(Span::styled(
            format!(" logging disabled: {} ", truncate_str(error, STATUS_ITEM_MAX_LEN)),
            Style::default().fg(Color::Yellow),
        )),
        (None, Some(dir)) => Some(Span::raw(format!(
            " logs: {} ",
            truncate_str(&contract_path(dir), STATUS_ITEM_MAX_LEN)
        ))),
        (None, None) => None,
    };
    if let Some(span) = log_display {
        output_block = output_block.title_bottom(Line::from(span).left_aligned());
    }
    output_block = output_block.title_bottom(
        Line::from(format!(
            " config: {} ",
            truncate_str(&app.config_load_status.summary(), STATUS_ITEM_MAX_LEN)
        ))
        .right_aligned(),
    );

    let output_panel = Paragraph::new(app.output_lines.clone())
        .block(output_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    f.render_widget(output_panel, chunks[2]);

    // Scrollbar - only visible when content exceeds viewport
    let visual_lines = app.visual_line_count();
    if visual_lines > app.main_pane_height {
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));

        let mut scrollbar_state = ScrollbarState::default()
            .content_length(visual_lines as usize)
            .position(app.scroll_offset as usize)
            .viewport_content_length(app.main_pane_height as usize);

        f.render_stateful_widget(scrollbar, chunks[2], &mut scrollbar_state);
    }

    // Command panel with keyboard shortcuts (left) and status indicator (right)
    let shortcuts = match app.form.focus {
        FormField::Goal => "[Enter] Generate  [Alt-Enter] Newline  [Tab] Next  [Esc] Quit",
        FormField::Tone | FormField::Detail => {
            "[←/→] Change  [Enter] Generate  [Tab] Next  [q] Quit"
        }
        FormField::GenerateButton => "[Enter] Generate  [↑/↓] Scroll  [Tab] Next  [q] Quit",
    };

    let status_dot = "● ";
    let status = status_text(app);
    let status_color = app.state.pulsing_color(app.frame_count);

    // Calculate spacing to right-align the status indicator
    let inner_width = chunks[3].width.saturating_sub(2) as usize;
    let status_len = status_dot.width() + status.width();
    let shortcuts_len = shortcuts.width();
    let spacing = inner_width.saturating_sub(shortcuts_len + status_len);

    let command_line = Line::from(vec![
        Span::styled(shortcuts, Style::default().fg(Color::DarkGray)),
        Span::raw(" ".repeat(spacing)),
        Span::styled(status_dot, Style::default().fg(status_color)),
        Span::styled(status, Style::default().fg(status_color)),
    ]);

    let command_panel = Paragraph::new(command_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(app.state.border_type())
            .border_style(Style::default().fg(status_color)),
    );
    f.render_widget(command_panel, chunks[3]);

    if app.show_already_running_popup {
        let popup_area = centered_rect(44, 5, f.area());
        f.render_widget(Clear, popup_area);
        let popup = Paragraph::new(vec![
            Line::raw("Generation already running"),
            Line::from(Span::styled(
                "press Enter to dismiss",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Notice")
                .style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(popup, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::parse_reply;

    fn line_text(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    // format_elapsed tests

    #[test]
    fn test_format_elapsed_zero() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0:00");
    }

    #[test]
    fn test_format_elapsed_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(5)), "0:05");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1:05");
        assert_eq!(format_elapsed(Duration::from_secs(3599)), "59:59");
    }

    #[test]
    fn test_format_elapsed_hours() {
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "1:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(7325)), "2:02:05");
    }

    // truncate_str tests

    #[test]
    fn test_truncate_str_short_string() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_str_long_string() {
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        assert_eq!(truncate_str("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_str_with_newlines() {
        assert_eq!(truncate_str("a\nb\nc", 10), "a b c");
    }

    #[test]
    fn test_contract_path() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(contract_path(&home.join("logs").join("golden")), "~/logs/golden");

        let outside = Path::new("/nonexistent/golden");
        if !outside.starts_with(&home) {
            assert_eq!(contract_path(outside), "/nonexistent/golden");
        }
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(10, 4, area), Rect::new(5, 3, 10, 4));
        assert_eq!(centered_rect(50, 50, area), Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn test_result_lines_layout() {
        let result = parse_reply(
            r#"{"prompts": [
                {"title": "Tutor", "content": "Line one\nLine two"},
                {"title": "Coach", "content": "Coach body"},
                {"title": "Quiz", "content": "Quiz body"}
            ]}"#,
        )
        .unwrap();
        let text = line_text(&result_lines(&result));

        assert_eq!(text[0], "✓ Prompts generated!");
        assert_eq!(text[2], "Prompt 1: Tutor");
        assert_eq!(text[3], "Line one");
        assert_eq!(text[4], "Line two");
        let second = text.iter().position(|l| l == "Prompt 2: Coach").unwrap();
        let third = text.iter().position(|l| l == "Prompt 3: Quiz").unwrap();
        let tips = text.iter().position(|l| l == "💡 Pro Tips").unwrap();
        assert!(second < third && third < tips);
        assert_eq!(text.len(), tips + 1 + PRO_TIPS.len());
    }

    #[test]
    fn test_error_lines_are_red() {
        let lines = error_lines("Error: network error: refused");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Red));
    }

    #[test]
    fn test_goal_lines_placeholder_when_unfocused_and_empty() {
        let form = GoalForm::new(Tone::Professional, DetailLevel::Balanced);
        assert_eq!(line_text(&goal_lines(&form, false)), vec![GOAL_PLACEHOLDER]);
    }

    #[test]
    fn test_goal_lines_cursor_at_end() {
        let mut form = GoalForm::new(Tone::Professional, DetailLevel::Balanced);
        for c in "ab".chars() {
            form.insert_char(c);
        }
        let lines = goal_lines(&form, true);
        assert_eq!(line_text(&lines), vec!["ab "]);
        let cursor = lines[0].spans.last().unwrap();
        assert_eq!(cursor.style.bg, Some(Color::White));
    }

    #[test]
    fn test_goal_lines_multiline_cursor_mid_text() {
        let mut form = GoalForm::new(Tone::Professional, DetailLevel::Balanced);
        for c in "one\ntwo".chars() {
            form.insert_char(c);
        }
        form.cursor_home();
        form.cursor_right();
        let lines = goal_lines(&form, true);
        assert_eq!(line_text(&lines), vec!["one", "two"]);
        assert_eq!(lines[0].spans[1].content, "n");
        assert_eq!(lines[0].spans[1].style.bg, Some(Color::White));
    }

    #[test]
    fn test_selector_line_marks_selection() {
        let line = selector_line(&Tone::ALL, Tone::Academic, |t| t.label(), true);
        let selected: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style.bg == Some(Color::Cyan))
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].content, " Academic ");
    }
}
