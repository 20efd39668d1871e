use crate::api::SearchBackend;
use crate::app::{App, InputMode, Source};
use crate::fetch::TriggerPolicy;
use crate::stories::Story;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn render<B: SearchBackend, S: KeyValueStore>(app: &App<B, S>, frame: &mut Frame) {
    let area = frame.area();

    // Layout: header(3) + search(3) + body(min) + status(1)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    let stories = app.visible_stories();

    // ── Header ──
    let source_label = match app.source {
        Source::Remote => "remote",
        Source::Local => "local",
    };
    let header_text = format!(
        " Hacker News Search   [{} stories, {}]",
        stories.len(),
        source_label
    );
    let header = Paragraph::new(header_text)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(header, chunks[0]);

    // ── Search bar ──
    render_search_bar(app, frame, chunks[1]);

    // ── Body: error banner, loading indicator, or the list ──
    let state = app.state();
    let body = if state.is_error {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(chunks[2]);
        let banner = Paragraph::new(" Something went wrong ...").style(
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(banner, split[0]);
        split[1]
    } else {
        chunks[2]
    };

    if state.is_loading {
        let loading = Paragraph::new(" Loading ...")
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(" Stories "),
            );
        frame.render_widget(loading, body);
    } else {
        render_stories(app, &stories, frame, body);
    }

    // ── Status bar ──
    let key = |k: &'static str| {
        Span::styled(
            k,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    };
    let status_line = Line::from(vec![
        key(" ↑↓"),
        Span::raw(" Navigate  "),
        key("/"),
        Span::raw(" Search  "),
        key("d"),
        Span::raw(" Dismiss  "),
        key("o"),
        Span::raw(" Open  "),
        key("?"),
        Span::raw(" Help  "),
        key("q"),
        Span::raw(" Quit  "),
        Span::styled(&app.status_msg, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(status_line), chunks[3]);
}

fn render_search_bar<B: SearchBackend, S: KeyValueStore>(
    app: &App<B, S>,
    frame: &mut Frame,
    area: Rect,
) {
    let editing = app.input_mode == InputMode::Editing;
    let style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let label = match (editing, app.trigger()) {
        (true, TriggerPolicy::Manual) => " Search (Enter to submit, Esc to stop): ",
        (true, TriggerPolicy::Automatic) => " Search (Esc to stop): ",
        (false, _) => " Search (/): ",
    };

    let mut title = String::from(" Search ");
    if app.trigger() == TriggerPolicy::Manual && app.query.input() != app.query.confirmed() {
        title = format!(" Search: showing \"{}\" ", app.query.confirmed());
    }

    let bar = Paragraph::new(format!("{}{}", label, app.query.input()))
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title(title),
        );
    frame.render_widget(bar, area);

    if editing {
        let x = area.x + 1 + label.width() as u16 + app.query.input().width() as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_stories<B: SearchBackend, S: KeyValueStore>(
    app: &App<B, S>,
    stories: &[&Story],
    frame: &mut Frame,
    area: Rect,
) {
    let now = Utc::now();
    let title_width = (area.width as usize).saturating_sub(50).max(10);

    // Only build the rows around the selection; the list can be long.
    let start = app
        .list_selected
        .saturating_sub(app.page_size.saturating_sub(1))
        .min(stories.len());
    let end = (start + app.page_size).min(stories.len());

    let items: Vec<ListItem> = stories[start..end]
        .iter()
        .map(|story| {
            let mut spans = vec![
                Span::styled(
                    truncate_str(&story.title, title_width),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", story.author),
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(
                    format!("  {} comments", story.num_comments),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if let Some(points) = story.points {
                spans.push(Span::styled(
                    format!("  {} points", points),
                    Style::default().fg(Color::Yellow),
                ));
            }
            if let Some(created) = story.created_at {
                spans.push(Span::styled(
                    format!("  {}", format_age(created, now)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            if !story.url.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", story.url),
                    Style::default().fg(Color::Blue),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let page_info = format!(
        " {} of {} ",
        if stories.is_empty() { 0 } else { app.list_selected + 1 },
        stories.len()
    );

    let list_widget = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Stories ")
                .title_bottom(Line::from(page_info).alignment(Alignment::Right)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut list_state = ListState::default();
    if end > start {
        list_state.select(Some(app.list_selected.min(end - 1) - start));
    }
    frame.render_stateful_widget(list_widget, area, &mut list_state);
}

/// Truncate a string to `max_width` display columns, adding "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        used += w;
        result.push(c);
    }
    result.push('…');
    result
}

/// Short relative age such as "5m ago" or "3d ago".
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(created);
    if age.num_minutes() < 1 {
        "just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else if age.num_days() < 365 {
        format!("{}d ago", age.num_days())
    } else {
        format!("{}y ago", age.num_days() / 365)
    }
}
