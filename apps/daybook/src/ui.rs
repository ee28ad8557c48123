//! UI rendering for daybook.

use crate::app::{App, ConfirmDialog, InputField, MessageType, Pane, View};
use daybook_store::{GridCell, Priority, ThemePreference, TimerState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Clear, Gauge, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};

/// Colors for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    today: Color,
    done: Color,
    high: Color,
    low: Color,
    selected_bg: Color,
}

impl Palette {
    const DARK: Palette = Palette {
        text: Color::White,
        muted: Color::DarkGray,
        accent: Color::Yellow,
        today: Color::Cyan,
        done: Color::Green,
        high: Color::Red,
        low: Color::Blue,
        selected_bg: Color::DarkGray,
    };

    const LIGHT: Palette = Palette {
        text: Color::Black,
        muted: Color::Gray,
        accent: Color::Magenta,
        today: Color::Blue,
        done: Color::Green,
        high: Color::Red,
        low: Color::Cyan,
        selected_bg: Color::Gray,
    };

    fn for_theme(theme: Option<ThemePreference>) -> Self {
        match theme.unwrap_or_else(system_theme) {
            ThemePreference::Dark => Self::DARK,
            ThemePreference::Light => Self::LIGHT,
        }
    }

    fn priority(&self, priority: Priority) -> Color {
        match priority {
            Priority::High => self.high,
            Priority::Normal => self.text,
            Priority::Low => self.low,
        }
    }
}

fn system_theme() -> ThemePreference {
    theme_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

/// `COLORFGBG` is "fg;bg" (sometimes "fg;default;bg"); light backgrounds
/// are ANSI 7 and 9-15.
fn theme_from_colorfgbg(value: Option<&str>) -> ThemePreference {
    let bg = value
        .and_then(|v| v.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok());
    match bg {
        Some(7) | Some(9..=15) => ThemePreference::Light,
        _ => ThemePreference::Dark,
    }
}

/// Draw the application.
pub fn draw(f: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.store.theme());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    draw_header(f, app, &palette, chunks[0]);
    match app.view {
        View::Calendar => draw_calendar_view(f, app, &palette, chunks[1]),
        View::Stats => draw_stats_view(f, app, &palette, chunks[1]),
        View::Focus => draw_focus_view(f, app, &palette, chunks[1]),
    }
    draw_footer(f, app, &palette, chunks[2]);

    if app.show_help {
        draw_help_popup(f);
    }

    if let Some(dialog) = &app.confirm_dialog {
        draw_confirm_dialog(f, dialog);
    }

    if app.editing {
        draw_input_dialog(f, app, &palette);
    }
}

fn draw_header(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let title = format!(
        " Daybook - {} | theme: {} ",
        app.selected_date.formatted(),
        ThemePreference::label(app.store.theme())
    );

    let tabs = vec![
        styled_tab("1:Calendar", app.view == View::Calendar, palette),
        Span::raw(" "),
        styled_tab("2:Stats", app.view == View::Stats, palette),
        Span::raw(" "),
        styled_tab("3:Focus", app.view == View::Focus, palette),
    ];

    let header = Paragraph::new(Line::from(tabs))
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);

    f.render_widget(header, area);
}

fn styled_tab<'a>(label: &'a str, active: bool, palette: &Palette) -> Span<'a> {
    if active {
        Span::styled(
            format!("[{}]", label),
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {} ", label), Style::default().fg(palette.muted))
    }
}

fn pane_block<'a>(title: String, focused: bool, palette: &Palette) -> Block<'a> {
    let border = if focused { palette.accent } else { palette.muted };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

// Calendar view

fn draw_calendar_view(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    draw_month_grid(f, app, palette, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(6)])
        .split(columns[1]);

    draw_todo_list(f, app, palette, right[0]);
    draw_note(f, app, palette, right[1]);
}

fn draw_month_grid(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let grid = &app.grid;

    let header = Row::new(
        grid.week_start
            .labels()
            .iter()
            .map(|l| Cell::from(*l).style(Style::default().fg(palette.muted))),
    );

    let rows: Vec<Row> = grid
        .weeks()
        .map(|week| {
            Row::new(week.iter().map(|cell| grid_cell(cell, cell.date == app.selected_date, palette)))
                .height(2)
        })
        .collect();

    let title = format!(" {}  [ ] month  t today ", grid.title());
    let table = Table::new(rows, [Constraint::Ratio(1, 7); 7])
        .header(header)
        .block(pane_block(title, app.pane == Pane::Calendar, palette));

    f.render_widget(table, area);
}

fn grid_cell<'a>(cell: &GridCell, selected: bool, palette: &Palette) -> Cell<'a> {
    let marker = if cell.has_open_todos() {
        "•"
    } else if cell.todo_count > 0 {
        "✓"
    } else {
        " "
    };
    let note = if cell.has_note { "*" } else { " " };
    let text = format!("{:>2}{}{}", cell.date.day(), marker, note);

    let mut style = if !cell.in_month {
        Style::default().fg(palette.muted)
    } else if cell.is_today {
        Style::default().fg(palette.today).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(palette.text)
    };
    if selected {
        style = style.bg(palette.selected_bg).add_modifier(Modifier::BOLD);
    }

    Cell::from(text).style(style)
}

fn draw_todo_list(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let todos = app.visible_todos();
    let title = format!(
        " Todos ({}) | new: {} {} ",
        todos.len(),
        app.new_priority.symbol(),
        app.new_priority.label()
    );
    let block = pane_block(title, app.pane == Pane::Todos, palette);

    if todos.is_empty() {
        let msg = Paragraph::new("No todos for this day. Press 'a' to add one.")
            .style(Style::default().fg(palette.muted))
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let items: Vec<ListItem> = todos
        .iter()
        .map(|todo| {
            let text_style = if todo.done {
                Style::default().fg(palette.muted).add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(palette.text)
            };
            let check_color = if todo.done { palette.done } else { palette.muted };
            ListItem::new(Line::from(vec![
                Span::styled(todo.checkbox(), Style::default().fg(check_color)),
                Span::raw(" "),
                Span::styled(todo.priority.symbol(), Style::default().fg(palette.priority(todo.priority))),
                Span::raw(" "),
                Span::styled(todo.text.clone(), text_style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(palette.selected_bg).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    if app.pane == Pane::Todos {
        state.select(Some(app.selected_index));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_note(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let note = app.store.note(app.selected_date);
    let (text, style) = if note.is_empty() {
        ("Press 'n' to write a note.", Style::default().fg(palette.muted))
    } else {
        (note, Style::default().fg(palette.text))
    };

    let paragraph = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(" Note "))
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

// Stats view

fn draw_stats_view(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let stats = app.stats();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(8)])
        .split(area);

    let focus = app.focus.stats();
    let label = Style::default().fg(palette.muted);
    let lines = vec![
        Line::from(vec![
            Span::styled("Total todos:      ", label),
            Span::raw(stats.total.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Completed:        ", label),
            Span::styled(stats.completed.to_string(), Style::default().fg(palette.done)),
        ]),
        Line::from(vec![
            Span::styled("Completion rate:  ", label),
            Span::raw(format!("{}%", stats.completion_rate)),
        ]),
        Line::from(vec![
            Span::styled("Active days:      ", label),
            Span::raw(stats.active_days.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Focus sessions:   ", label),
            Span::raw(format!(
                "{} today, {} total ({})",
                focus.today_sessions,
                focus.total_sessions,
                focus.format_focus_time()
            )),
        ]),
    ];

    let summary = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Overview "));
    f.render_widget(summary, chunks[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let recent_labels: Vec<String> = stats
        .recent
        .iter()
        .map(|(date, _)| date.date().format("%a").to_string())
        .collect();
    let recent: Vec<(&str, u64)> = recent_labels
        .iter()
        .zip(&stats.recent)
        .map(|(label, (_, count))| (label.as_str(), *count as u64))
        .collect();

    let recent_chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Last 7 Days "))
        .data(recent.as_slice())
        .max(stats.recent_max().max(1) as u64)
        .bar_width(4)
        .bar_gap(1)
        .bar_style(Style::default().fg(palette.accent))
        .value_style(Style::default().fg(palette.text).add_modifier(Modifier::BOLD));
    f.render_widget(recent_chart, charts[0]);

    let priorities: Vec<(&str, u64)> = Priority::ALL
        .iter()
        .map(|p| (p.label(), stats.priorities.get(*p) as u64))
        .collect();

    let priority_chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" By Priority "))
        .data(priorities.as_slice())
        .bar_width(6)
        .bar_gap(2)
        .bar_style(Style::default().fg(palette.today))
        .value_style(Style::default().fg(palette.text).add_modifier(Modifier::BOLD));
    f.render_widget(priority_chart, charts[1]);
}

// Focus view

fn draw_focus_view(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let timer = &app.focus;
    let mode_color = if timer.mode().is_break() { palette.done } else { palette.high };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let state = match timer.state() {
        TimerState::Idle => "Ready",
        TimerState::Running => "Running",
        TimerState::Paused => "Paused",
    };

    let clock = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            timer.mode().name(),
            Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            timer.format_remaining(),
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(state, Style::default().fg(palette.muted))),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Focus Timer "))
    .alignment(Alignment::Center);
    f.render_widget(clock, chunks[0]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .ratio(timer.progress())
        .gauge_style(Style::default().fg(mode_color));
    f.render_widget(gauge, chunks[1]);

    let settings = timer.settings();
    let stats = timer.stats();
    let label = Style::default().fg(palette.muted);
    let on_off = |b: bool| if b { "on" } else { "off" };
    let lines = vec![
        Line::from(vec![
            Span::styled("Today:        ", label),
            Span::raw(format!("{} sessions", stats.today_sessions)),
        ]),
        Line::from(vec![
            Span::styled("Long break:   ", label),
            Span::raw(format!("in {} sessions", timer.until_long_break())),
        ]),
        Line::from(vec![
            Span::styled("Total:        ", label),
            Span::raw(format!("{} sessions, {}", stats.total_sessions, stats.format_focus_time())),
        ]),
        Line::from(vec![
            Span::styled("Lengths:      ", label),
            Span::raw(format!(
                "{}/{}/{} min",
                settings.focus_mins, settings.short_break_mins, settings.long_break_mins
            )),
        ]),
        Line::from(vec![
            Span::styled("Sound:        ", label),
            Span::raw(on_off(settings.sound_enabled)),
            Span::styled("   Auto breaks: ", label),
            Span::raw(on_off(settings.auto_start_breaks)),
        ]),
    ];

    let details = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Sessions "));
    f.render_widget(details, chunks[2]);
}

// Footer and popups

fn draw_footer(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let (msg, style) = if let Some((ref message, msg_type)) = app.message {
        let color = match msg_type {
            MessageType::Info => Color::Blue,
            MessageType::Success => Color::Green,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };
        (message.clone(), Style::default().fg(color))
    } else {
        let help = match (app.view, app.pane) {
            (View::Calendar, Pane::Calendar) => {
                "hjkl:Move  [/]:Month  t:Today  Tab:Todos  a:Add  n:Note  T:Theme  ?:Help  q:Quit"
            }
            (View::Calendar, Pane::Todos) => {
                "j/k:Select  Space:Toggle  a:Add  e:Edit  d:Delete  J/K:Move  C:Clear done  ?:Help"
            }
            (View::Stats, _) => "1:Calendar  3:Focus  E:Export  I:Import  ?:Help  q:Quit",
            (View::Focus, _) => "Space:Start/Pause  r:Reset  s:Skip  m:Mode  +/-:Length  ?:Help  q:Quit",
        };
        (help.to_string(), Style::default().fg(palette.muted))
    };

    let footer = Paragraph::new(msg)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help_text = vec![
        Line::from(Span::styled("Calendar", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  h/j/k/l     Move by day / week"),
        Line::from("  [ / ]       Previous / next month"),
        Line::from("  t           Jump to today"),
        Line::from("  Tab         Switch calendar / todos"),
        Line::from(""),
        Line::from(Span::styled("Todos", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  a           Add (Tab cycles priority)"),
        Line::from("  Space/x     Toggle done"),
        Line::from("  e / d       Edit / delete"),
        Line::from("  J / K       Move down / up"),
        Line::from("  C           Clear completed"),
        Line::from("  n           Edit note"),
        Line::from("  p           Priority for new todos"),
        Line::from(""),
        Line::from(Span::styled("Focus", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Space       Start / pause"),
        Line::from("  r / s / m   Reset / skip / switch mode"),
        Line::from("  + / -       Session length"),
        Line::from("  o / b       Sound / auto-start breaks"),
        Line::from(""),
        Line::from(Span::styled("General", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  1 / 2 / 3   Calendar / stats / focus"),
        Line::from("  T           Cycle theme"),
        Line::from("  E / B       Export todos / everything"),
        Line::from("  I           Import"),
        Line::from("  q           Quit"),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title(" Help (press any key) "))
        .wrap(Wrap { trim: false });

    f.render_widget(help, area);
}

fn draw_confirm_dialog(f: &mut Frame, dialog: &ConfirmDialog) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let text = Paragraph::new(format!("{}\n\n(y)es / (n)o", dialog.message))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", dialog.title)),
        )
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(text, area);
}

fn draw_input_dialog(f: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(60, 25, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![Line::from(format!("{}_", app.input_buffer))];
    if app.input_field == InputField::NewTodo {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Priority: ", Style::default().fg(palette.muted)),
            Span::styled(
                format!("{} {}", app.new_priority.symbol(), app.new_priority.label()),
                Style::default().fg(palette.priority(app.new_priority)),
            ),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter: save  Esc: cancel",
        Style::default().fg(palette.muted),
    )));

    let input = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(app.input_field.title()))
        .wrap(Wrap { trim: false });

    f.render_widget(input, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
