// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use std::io;
use std::time::Duration;
use stockline_app::{
    ActionOutcome, CellValue, ColumnDescriptor, ColumnKind, DisplayRow, Labels, RowAction,
    RowActionName, TableController, TableRuntime, TableViewState,
};
use tracing::debug;

const ACTION_CELL_PADDING: u16 = 2;
// Pixel width hints are scaled down to terminal columns.
const PIXELS_PER_CELL: u16 = 10;
const DATA_COLUMN_MIN_WIDTH: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    JumpFirstRow,
    JumpLastRow,
    Delete,
    View,
    Reload,
    ToggleHelp,
    Quit,
}

impl TableCommand {
    /// Commands that block on the record service; a loading frame is drawn
    /// before they run.
    fn busy_label(self) -> Option<&'static str> {
        match self {
            Self::Delete => Some("deleting"),
            Self::Reload => Some("reloading"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TableStatus {
    Busy,
    NoRowSelected,
    ViewUnavailable,
    DeleteUnavailable,
    Deleted(String),
    DeleteFailed,
    Opened(String),
    NoProductToOpen,
    OpenFailed,
    Reloaded(usize),
}

impl TableStatus {
    fn message(&self) -> String {
        match self {
            Self::Busy => "still loading".to_owned(),
            Self::NoRowSelected => "no row selected".to_owned(),
            Self::ViewUnavailable => "view not available for this profile".to_owned(),
            Self::DeleteUnavailable => "delete not available right now".to_owned(),
            Self::Deleted(id) => format!("deleted {id}"),
            Self::DeleteFailed => "delete failed".to_owned(),
            Self::Opened(id) => format!("opened {id}"),
            Self::NoProductToOpen => "row has no product to open".to_owned(),
            Self::OpenFailed => "could not open product".to_owned(),
            Self::Reloaded(rows) => format!("reloaded {rows} rows"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    selected_row: usize,
    status: Option<TableStatus>,
    busy: Option<&'static str>,
    help_visible: bool,
}

pub fn run_app<R: TableRuntime>(controller: &mut TableController, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        busy: Some("loading"),
        ..ViewData::default()
    };

    let result = (|| -> Result<()> {
        terminal
            .draw(|frame| render(frame, controller, &view_data))
            .context("draw frame")?;
        controller.mount(runtime);
        view_data.busy = None;

        loop {
            clamp_selection(controller.state(), &mut view_data);
            terminal
                .draw(|frame| render(frame, controller, &view_data))
                .context("draw frame")?;

            if !event::poll(Duration::from_millis(120)).context("poll event")? {
                continue;
            }
            let Event::Key(key) = event::read().context("read event")? else {
                continue;
            };
            let Some(command) = table_command_for_key(key) else {
                continue;
            };

            if let Some(label) = command.busy_label()
                && !controller.state().is_loading
            {
                view_data.busy = Some(label);
                terminal
                    .draw(|frame| render(frame, controller, &view_data))
                    .context("draw frame")?;
            }
            let quit = apply_table_command(controller, runtime, &mut view_data, command);
            view_data.busy = None;
            if quit {
                return Ok(());
            }
        }
    })();

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TableCommand::Quit)
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(TableCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(TableCommand::MoveRow(-1)),
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(TableCommand::JumpFirstRow),
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(TableCommand::JumpLastRow),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(TableCommand::Delete),
        (KeyCode::Char('v'), KeyModifiers::NONE) => Some(TableCommand::View),
        (KeyCode::Char('r'), KeyModifiers::NONE) => Some(TableCommand::Reload),
        (KeyCode::Char('?'), _) => Some(TableCommand::ToggleHelp),
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Some(TableCommand::Quit),
        _ => None,
    }
}

/// Returns `true` when the app should exit.
fn apply_table_command<R: TableRuntime>(
    controller: &mut TableController,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: TableCommand,
) -> bool {
    let row_count = controller.state().rows.len();
    match command {
        TableCommand::Quit => return true,
        TableCommand::ToggleHelp => view_data.help_visible = !view_data.help_visible,
        TableCommand::MoveRow(delta) => {
            view_data.selected_row = offset_row(view_data.selected_row, delta, row_count);
        }
        TableCommand::JumpFirstRow => view_data.selected_row = 0,
        TableCommand::JumpLastRow => view_data.selected_row = row_count.saturating_sub(1),
        TableCommand::Reload => {
            if controller.state().is_loading {
                view_data.status = Some(TableStatus::Busy);
            } else {
                controller.reload(runtime);
                view_data.status = Some(TableStatus::Reloaded(controller.state().rows.len()));
            }
        }
        TableCommand::Delete => {
            view_data.status = Some(run_row_action(
                controller,
                runtime,
                view_data,
                RowActionName::Delete,
            ));
        }
        TableCommand::View => {
            view_data.status = Some(run_row_action(
                controller,
                runtime,
                view_data,
                RowActionName::View,
            ));
        }
    }
    clamp_selection(controller.state(), view_data);
    false
}

fn run_row_action<R: TableRuntime>(
    controller: &mut TableController,
    runtime: &mut R,
    view_data: &ViewData,
    name: RowActionName,
) -> TableStatus {
    let state = controller.state();
    if state.is_loading {
        return TableStatus::Busy;
    }
    let Some(row) = state.rows.get(view_data.selected_row).cloned() else {
        return TableStatus::NoRowSelected;
    };
    if !state
        .columns
        .iter()
        .any(|column| column.action == Some(name))
    {
        return match name {
            RowActionName::Delete => TableStatus::DeleteUnavailable,
            RowActionName::View => TableStatus::ViewUnavailable,
        };
    }

    debug!(action = name.as_str(), line_item = %row.line_item_id, "row action");
    match controller.dispatch(runtime, &RowAction { name, row }) {
        ActionOutcome::Deleted(id) => TableStatus::Deleted(id.to_string()),
        ActionOutcome::Navigated(request) => TableStatus::Opened(request.record_id.to_string()),
        ActionOutcome::Ignored if name == RowActionName::Delete => TableStatus::Busy,
        ActionOutcome::Ignored => TableStatus::NoProductToOpen,
        ActionOutcome::Failed if name == RowActionName::Delete => TableStatus::DeleteFailed,
        ActionOutcome::Failed => TableStatus::OpenFailed,
    }
}

fn offset_row(current: usize, delta: isize, row_count: usize) -> usize {
    if row_count == 0 {
        return 0;
    }
    let max = row_count - 1;
    current.saturating_add_signed(delta).min(max)
}

fn clamp_selection(state: &TableViewState, view_data: &mut ViewData) {
    view_data.selected_row = view_data
        .selected_row
        .min(state.rows.len().saturating_sub(1));
}

fn render(frame: &mut ratatui::Frame<'_>, controller: &TableController, view_data: &ViewData) {
    let state = controller.state();
    let labels = controller.labels();
    let warning = warning_text(state, labels);

    let mut constraints = vec![Constraint::Length(3)];
    if warning.is_some() {
        constraints.push(Constraint::Length(4));
    }
    constraints.push(Constraint::Min(1));
    constraints.push(Constraint::Length(3));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let mut slot = 0;
    let title = Paragraph::new(title_text(controller)).block(
        Block::default()
            .title("stockline")
            .borders(Borders::ALL),
    );
    frame.render_widget(title, layout[slot]);
    slot += 1;

    if let Some(text) = warning {
        let warning = Paragraph::new(text)
            .style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL).title("stock"));
        frame.render_widget(warning, layout[slot]);
        slot += 1;
    }

    match body_message(state, labels, view_data.busy) {
        Some(BodyMessage::Error(title, text)) => {
            let body = Paragraph::new(text)
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(body, layout[slot]);
        }
        Some(BodyMessage::Plain(text)) => {
            let body = Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(labels.opportunity_products.as_str()),
            );
            frame.render_widget(body, layout[slot]);
        }
        None => render_table(frame, layout[slot], controller, view_data),
    }
    slot += 1;

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[slot]);

    if view_data.help_visible {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    controller: &TableController,
    view_data: &ViewData,
) {
    let state = controller.state();
    let widths = state
        .columns
        .iter()
        .map(column_constraint)
        .collect::<Vec<_>>();

    let header = Row::new(state.columns.iter().map(|column| {
        Cell::from(header_label(column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = state.rows.iter().enumerate().map(|(row_index, row)| {
        let selected = row_index == view_data.selected_row;
        let cells = state
            .columns
            .iter()
            .map(|column| {
                Cell::from(cell_text(row, column)).style(cell_style(row, column, selected))
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(controller.labels().opportunity_products.as_str())
                .borders(Borders::ALL),
        );
    let mut table_state = TableState::default().with_selected(Some(view_data.selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn title_text(controller: &TableController) -> String {
    let role = controller.role().map_or("unresolved", |role| role.as_str());
    format!(
        "{} | {} | {role}",
        controller.labels().opportunity_products,
        controller.opportunity_id()
    )
}

fn warning_text(state: &TableViewState, labels: &Labels) -> Option<String> {
    state
        .any_shortfall
        .then(|| labels.stock_warning().join("\n"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyMessage {
    Error(String, String),
    Plain(String),
}

/// What replaces the table, if anything. Errors win over the empty message.
fn body_message(
    state: &TableViewState,
    labels: &Labels,
    busy: Option<&'static str>,
) -> Option<BodyMessage> {
    if let Some(error) = &state.error {
        return Some(BodyMessage::Error(
            format!("error: {}", error.kind.as_str()),
            error.message(),
        ));
    }
    if let Some(label) = busy.filter(|_| !state.has_products()) {
        return Some(BodyMessage::Plain(format!("{label}...")));
    }
    if state.is_loading && !state.has_products() {
        return Some(BodyMessage::Plain("loading...".to_owned()));
    }
    if state.show_empty_message() {
        return Some(BodyMessage::Plain(labels.no_products().join("\n")));
    }
    None
}

fn header_label(column: &ColumnDescriptor) -> String {
    match column.kind {
        ColumnKind::Action => String::new(),
        _ => column.label.clone(),
    }
}

fn column_constraint(column: &ColumnDescriptor) -> Constraint {
    match column.width_hint {
        Some(hint) => {
            let label = u16::try_from(column.label.chars().count()).unwrap_or(u16::MAX);
            Constraint::Length(
                (hint / PIXELS_PER_CELL).max(label.saturating_add(ACTION_CELL_PADDING)),
            )
        }
        None => Constraint::Min(DATA_COLUMN_MIN_WIDTH),
    }
}

fn cell_text(row: &DisplayRow, column: &ColumnDescriptor) -> String {
    if column.kind == ColumnKind::Action {
        return format!("[{}]", column.label);
    }
    let Some(field) = column.field else {
        return String::new();
    };
    match row.cell(field) {
        CellValue::Text(text) => text,
        CellValue::Number(value) => format_quantity(value),
        CellValue::Currency(value) => value.map(format_currency).unwrap_or_default(),
    }
}

fn cell_style(row: &DisplayRow, column: &ColumnDescriptor, selected: bool) -> Style {
    let mut style = Style::default();
    if !row.cell_class(column).is_empty() {
        style = style.fg(Color::Red).add_modifier(Modifier::BOLD);
    }
    if column.kind == ColumnKind::Action {
        style = style.fg(Color::Cyan);
    }
    if selected {
        style = style.bg(Color::DarkGray);
    }
    style
}

fn status_text(state: &TableViewState, view_data: &ViewData) -> String {
    let phase = match view_data.busy {
        Some(label) => label,
        None => state.phase.label(),
    };
    let position = if state.has_products() {
        format!("{}/{}", view_data.selected_row + 1, state.rows.len())
    } else {
        "0/0".to_owned()
    };
    let keys = "j/k g/G | d delete v view r reload | ? help q quit";
    match &view_data.status {
        Some(status) => format!("{phase} | {position} | {} | {keys}", status.message()),
        None => format!("{phase} | {position} | {keys}"),
    }
}

fn help_overlay_text() -> String {
    [
        "j / down    next row",
        "k / up      previous row",
        "g / G       first / last row",
        "d           delete selected line",
        "v           open selected product",
        "r           reload from service",
        "?           toggle help",
        "q / esc     quit",
    ]
    .join("\n")
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{value:.0}");
    }
    let text = format!("{value:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    let dollars = cents / 100;
    let cents_component = cents % 100;
    format!("{sign}${}.{cents_component:02}", group_thousands(dollars))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
