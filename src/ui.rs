use crate::config::{Config, ControlAction, Controls};
use crate::controller::{FileSource, ScheduleController, SourceText, StartupOrigin};
use crate::editor::{CellEditor, Commit};
use crate::grid::{GridView, ScheduleGrid};
use crate::storage::{FileStore, StateStore};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const LABEL_WIDTH: u16 = 13;
const ROW_HEIGHT: u16 = 2;

pub fn run(
    controller: ScheduleController<ScheduleGrid, FileStore>,
    source: FileSource,
    origin: Option<StartupOrigin>,
    config: &Config,
) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(controller, source, origin, config);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App<S: StateStore, T: SourceText> {
    controller: ScheduleController<ScheduleGrid, S>,
    source: T,
    controls: Controls,
    export_dir: PathBuf,
    editor: CellEditor,
    origin: Option<StartupOrigin>,
    status: String,
    last_save: Option<Instant>,
    scroll_offset: usize,
    cell_areas: Vec<(Rect, usize, usize)>,
    last_click: Option<(usize, usize, Instant)>,
}

impl<S: StateStore, T: SourceText> App<S, T> {
    fn new(
        controller: ScheduleController<ScheduleGrid, S>,
        source: T,
        origin: Option<StartupOrigin>,
        config: &Config,
    ) -> Self {
        let editor = CellEditor::new(controller.grid().layout());
        let status = match origin {
            Some(o) => format!("Loaded {} entries from {}", o.placed(), o.label()),
            None => format!("Could not load {}", source.describe()),
        };
        App {
            controller,
            source,
            controls: config.controls,
            export_dir: config.export_dir(),
            editor,
            origin,
            status,
            last_save: None,
            scroll_offset: 0,
            cell_areas: Vec::new(),
            last_click: None,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        if let Some(commit) = self.editor.blur() {
            self.apply_commit(commit);
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.editor.is_editing() {
            self.handle_edit_key(key);
            return false;
        }
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left | KeyCode::Char('h') => self.editor.move_focus(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.editor.move_focus(0, 1),
            KeyCode::Up | KeyCode::Char('k') => self.editor.move_focus(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.editor.move_focus(1, 0),
            KeyCode::Enter | KeyCode::F(2) | KeyCode::Char('e') => self.activate(),
            KeyCode::Char(c) => {
                if let Some(action) = self.controls.action_for(c) {
                    self.run_control(action);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        let line_break =
            key.code == KeyCode::Enter && key.modifiers.contains(KeyModifiers::ALT);
        if !line_break && matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Tab) {
            if let Some(commit) = self.editor.blur() {
                self.apply_commit(commit);
            }
            return;
        }
        let Some(buffer) = self.editor.buffer_mut() else {
            return;
        };
        match key.code {
            KeyCode::Enter => buffer.insert_char('\n'),
            KeyCode::Left => buffer.move_left(),
            KeyCode::Right => buffer.move_right(),
            KeyCode::Up => buffer.move_up(),
            KeyCode::Down => buffer.move_down(),
            KeyCode::Home => buffer.home(),
            KeyCode::End => buffer.end(),
            KeyCode::Backspace => buffer.backspace(),
            KeyCode::Delete => buffer.delete(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    buffer.insert_char(c);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let hit = self
            .cell_areas
            .iter()
            .find(|(area, _, _)| contains(*area, mouse.column, mouse.row))
            .map(|(_, row, col)| (*row, *col));
        let Some((row, col)) = hit else {
            return;
        };
        if let Some(commit) = self.editor.focus_cell(row, col) {
            self.apply_commit(commit);
        }
        let now = Instant::now();
        let double = matches!(
            self.last_click,
            Some((r, c, at)) if r == row && c == col && now.duration_since(at) <= DOUBLE_CLICK
        );
        if double {
            self.activate();
            self.last_click = None;
        } else {
            self.last_click = Some((row, col, now));
        }
    }

    fn activate(&mut self) {
        if !self.controller.is_loaded() {
            self.status = "Schedule source unavailable; editing disabled".into();
            return;
        }
        let grid = self.controller.grid();
        let layout = grid.layout();
        let current = self
            .editor
            .focused_key(layout)
            .and_then(|key| grid.cell(&key).map(str::to_string))
            .unwrap_or_default();
        if self.editor.activate(layout, &current) {
            self.status = "Editing (Enter to save, Alt+Enter new line)".into();
        }
    }

    fn apply_commit(&mut self, commit: Commit) {
        match self.controller.commit_cell(&commit.key, &commit.text) {
            Ok(count) => {
                self.last_save = Some(Instant::now());
                self.status = format!("Saved {} ({} entries)", commit.key, count);
            }
            Err(err) => self.status = format!("Save failed: {:#}", err),
        }
    }

    fn run_control(&mut self, action: ControlAction) {
        if !self.controller.is_loaded() && action != ControlAction::ClearLocal {
            self.status = format!("Cannot {} without a loaded schedule", action.label());
            return;
        }
        match action {
            ControlAction::Export => match self.controller.export_to(&self.export_dir) {
                Ok(path) => self.status = format!("Exported to {}", path.display()),
                Err(err) => self.status = format!("Export failed: {:#}", err),
            },
            ControlAction::Restore => match self.controller.restore_original() {
                Ok(placed) => {
                    self.origin = Some(StartupOrigin::Original { placed });
                    self.last_save = None;
                    self.editor.attach(self.controller.grid().layout());
                    self.status = format!("Restored original ({} entries)", placed);
                }
                Err(err) => self.status = format!("Restore failed: {:#}", err),
            },
            ControlAction::ClearLocal => match self.controller.clear_local(&self.source) {
                Ok(origin) => {
                    self.origin = origin;
                    self.last_save = None;
                    self.editor.attach(self.controller.grid().layout());
                    self.status = match origin {
                        Some(o) => format!("Cleared local edits, reloaded {} entries", o.placed()),
                        None => format!(
                            "Cleared local edits; could not load {}",
                            self.source.describe()
                        ),
                    };
                }
                Err(err) => self.status = format!("Clear failed: {:#}", err),
            },
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_grid(f, layout[1]);
        self.draw_footer(f, layout[2]);
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let origin = match self.origin {
            Some(_) if self.last_save.is_some() => "saved edits".to_string(),
            Some(o) => o.label().to_string(),
            None => "not loaded".to_string(),
        };
        let saved = match self.last_save {
            Some(at) => format!("saved {}", format_elapsed(at)),
            None => "no changes".to_string(),
        };
        let mut spans = vec![
            Span::styled(
                "timetable ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.source.describe(),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(origin, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(saved, Style::default().fg(Color::Gray)),
            Span::raw("  •  "),
            Span::styled(
                format!("{} filled", self.controller.grid().filled_count()),
                Style::default().fg(Color::Magenta),
            ),
        ];
        if let Some(key) = self.editor.editing_key() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                format!("editing {}", key),
                Style::default().fg(Color::LightYellow),
            ));
        }

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_grid(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        self.cell_areas.clear();
        let block = Block::default()
            .title(Span::styled(
                "Schedule",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let grid = self.controller.grid();
        let layout = grid.layout();
        if inner.height < 1 + ROW_HEIGHT || layout.days.is_empty() {
            return;
        }

        let mut constraints = vec![Constraint::Length(LABEL_WIDTH)];
        constraints.extend(
            layout
                .days
                .iter()
                .map(|_| Constraint::Ratio(1, layout.days.len() as u32)),
        );
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(inner);

        for (col, day) in layout.days.iter().enumerate() {
            let header = Rect { height: 1, y: inner.y, ..columns[col + 1] };
            f.render_widget(
                Paragraph::new(Span::styled(
                    day.clone(),
                    Style::default()
                        .fg(color_for_index(col))
                        .add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center),
                header,
            );
        }

        let viewport = ((inner.height - 1) / ROW_HEIGHT) as usize;
        let (focus_row, focus_col) = self.editor.focus();
        self.scroll_offset = adjust_offset(
            focus_row,
            self.scroll_offset,
            viewport,
            1,
            layout.intervals.len(),
        );

        let mut areas = Vec::new();
        for (slot, row) in (self.scroll_offset..layout.intervals.len())
            .take(viewport)
            .enumerate()
        {
            let y = inner.y + 1 + slot as u16 * ROW_HEIGHT;
            let base = Style::default().bg(if row % 2 == 0 {
                Color::Rgb(16, 18, 24)
            } else {
                Color::Rgb(22, 24, 30)
            });
            let label = Rect { y, height: ROW_HEIGHT, ..columns[0] };
            f.render_widget(
                Paragraph::new(layout.intervals[row].key())
                    .style(base.fg(Color::Gray)),
                label,
            );

            for col in 0..layout.days.len() {
                let cell_area = Rect { y, height: ROW_HEIGHT, ..columns[col + 1] };
                let focused = row == focus_row && col == focus_col;
                let editing = focused && self.editor.is_editing();
                let width = cell_area.width as usize;
                let lines = match self.editor.buffer().filter(|_| editing) {
                    Some(buffer) => edit_lines(&buffer.with_caret(), width),
                    None => cell_lines(grid.cell_at(row, col), width),
                };
                let style = if editing {
                    Style::default().bg(Color::Rgb(252, 214, 112)).fg(Color::Black)
                } else if focused {
                    Style::default().bg(Color::LightCyan).fg(Color::Black)
                } else {
                    base.fg(Color::White)
                };
                f.render_widget(Paragraph::new(lines).style(style), cell_area);
                areas.push((cell_area, row, col));
            }
        }
        self.cell_areas = areas;
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        if self.editor.is_editing() {
            return Line::from(vec![
                Span::styled("Enter/Esc/Tab", Style::default().fg(Color::LightGreen)),
                Span::raw(" save  "),
                Span::styled("Alt+Enter", Style::default().fg(Color::LightCyan)),
                Span::raw(" new line (second line is the group)  "),
                Span::styled("←↑↓→", Style::default().fg(Color::LightCyan)),
                Span::raw(" caret"),
            ]);
        }
        let mut spans = vec![
            Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
            Span::raw(" move  "),
            Span::styled("e/Enter/double-click", Style::default().fg(Color::LightYellow)),
            Span::raw(" edit  "),
        ];
        for action in [
            ControlAction::Export,
            ControlAction::Restore,
            ControlAction::ClearLocal,
        ] {
            if let Some(key) = self.controls.key_for(action) {
                spans.push(Span::styled(
                    key.to_string(),
                    Style::default().fg(Color::LightMagenta),
                ));
                spans.push(Span::raw(format!(" {}  ", action.label())));
            }
        }
        spans.push(Span::styled("q", Style::default().fg(Color::LightRed)));
        spans.push(Span::raw(" quit"));
        Line::from(spans)
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

/// Subject on the first line, every further line in bold as the group.
fn cell_lines(text: &str, width: usize) -> Vec<Line<'static>> {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(idx, line)| {
            let text = truncate_text(line, width);
            if idx == 0 {
                Line::raw(text)
            } else {
                Line::from(Span::styled(
                    text,
                    Style::default().add_modifier(Modifier::BOLD),
                ))
            }
        })
        .collect()
}

/// Raw buffer lines, scrolled so the caret stays inside the cell.
fn edit_lines(text: &str, width: usize) -> Vec<Line<'static>> {
    let lines: Vec<&str> = text.split('\n').collect();
    let caret_line = lines.iter().position(|l| l.contains('▌')).unwrap_or(0);
    let first = (caret_line + 1).saturating_sub(ROW_HEIGHT as usize);
    lines[first..]
        .iter()
        .map(|line| Line::raw(truncate_tail(line, width)))
        .collect()
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&"...".chars().take(max - keep).collect::<String>());
    out
}

/// Keeps the end of the line visible, which is where typing happens.
fn truncate_tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
