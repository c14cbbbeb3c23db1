use anyhow::Result;
use cost_analytics::{
    available_periods, clinic_options, default_periods, facility_options, format_currency,
    records::MAX_AGE, CostRecord, DashboardReport, PeriodComparison, ScatterPoint, Selection,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table,
        TableState,
    },
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;

const FACILITY_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Red,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Evolution,
    Facilities,
    Audit,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Evolution => Page::Facilities,
            Page::Facilities => Page::Audit,
            Page::Audit => Page::Evolution,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Evolution => Page::Audit,
            Page::Facilities => Page::Evolution,
            Page::Audit => Page::Facilities,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Evolution => "Monthly Evolution",
            Page::Facilities => "Facility Performance",
            Page::Audit => "Data Audit",
        }
    }
}

pub struct App {
    pub table: Arc<[CostRecord]>,
    pub network_label: String,
    /// Most recent first
    pub periods: Vec<String>,
    pub period_a: usize,
    pub period_b: usize,
    pub facilities: Vec<String>,
    pub clinics: Vec<String>,
    pub selection: Selection,
    pub report: DashboardReport,
    pub current_page: Page,
    pub audit_state: TableState,
}

impl App {
    pub fn new(table: Arc<[CostRecord]>, network_label: String) -> Self {
        let periods = available_periods(&table);
        let (period_a, period_b) = match default_periods(&periods) {
            Some((a, b)) => (
                periods.iter().position(|p| *p == a).unwrap_or(0),
                periods.iter().position(|p| *p == b).unwrap_or(0),
            ),
            None => (0, 0),
        };

        let facilities = facility_options(&table);
        let clinics = clinic_options(&table);
        let selection = Selection::new(facilities.clone(), clinics.clone());

        let mut app = Self {
            report: DashboardReport::build(&[], &selection, "", "", &network_label),
            table,
            network_label,
            periods,
            period_a,
            period_b,
            facilities,
            clinics,
            selection,
            current_page: Page::Evolution,
            audit_state: TableState::default(),
        };
        app.recompute();
        app
    }

    pub fn period_a_key(&self) -> &str {
        self.periods.get(self.period_a).map(String::as_str).unwrap_or("")
    }

    pub fn period_b_key(&self) -> &str {
        self.periods.get(self.period_b).map(String::as_str).unwrap_or("")
    }

    /// Rebuild every view from the table and the current selection
    pub fn recompute(&mut self) {
        self.report = DashboardReport::build(
            &self.table,
            &self.selection,
            self.period_a_key(),
            self.period_b_key(),
            &self.network_label,
        );

        if self.report.detail.is_empty() {
            self.audit_state.select(None);
        } else {
            self.audit_state.select(Some(0));
        }
    }

    /// Step period A; `older` moves back in time
    pub fn shift_period_a(&mut self, older: bool) {
        self.period_a = step(self.period_a, self.periods.len(), older);
        self.recompute();
    }

    pub fn shift_period_b(&mut self, older: bool) {
        self.period_b = step(self.period_b, self.periods.len(), older);
        self.recompute();
    }

    pub fn toggle_facility(&mut self, index: usize) {
        if let Some(name) = self.facilities.get(index).cloned() {
            self.selection.toggle_facility(&name);
            self.recompute();
        }
    }

    pub fn toggle_clinic(&mut self, index: usize) {
        if let Some(clinic) = self.clinics.get(index).cloned() {
            self.selection.toggle_clinic(&clinic);
            self.recompute();
        }
    }

    pub fn reset_selection(&mut self) {
        self.selection = Selection::new(self.facilities.clone(), self.clinics.clone());
        self.recompute();
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.report.detail.len();
        if len == 0 {
            return;
        }
        let i = match self.audit_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.audit_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.report.detail.len();
        if len == 0 {
            return;
        }
        let i = match self.audit_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.audit_state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.report.detail.len();
        if len == 0 {
            return;
        }
        let i = self.audit_state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        self.audit_state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.audit_state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.audit_state.select(Some(i));
    }
}

fn step(index: usize, len: usize, older: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if older {
        (index + 1).min(len - 1)
    } else {
        index.saturating_sub(1)
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('a') => app.shift_period_a(true),
                KeyCode::Char('A') => app.shift_period_a(false),
                KeyCode::Char('b') => app.shift_period_b(true),
                KeyCode::Char('B') => app.shift_period_b(false),
                KeyCode::Char('r') => app.reset_selection(),
                KeyCode::Char(c @ '1'..='9') => app.toggle_facility(c as usize - '1' as usize),
                KeyCode::F(n @ 1..=12) => app.toggle_clinic(n as usize - 1),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.audit_state.select(Some(0)),
                KeyCode::End => {
                    if !app.report.detail.is_empty() {
                        app.audit_state.select(Some(app.report.detail.len() - 1));
                    }
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Sidebar + content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)])
        .split(chunks[1]);

    render_sidebar(f, body[0], app);

    match app.current_page {
        Page::Evolution => render_evolution(f, body[1], app),
        Page::Facilities => render_facilities(f, body[1], app),
        Page::Audit => render_audit(f, body[1], app),
    }

    render_status_bar(f, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Evolution, Page::Facilities, Page::Audit];

    let mut spans = vec![Span::styled(
        " 🏥 Health Intelligence Hub ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw(" │ "));

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("{} vs {}", app.period_a_key(), app.period_b_key()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(Color::Yellow);
    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled(" Periods", heading)),
        Line::from(vec![
            Span::styled(" a/A", key_style),
            Span::raw(format!(" Base (A):   {}", app.period_a_key())),
        ]),
        Line::from(vec![
            Span::styled(" b/B", key_style),
            Span::raw(format!(" Compare (B): {}", app.period_b_key())),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Facilities", heading)),
    ];

    for (i, name) in app.facilities.iter().enumerate().take(9) {
        let checked = app.selection.facilities.contains(name);
        lines.push(checkbox_line(&format!("{}", i + 1), name, checked));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Specialties", heading)));

    for (i, clinic) in app.clinics.iter().enumerate().take(12) {
        let checked = app.selection.clinics.contains(clinic);
        lines.push(checkbox_line(&format!("F{}", i + 1), clinic, checked));
    }

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Settings "),
    );

    f.render_widget(sidebar, area);
}

fn checkbox_line(key: &str, label: &str, checked: bool) -> Line<'static> {
    let (mark, color) = if checked {
        ("[x]", Color::Green)
    } else {
        ("[ ]", Color::DarkGray)
    };

    Line::from(vec![
        Span::styled(format!(" {:>3} ", key), Style::default().fg(Color::Yellow)),
        Span::styled(mark, Style::default().fg(color)),
        Span::raw(format!(" {}", truncate(label, 22))),
    ])
}

fn notice(f: &mut Frame, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  ⚠ {}", message),
            Style::default().fg(Color::Yellow),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", title)),
    );

    f.render_widget(paragraph, area);
}

fn render_evolution(f: &mut Frame, area: Rect, app: &App) {
    let result = match &app.report.comparison {
        PeriodComparison::Ready { result, .. } => result,
        PeriodComparison::NoData { .. } => {
            notice(
                f,
                area,
                Page::Evolution.title(),
                "Select filters with data in both months to build the indicators.",
            );
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(rows[0]);

    let delta_color = if result.percent_delta > 0.0 {
        Color::Red
    } else {
        Color::Green
    };

    metric_card(
        f,
        cards[0],
        &format!("Spend in {}", app.period_b_key()),
        format_currency(result.total_b),
        Some((format!("{:+.1}%", result.percent_delta), delta_color)),
    );
    metric_card(
        f,
        cards[1],
        "Admissions (B)",
        result.count_b.to_string(),
        Some((format!("{:+} pat.", result.count_delta), Color::White)),
    );
    metric_card(
        f,
        cards[2],
        "Average Ticket (B)",
        result.mean_b.map(format_currency).unwrap_or_else(|| "-".to_string()),
        None,
    );
    metric_card(
        f,
        cards[3],
        "Length of Stay (B)",
        result
            .mean_stay_b
            .map(|d| format!("{:.1} days", d))
            .unwrap_or_else(|| "-".to_string()),
        None,
    );

    let mixes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    render_mix(f, mixes[0], app.period_a_key(), &app.report.clinic_mix_a, Color::Blue);
    render_mix(f, mixes[1], app.period_b_key(), &app.report.clinic_mix_b, Color::Cyan);
}

fn metric_card(
    f: &mut Frame,
    area: Rect,
    title: &str,
    value: String,
    delta: Option<(String, Color)>,
) {
    let mut lines = vec![Line::from(Span::styled(
        value,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ))];
    if let Some((text, color)) = delta {
        lines.push(Line::from(Span::styled(text, Style::default().fg(color))));
    }

    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" {} ", title)),
    );

    f.render_widget(card, area);
}

fn render_mix(f: &mut Frame, area: Rect, period: &str, mix: &[cost_analytics::MixEntry], color: Color) {
    let labels: Vec<String> = mix
        .iter()
        .map(|m| format!("{} {:.0}%", truncate(&m.label, 10), m.share_percent))
        .collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(mix)
        .map(|(label, m)| (label.as_str(), m.value.round() as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Cost Mix: {} ", period)),
        )
        .data(data.as_slice())
        .bar_width(14)
        .bar_gap(2)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color));

    f.render_widget(chart, area);
}

fn render_facilities(f: &mut Frame, area: Rect, app: &App) {
    if !app.report.has_period_b_data() {
        notice(
            f,
            area,
            Page::Facilities.title(),
            "Adjust the filters to see performance by facility.",
        );
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[0]);

    render_hierarchy(f, tables[0], app);
    render_stacked(f, tables[1], app);
    render_scatter(f, rows[1], app);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_hierarchy(f: &mut Frame, area: Rect, app: &App) {
    let rows = app.report.hierarchy.iter().map(|node| {
        let style = match node.depth {
            0 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            1 => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            _ => Style::default().fg(Color::Gray),
        };

        Row::new(vec![
            Cell::from(format!("{}{}", "  ".repeat(node.depth as usize), node.label)).style(style),
            Cell::from(format_currency(node.value)),
            Cell::from(format!("{:.1}%", node.percent_of_parent)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(18),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Facility > Specialty", "Value", "% parent"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Hierarchical View "),
    );

    f.render_widget(table, area);
}

fn render_stacked(f: &mut Frame, area: Rect, app: &App) {
    let max = app
        .report
        .stacked
        .iter()
        .map(|s| s.value)
        .fold(0.0_f64, f64::max);

    let rows = app.report.stacked.iter().map(|segment| {
        let width = if max > 0.0 {
            ((segment.value / max) * 12.0).round() as usize
        } else {
            0
        };

        Row::new(vec![
            Cell::from(truncate(&segment.facility, 20)),
            Cell::from(truncate(&segment.clinic, 12)),
            Cell::from("█".repeat(width)).style(Style::default().fg(Color::Magenta)),
            Cell::from(format_currency(segment.value)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(21),
            Constraint::Length(13),
            Constraint::Length(13),
            Constraint::Min(14),
        ],
    )
    .header(header_row(&["Facility", "Specialty", "", "Value"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Facility Mix "),
    );

    f.render_widget(table, area);
}

fn render_scatter(f: &mut Frame, area: Rect, app: &App) {
    let series: Vec<(String, Vec<(f64, f64)>)> = app
        .facilities
        .iter()
        .map(|name| {
            let points = app
                .report
                .scatter
                .iter()
                .filter(|p| &p.facility == name)
                .map(|p| (p.age as f64, p.value))
                .collect();
            (name.clone(), points)
        })
        .filter(|(_, points): &(String, Vec<(f64, f64)>)| !points.is_empty())
        .collect();

    let (age_bounds, value_bounds) = scatter_bounds(&app.report.scatter);
    let max_age = age_bounds[1];
    let max_value = value_bounds[1];

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(FACILITY_COLORS[i % FACILITY_COLORS.len()]))
                .data(points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Age vs Cost "),
        )
        .x_axis(
            Axis::default()
                .title("Age")
                .style(Style::default().fg(Color::Gray))
                .bounds(age_bounds)
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", max_age / 2.0)),
                    Span::raw(format!("{:.0}", max_age)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Value")
                .style(Style::default().fg(Color::Gray))
                .bounds(value_bounds)
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", max_value / 2.0)),
                    Span::raw(format!("{:.0}", max_value)),
                ]),
        );

    f.render_widget(chart, area);
}

/// Axis bounds for the age × cost chart. Ages span the full valid range.
fn scatter_bounds(points: &[ScatterPoint]) -> ([f64; 2], [f64; 2]) {
    let max_value = points
        .iter()
        .map(|p| p.value)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    ([0.0, MAX_AGE as f64], [0.0, max_value])
}

fn render_audit(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.report.detail.iter().map(|row| {
        Row::new(vec![
            Cell::from(truncate(&row.facility, 24)),
            Cell::from(truncate(&row.clinic, 14)),
            Cell::from(format_currency(row.value)).style(Style::default().fg(Color::Green)),
            Cell::from(row.age.to_string()),
            Cell::from(row.sex.clone().unwrap_or_else(|| "-".to_string())),
            Cell::from(row.length_of_stay.to_string()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(6),
        ],
    )
    .header(header_row(&["Facility", "Specialty", "Value", "Age", "Sex", "Days"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(
                " Detailed Records, Period B ({}) - {} rows ",
                app.period_b_key(),
                app.report.detail.len()
            )),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.audit_state);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow);

    let spans = vec![
        Span::styled(" Tab", key),
        Span::raw(" Page | "),
        Span::styled("a/A b/B", key),
        Span::raw(" Periods | "),
        Span::styled("1-9", key),
        Span::raw(" Facilities | "),
        Span::styled("F1-F12", key),
        Span::raw(" Specialties | "),
        Span::styled("r", key),
        Span::raw(" Reset | "),
        Span::styled("↑/↓", key),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let table: Vec<CostRecord> = vec![
            CostRecord::new("1", "Hospital A", "UTI Adulto", "2024-01", 1000.0),
            CostRecord::new("1", "Hospital A", "Médica", "2024-02", 3000.0),
            CostRecord::new("2", "Hospital B", "UTI Adulto", "2024-02", 500.0),
            CostRecord::new("2", "Hospital B", "Médica", "2024-03", 700.0),
        ];
        App::new(Arc::from(table), "Rede".to_string())
    }

    #[test]
    fn test_default_periods_selected() {
        let app = app();

        assert_eq!(app.period_b_key(), "2024-03");
        assert_eq!(app.period_a_key(), "2024-01");
        assert!(app.report.comparison.is_ready());
    }

    #[test]
    fn test_period_shift_clamps() {
        let mut app = app();

        app.shift_period_b(true);
        assert_eq!(app.period_b_key(), "2024-02");
        assert_eq!(app.report.detail.len(), 2);

        app.shift_period_b(false);
        app.shift_period_b(false);
        assert_eq!(app.period_b_key(), "2024-03", "cannot go past the latest period");

        app.shift_period_a(true);
        assert_eq!(app.period_a_key(), "2024-01", "cannot go past the oldest period");
    }

    #[test]
    fn test_toggles_recompute_report() {
        let mut app = app();

        app.toggle_facility(1); // Hospital B
        assert!(!app.report.comparison.is_ready(), "2024-03 only has Hospital B");
        assert!(app.audit_state.selected().is_none());

        app.reset_selection();
        assert!(app.report.comparison.is_ready());

        app.toggle_clinic(5); // out of range: no-op
        assert!(app.report.comparison.is_ready());
    }

    #[test]
    fn test_audit_navigation_wraps() {
        let mut app = app();
        app.shift_period_b(true); // 2024-02, two rows

        assert_eq!(app.audit_state.selected(), Some(0));
        app.next();
        assert_eq!(app.audit_state.selected(), Some(1));
        app.next();
        assert_eq!(app.audit_state.selected(), Some(0));
        app.previous();
        assert_eq!(app.audit_state.selected(), Some(1));
        app.page_up();
        assert_eq!(app.audit_state.selected(), Some(0));
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Evolution.next(), Page::Facilities);
        assert_eq!(Page::Evolution.previous(), Page::Audit);
        assert_eq!(Page::Audit.next().title(), "Monthly Evolution");
    }

    #[test]
    fn test_scatter_bounds_cover_oldest_patients() {
        let point = |age: u32, value: f64| ScatterPoint {
            age,
            value,
            facility: "Hospital A".to_string(),
            clinic: "Médica".to_string(),
            length_of_stay: 1,
        };

        let (ages, values) = scatter_bounds(&[point(119, 2500.0), point(3, 9000.0)]);
        assert!(ages[0] <= 0.0 && 119.0 <= ages[1], "age 119 must not be clipped");
        assert_eq!(values, [0.0, 9000.0]);

        let (_, values) = scatter_bounds(&[]);
        assert_eq!(values, [0.0, 1.0], "empty chart keeps a non-degenerate axis");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Obstetrícia", 20), "Obstetrícia");
        assert_eq!(truncate("Hospital Santo Antônio", 10), "Hospita...");
    }
}
