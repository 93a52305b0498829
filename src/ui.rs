use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use expense_classifier::{CategorizedTransaction, Category, Report, Session, TransactionKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Ledger,
    Insights,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Ledger,
            Page::Ledger => Page::Insights,
            Page::Insights => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Insights,
            Page::Ledger => Page::Dashboard,
            Page::Insights => Page::Ledger,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Ledger => "Ledger",
            Page::Insights => "Insights",
        }
    }
}

pub struct App {
    pub session: Session,
    /// Indices into `session.transactions` that pass the filter
    pub visible: Vec<usize>,
    pub report: Report,
    pub filter: Option<Category>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    top_merchants: usize,
}

impl App {
    pub fn new(session: Session, top_merchants: usize) -> Self {
        let mut app = Self {
            visible: Vec::new(),
            report: Report::build(&[], top_merchants),
            session,
            filter: None,
            state: TableState::default(),
            current_page: Page::Dashboard,
            show_detail: false,
            top_merchants,
        };
        app.apply_filter(None);
        app
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_transaction(&self) -> Option<&CategorizedTransaction> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .and_then(|idx| self.session.transactions.get(*idx))
    }

    pub fn apply_filter(&mut self, filter: Option<Category>) {
        self.filter = filter;

        self.visible = self
            .session
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| filter.map_or(true, |c| tx.category == c))
            .map(|(i, _)| i)
            .collect();

        let rows: Vec<&CategorizedTransaction> =
            self.visible.iter().map(|i| &self.session.transactions[*i]).collect();
        self.report = Report::build(&rows, self.top_merchants);

        // Reset selection to first item
        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    /// All → each category present (priority order) → All
    pub fn cycle_filter(&mut self) {
        let present: Vec<Category> = Category::all()
            .iter()
            .copied()
            .filter(|c| self.session.transactions.iter().any(|tx| tx.category == *c))
            .collect();

        let next = match self.filter {
            None => present.first().copied(),
            Some(current) => present
                .iter()
                .position(|c| *c == current)
                .and_then(|i| present.get(i + 1))
                .copied(),
        };
        self.apply_filter(next);
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(None);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + PAGE_STEP).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_STEP));
        self.state.select(Some(i));
    }

    pub fn select_last(&mut self) {
        if !self.visible.is_empty() {
            self.state.select(Some(self.visible.len() - 1));
        }
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

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Char('f') => app.cycle_filter(),
                KeyCode::Char('c') => app.clear_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(if app.visible.is_empty() { None } else { Some(0) }),
                KeyCode::End => app.select_last(),
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
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Ledger {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Dashboard => render_dashboard(f, chunks[1], app),
            Page::Ledger => render_table(f, chunks[1], app),
            Page::Insights => render_insights(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn category_color(category: Category) -> Color {
    let hex = category.color().trim_start_matches('#');
    let channel = |i: usize| hex.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok());
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

fn kind_color(kind: TransactionKind) -> Color {
    match kind {
        TransactionKind::Expense => Color::Red,
        TransactionKind::Income => Color::Green,
        TransactionKind::Neutral => Color::White,
    }
}

fn label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(
        titles
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1)
}

fn bordered(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let summary = &app.report.summary;

    let mut tab_spans = vec![];
    for (i, page) in [Page::Dashboard, Page::Ledger, Page::Insights].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        truncate(&app.session.source_name, 30),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("↓ {}", summary.expense_count),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("↑ {}", summary.income_count),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(0)])
        .split(area);

    let summary = &app.report.summary;
    let period = match &summary.period {
        Some(p) => format!("{} → {} ({} days)", p.start, p.end, p.days),
        None => "n/a".to_string(),
    };
    let cashflow_color = if summary.net_cashflow >= 0.0 { Color::Green } else { Color::Red };

    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Transactions: ", label_style()),
            Span::raw(summary.transaction_count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Total spend:  ", label_style()),
            Span::styled(format!("{:.2}", summary.total_spend), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("  Total income: ", label_style()),
            Span::styled(format!("{:.2}", summary.total_income), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("  Net:          ", label_style()),
            Span::styled(
                format!("{:.2} ({})", summary.net_cashflow, summary.cashflow_label()),
                Style::default().fg(cashflow_color),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Avg expense:  ", label_style()),
            Span::raw(format!("{:.2}", summary.average_expense)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  Period: ", label_style())]),
        Line::from(format!("  {}", period)),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Skipped rows: ", label_style()),
            Span::raw(app.session.skipped_count().to_string()),
        ]),
    ];
    f.render_widget(Paragraph::new(content).block(bordered(" Summary ".to_string())), chunks[0]);

    let bars: Vec<Bar> = app
        .report
        .categories
        .iter()
        .filter(|c| c.spend > 0.0)
        .map(|c| {
            Bar::default()
                .label(Line::from(c.category.label()))
                .value(c.spend.round() as u64)
                .text_value(format!("{:.2} ({:.1}%)", c.spend, c.share_of_spend))
                .style(Style::default().fg(category_color(c.category)))
        })
        .collect();

    let chart = BarChart::default()
        .block(bordered(" Spend by category ".to_string()))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, chunks[1]);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["Date", "Description", "Amount", "Category"]);

    let rows = app.visible.iter().map(|i| {
        let tx = &app.session.transactions[*i];
        let t = &tx.transaction;
        Row::new(vec![
            Cell::from(t.date.format("%Y-%m-%d").to_string()),
            Cell::from(truncate(&t.description, 40)),
            Cell::from(format!("{:.2}", t.amount)).style(Style::default().fg(kind_color(t.kind))),
            Cell::from(tx.category.label()).style(Style::default().fg(category_color(tx.category))),
        ])
        .height(1)
    });

    let title = match app.filter {
        Some(category) => format!(" Transactions: {} ", category),
        None => " Transactions ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(24),
        ],
    )
    .header(header)
    .block(bordered(title))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Transaction Details ");

    let Some(tx) = app.selected_transaction() else {
        f.render_widget(Paragraph::new("No transaction selected").block(block), area);
        return;
    };
    let t = &tx.transaction;

    let keyword = match &tx.matched_keyword {
        Some(k) => Span::styled(format!("\"{}\"", k), Style::default().fg(Color::Yellow)),
        None => Span::styled("none (fallback)", Style::default().fg(Color::DarkGray)),
    };

    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  Date: ", label_style()), Span::raw(t.date.to_string())]),
        Line::from(vec![Span::styled("  Weekday: ", label_style()), Span::raw(t.day_of_week.to_string())]),
        Line::from(""),
        Line::from(vec![Span::styled("  Description: ", label_style()), Span::raw(t.description.clone())]),
        Line::from(vec![Span::styled("  Merchant: ", label_style()), Span::raw(t.merchant.clone())]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount: ", label_style()),
            Span::styled(format!("{:.2}", t.amount), Style::default().fg(kind_color(t.kind))),
        ]),
        Line::from(vec![
            Span::styled("  Type: ", label_style()),
            Span::styled(t.kind.as_str(), Style::default().fg(kind_color(t.kind))),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Category: ", label_style()),
            Span::styled(tx.category.label(), Style::default().fg(category_color(tx.category))),
        ]),
        Line::from(vec![Span::styled("  Matched keyword: ", label_style()), keyword]),
        Line::from(""),
        Line::from(vec![Span::styled("  Source line: ", label_style()), Span::raw(t.line_number.to_string())]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_insights(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Top merchants
    let merchant_rows = app.report.top_merchants.iter().enumerate().map(|(i, m)| {
        Row::new(vec![
            Cell::from(format!("{}", i + 1)),
            Cell::from(truncate(&m.merchant, 24)),
            Cell::from(format!("{:.2}", m.spend)).style(Style::default().fg(Color::Red)),
            Cell::from(format!("{:.1}%", m.share_of_spend)),
        ])
    });
    let merchants = Table::new(
        merchant_rows,
        [Constraint::Length(3), Constraint::Min(12), Constraint::Length(11), Constraint::Length(7)],
    )
    .header(header_row(&["#", "Merchant", "Spend", "Share"]))
    .block(bordered(" Top merchants ".to_string()));
    f.render_widget(merchants, top[0]);

    // Weekday x category
    let matrix = &app.report.weekday_matrix;
    let mut widths = vec![Constraint::Length(5)];
    widths.extend(matrix.categories.iter().map(|_| Constraint::Length(10)));

    let mut header_cells = vec![Cell::from("Day")];
    header_cells.extend(matrix.categories.iter().map(|c| {
        Cell::from(truncate(c.label(), 9)).style(Style::default().fg(category_color(*c)).add_modifier(Modifier::BOLD))
    }));

    let weekday_rows = matrix.weekdays.iter().zip(&matrix.spend).map(|(day, spend)| {
        let mut cells = vec![Cell::from(day.clone())];
        cells.extend(spend.iter().map(|v| {
            Cell::from(if *v > 0.0 { format!("{:.2}", v) } else { "·".to_string() })
        }));
        Row::new(cells)
    });
    let weekdays = Table::new(weekday_rows, widths)
        .header(Row::new(header_cells).style(Style::default().bg(Color::DarkGray)))
        .block(bordered(" Spend by weekday ".to_string()));
    f.render_widget(weekdays, top[1]);

    // Skipped rows
    let skipped_rows = app.session.skipped.iter().map(|s| {
        Row::new(vec![
            Cell::from(s.line.to_string()),
            Cell::from(truncate(&s.date, 12)),
            Cell::from(truncate(&s.description, 30)),
            Cell::from(truncate(&s.amount, 12)),
            Cell::from(s.reason.message()).style(Style::default().fg(Color::Red)),
        ])
    });
    let skipped = Table::new(
        skipped_rows,
        [
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(44),
        ],
    )
    .header(header_row(&["Line", "Date", "Description", "Amount", "Reason"]))
    .block(bordered(format!(" Skipped rows ({}) ", app.session.skipped_count())));
    f.render_widget(skipped, rows[1]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.visible.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(category) = app.filter {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", category),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    for (key, action) in [
        ("f", " Filter"),
        ("Enter", " Details"),
        ("Tab", " Page"),
        ("↑/↓", " Nav"),
        ("PgUp/PgDn", " Fast"),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
