use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use holdings_core::{
    error::AuthError,
    holdings::{
        ConfirmState, DialogMode, HoldingsPage, HoldingsStore, PageOutcome, PageRequest,
        PageResult,
    },
    models::{Holding, UserIdentity},
    notify::{Notification, NotificationSink, Severity},
    routes::{Route, Router},
    session::SessionStore,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info, warn};

use crate::input::{AuthForm, HoldingField, HoldingForm, TextInput};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::Success => self.success,
            Severity::Info => self.accent,
            Severity::Error => self.danger,
        }
    }

    fn signed(&self, value: f64) -> Color {
        if value > 0.0 {
            self.success
        } else if value < 0.0 {
            self.danger
        } else {
            self.primary_fg
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    LoggedIn(Result<UserIdentity, AuthError>),
    Registered(Result<(), AuthError>),
    LoggedOut(Result<(), AuthError>),
    Page { generation: u64, result: PageResult },
}

/// Terminal front-end over the holdings core.
pub struct HoldingsApp {
    session: Arc<SessionStore>,
    store: Arc<HoldingsStore>,
    notifier: Arc<dyn NotificationSink>,
    notifications: Option<mpsc::UnboundedReceiver<Notification>>,
    router: Router,
    state: UiState,
    auth: AuthForm,
    page: Option<HoldingsPage>,
    page_generation: u64,
    form: Option<HoldingForm>,
    logging_out: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl HoldingsApp {
    pub fn new(
        session: Arc<SessionStore>,
        store: Arc<HoldingsStore>,
        router: Router,
        notifier: Arc<dyn NotificationSink>,
        notifications: mpsc::UnboundedReceiver<Notification>,
    ) -> Self {
        Self {
            session,
            store,
            notifier,
            notifications: Some(notifications),
            router,
            state: UiState::default(),
            auth: AuthForm::default(),
            page: None,
            page_generation: 0,
            form: None,
            logging_out: false,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self, start_path: &str) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let route = Route::parse(start_path);
        self.navigate(route);

        let mut notifications = self.notifications.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = notifications.as_mut() {
                let mut closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_notification = rx.recv() => {
                        match maybe_notification {
                            Some(notification) => self.state.show(notification),
                            None => closed = true,
                        }
                    }
                }
                if closed {
                    notifications = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => true,
            Some(AppEvent::LoggedIn(result)) => {
                self.handle_logged_in(result);
                true
            }
            Some(AppEvent::Registered(result)) => {
                self.handle_registered(result);
                true
            }
            Some(AppEvent::LoggedOut(result)) => {
                self.handle_logged_out(result);
                true
            }
            Some(AppEvent::Page { generation, result }) => {
                self.handle_page_result(generation, result);
                true
            }
            None => false,
        }
    }

    fn navigate(&mut self, target: Route) {
        let previous = self.router.current();
        let route = self.router.navigate(target);
        if route != target {
            info!(%target, %route, "Navigation redirected");
        }

        match route {
            Route::Holdings => {
                if self.page.is_none() {
                    self.mount_page();
                }
            }
            Route::Login | Route::Register => {
                self.drop_page();
                if route != previous {
                    self.auth.clear_secret();
                    self.auth.pending = false;
                }
            }
        }
    }

    fn mount_page(&mut self) {
        let mut page = HoldingsPage::new(
            self.store.clone(),
            self.session.clone(),
            self.notifier.clone(),
            today(),
        );
        let requests = page.mount();
        self.page = Some(page);
        self.state.reset_cursor();
        info!(generation = self.page_generation, "Holdings page mounted");
        for request in requests {
            self.dispatch(request);
        }
    }

    /// Tear the page down; results still in flight for it are dropped.
    fn drop_page(&mut self) {
        if self.page.take().is_some() {
            self.page_generation = self.page_generation.wrapping_add(1);
            self.form = None;
            debug!(generation = self.page_generation, "Holdings page dropped");
        }
    }

    fn dispatch(&mut self, request: PageRequest) {
        let Some(page) = self.page.as_ref() else {
            return;
        };
        let Some(sender) = self.event_tx.clone() else {
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };

        let store = page.store().clone();
        let generation = self.page_generation;
        debug!(?request, generation, "Dispatching page request");
        spawn(async move {
            let result = request.execute(&store).await;
            let _ = sender.send(AppEvent::Page { generation, result }).await;
        });
    }

    fn handle_page_result(&mut self, generation: u64, result: PageResult) {
        if generation != self.page_generation {
            debug!(generation, "Dropping result for a page that is gone");
            return;
        }
        let Some(page) = self.page.as_mut() else {
            return;
        };

        let outcome = page.apply(result);
        if !page.edit().is_open() {
            self.form = None;
        }
        let len = page.store().len();
        self.state.clamp_cursor(len);

        match outcome {
            PageOutcome::Idle => {}
            PageOutcome::Follow(request) => self.dispatch(request),
            PageOutcome::RedirectToLogin => self.navigate(Route::Login),
        }
    }

    fn handle_logged_in(&mut self, result: Result<UserIdentity, AuthError>) {
        self.auth.pending = false;
        match result {
            Ok(user) => {
                self.auth = AuthForm::default();
                self.state.set_status(format!("Signed in as {}", user.email));
                self.navigate(Route::Holdings);
            }
            Err(err) => {
                warn!(%err, "Login failed");
                self.auth.clear_secret();
                self.notifier
                    .notify(Notification::error(err.user_message("Login failed")));
            }
        }
    }

    fn handle_registered(&mut self, result: Result<(), AuthError>) {
        self.auth.pending = false;
        match result {
            Ok(()) => {
                let email = self.auth.email.value().to_string();
                self.auth = AuthForm {
                    email: TextInput::new(email),
                    ..AuthForm::default()
                };
                self.notifier.notify(Notification::success(
                    "Account created, please sign in",
                ));
                self.navigate(Route::Login);
            }
            Err(err) => {
                warn!(%err, "Registration failed");
                self.auth.clear_secret();
                self.notifier
                    .notify(Notification::error(err.user_message("Registration failed")));
            }
        }
    }

    fn handle_logged_out(&mut self, result: Result<(), AuthError>) {
        self.logging_out = false;
        if let Err(err) = result {
            warn!(%err, "Logout call failed");
        }
        self.store.reset();
        self.navigate(Route::Login);
        self.state.set_status("Signed out".to_string());
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }

        match self.router.current() {
            Route::Login | Route::Register => self.handle_auth_key(key),
            Route::Holdings => self.handle_holdings_key(key),
        }
        Ok(())
    }

    fn handle_auth_key(&mut self, key: KeyEvent) {
        if self.auth.pending {
            return;
        }
        let on_login = self.router.current() == Route::Login;
        match key.code {
            KeyCode::Esc => {
                if on_login {
                    self.state.should_quit = true;
                } else {
                    self.navigate(Route::Login);
                }
            }
            KeyCode::Char('n') if on_login && key.modifiers == KeyModifiers::CONTROL => {
                self.navigate(Route::Register);
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.auth.toggle_focus()
            }
            KeyCode::Enter => {
                if self.auth.focus_password {
                    self.submit_auth(on_login);
                } else {
                    self.auth.toggle_focus();
                }
            }
            _ => edit_text(self.auth.focused(), key),
        }
    }

    fn submit_auth(&mut self, login: bool) {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            return;
        };
        let session = self.session.clone();
        let credentials = self.auth.credentials();
        self.auth.pending = true;
        if login {
            self.state.set_status("Signing in...".to_string());
            spawn(async move {
                let result = session.login(&credentials).await;
                let _ = sender.send(AppEvent::LoggedIn(result)).await;
            });
        } else {
            self.state.set_status("Creating account...".to_string());
            spawn(async move {
                let result = session.register(&credentials).await;
                let _ = sender.send(AppEvent::Registered(result)).await;
            });
        }
    }

    fn handle_holdings_key(&mut self, key: KeyEvent) {
        if self.logging_out {
            return;
        }
        let Some(page) = self.page.as_ref() else {
            return;
        };
        if matches!(page.confirmation().state(), ConfirmState::Pending { .. }) {
            self.handle_confirm_key(key);
        } else if page.edit().is_open() {
            self.handle_dialog_key(key);
        } else {
            self.handle_list_key(key);
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let holdings = self.store.holdings();
        let selected = holdings.get(self.state.cursor).and_then(|holding| holding.id);
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.state.move_cursor(-1, holdings.len()),
            KeyCode::Down | KeyCode::Char('j') => self.state.move_cursor(1, holdings.len()),
            KeyCode::PageUp => {
                let step = self.state.list_height.max(1) as isize;
                self.state.move_cursor(-step, holdings.len());
            }
            KeyCode::PageDown => {
                let step = self.state.list_height.max(1) as isize;
                self.state.move_cursor(step, holdings.len());
            }
            KeyCode::Home | KeyCode::Char('g') => self.state.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => {
                self.state.cursor = holdings.len().saturating_sub(1);
            }
            KeyCode::Char('n') => {
                if let Some(page) = self.page.as_mut() {
                    if page.open_new(today()) {
                        self.form = Some(HoldingForm::from_draft(page.edit().draft()));
                    }
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                let Some(id) = selected else {
                    return;
                };
                if let Some(page) = self.page.as_mut() {
                    if page.open_edit(id) {
                        self.form = Some(HoldingForm::from_draft(page.edit().draft()));
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let Some(id) = selected else {
                    return;
                };
                if let Some(page) = self.page.as_mut() {
                    if page.request_delete(id).is_none() {
                        self.state
                            .set_status("A delete is already in progress".to_string());
                    }
                }
            }
            KeyCode::Char('r') => {
                self.dispatch(PageRequest::LoadHoldings);
                self.dispatch(PageRequest::LoadBrokerages);
                self.state.set_status("Reloading...".to_string());
            }
            KeyCode::Char('R') => {
                if let Some(id) = selected {
                    self.dispatch(PageRequest::Refresh(id));
                }
            }
            KeyCode::Char('l') => self.logout(),
            _ => {}
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let (Some(page), Some(form)) = (self.page.as_mut(), self.form.as_mut()) else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                if page.close_dialog() {
                    self.form = None;
                }
            }
            KeyCode::Tab | KeyCode::Down => form.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => form.move_focus(-1),
            KeyCode::Enter => {
                if page.edit().is_submitting() {
                    return;
                }
                if let Err(reason) = form.write_to(page.edit_mut().draft_mut()) {
                    self.state.set_status(reason);
                    return;
                }
                if let Some(request) = page.submit() {
                    self.state.set_status("Saving...".to_string());
                    self.dispatch(request);
                }
            }
            KeyCode::Left | KeyCode::Right if form.focus() == HoldingField::Brokerage => {
                let delta = if key.code == KeyCode::Left { -1 } else { 1 };
                form.cycle_brokerage(&page.store().brokerages(), delta);
            }
            _ => {
                if let Some(input) = form.focused_input() {
                    edit_text(input, key);
                }
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(page) = self.page.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(request) = page.accept_delete() {
                    self.dispatch(request);
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                page.decline_delete();
            }
            _ => {}
        }
    }

    fn logout(&mut self) {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            return;
        };
        self.logging_out = true;
        self.state.set_status("Signing out...".to_string());
        let session = self.session.clone();
        spawn(async move {
            let result = session.logout().await;
            let _ = sender.send(AppEvent::LoggedOut(result)).await;
        });
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        match self.router.current() {
            Route::Login | Route::Register => self.draw_auth(frame, layout[0]),
            Route::Holdings => self.draw_holdings(frame, layout[0]),
        }
        self.render_status(frame, layout[1]);

        if let (Some(page), Some(form)) = (self.page.as_ref(), self.form.as_ref()) {
            if page.edit().is_open() {
                self.render_dialog(frame, page, form);
            }
        }
        if let Some(prompt) = self.page.as_ref().and_then(|page| page.confirmation().prompt()) {
            self.render_confirm(frame, &prompt);
        }
    }

    fn draw_auth(&self, frame: &mut Frame, area: Rect) {
        let register = self.router.current() == Route::Register;
        let title = if register { "Create account" } else { "Sign in" };
        let box_area = centered_rect(50, 10, area);
        frame.render_widget(Clear, box_area);

        let field = |label: &str, input: &TextInput, focused: bool| {
            let marker = if focused {
                Span::styled("▶ ", Style::default().fg(self.theme.accent))
            } else {
                Span::raw("  ")
            };
            Line::from(vec![
                marker,
                Span::styled(format!("{label:<10}"), Style::default().fg(self.theme.muted)),
                Span::raw(input.display()),
            ])
        };

        let helper = if register {
            "Enter next/submit  Tab switch  Esc back to sign in"
        } else {
            "Enter next/submit  Tab switch  Ctrl+N register  Esc quit"
        };
        let mut lines = vec![
            Line::from(""),
            field("Email", &self.auth.email, !self.auth.focus_password),
            field("Password", &self.auth.password, self.auth.focus_password),
            Line::from(""),
        ];
        if self.auth.pending {
            lines.push(Line::from(Span::styled(
                "Waiting for server...",
                Style::default().fg(self.theme.warning),
            )));
        } else {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            helper,
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, box_area);

        let input = if self.auth.focus_password {
            &self.auth.password
        } else {
            &self.auth.email
        };
        let row = if self.auth.focus_password { 3 } else { 2 };
        let cursor_x = (box_area.x + 13 + input.cursor() as u16)
            .min(box_area.x + box_area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, box_area.y + row);
    }

    fn draw_holdings(&mut self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_header(frame, layout[0]);
        self.render_table(frame, layout[1]);
        self.render_summary(frame, layout[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let belief = self.session.current_belief();
        let mut spans = vec![
            Span::styled(
                "Holdings",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(belief.display_email, Style::default().fg(self.theme.muted)),
        ];
        if self.store.is_loading() {
            spans.push(Span::styled(
                "  loading...",
                Style::default().fg(self.theme.warning),
            ));
        }
        let help = Line::from(Span::styled(
            "n new  e edit  d delete  r reload  R refresh row  l sign out  q quit",
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![Line::from(spans), help])
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(paragraph, area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect) {
        let holdings = self.store.holdings();
        self.state.list_height = area.height.saturating_sub(3) as usize;
        self.state.clamp_cursor(holdings.len());

        let header = Row::new(
            [
                "Symbol", "Qty", "Cost", "Date", "Brokerage", "Price", "Value", "P/L", "P/L %",
            ]
            .into_iter()
            .map(|title| Cell::from(title).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .style(Style::default().fg(self.theme.accent));

        let rows: Vec<Row> = holdings
            .iter()
            .map(|holding| self.holding_row(holding))
            .collect();

        let widths = [
            Constraint::Min(14),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(8),
        ];
        let title = if holdings.is_empty() && !self.store.is_loading() {
            "Holdings (empty, press n to add one)".to_string()
        } else {
            format!("Holdings ({})", holdings.len())
        };
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");

        let mut table_state = TableState::default();
        if !holdings.is_empty() {
            table_state.select(Some(self.state.cursor));
        }
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn holding_row(&self, holding: &Holding) -> Row<'static> {
        let brokerage = holding
            .brokerage_id
            .and_then(|id| self.store.brokerage_name(id))
            .unwrap_or_default();
        let signed = |value: Option<f64>, text: String| {
            Cell::from(text).style(Style::default().fg(self.theme.signed(value.unwrap_or(0.0))))
        };
        Row::new(vec![
            Cell::from(holding.display_name()),
            Cell::from(format_amount(holding.quantity)),
            Cell::from(format_amount(holding.cost_basis)),
            Cell::from(holding.purchase_date.format("%Y-%m-%d").to_string()),
            Cell::from(brokerage),
            Cell::from(format_optional(holding.current_price)),
            Cell::from(format_optional(holding.market_value)),
            signed(holding.profit_loss, format_optional(holding.profit_loss)),
            signed(
                holding.profit_loss_percent,
                holding
                    .profit_loss_percent
                    .map(|pct| format!("{pct:+.2}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ])
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect) {
        let summary = self.store.summary();
        let percent = summary
            .profit_loss_percent()
            .map(|pct| format!(" ({pct:+.2}%)"))
            .unwrap_or_default();
        let line = Line::from(vec![
            Span::raw(format!("Positions {}  ", summary.positions)),
            Span::raw(format!("Cost {}  ", format_amount(summary.cost_total))),
            Span::raw(format!("Value {}  ", format_amount(summary.market_value))),
            Span::styled(
                format!("P/L {}{percent}", format_amount(summary.profit_loss)),
                Style::default().fg(self.theme.signed(summary.profit_loss)),
            ),
        ]);
        let paragraph =
            Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Totals"));
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let style = Style::default().fg(self.theme.severity(self.state.severity));
        let paragraph = Paragraph::new(Line::from(Span::styled(self.state.status.clone(), style)))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_dialog(&self, frame: &mut Frame, page: &HoldingsPage, form: &HoldingForm) {
        let edit = page.edit();
        let title = match edit.mode() {
            DialogMode::Edit(_) => "Edit holding",
            _ => "New holding",
        };
        let area = centered_rect(56, 14, frame.size());
        frame.render_widget(Clear, area);

        let mut lines = vec![Line::from("")];
        let mut cursor = None;
        for (row, field) in HoldingField::ALL.iter().enumerate() {
            let focused = form.focus() == *field;
            let marker = if focused {
                Span::styled("▶ ", Style::default().fg(self.theme.accent))
            } else {
                Span::raw("  ")
            };
            let label_style = if *field == HoldingField::Symbol && edit.symbol_error() {
                Style::default().fg(self.theme.danger)
            } else {
                Style::default().fg(self.theme.muted)
            };
            let value = match form.input(*field) {
                Some(input) => {
                    if focused {
                        cursor = Some((row as u16 + 1, input.cursor() as u16));
                    }
                    input.display()
                }
                None => {
                    let name = form
                        .brokerage_id()
                        .and_then(|id| page.store().brokerage_name(id))
                        .unwrap_or_else(|| "(none)".to_string());
                    format!("◀ {name} ▶")
                }
            };
            lines.push(Line::from(vec![
                marker,
                Span::styled(format!("{:<15}", field.label()), label_style),
                Span::raw(value),
            ]));
        }
        lines.push(Line::from(""));
        if edit.symbol_error() {
            lines.push(Line::from(Span::styled(
                "Symbol is required.",
                Style::default().fg(self.theme.danger),
            )));
        } else if edit.is_submitting() {
            lines.push(Line::from(Span::styled(
                "Saving...",
                Style::default().fg(self.theme.warning),
            )));
        } else {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" save  "),
            Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" next field  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        if let Some((row, column)) = cursor {
            let cursor_x =
                (area.x + 18 + column).min(area.x + area.width.saturating_sub(2));
            frame.set_cursor(cursor_x, area.y + 1 + row);
        }
    }

    fn render_confirm(&self, frame: &mut Frame, prompt: &str) {
        let area = centered_rect(50, 6, frame.size());
        frame.render_widget(Clear, area);
        let helper = Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" yes  "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" no"),
        ]);
        let paragraph = Paragraph::new(vec![Line::from(prompt.to_string()), Line::from(""), helper])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm")
                    .border_style(Style::default().fg(self.theme.warning)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn edit_text(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Left => input.move_cursor(-1),
        KeyCode::Right => input.move_cursor(1),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Char(ch) => {
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                input.insert(ch);
            }
        }
        _ => {}
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    cursor: usize,
    list_height: usize,
    status: String,
    severity: Severity,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            list_height: 1,
            status: "Ready".to_string(),
            severity: Severity::Info,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
        self.severity = Severity::Info;
    }

    fn show(&mut self, notification: Notification) {
        self.severity = notification.severity;
        self.status = notification.to_string();
    }

    fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let idx = (self.cursor as isize).saturating_add(delta);
        self.cursor = idx.clamp(0, len as isize - 1) as usize;
    }

    fn clamp_cursor(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_amount).unwrap_or_else(|| "-".to_string())
}
