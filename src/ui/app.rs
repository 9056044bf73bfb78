use std::mem;

use anyhow::Result;
use chrono::Local;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

use crate::db::{Store, StoreError};
use crate::models::{Bill, Customer, CustomerName};

use super::forms::{BillField, BillForm, CustomerField, CustomerForm};
use super::helpers::{centered_rect, surface_error};
use super::screens::TableCursor;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// High-level navigation states. One screen per entity; Tab flips between
/// them, mirroring the two tabs of a windowed data-entry app.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Screen {
    Customers,
    Billing,
}

/// Fine-grained modes scoped to the current screen. Forms are modal: while
/// one is open every key feeds the form until it saves or cancels.
enum Mode {
    Normal,
    AddingCustomer(CustomerForm),
    AddingBill(BillForm),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. The struct combines the
/// store, the cached result sets, and the active mode. The caches are only
/// ever replaced wholesale: after every successful mutation all three are
/// re-fetched in full, so no incremental bookkeeping exists anywhere.
pub struct App {
    /// Long-lived persistence handle. Kept on the struct so every handler
    /// can synchronously issue calls without extra plumbing.
    store: Store,
    /// Full customer list backing the customers table.
    customers: Vec<Customer>,
    /// Full joined bill list backing the billing table.
    bills: Vec<Bill>,
    /// (id, name) projection backing the bill form's customer selector.
    customer_names: Vec<CustomerName>,
    /// Active high-level screen.
    screen: Screen,
    /// Current interaction mode for that screen.
    mode: Mode,
    /// Optional status line surfaced in the footer.
    status: Option<StatusMessage>,
    customer_cursor: TableCursor,
    bill_cursor: TableCursor,
}

impl App {
    /// Construct an `App` over a connected store and load the initial data.
    /// A failed initial load is reported in the footer instead of aborting,
    /// matching how every later failure is handled.
    pub fn new(store: Store) -> Self {
        let mut app = Self::empty(store);
        if let Err(err) = app.reload_all() {
            app.set_status(format!("Failed to load data: {err}"), StatusKind::Error);
        }
        app
    }

    /// Construct an `App` whose store never connected. The app still runs;
    /// every operation reports the disconnected failure.
    pub fn with_startup_failure(err: StoreError) -> Self {
        let mut app = Self::empty(Store::disconnected());
        app.set_status(
            format!("Database connection failed: {err}"),
            StatusKind::Error,
        );
        app
    }

    fn empty(store: Store) -> Self {
        Self {
            store,
            customers: Vec::new(),
            bills: Vec::new(),
            customer_names: Vec::new(),
            screen: Screen::Customers,
            mode: Mode::Normal,
            status: None,
            customer_cursor: TableCursor::default(),
            bill_cursor: TableCursor::default(),
        }
    }

    /// Release the store connection on the way out. Safe to call even when
    /// initialization already failed.
    pub fn close_store(&mut self) {
        self.store.close();
    }

    /// Top-level key dispatcher. Every key funnels through the active
    /// `Mode`, which returns the next mode to run. The boolean result tells
    /// the outer loop whether the user requested an exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingCustomer(form) => self.handle_add_customer(code, form)?,
            Mode::AddingBill(form) => self.handle_add_bill(code, form)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Handle keys while in `Mode::Normal`: table navigation, screen
    /// switching, refresh, and opening the add forms.
    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.clear_status();
                self.screen = match self.screen {
                    Screen::Customers => Screen::Billing,
                    Screen::Billing => Screen::Customers,
                };
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-5),
            KeyCode::PageDown => self.move_selection(5),
            KeyCode::Home => match self.screen {
                Screen::Customers => self.customer_cursor.select_first(),
                Screen::Billing => self.bill_cursor.select_first(),
            },
            KeyCode::End => match self.screen {
                Screen::Customers => self.customer_cursor.select_last(self.customers.len()),
                Screen::Billing => self.bill_cursor.select_last(self.bills.len()),
            },
            KeyCode::Char('+') | KeyCode::Char('a') | KeyCode::Char('A') => {
                return Ok(self.open_add_form());
            }
            KeyCode::Char('r') | KeyCode::Char('R') => match self.reload_all() {
                Ok(()) => self.set_status("Data refreshed.", StatusKind::Info),
                Err(err) => self.set_status(err.to_string(), StatusKind::Error),
            },
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Open the add form for the active screen. Creating a bill is gated on
    /// at least one customer existing; the rejection happens here, before
    /// any persistence call could be made.
    fn open_add_form(&mut self) -> Mode {
        self.clear_status();
        match self.screen {
            Screen::Customers => Mode::AddingCustomer(CustomerForm::default()),
            Screen::Billing => {
                if self.customer_names.is_empty() {
                    self.set_status(
                        "No customers available. Add a customer first.",
                        StatusKind::Error,
                    );
                    Mode::Normal
                } else {
                    Mode::AddingBill(BillForm::new(
                        self.customer_names.clone(),
                        Local::now().date_naive(),
                    ))
                }
            }
        }
    }

    /// Process key presses while the "Add Customer" form is active. Returns
    /// the next mode so the caller can continue driving the state machine.
    fn handle_add_customer(&mut self, code: KeyCode, mut form: CustomerForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add customer cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_customer(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingCustomer(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    /// Mirror of `handle_add_customer` for the bill form, with Up/Down
    /// routed to the customer selector while that field has focus.
    fn handle_add_bill(&mut self, code: KeyCode, mut form: BillForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Bill creation cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Up if form.active == BillField::Customer => form.select_customer(-1),
            KeyCode::Down if form.active == BillField::Customer => form.select_customer(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_bill(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingBill(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    /// Persist a new customer from the form data and re-fetch every view.
    fn save_new_customer(&mut self, form: &CustomerForm) -> Result<()> {
        let (name, email, phone, address) = form.parse_inputs()?;
        let id = self.store.add_customer(
            &name,
            email.as_deref(),
            phone.as_deref(),
            address.as_deref(),
        )?;
        self.reload_all()?;
        self.set_status(format!("Customer added with id {id}."), StatusKind::Info);
        Ok(())
    }

    /// Persist a new bill from the form data and re-fetch every view. A
    /// dangling customer reference is not checked here; the store's
    /// foreign-key constraint reports it.
    fn save_new_bill(&mut self, form: &BillForm) -> Result<()> {
        let (customer_id, date, total, items) = form.parse_inputs()?;
        let id = self.store.add_bill(customer_id, date, total, &items)?;
        self.reload_all()?;
        self.set_status(format!("Bill created with id {id}."), StatusKind::Info);
        Ok(())
    }

    /// Re-fetch the complete customer list, the complete bill list, and the
    /// customer-name projection. There is no partial refresh: this is the
    /// whole contract between mutations and the rendered tables.
    fn reload_all(&mut self) -> Result<(), StoreError> {
        self.customers = self.store.all_customers()?;
        self.bills = self.store.all_bills()?;
        self.customer_names = self.store.customer_names()?;
        self.customer_cursor.clamp(self.customers.len());
        self.bill_cursor.clamp(self.bills.len());
        Ok(())
    }

    fn move_selection(&mut self, offset: isize) {
        match self.screen {
            Screen::Customers => self.customer_cursor.move_by(offset, self.customers.len()),
            Screen::Billing => self.bill_cursor.move_by(offset, self.bills.len()),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Main render routine invoked each tick. Splits the frame into content
    /// and footer regions, draws the active screen, then overlays any modal
    /// form.
    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match self.screen {
            Screen::Customers => self.draw_customers(frame, content_area),
            Screen::Billing => self.draw_bills(frame, content_area),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingCustomer(form) => self.draw_customer_form(frame, area, form),
            Mode::AddingBill(form) => self.draw_bill_form(frame, area, form),
            Mode::Normal => {}
        }
    }

    /// Render the customers table with the row highlight.
    fn draw_customers(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Customers ({})", self.customers.len()));

        if self.customers.is_empty() {
            let message = Paragraph::new("No customers yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(["ID", "Name", "Email", "Phone", "Address"])
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self.customers.iter().map(|customer| {
            Row::new([
                customer.id.to_string(),
                customer.name.clone(),
                customer.email.clone().unwrap_or_default(),
                customer.phone.clone().unwrap_or_default(),
                customer.address.clone().unwrap_or_default(),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(24),
                Constraint::Percentage(26),
                Constraint::Length(16),
                Constraint::Percentage(34),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(self.customer_cursor.index()));
        frame.render_stateful_widget(table, area, &mut state);
    }

    /// Render the bills table. Rows come straight from the store's join;
    /// the items column shows the blob verbatim.
    fn draw_bills(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Bills ({})", self.bills.len()));

        if self.bills.is_empty() {
            let message = Paragraph::new("No bills yet. Press '+' to create one.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(["ID", "Customer", "Date", "Amount", "Items"])
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self.bills.iter().map(|bill| {
            Row::new([
                bill.id.to_string(),
                bill.customer.clone(),
                bill.bill_date.to_string(),
                bill.total.to_string(),
                bill.items.clone(),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(22),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Percentage(46),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(self.bill_cursor.index()));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.mode, self.screen) {
            (Mode::AddingCustomer(_), _) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Next Field   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Mode::AddingBill(_), _) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Choose Customer   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next Field   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Mode::Normal, Screen::Customers) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Billing   "),
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add Customer   "),
                Span::styled("[r]", key_style),
                Span::raw(" Refresh   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            (Mode::Normal, Screen::Billing) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Customers   "),
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[+]", key_style),
                Span::raw(" New Bill   "),
                Span::styled("[r]", key_style),
                Span::raw(" Refresh   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_customer_form(&self, frame: &mut Frame, area: Rect, form: &CustomerForm) {
        let popup_area = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Add Customer").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Name", CustomerField::Name),
            form.build_line("Email", CustomerField::Email),
            form.build_line("Phone", CustomerField::Phone),
            form.build_line("Address", CustomerField::Address),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (prefix, row) = match form.active {
            CustomerField::Name => ("Name: ", 0),
            CustomerField::Email => ("Email: ", 1),
            CustomerField::Phone => ("Phone: ", 2),
            CustomerField::Address => ("Address: ", 3),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x, inner.y + row));
    }

    fn draw_bill_form(&self, frame: &mut Frame, area: Rect, form: &BillForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Create Bill").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Customer", BillField::Customer),
            form.build_line("Date", BillField::Date),
            form.build_line("Total", BillField::Total),
            form.build_line("Items", BillField::Items),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        // The selector has no text cursor; only the typed fields get one.
        let cursor = match form.active {
            BillField::Customer => None,
            BillField::Date => Some(("Date: ", 1)),
            BillField::Total => Some(("Total: ", 2)),
            BillField::Items => Some(("Items: ", 3)),
        };
        if let Some((prefix, row)) = cursor {
            let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
            frame.set_cursor_position((cursor_x, inner.y + row));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_memory_store() -> App {
        App::new(Store::open_in_memory().expect("in-memory store"))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn bill_form_is_rejected_without_customers() {
        let mut app = app_with_memory_store();

        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Char('+')).unwrap();

        // The rejection happens before any persistence call: no form opens
        // and the bill list stays empty.
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app
            .status
            .as_ref()
            .is_some_and(|status| matches!(status.kind, StatusKind::Error)));
        assert!(app.bills.is_empty());
    }

    #[test]
    fn adding_a_customer_then_a_bill_refreshes_every_view() {
        let mut app = app_with_memory_store();

        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "Alice");
        app.handle_key(KeyCode::Enter).unwrap();

        assert_eq!(app.customers.len(), 1);
        assert_eq!(app.customer_names.len(), 1);
        assert!(matches!(app.mode, Mode::Normal));

        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Char('+')).unwrap();
        assert!(matches!(app.mode, Mode::AddingBill(_)));

        // Customer and date are pre-seeded; fill in total and items.
        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "12.99");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "Pen:2:1.50,Book:1:9.99");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.bills.len(), 1);
        assert_eq!(app.bills[0].customer, "Alice");
        assert_eq!(app.bills[0].items, "Pen:2:1.50,Book:1:9.99");
    }

    #[test]
    fn empty_name_keeps_the_form_open_with_an_error() {
        let mut app = app_with_memory_store();

        app.handle_key(KeyCode::Char('+')).unwrap();
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.mode {
            Mode::AddingCustomer(form) => assert!(form.error.is_some()),
            _ => panic!("form should stay open after a validation failure"),
        }
        assert!(app.customers.is_empty());
    }

    #[test]
    fn disconnected_store_reports_failure_instead_of_crashing() {
        let mut app = App::with_startup_failure(StoreError::Disconnected);

        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "Alice");
        app.handle_key(KeyCode::Enter).unwrap();

        // The save fails, the form stays open, the process keeps running.
        assert!(matches!(app.mode, Mode::AddingCustomer(_)));
        assert!(app.customers.is_empty());
    }
}
