use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::CustomerName;

/// Internal representation of the "add customer" form fields.
#[derive(Default, Clone)]
pub(crate) struct CustomerForm {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) address: String,
    pub(crate) active: CustomerField,
    pub(crate) error: Option<String>,
}

/// Fields available within the customer form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum CustomerField {
    #[default]
    Name,
    Email,
    Phone,
    Address,
}

impl CustomerForm {
    /// Cycle focus across the four fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            CustomerField::Name => CustomerField::Email,
            CustomerField::Email => CustomerField::Phone,
            CustomerField::Phone => CustomerField::Address,
            CustomerField::Address => CustomerField::Name,
        };
    }

    /// Append a character to the active field, validating allowed input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            CustomerField::Name => self.name.push(ch),
            CustomerField::Email => self.email.push(ch),
            CustomerField::Phone => self.phone.push(ch),
            CustomerField::Address => self.address.push(ch),
        }
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            CustomerField::Name => {
                self.name.pop();
            }
            CustomerField::Email => {
                self.email.pop();
            }
            CustomerField::Phone => {
                self.phone.pop();
            }
            CustomerField::Address => {
                self.address.pop();
            }
        }
    }

    /// Validate the inputs and return typed values ready for persistence.
    /// The name is the only required field; blank optional fields become
    /// `None` so they land in the store as NULL.
    pub(crate) fn parse_inputs(&self) -> Result<(String, Option<String>, Option<String>, Option<String>)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Customer name is required."));
        }
        Ok((
            name.to_string(),
            optional(&self.email),
            optional(&self.phone),
            optional(&self.address),
        ))
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field_name: &str, field: CustomerField) -> Line<'static> {
        let (value, is_active) = match field {
            CustomerField::Name => (&self.name, self.active == CustomerField::Name),
            CustomerField::Email => (&self.email, self.active == CustomerField::Email),
            CustomerField::Phone => (&self.phone, self.active == CustomerField::Phone),
            CustomerField::Address => (&self.address, self.active == CustomerField::Address),
        };

        let placeholder = match field {
            CustomerField::Name => "<required>",
            _ => "<optional>",
        };

        build_text_line(field_name, value, placeholder, is_active)
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: CustomerField) -> usize {
        match field {
            CustomerField::Name => self.name.chars().count(),
            CustomerField::Email => self.email.chars().count(),
            CustomerField::Phone => self.phone.chars().count(),
            CustomerField::Address => self.address.chars().count(),
        }
    }
}

/// Form state for bill creation. The customer is picked from a snapshot of
/// the (id, name) projection taken when the form opens; the remaining
/// fields are free text validated on save.
#[derive(Clone)]
pub(crate) struct BillForm {
    pub(crate) customers: Vec<CustomerName>,
    pub(crate) customer_index: usize,
    pub(crate) date: String,
    pub(crate) total: String,
    pub(crate) items: String,
    pub(crate) active: BillField,
    pub(crate) error: Option<String>,
}

/// Enumerates the fields within the bill form to drive focus management.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum BillField {
    Customer,
    Date,
    Total,
    Items,
}

impl BillForm {
    /// Open a fresh form over the current customer projection, seeding the
    /// date field with today so the common case is a single Enter away.
    pub(crate) fn new(customers: Vec<CustomerName>, today: NaiveDate) -> Self {
        Self {
            customers,
            customer_index: 0,
            date: today.format("%Y-%m-%d").to_string(),
            total: String::new(),
            items: String::new(),
            active: BillField::Customer,
            error: None,
        }
    }

    /// Cycle focus across the four fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            BillField::Customer => BillField::Date,
            BillField::Date => BillField::Total,
            BillField::Total => BillField::Items,
            BillField::Items => BillField::Customer,
        };
    }

    /// Move the customer selector. Only meaningful while the customer field
    /// has focus; the caller routes Up/Down here in that case.
    pub(crate) fn select_customer(&mut self, offset: isize) {
        if self.customers.is_empty() {
            return;
        }
        let max = self.customers.len() as isize - 1;
        let new = (self.customer_index as isize + offset).clamp(0, max);
        self.customer_index = new as usize;
    }

    /// The currently selected customer, if the projection is non-empty.
    pub(crate) fn selected_customer(&self) -> Option<&CustomerName> {
        self.customers.get(self.customer_index)
    }

    /// Append a character to the active field, validating allowed input.
    /// The date and total fields only accept characters that could appear
    /// in a well-formed value; everything else is rejected at the keystroke.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            BillField::Customer => false,
            BillField::Date => {
                if ch.is_ascii_digit() || ch == '-' {
                    self.date.push(ch);
                    true
                } else {
                    false
                }
            }
            BillField::Total => {
                if ch.is_ascii_digit() || ch == '.' {
                    self.total.push(ch);
                    true
                } else {
                    false
                }
            }
            BillField::Items => {
                if !ch.is_control() {
                    self.items.push(ch);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            BillField::Customer => {}
            BillField::Date => {
                self.date.pop();
            }
            BillField::Total => {
                self.total.pop();
            }
            BillField::Items => {
                self.items.pop();
            }
        }
    }

    /// Validate the inputs and return typed values ready for persistence.
    /// All rejection happens here, before any store call: a selected
    /// customer, a well-formed calendar date, a strictly positive total,
    /// and a non-empty items blob. The items text itself is passed through
    /// verbatim so the store round-trips it byte for byte.
    pub(crate) fn parse_inputs(&self) -> Result<(i64, NaiveDate, Decimal, String)> {
        let customer = self
            .selected_customer()
            .ok_or_else(|| anyhow!("No customers available. Add a customer first."))?;

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .context("Bill date must be a valid YYYY-MM-DD date.")?;

        let total = Decimal::from_str(self.total.trim())
            .map_err(|_| anyhow!("Total amount must be a number."))?;
        if total <= Decimal::ZERO {
            return Err(anyhow!("Total amount must be greater than zero."));
        }

        if self.items.trim().is_empty() {
            return Err(anyhow!("At least one line item is required."));
        }

        Ok((customer.id, date, total.round_dp(2), self.items.clone()))
    }

    /// Render a single line for the form widget. The customer line shows
    /// the current pick instead of typed text.
    pub(crate) fn build_line(&self, field_name: &str, field: BillField) -> Line<'static> {
        if field == BillField::Customer {
            let is_active = self.active == BillField::Customer;
            let display = match self.selected_customer() {
                Some(customer) => format!("{} (id {})", customer.name, customer.id),
                None => "<no customers>".to_string(),
            };
            let style = if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(format!("{field_name}: ")),
                Span::styled(display, style),
            ];
            if is_active && self.customers.len() > 1 {
                spans.push(Span::styled(
                    "  (Up/Down to change)",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            return Line::from(spans);
        }

        let (value, is_active) = match field {
            BillField::Customer => unreachable!("handled above"),
            BillField::Date => (&self.date, self.active == BillField::Date),
            BillField::Total => (&self.total, self.active == BillField::Total),
            BillField::Items => (&self.items, self.active == BillField::Items),
        };

        let placeholder = match field {
            BillField::Date => "<YYYY-MM-DD>",
            BillField::Total => "<required>",
            _ => "<Item:Qty:Price, ...>",
        };

        build_text_line(field_name, value, placeholder, is_active)
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: BillField) -> usize {
        match field {
            BillField::Customer => 0,
            BillField::Date => self.date.chars().count(),
            BillField::Total => self.total.chars().count(),
            BillField::Items => self.items.chars().count(),
        }
    }
}

/// Shared rendering for a labelled text field with placeholder and focus
/// styling.
fn build_text_line(
    field_name: &str,
    value: &str,
    placeholder: &str,
    is_active: bool,
) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, style),
    ])
}

/// Blank-or-whitespace optional fields collapse to `None`.
fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[(i64, &str)]) -> Vec<CustomerName> {
        entries
            .iter()
            .map(|(id, name)| CustomerName {
                id: *id,
                name: (*name).to_string(),
            })
            .collect()
    }

    fn filled_bill_form() -> BillForm {
        let mut form = BillForm::new(
            names(&[(1, "Alice"), (2, "Bob")]),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        form.total = "12.99".to_string();
        form.items = "Pen:2:1.50,Book:1:9.99".to_string();
        form
    }

    #[test]
    fn customer_form_requires_a_name() {
        let mut form = CustomerForm::default();
        form.email = "a@x.com".to_string();
        assert!(form.parse_inputs().is_err());

        form.name = "   ".to_string();
        assert!(form.parse_inputs().is_err());
    }

    #[test]
    fn customer_form_collapses_blank_optionals() {
        let mut form = CustomerForm::default();
        form.name = " Alice ".to_string();
        form.phone = "  ".to_string();
        form.address = "1 Main St".to_string();

        let (name, email, phone, address) = form.parse_inputs().unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(email, None);
        assert_eq!(phone, None);
        assert_eq!(address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn bill_form_parses_valid_inputs() {
        let form = filled_bill_form();
        let (customer_id, date, total, items) = form.parse_inputs().unwrap();
        assert_eq!(customer_id, 1);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(total, Decimal::new(1299, 2));
        assert_eq!(items, "Pen:2:1.50,Book:1:9.99");
    }

    #[test]
    fn bill_form_rejects_empty_items() {
        let mut form = filled_bill_form();
        form.items = "  ".to_string();
        assert!(form.parse_inputs().is_err());
    }

    #[test]
    fn bill_form_rejects_non_positive_totals() {
        let mut form = filled_bill_form();
        form.total = "0".to_string();
        assert!(form.parse_inputs().is_err());

        form.total = "not-a-number".to_string();
        assert!(form.parse_inputs().is_err());
    }

    #[test]
    fn bill_form_rejects_malformed_dates() {
        let mut form = filled_bill_form();
        form.date = "01/01/2024".to_string();
        assert!(form.parse_inputs().is_err());
    }

    #[test]
    fn bill_form_requires_an_available_customer() {
        let form = BillForm::new(Vec::new(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(form.parse_inputs().is_err());
    }

    #[test]
    fn customer_selector_is_bounded() {
        let mut form = filled_bill_form();
        form.select_customer(-3);
        assert_eq!(form.selected_customer().unwrap().id, 1);
        form.select_customer(10);
        assert_eq!(form.selected_customer().unwrap().id, 2);
    }

    #[test]
    fn date_and_total_fields_filter_keystrokes() {
        let mut form = filled_bill_form();
        form.active = BillField::Total;
        assert!(!form.push_char('x'));
        assert!(form.push_char('5'));

        form.active = BillField::Date;
        assert!(!form.push_char('/'));
        assert!(form.push_char('-'));
    }
}
