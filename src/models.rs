//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. The intent is that these types stay light-weight data holders so other
//! layers can focus on presentation and persistence logic.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
/// A billable party with contact details, as stored in the `customers` table.
pub struct Customer {
    /// Primary key from the database. Auto-assigned on insert and immutable
    /// afterwards; bills reference it through their foreign key.
    pub id: i64,
    /// Required display name. The form layer rejects empty names before this
    /// struct is ever constructed.
    pub name: String,
    /// Optional contact email. `None` maps to NULL in the store.
    pub email: Option<String>,
    /// Optional phone number, kept as raw text.
    pub phone: Option<String>,
    /// Optional postal address.
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
/// A dated charge against one customer. This is the joined row shape the
/// billing table renders: the customer's name is resolved by the store's
/// join, not carried as a foreign key.
pub struct Bill {
    /// Primary key from the `bills` table.
    pub id: i64,
    /// Name of the customer the bill was charged to.
    pub customer: String,
    /// Calendar date of the charge. No time component.
    pub bill_date: NaiveDate,
    /// Total amount with two-digit fractional precision.
    pub total: Decimal,
    /// Opaque line-item blob (`name:qty:price` triples joined by commas).
    /// Stored and returned verbatim; nothing in this crate parses it.
    pub items: String,
}

#[derive(Debug, Clone)]
/// Lightweight (id, name) projection used to populate the bill form's
/// customer selector without dragging the full contact columns along.
pub struct CustomerName {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for CustomerName {
    /// Write the customer name to any formatter. Display is implemented so
    /// the type plays nicely with Ratatui widgets that consume strings
    /// implicitly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
