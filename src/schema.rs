//! The fixed column contract for daily equity trading files.

use crate::validators::{is_numeric, is_valid_date};

/// How a column's raw value is checked on every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Numeric,
    /// Required as a header, never checked per row.
    Text,
}

impl ColumnKind {
    /// `None` when the kind has no per-row check.
    pub fn validator(self) -> Option<fn(&str) -> bool> {
        match self {
            ColumnKind::Date => Some(is_valid_date),
            ColumnKind::Numeric => Some(is_numeric),
            ColumnKind::Text => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Header name as it appears in the file.
    pub name: &'static str,
    /// Field name on the persisted record.
    pub field: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, field: &'static str, kind: ColumnKind) -> Self {
        Self { name, field, kind }
    }
}

/// Ordered set of required columns. Built once as a `static` and shared by reference.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    columns: &'static [ColumnSpec],
}

static EQUITY_DAILY_COLUMNS: [ColumnSpec; 15] = [
    ColumnSpec::new("Date", "date", ColumnKind::Date),
    ColumnSpec::new("Symbol", "symbol", ColumnKind::Text),
    ColumnSpec::new("Series", "series", ColumnKind::Text),
    ColumnSpec::new("Prev Close", "prev_close", ColumnKind::Numeric),
    ColumnSpec::new("Open", "open", ColumnKind::Numeric),
    ColumnSpec::new("High", "high", ColumnKind::Numeric),
    ColumnSpec::new("Low", "low", ColumnKind::Numeric),
    ColumnSpec::new("Last", "last", ColumnKind::Numeric),
    ColumnSpec::new("Close", "close", ColumnKind::Numeric),
    ColumnSpec::new("VWAP", "vwap", ColumnKind::Numeric),
    ColumnSpec::new("Volume", "volume", ColumnKind::Numeric),
    ColumnSpec::new("Turnover", "turnover", ColumnKind::Numeric),
    ColumnSpec::new("Trades", "trades", ColumnKind::Numeric),
    ColumnSpec::new("Deliverable Volume", "deliverable", ColumnKind::Numeric),
    ColumnSpec::new("%Deliverble", "percentage_deliverable", ColumnKind::Numeric),
];

static EQUITY_DAILY: Schema = Schema::new(&EQUITY_DAILY_COLUMNS);

impl Schema {
    pub const fn new(columns: &'static [ColumnSpec]) -> Self {
        Self { columns }
    }

    /// The daily equity bhavcopy layout (`Date, Symbol, Series, Prev Close, ...`).
    pub fn equity_daily() -> &'static Schema {
        &EQUITY_DAILY
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        self.columns
    }

    pub fn required_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Required columns absent from `headers`, in schema order. Matching is exact.
    pub fn missing_columns<S: AsRef<str>>(&self, headers: &[S]) -> Vec<&'static str> {
        self.required_names()
            .filter(|req| !headers.iter().any(|h| h.as_ref() == *req))
            .collect()
    }
}
