//! Persistence port for accepted rows, plus an in-memory implementation.

use crate::row::RawRow;
use crate::schema::Schema;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("record {record}: cannot store {value:?} as {field} ({reason})")]
    Coercion {
        record: usize,
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// An accepted row with columns renamed to record fields, values still raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    fields: Vec<(&'static str, String)>,
}

impl PendingRecord {
    /// Rename the schema's columns to field names. No checks; absent columns are skipped.
    pub fn from_row(row: &RawRow, schema: &Schema) -> Self {
        let fields = schema
            .columns()
            .iter()
            .filter_map(|col| row.get(col.name).map(|v| (col.field, v.to_string())))
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }
}

/// A typed daily trading record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub series: String,
    pub prev_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    pub close: f64,
    pub vwap: f64,
    pub volume: i64,
    pub turnover: f64,
    pub trades: i64,
    pub deliverable: i64,
    pub percentage_deliverable: f64,
}

struct Coercer<'a> {
    record: usize,
    pending: &'a PendingRecord,
}

impl Coercer<'_> {
    fn fail(&self, field: &'static str, value: &str, reason: impl Into<String>) -> PersistError {
        PersistError::Coercion {
            record: self.record,
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn raw(&self, field: &'static str) -> Result<&str, PersistError> {
        self.pending
            .get(field)
            .ok_or_else(|| self.fail(field, "", "missing"))
    }

    fn text(&self, field: &'static str) -> Result<String, PersistError> {
        Ok(self.raw(field)?.to_string())
    }

    fn date(&self, field: &'static str) -> Result<NaiveDate, PersistError> {
        let v = self.raw(field)?;
        NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|e| self.fail(field, v, e.to_string()))
    }

    fn number(&self, field: &'static str) -> Result<f64, PersistError> {
        let v = self.raw(field)?;
        match v.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            Ok(_) => Err(self.fail(field, v, "not finite")),
            Err(e) => Err(self.fail(field, v, e.to_string())),
        }
    }

    fn count(&self, field: &'static str) -> Result<i64, PersistError> {
        let n = self.number(field)?;
        if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
            return Err(self.fail(field, self.raw(field)?, "not a whole number"));
        }
        Ok(n as i64)
    }
}

impl PersistedRecord {
    /// Coerce raw values into their stored types.
    pub fn coerce(record: usize, pending: &PendingRecord) -> Result<Self, PersistError> {
        let c = Coercer { record, pending };
        Ok(Self {
            date: c.date("date")?,
            symbol: c.text("symbol")?,
            series: c.text("series")?,
            prev_close: c.number("prev_close")?,
            open: c.number("open")?,
            high: c.number("high")?,
            low: c.number("low")?,
            last: c.number("last")?,
            close: c.number("close")?,
            vwap: c.number("vwap")?,
            volume: c.count("volume")?,
            turnover: c.number("turnover")?,
            trades: c.count("trades")?,
            deliverable: c.count("deliverable")?,
            percentage_deliverable: c.number("percentage_deliverable")?,
        })
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store every record or none. Returns what was stored.
    async fn insert_many(
        &self,
        records: Vec<PendingRecord>,
    ) -> Result<Vec<PersistedRecord>, PersistError>;
}

/// Process-local store. Each batch is coerced fully before anything is appended.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<PersistedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<PersistedRecord> {
        self.records.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_many(
        &self,
        records: Vec<PendingRecord>,
    ) -> Result<Vec<PersistedRecord>, PersistError> {
        let typed = records
            .iter()
            .enumerate()
            .map(|(i, p)| PersistedRecord::coerce(i, p))
            .collect::<Result<Vec<_>, _>>()?;

        self.records.write().await.extend(typed.iter().cloned());
        Ok(typed)
    }
}
