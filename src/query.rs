//! Read-side aggregations over stored records, grouped by symbol.

use crate::store::PersistedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Inclusive date bounds and an optional symbol allow-list (empty = every symbol).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub symbols: Vec<String>,
}

impl RecordFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            symbols: Vec::new(),
        }
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, record: &PersistedRecord) -> bool {
        self.from.is_none_or(|from| record.date >= from)
            && self.to.is_none_or(|to| record.date <= to)
            && (self.symbols.is_empty() || self.symbols.iter().any(|s| *s == record.symbol))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumePeak {
    pub symbol: String,
    pub date: NaiveDate,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolAverage {
    pub symbol: String,
    pub value: f64,
    pub samples: usize,
}

/// Per symbol, the day with the highest volume. Ties keep the earliest record seen.
pub fn max_volume(records: &[PersistedRecord], filter: &RecordFilter) -> Vec<VolumePeak> {
    let mut peaks: BTreeMap<&str, &PersistedRecord> = BTreeMap::new();
    for rec in records.iter().filter(|r| filter.matches(r)) {
        peaks
            .entry(rec.symbol.as_str())
            .and_modify(|best| {
                if rec.volume > best.volume {
                    *best = rec;
                }
            })
            .or_insert(rec);
    }
    peaks
        .into_values()
        .map(|r| VolumePeak {
            symbol: r.symbol.clone(),
            date: r.date,
            volume: r.volume,
        })
        .collect()
}

pub fn average_close(records: &[PersistedRecord], filter: &RecordFilter) -> Vec<SymbolAverage> {
    average_by_symbol(records, filter, |r| r.close)
}

pub fn average_vwap(records: &[PersistedRecord], filter: &RecordFilter) -> Vec<SymbolAverage> {
    average_by_symbol(records, filter, |r| r.vwap)
}

fn average_by_symbol(
    records: &[PersistedRecord],
    filter: &RecordFilter,
    value: impl Fn(&PersistedRecord) -> f64,
) -> Vec<SymbolAverage> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for rec in records.iter().filter(|r| filter.matches(r)) {
        let slot = sums.entry(rec.symbol.as_str()).or_insert((0.0, 0));
        slot.0 += value(rec);
        slot.1 += 1;
    }
    sums.into_iter()
        .map(|(symbol, (sum, n))| SymbolAverage {
            symbol: symbol.to_string(),
            value: sum / n as f64,
            samples: n,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).expect("valid day")
    }

    fn rec(symbol: &str, d: u32, close: f64, vwap: f64, volume: i64) -> PersistedRecord {
        PersistedRecord {
            date: day(d),
            symbol: symbol.into(),
            series: "EQ".into(),
            prev_close: close,
            open: close,
            high: close,
            low: close,
            last: close,
            close,
            vwap,
            volume,
            turnover: 0.0,
            trades: 1,
            deliverable: 0,
            percentage_deliverable: 0.0,
        }
    }

    fn sample() -> Vec<PersistedRecord> {
        vec![
            rec("TCS", 21, 10.0, 11.0, 500),
            rec("AAPL", 21, 100.0, 101.0, 900),
            rec("AAPL", 22, 110.0, 109.0, 1_500),
            rec("AAPL", 23, 120.0, 121.0, 700),
            rec("TCS", 23, 20.0, 19.0, 800),
        ]
    }

    #[test]
    fn max_volume_per_symbol_in_range() {
        let peaks = max_volume(&sample(), &RecordFilter::default());
        assert_eq!(peaks.len(), 2);
        assert_eq!(
            (peaks[0].symbol.as_str(), peaks[0].date, peaks[0].volume),
            ("AAPL", day(22), 1_500)
        );
        assert_eq!((peaks[1].symbol.as_str(), peaks[1].volume), ("TCS", 800));

        let early = max_volume(&sample(), &RecordFilter::between(day(21), day(21)));
        assert_eq!(early[0].volume, 900);
    }

    #[test]
    fn averages_respect_symbol_filter() {
        let filter = RecordFilter::default().with_symbols(["AAPL"]);
        let closes = average_close(&sample(), &filter);
        assert_eq!(closes, vec![SymbolAverage { symbol: "AAPL".into(), value: 110.0, samples: 3 }]);

        let vwaps = average_vwap(&sample(), &RecordFilter::between(day(22), day(23)));
        assert_eq!(vwaps[0].value, 115.0);
        assert_eq!(vwaps[1], SymbolAverage { symbol: "TCS".into(), value: 19.0, samples: 1 });
    }

    #[test]
    fn empty_selection_yields_nothing() {
        let filter = RecordFilter::default().with_symbols(["MSFT"]);
        assert!(max_volume(&sample(), &filter).is_empty());
        assert!(average_close(&sample(), &filter).is_empty());
    }
}
