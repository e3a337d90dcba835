use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// One parsed record: values keyed by the file's header, in file order, uncoerced.
///
/// Header names are shared across all rows of one file. Looking up a column the
/// record does not carry (unknown header, or a short row) yields `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    index: u64,
    line: u64,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    pub fn new(index: u64, line: u64, headers: Arc<[String]>, values: Vec<String>) -> Self {
        Self {
            index,
            line,
            headers,
            values,
        }
    }

    /// 0-based position among the data records of the file.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// 1-based line in the source where the record starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        let pos = self.headers.iter().position(|h| h == column)?;
        self.values.get(pos).map(String::as_str)
    }

    /// `(header, value)` pairs. Fields past the header width are not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let width = self.headers.len().min(self.values.len());
        let mut map = serializer.serialize_map(Some(width))?;
        for (h, v) in self.iter() {
            map.serialize_entry(h, v)?;
        }
        map.end()
    }
}
