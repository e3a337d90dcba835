use crate::row::RawRow;
use crc32fast::Hasher as Crc32;
use serde::Serialize;

pub const MISSING_COLUMNS_MESSAGE: &str = "Missing required columns";

/// Terminal state an ingestion ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Completed,
    HeaderRejected,
    StreamError,
}

/// Why a row landed in `invalid_rows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRejection {
    pub index: u64,
    pub line: u64,
    pub failed_fields: Vec<&'static str>,
}

/// Result of one ingestion attempt. Built exactly once, at the terminal transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    pub success: bool,
    #[serde(skip)]
    pub outcome: Outcome,
    #[serde(rename = "message", skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_columns: Option<Vec<String>>,
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub valid_rows: Vec<RawRow>,
    pub invalid_rows: Vec<RawRow>,
    /// Parallel to `invalid_rows`.
    pub rejections: Vec<RowRejection>,
}

impl IngestionSummary {
    pub(crate) fn completed(
        valid_rows: Vec<RawRow>,
        invalid_rows: Vec<RawRow>,
        rejections: Vec<RowRejection>,
    ) -> Self {
        Self {
            success: true,
            outcome: Outcome::Completed,
            failure_reason: None,
            missing_columns: None,
            total_records: valid_rows.len() + invalid_rows.len(),
            successful_records: valid_rows.len(),
            failed_records: invalid_rows.len(),
            valid_rows,
            invalid_rows,
            rejections,
        }
    }

    pub(crate) fn header_rejected(missing: Vec<&'static str>) -> Self {
        let mut summary = Self::failed(Outcome::HeaderRejected, MISSING_COLUMNS_MESSAGE.into());
        summary.missing_columns = Some(missing.into_iter().map(String::from).collect());
        summary
    }

    pub(crate) fn stream_failed(message: String) -> Self {
        Self::failed(Outcome::StreamError, message)
    }

    fn failed(outcome: Outcome, message: String) -> Self {
        Self {
            success: false,
            outcome,
            failure_reason: Some(message),
            missing_columns: None,
            total_records: 0,
            successful_records: 0,
            failed_records: 0,
            valid_rows: Vec::new(),
            invalid_rows: Vec::new(),
            rejections: Vec::new(),
        }
    }

    /// CRC32 over the counts and every row, accepted rows first.
    /// Two runs over the same bytes give the same value.
    pub fn fingerprint(&self) -> u32 {
        let mut crc = Crc32::new();
        crc.update(&[self.success as u8]);
        for n in [self.total_records, self.successful_records, self.failed_records] {
            crc.update(&(n as u64).to_le_bytes());
        }
        for row in self.valid_rows.iter().chain(&self.invalid_rows) {
            crc.update(&row.index().to_le_bytes());
            // fields joined by the ASCII unit separator, rows by the record separator
            for (i, field) in row.values().iter().enumerate() {
                if i > 0 {
                    crc.update(&[0x1f]);
                }
                crc.update(field.as_bytes());
            }
            crc.update(&[0x1e]);
        }
        if let Some(reason) = &self.failure_reason {
            crc.update(reason.as_bytes());
        }
        crc.finalize()
    }
}
