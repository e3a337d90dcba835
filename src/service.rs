//! One upload, end to end: gate, stream, validate, persist.

use crate::config::IngestConfig;
use crate::io::build_csv_reader;
use crate::pipeline::ingest;
use crate::row::RawRow;
use crate::schema::Schema;
use crate::store::{PendingRecord, PersistError, PersistedRecord, RecordStore};
use crate::summary::{Outcome, RowRejection, MISSING_COLUMNS_MESSAGE};
use crate::upload::{check_upload, CappedReader, TransportError, Upload, UploadSource};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{info, warn};

pub const NO_VALID_ROWS_MESSAGE: &str = "No valid rows found in CSV";

/// Everything that ends an upload without storing it.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("Error processing CSV: {0}")]
    Stream(String),
    #[error("No valid rows found in CSV")]
    NoValidRows { failed_records: usize },
    #[error("Error saving records: {0}")]
    Persistence(#[from] PersistError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// HTTP status the outcome maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::Transport(_)
            | IngestError::Schema { .. }
            | IngestError::Stream(_)
            | IngestError::NoValidRows { .. } => 400,
            IngestError::Persistence(_) | IngestError::Io(_) => 500,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            IngestError::Schema { missing } => json!({
                "message": MISSING_COLUMNS_MESSAGE,
                "missingColumns": missing,
            }),
            IngestError::NoValidRows { failed_records } => json!({
                "message": NO_VALID_ROWS_MESSAGE,
                "failedRecords": failed_records,
            }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub inserted_records: Vec<PersistedRecord>,
    pub invalid_rows: Vec<RawRow>,
    pub rejections: Vec<RowRejection>,
}

/// Status plus JSON body, ready for whatever HTTP layer sits in front.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn from_result(result: &Result<UploadReport, IngestError>) -> Self {
        match result {
            Ok(report) => {
                let mut body = serde_json::to_value(report)
                    .unwrap_or_else(|e| json!({ "serializationError": e.to_string() }));
                body["message"] = json!("CSV data processed successfully");
                Reply { status: 201, body }
            }
            Err(e) => Reply {
                status: e.status_code(),
                body: e.body(),
            },
        }
    }
}

/// Stateless apart from the store; uploads never share accumulation state.
pub struct IngestService<S> {
    schema: &'static Schema,
    store: S,
    config: IngestConfig,
}

impl<S: RecordStore> IngestService<S> {
    pub fn new(store: S, config: IngestConfig) -> Self {
        Self {
            schema: Schema::equity_daily(),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub async fn handle_upload(
        &self,
        upload: Option<Upload>,
    ) -> Result<UploadReport, IngestError> {
        let upload = upload.ok_or(TransportError::NoFile)?;
        check_upload(&upload.meta, &self.config)?;
        info!(
            file = %upload.meta.file_name,
            size = ?upload.meta.declared_size,
            "upload accepted"
        );

        let raw: Box<dyn AsyncRead + Unpin + Send> = match upload.source {
            UploadSource::Path(path) => Box::new(tokio::fs::File::open(&path).await?),
            UploadSource::Reader(raw) => raw,
        };
        let limit = self.config.max_upload_bytes;
        let capped = CappedReader::new(raw, limit);
        let counter = capped.counter();

        // the reader is moved into `ingest` and dropped there on every path
        let reader = build_csv_reader(capped, &upload.meta);
        let summary = ingest(reader, self.schema, &self.config).await;

        if counter.bytes() > limit {
            warn!(read = counter.bytes(), limit, "upload over the size limit");
            return Err(TransportError::TooLarge {
                size: counter.bytes(),
                limit,
            }
            .into());
        }

        match summary.outcome {
            Outcome::Completed => {}
            Outcome::HeaderRejected => {
                return Err(IngestError::Schema {
                    missing: summary.missing_columns.unwrap_or_default(),
                })
            }
            Outcome::StreamError => {
                return Err(IngestError::Stream(
                    summary.failure_reason.unwrap_or_default(),
                ))
            }
        }

        if summary.valid_rows.is_empty() {
            warn!(failed = summary.failed_records, "no valid rows to insert");
            return Err(IngestError::NoValidRows {
                failed_records: summary.failed_records,
            });
        }

        let pending: Vec<PendingRecord> = summary
            .valid_rows
            .iter()
            .map(|row| PendingRecord::from_row(row, self.schema))
            .collect();
        let inserted_records = self.store.insert_many(pending).await?;
        info!(inserted = inserted_records.len(), "records stored");

        Ok(UploadReport {
            total_records: summary.total_records,
            successful_records: summary.successful_records,
            failed_records: summary.failed_records,
            inserted_records,
            invalid_rows: summary.invalid_rows,
            rejections: summary.rejections,
        })
    }
}
