//! Streaming ingestion and validation of daily equity trading CSV files.
//!
//! - Upload gate: content type, extension and declared size are checked before parsing;
//!   the bytes actually read are held to the same size cap.
//! - Streaming path: local files, gzip/zstd, any charset `encoding_rs` knows.
//! - Every row is checked against [`Schema::equity_daily`]; bad rows are reported,
//!   never fatal. A missing header column or a broken stream fails the whole attempt.
//!
//! Data shape:
//! - [`IngestionSummary`] `{ total_records, successful_records, failed_records,
//!   valid_rows, invalid_rows, .. }`
//! - Rows: [`RawRow`] (lookup with `get(column) -> Option<&str>`)
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
mod config;
mod io;
mod parser;
mod pipeline;
pub mod query;
mod row;
mod schema;
mod service;
mod store;
mod summary;
mod upload;
mod validate;
pub mod validators;

pub use crate::config::{IngestConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_UPLOAD_BYTES};
pub use crate::io::{build_csv_reader, reader_from_path, Compression, UploadMeta};
pub use crate::parser::{CsvResult, ParseError, RowReader};
pub use crate::pipeline::{ingest, AwaitingHeader, Streaming};
pub use crate::row::RawRow;
pub use crate::schema::{ColumnKind, ColumnSpec, Schema};
pub use crate::service::{IngestError, IngestService, Reply, UploadReport, NO_VALID_ROWS_MESSAGE};
pub use crate::store::{MemoryStore, PendingRecord, PersistError, PersistedRecord, RecordStore};
pub use crate::summary::{IngestionSummary, Outcome, RowRejection, MISSING_COLUMNS_MESSAGE};
pub use crate::upload::{
    check_upload, CappedReader, ReadCounter, TransportError, Upload, UploadSource,
};
pub use crate::validate::{validate_row, RowVerdict};
