//! Header gate plus the fold of every row into accepted and rejected sets.
//!
//! The states are types: [`AwaitingHeader`] becomes [`Streaming`] once the
//! header passes, and every terminal transition consumes the state and hands
//! back the one [`IngestionSummary`] for the attempt. A rejected header leaves
//! nothing to feed rows into.
//!
//! [`ingest`] drives the machine from a byte stream; tests can drive the
//! transitions directly.

use crate::config::IngestConfig;
use crate::parser::RowReader;
use crate::row::RawRow;
use crate::schema::Schema;
use crate::summary::{IngestionSummary, RowRejection};
use crate::validate::validate_row;
use futures::StreamExt;
use std::fmt::Display;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

/// Start state: nothing read yet.
#[derive(Debug)]
pub struct AwaitingHeader<'s> {
    schema: &'s Schema,
}

/// Header accepted; rows are being folded.
#[derive(Debug)]
pub struct Streaming<'s> {
    schema: &'s Schema,
    valid_rows: Vec<RawRow>,
    invalid_rows: Vec<RawRow>,
    rejections: Vec<RowRejection>,
}

impl<'s> AwaitingHeader<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Check the header against the schema. `Err` carries the terminal summary.
    pub fn on_header<S: AsRef<str>>(
        self,
        headers: &[S],
    ) -> Result<Streaming<'s>, IngestionSummary> {
        let missing = self.schema.missing_columns(headers);
        if !missing.is_empty() {
            warn!(?missing, "header rejected");
            return Err(IngestionSummary::header_rejected(missing));
        }
        debug!(columns = headers.len(), "header accepted");
        Ok(Streaming {
            schema: self.schema,
            valid_rows: Vec::new(),
            invalid_rows: Vec::new(),
            rejections: Vec::new(),
        })
    }

    /// The header itself could not be read.
    pub fn on_error(self, err: impl Display) -> IngestionSummary {
        stream_failed(err)
    }
}

impl<'s> Streaming<'s> {
    /// Validate one row and append it to the matching side. Returns whether it was accepted.
    pub fn on_row(&mut self, row: RawRow) -> bool {
        let verdict = validate_row(row, self.schema);
        if verdict.is_valid() {
            self.valid_rows.push(verdict.row);
            true
        } else {
            self.rejections.push(RowRejection {
                index: verdict.row.index(),
                line: verdict.row.line(),
                failed_fields: verdict.failed_fields,
            });
            self.invalid_rows.push(verdict.row);
            false
        }
    }

    pub fn on_end(self) -> IngestionSummary {
        let summary =
            IngestionSummary::completed(self.valid_rows, self.invalid_rows, self.rejections);
        info!(
            total = summary.total_records,
            accepted = summary.successful_records,
            rejected = summary.failed_records,
            "ingestion completed"
        );
        summary
    }

    /// Mid-stream failure. Rows gathered so far are dropped.
    pub fn on_error(self, err: impl Display) -> IngestionSummary {
        debug!(
            discarded = self.valid_rows.len() + self.invalid_rows.len(),
            "dropping partial ingestion"
        );
        stream_failed(err)
    }

    pub fn rows_seen(&self) -> usize {
        self.valid_rows.len() + self.invalid_rows.len()
    }
}

fn stream_failed(err: impl Display) -> IngestionSummary {
    let mut message = err.to_string();
    if message.is_empty() {
        message = "stream error".into();
    }
    warn!(%message, "ingestion aborted");
    IngestionSummary::stream_failed(message)
}

/// Stream `reader` through the header gate and row validator.
///
/// Never fails: header rejection and stream errors come back as unsuccessful
/// summaries. The reader is dropped before this returns on every path.
pub async fn ingest<R>(reader: R, schema: &Schema, config: &IngestConfig) -> IngestionSummary
where
    R: AsyncRead + Unpin + Send,
{
    let mut rows = RowReader::new(reader, config);
    let start = AwaitingHeader::new(schema);

    let headers = match rows.headers().await {
        Ok(h) => h,
        Err(e) => return start.on_error(e),
    };
    let mut state = match start.on_header(&headers) {
        Ok(streaming) => streaming,
        Err(rejected) => return rejected,
    };

    let stream = rows.into_stream();
    futures::pin_mut!(stream);
    while let Some(next) = stream.next().await {
        match next {
            Ok(row) => {
                state.on_row(row);
            }
            Err(e) => return state.on_error(e),
        }
    }
    state.on_end()
}
