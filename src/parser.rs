//! Forward-only reader turning a byte stream into a header plus [`RawRow`]s.

use crate::config::IngestConfig;
use crate::row::RawRow;
use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord, Trim};
use futures::stream::{self, Stream};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Anything that ends the record sequence early.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

pub type CsvResult<T> = std::result::Result<T, ParseError>;

/// Single-pass record reader. Owns the source; dropping it releases the handle.
///
/// [`RowReader::headers`] must be called before [`RowReader::next_row`]; the
/// reader is consumed by [`RowReader::into_stream`] and cannot be rewound.
pub struct RowReader<R> {
    rdr: AsyncReader<R>,
    headers: Option<Arc<[String]>>,
    record: StringRecord,
    next_index: u64,
}

impl<R> RowReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, config: &IngestConfig) -> Self {
        let rdr = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(config.flexible_rows)
            .trim(Trim::Headers)
            .buffer_capacity(config.buffer_capacity)
            .create_reader(reader);

        Self {
            rdr,
            headers: None,
            record: StringRecord::new(),
            next_index: 0,
        }
    }

    /// Header names, read once. Empty input yields no headers.
    pub async fn headers(&mut self) -> CsvResult<Arc<[String]>> {
        if let Some(h) = &self.headers {
            return Ok(Arc::clone(h));
        }
        let raw = self.rdr.headers().await?;
        let headers: Arc<[String]> = raw
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // spreadsheet exports often lead with a UTF-8 BOM
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.to_string()
            })
            .collect();
        self.headers = Some(Arc::clone(&headers));
        Ok(headers)
    }

    /// Next data record, or `None` at end of input.
    pub async fn next_row(&mut self) -> CsvResult<Option<RawRow>> {
        let headers = self.headers().await?;
        if !self.rdr.read_record(&mut self.record).await? {
            return Ok(None);
        }

        let line = self.record.position().map(|p| p.line()).unwrap_or(0);
        let values = self.record.iter().map(str::to_string).collect();
        let row = RawRow::new(self.next_index, line, headers, values);
        self.next_index += 1;
        Ok(Some(row))
    }

    /// Rows as a lazy stream. The first error is the last item.
    pub fn into_stream(self) -> impl Stream<Item = CsvResult<RawRow>> {
        stream::try_unfold(self, |mut reader| async move {
            let next = reader.next_row().await?;
            Ok::<_, ParseError>(next.map(|row| (row, reader)))
        })
    }
}
