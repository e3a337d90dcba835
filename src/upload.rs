//! Transport-level gate: is this upload a CSV file we are willing to parse?

use crate::config::IngestConfig;
use crate::io::{Compression, UploadMeta};
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

/// Rejections raised before a single byte is parsed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No file uploaded")]
    NoFile,
    #[error("Only CSV files are allowed (got {content_type:?} for {file_name:?})")]
    UnsupportedType {
        content_type: String,
        file_name: String,
    },
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

const CSV_TYPES: [&str; 5] = [
    "text/csv",
    "application/csv",
    "text/x-csv",
    "text/comma-separated-values",
    // what browsers on Windows send for .csv
    "application/vnd.ms-excel",
];

const COMPRESSED_TYPES: [&str; 3] = ["application/gzip", "application/x-gzip", "application/zstd"];

/// Where the bytes come from.
pub enum UploadSource {
    Path(PathBuf),
    Reader(Box<dyn AsyncRead + Unpin + Send>),
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            UploadSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

#[derive(Debug)]
pub struct Upload {
    pub source: UploadSource,
    pub meta: UploadMeta,
}

impl Upload {
    pub fn from_path(path: impl Into<PathBuf>, meta: UploadMeta) -> Self {
        Self {
            source: UploadSource::Path(path.into()),
            meta,
        }
    }

    pub fn from_reader<R>(reader: R, meta: UploadMeta) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            source: UploadSource::Reader(Box::new(reader)),
            meta,
        }
    }
}

/// Media type without parameters, lowercased (`Text/CSV; charset=utf-8` -> `text/csv`).
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Counts raw upload bytes and fails the read that crosses `limit`.
///
/// The declared size is only a claim; this holds whatever the source
/// actually delivers to the same cap, before any decompression.
pub struct CappedReader<R> {
    inner: R,
    limit: u64,
    read: Arc<AtomicU64>,
}

/// Shared view of how many bytes a [`CappedReader`] has let through.
#[derive(Debug, Clone)]
pub struct ReadCounter(Arc<AtomicU64>);

impl ReadCounter {
    pub fn bytes(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl<R> CappedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            read: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn counter(&self) -> ReadCounter {
        ReadCounter(Arc::clone(&self.read))
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CappedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let got = (buf.filled().len() - before) as u64;
        let total = this.read.fetch_add(got, Ordering::Relaxed) + got;
        if total > this.limit {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("upload exceeds the {} byte limit", this.limit),
            )));
        }
        Poll::Ready(Ok(()))
    }
}

/// Check type, extension and declared size. Case-insensitive throughout.
pub fn check_upload(meta: &UploadMeta, config: &IngestConfig) -> Result<(), TransportError> {
    let unsupported = || TransportError::UnsupportedType {
        content_type: meta.content_type.clone(),
        file_name: meta.file_name.clone(),
    };

    let ct = essence(&meta.content_type);
    let compression = meta.compression();
    let type_ok = CSV_TYPES.contains(&ct.as_str())
        || (compression != Compression::None && COMPRESSED_TYPES.contains(&ct.as_str()));
    if !type_ok {
        return Err(unsupported());
    }

    let name = meta.file_name.to_ascii_lowercase();
    let stem = name
        .strip_suffix(".gz")
        .or_else(|| name.strip_suffix(".zst"))
        .unwrap_or(&name);
    if !stem.ends_with(".csv") {
        return Err(unsupported());
    }

    if let Some(size) = meta.declared_size {
        if size > config.max_upload_bytes {
            return Err(TransportError::TooLarge {
                size,
                limit: config.max_upload_bytes,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn meta(content_type: &str, file_name: &str) -> UploadMeta {
        UploadMeta {
            content_type: content_type.into(),
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_csv_in_any_case() {
        let config = IngestConfig::default();
        assert!(check_upload(&meta("text/csv", "bhav.csv"), &config).is_ok());
        assert!(check_upload(&meta("Text/CSV; charset=utf-8", "BHAV.CSV"), &config).is_ok());
        assert!(check_upload(&meta("application/vnd.ms-excel", "Bhav.Csv"), &config).is_ok());
        assert!(check_upload(&meta("application/gzip", "bhav.csv.gz"), &config).is_ok());
    }

    #[test]
    fn type_and_extension_must_both_match() {
        let config = IngestConfig::default();
        for (ct, name) in [
            ("application/json", "bhav.csv"),
            ("text/csv", "bhav.json"),
            ("text/csv", "bhav"),
            ("application/gzip", "bhav.json.gz"),
            ("", "bhav.csv"),
        ] {
            assert!(
                matches!(
                    check_upload(&meta(ct, name), &config),
                    Err(TransportError::UnsupportedType { .. })
                ),
                "{ct} / {name} should be refused"
            );
        }
    }

    #[test]
    fn declared_size_over_limit_is_refused() {
        let config = IngestConfig::default().with_max_upload_bytes(1024);
        let mut m = meta("text/csv", "bhav.csv");
        m.declared_size = Some(1024);
        assert!(check_upload(&m, &config).is_ok());

        m.declared_size = Some(1025);
        assert!(matches!(
            check_upload(&m, &config),
            Err(TransportError::TooLarge { size: 1025, limit: 1024 })
        ));
    }

    #[tokio::test]
    async fn capped_reader_passes_bytes_up_to_the_limit() -> anyhow::Result<()> {
        let mut reader = CappedReader::new(&b"0123456789"[..], 10);
        let counter = reader.counter();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        assert_eq!(out, b"0123456789");
        assert_eq!(counter.bytes(), 10);
        Ok(())
    }

    #[tokio::test]
    async fn capped_reader_fails_past_the_limit() {
        let mut reader = CappedReader::new(&b"0123456789"[..], 4);
        let counter = reader.counter();
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.expect_err("over limit");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(counter.bytes() > 4);
    }
}
