use crate::codec::Utf8Transcoder;
use crate::parser::CsvResult;
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

/// What the transport told us about an upload.
#[derive(Debug, Clone)]
pub struct UploadMeta {
    /// e.g. "text/csv" or "application/gzip"
    pub content_type: String,
    /// e.g. "gzip", "zstd", "gzip, identity" or empty
    pub content_encoding: String,
    /// original file name as sent by the client
    pub file_name: String,
    /// size in bytes claimed by the transport, if any
    pub declared_size: Option<u64>,
    /// character encoding of the text (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for UploadMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            file_name: String::new(),
            declared_size: None,
            charset: encoding_rs::UTF_8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl UploadMeta {
    pub fn csv(file_name: impl Into<String>) -> Self {
        Self {
            content_type: "text/csv".into(),
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Meta for a local file, from its name alone. Nothing is opened.
    pub fn for_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let mut meta = Self {
            file_name: name,
            ..Default::default()
        };
        match meta.compression() {
            Compression::Gzip => {
                meta.content_type = "application/gzip".into();
                meta.content_encoding = "gzip".into();
            }
            Compression::Zstd => {
                meta.content_type = "application/zstd".into();
                meta.content_encoding = "zstd".into();
            }
            Compression::None => {
                meta.content_type = "text/csv".into();
            }
        }
        meta
    }

    /// Decompression choice: encoding, then type, then extension.
    pub fn compression(&self) -> Compression {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        let name = self.file_name.to_ascii_lowercase();

        let is_gzip = ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || name.ends_with(".gz");
        let is_zstd = ce.split(',').any(|s| s.trim() == "zstd")
            || ct == "application/zstd"
            || name.ends_with(".zst");

        if is_gzip {
            Compression::Gzip
        } else if is_zstd {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// Wrap a raw upload with optional decompression and UTF-8 transcoding.
/// The result yields UTF-8 CSV bytes.
pub fn build_csv_reader<R>(raw: R, meta: &UploadMeta) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // Use a larger buffer for fewer syscalls (1 MiB)
    let buf = BufReader::with_capacity(1 << 20, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = match meta.compression() {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    // transcode only when charset != UTF-8 to avoid extra copies
    if meta.charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    }
}

/// Open a local file; meta is inferred from the extension and file size.
pub async fn reader_from_path(
    path: &Path,
) -> CsvResult<(Box<dyn AsyncRead + Unpin + Send>, UploadMeta)> {
    let file = File::open(path).await?;
    let size = file.metadata().await?.len();
    let meta = UploadMeta {
        declared_size: Some(size),
        ..UploadMeta::for_path(path)
    };

    let reader = build_csv_reader(file, &meta);
    Ok((reader, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn compression_from_encoding_type_or_name() {
        let mut meta = UploadMeta::csv("daily.csv");
        assert_eq!(meta.compression(), Compression::None);

        meta.content_encoding = "identity, GZIP".into();
        assert_eq!(meta.compression(), Compression::Gzip);

        let meta = UploadMeta {
            content_type: "application/zstd".into(),
            ..Default::default()
        };
        assert_eq!(meta.compression(), Compression::Zstd);

        assert_eq!(UploadMeta::csv("DAILY.CSV.GZ").compression(), Compression::Gzip);
    }

    #[test]
    fn meta_for_path_needs_no_file() {
        let meta = UploadMeta::for_path(Path::new("/nowhere/bhav.csv.zst"));
        assert_eq!(meta.file_name, "bhav.csv.zst");
        assert_eq!(meta.content_type, "application/zstd");
        assert_eq!(meta.content_encoding, "zstd");
        assert_eq!(meta.declared_size, None);

        let plain = UploadMeta::for_path(Path::new("bhav.csv"));
        assert_eq!(plain.content_type, "text/csv");
        assert_eq!(plain.compression(), Compression::None);
    }

    #[tokio::test]
    async fn transcodes_declared_charset() -> anyhow::Result<()> {
        let meta = UploadMeta {
            charset: encoding_rs::WINDOWS_1252,
            ..UploadMeta::csv("daily.csv")
        };
        let raw: &'static [u8] = b"Symbol\nSOCI\xc9T\xc9\n";
        let mut out = String::new();
        build_csv_reader(raw, &meta).read_to_string(&mut out).await?;
        assert_eq!(out, "Symbol\nSOCIÉTÉ\n");
        Ok(())
    }
}
