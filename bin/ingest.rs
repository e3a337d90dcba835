use clap::{Arg, ArgAction, Command};
use equity_ingest::query::{average_close, average_vwap, max_volume, RecordFilter};
use equity_ingest::{IngestConfig, IngestService, MemoryStore, Reply, Upload, UploadMeta};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("ingest")
        .about("Validate and load a daily equity CSV, then print aggregates")
        .arg(
            Arg::new("path")
                .long("path")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("content_type")
                .long("content-type")
                .help("Declared media type (default: from extension)"),
        )
        .arg(
            Arg::new("charset")
                .long("charset")
                .help("Text encoding label, e.g. windows-1252")
                .default_value("utf-8"),
        )
        .arg(
            Arg::new("max_upload_bytes")
                .long("max-upload-bytes")
                .env("INGEST_MAX_UPLOAD_BYTES")
                .value_parser(clap::value_parser!(u64))
                .default_value("52428800"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .env("INGEST_STRICT_ROWS")
                .help("End the stream on a ragged row instead of rejecting just that row")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("from").long("from").value_parser(clap::value_parser!(chrono::NaiveDate)))
        .arg(Arg::new("to").long("to").value_parser(clap::value_parser!(chrono::NaiveDate)))
        .arg(Arg::new("symbol").long("symbol").action(ArgAction::Append))
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = matches.get_one::<PathBuf>("path").expect("required arg").clone();
    let label = matches.get_one::<String>("charset").expect("defaulted arg");
    let charset = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| anyhow::anyhow!("unknown charset {label:?}"))?;

    // the local file stands in for what an HTTP transport would hand over
    let mut meta = UploadMeta::for_path(&path);
    meta.declared_size = Some(tokio::fs::metadata(&path).await?.len());
    if let Some(ct) = matches.get_one::<String>("content_type") {
        meta.content_type = ct.clone();
    }
    meta.charset = charset;

    let max_upload_bytes = *matches.get_one::<u64>("max_upload_bytes").expect("defaulted arg");
    let config = IngestConfig::default()
        .with_max_upload_bytes(max_upload_bytes)
        .with_flexible_rows(!matches.get_flag("strict"));
    let service = IngestService::new(MemoryStore::new(), config);

    let result = service.handle_upload(Some(Upload::from_path(path, meta))).await;
    let reply = Reply::from_result(&result);
    let envelope = serde_json::json!({
        "status": reply.status,
        "body": reply.body,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if result.is_err() {
        std::process::exit(1);
    }

    let filter = RecordFilter {
        from: matches.get_one::<chrono::NaiveDate>("from").copied(),
        to: matches.get_one::<chrono::NaiveDate>("to").copied(),
        symbols: matches
            .get_many::<String>("symbol")
            .map(|v| v.cloned().collect())
            .unwrap_or_default(),
    };
    let records = service.store().snapshot().await;
    let aggregates = serde_json::json!({
        "maxVolume": max_volume(&records, &filter),
        "averageClose": average_close(&records, &filter),
        "averageVwap": average_vwap(&records, &filter),
    });
    println!("{}", serde_json::to_string_pretty(&aggregates)?);
    Ok(())
}
