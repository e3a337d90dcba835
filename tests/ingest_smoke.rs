use equity_ingest::{
    ingest, reader_from_path, IngestConfig, IngestError, IngestService, MemoryStore, Outcome,
    Reply, Schema, Upload, UploadMeta, MISSING_COLUMNS_MESSAGE,
};
use std::{fs::File, io::Write, path::Path, path::PathBuf, process::Command};

const HEADER: &str = "Date,Symbol,Series,Prev Close,Open,High,Low,Last,Close,VWAP,Volume,Turnover,Trades,Deliverable Volume,%Deliverble";
const GOOD: &str = "2024-10-22,AAPL,EQ,150,152,153,149,151,150.5,151.25,1000000,150000000,1000,800000,80";
const BAD_DATE: &str = "22-10-2024,AAPL,EQ,150,152,153,149,151,150.5,151.25,1000000,150000000,1000,800000,80";

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let mut f = File::create(&path)?;
    writeln!(f, "{header}")?;
    for row in rows {
        writeln!(f, "{row}")?;
    }
    Ok(path)
}

async fn summarize(path: &Path) -> anyhow::Result<equity_ingest::IngestionSummary> {
    let (reader, _meta) = reader_from_path(path).await?;
    Ok(ingest(reader, Schema::equity_daily(), &IngestConfig::default()).await)
}

#[tokio::test]
async fn parses_gzip_and_counts_rows() -> anyhow::Result<()> {
    // Create a large CSV; every 10th row carries a bad date
    let dir = tempfile::tempdir()?;
    let csv_path = dir.path().join("bhav.csv");
    let mut f = File::create(&csv_path)?;
    writeln!(f, "{HEADER}")?;
    for i in 0..100_000u32 {
        let date = if i % 10 == 9 { "22-10-2024" } else { "2024-10-22" };
        writeln!(
            f,
            "{date},SYM{i:06},EQ,150,152,153,149,151,150.5,151.25,{i},150000000,1000,800000,80"
        )?;
    }
    drop(f);

    // gzip it (use system gzip for speed)
    let gz_path: PathBuf = dir.path().join("bhav.csv.gz");
    let status = Command::new("bash")
        .arg("-lc")
        .arg(format!(
            "gzip -c {} > {}",
            csv_path.display(),
            gz_path.display()
        ))
        .status()?;
    assert!(status.success());

    // Parse via library
    let summary = summarize(&gz_path).await?;

    assert!(summary.success);
    assert_eq!(summary.total_records, 100_000);
    assert_eq!(summary.successful_records, 90_000);
    assert_eq!(summary.failed_records, 10_000);
    assert_eq!(summary.valid_rows.len(), summary.successful_records);
    assert_eq!(summary.invalid_rows.len(), summary.failed_records);
    assert_eq!(summary.invalid_rows[0].get("Symbol"), Some("SYM000009"));
    assert_eq!(summary.rejections[0].line, 11);
    Ok(())
}

#[tokio::test]
async fn same_file_twice_gives_identical_summaries() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_csv(dir.path(), "bhav.csv", HEADER, &[GOOD, BAD_DATE, GOOD])?;

    let first = summarize(&path).await?;
    let second = summarize(&path).await?;
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    Ok(())
}

#[tokio::test]
async fn missing_prev_close_rejects_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let header = HEADER.replace("Prev Close,", "");
    let path = write_csv(dir.path(), "bhav.csv", &header, &[GOOD])?;

    let summary = summarize(&path).await?;
    assert!(!summary.success);
    assert_eq!(summary.outcome, Outcome::HeaderRejected);
    assert_eq!(summary.failure_reason.as_deref(), Some(MISSING_COLUMNS_MESSAGE));
    assert_eq!(summary.missing_columns, Some(vec!["Prev Close".to_string()]));
    assert_eq!(summary.total_records, 0);
    Ok(())
}

#[tokio::test]
async fn mixed_validity_counts_each_side() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_csv(dir.path(), "bhav.csv", HEADER, &[GOOD, BAD_DATE])?;

    let summary = summarize(&path).await?;
    assert!(summary.success);
    assert_eq!(
        (summary.total_records, summary.successful_records, summary.failed_records),
        (2, 1, 1)
    );
    assert_eq!(summary.invalid_rows[0].get("Date"), Some("22-10-2024"));
    Ok(())
}

#[tokio::test]
async fn corrupt_record_mid_file_stores_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bhav.csv");
    let mut f = File::create(&path)?;
    writeln!(f, "{HEADER}\n{GOOD}")?;
    // bytes that are not UTF-8 in a file declared as UTF-8
    f.write_all(b"2024-10-23,AAPL,EQ,\xff\xfe,152,153,149,151,150.5,151.25,1,1,1,1,80\n")?;
    writeln!(f, "{GOOD}")?;
    drop(f);

    let summary = summarize(&path).await?;
    assert!(!summary.success);
    assert_eq!(summary.outcome, Outcome::StreamError);
    assert!(summary.failure_reason.as_deref().is_some_and(|m| !m.is_empty()));

    let service = IngestService::new(MemoryStore::new(), IngestConfig::default());
    let result = service
        .handle_upload(Some(Upload::from_path(&path, UploadMeta::csv("bhav.csv"))))
        .await;
    assert!(matches!(result, Err(IngestError::Stream(_))));
    assert_eq!(Reply::from_result(&result).status, 400);
    assert_eq!(service.store().count().await, 0);
    Ok(())
}

#[tokio::test]
async fn truncated_row_is_rejected_and_the_rest_stored() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let truncated = "2024-10-23,AAPL,EQ,150,152";
    let path = write_csv(dir.path(), "bhav.csv", HEADER, &[GOOD, truncated, GOOD])?;

    let service = IngestService::new(MemoryStore::new(), IngestConfig::default());
    let report = service
        .handle_upload(Some(Upload::from_path(&path, UploadMeta::csv("bhav.csv"))))
        .await?;
    assert_eq!(report.failed_records, 1);
    assert_eq!(report.invalid_rows[0].get("Open"), Some("152"));
    assert_eq!(report.invalid_rows[0].get("High"), None);
    assert_eq!(service.store().count().await, 2);
    Ok(())
}

#[tokio::test]
async fn full_upload_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_csv(dir.path(), "Bhav.CSV", HEADER, &[GOOD, BAD_DATE, GOOD])?;

    let service = IngestService::new(MemoryStore::new(), IngestConfig::default());
    let report = service
        .handle_upload(Some(Upload::from_path(&path, UploadMeta::csv("Bhav.CSV"))))
        .await?;
    assert_eq!(report.inserted_records.len(), 2);
    assert_eq!(report.failed_records, 1);
    assert_eq!(service.store().count().await, 2);
    Ok(())
}
