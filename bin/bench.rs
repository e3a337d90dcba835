use clap::{Arg, ArgAction, Command};
use equity_ingest::{ingest, reader_from_path, IngestConfig, Schema};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("bench")
        .about("Stream a file through the validator and report throughput")
        .arg(
            Arg::new("path")
                .long("path")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("runs")
                .long("runs")
                .help("Repeat the run; fingerprints must match")
                .value_parser(clap::value_parser!(u32))
                .default_value("1"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .env("INGEST_STRICT_ROWS")
                .help("End the stream on a ragged row instead of rejecting just that row")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("buffer")
                .long("buffer-capacity")
                .env("INGEST_BUFFER_CAPACITY")
                .value_parser(clap::value_parser!(usize))
                .default_value("1048576"),
        )
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = matches.get_one::<PathBuf>("path").expect("required arg");
    let runs = *matches.get_one::<u32>("runs").expect("defaulted arg");
    let config = IngestConfig::default()
        .with_flexible_rows(!matches.get_flag("strict"))
        .with_buffer_capacity(*matches.get_one::<usize>("buffer").expect("defaulted arg"));

    let mut first_fingerprint = None;
    for run in 1..=runs {
        let start = Instant::now();
        let (reader, _meta) = reader_from_path(path).await?;
        let summary = ingest(reader, Schema::equity_daily(), &config).await;
        let elapsed = start.elapsed().as_secs_f64();
        let rps = (summary.total_records as f64) / elapsed;
        let digest = summary.fingerprint();

        println!(
            "run={run} source={} success={} rows={} accepted={} rejected={} crc=0x{digest:08x}",
            path.display(),
            summary.success,
            summary.total_records,
            summary.successful_records,
            summary.failed_records,
        );
        println!("elapsed={elapsed:.1}s rows/sec={rps:.0}");
        if let Some(reason) = &summary.failure_reason {
            println!("failure={reason}");
        }

        match first_fingerprint {
            None => first_fingerprint = Some(digest),
            Some(d) if d != digest => {
                anyhow::bail!("run {run} fingerprint 0x{digest:08x} differs from 0x{d:08x}")
            }
            Some(_) => {}
        }
    }
    Ok(())
}
