use clap::{Arg, Command};
use equity_ingest::Schema;
use std::io::{self, Write};

const SYMBOLS: [&str; 5] = ["AAPL", "INFY", "TCS", "RELIANCE", "HDFCBANK"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic daily equity CSV to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("with_header")
                .long("with-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("invalid_every")
                .long("invalid-every")
                .help("Make every Nth row fail validation (0 = never)")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").expect("required arg");
    let with_header = matches.get_flag("with_header");
    let invalid_every: u64 = *matches.get_one("invalid_every").expect("defaulted arg");

    let mut out = io::BufWriter::new(io::stdout().lock());

    if with_header {
        let names: Vec<&str> = Schema::equity_daily().required_names().collect();
        writeln!(&mut out, "{}", names.join(","))?;
    }

    // deterministic data; dates walk forward one day per symbol cycle
    let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid start date");
    for i in 0..rows {
        let symbol = SYMBOLS[(i % SYMBOLS.len() as u64) as usize];
        let day = start + chrono::Days::new(i / SYMBOLS.len() as u64);
        let base = 100.0 + (i % 97) as f64;
        let volume = 10_000 + (i % 1_000) * 37;
        let broken = invalid_every > 0 && (i + 1) % invalid_every == 0;

        if broken {
            write!(&mut out, "{}", day.format("%d-%m-%Y"))?;
        } else {
            write!(&mut out, "{}", day.format("%Y-%m-%d"))?;
        }
        writeln!(
            &mut out,
            ",{symbol},EQ,{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{volume},{:.2},{},{},{:.2}",
            base,
            base + 1.0,
            base + 2.5,
            base - 1.5,
            base + 0.5,
            base + 0.75,
            base + 0.4,
            volume as f64 * base,
            volume / 10,
            volume * 4 / 5,
            80.0,
        )?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
