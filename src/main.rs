use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use csv_records::{CsvReader, ReaderConfig, Record, SplitterOptions, NULL_FIELD};

/// Read a CSV file line by line, optionally selecting and naming columns,
/// and write the resulting records back out as CSV.
#[derive(Debug, Parser)]
#[command(name = "csv-records", version)]
struct Args {
    /// CSV file to read
    file: PathBuf,

    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    #[arg(short, long, default_value_t = '"')]
    quote: char,

    /// Escape character inside quoted fields (disables doubled quotes)
    #[arg(short, long)]
    escape: Option<char>,

    /// Trim whitespace around every field
    #[arg(long)]
    trim: bool,

    /// Accept lines with unterminated quotes
    #[arg(long)]
    lenient: bool,

    /// Zero-based column indices to keep, e.g. 2,0
    #[arg(short, long, value_delimiter = ',')]
    fields: Vec<usize>,

    /// Names for the selected columns; `null` drops a column
    #[arg(short, long, value_delimiter = ',')]
    map: Vec<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ReaderConfig {
        splitter: SplitterOptions {
            delimiter: args.delimiter,
            quote: args.quote,
            escape: args.escape,
            double_quote: args.escape.is_none(),
            trim: args.trim,
            strict: !args.lenient,
            ..Default::default()
        },
        wanted_fields: args.fields,
        field_map: args.map,
    };

    let mut reader = CsvReader::with_config(config).context("invalid CSV options")?;
    let records = reader
        .read_file(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    write_records(&reader, &records)
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("csv_records={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn write_records(reader: &CsvReader, records: &[Record]) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(std::io::stdout());

    let mut names: Vec<&str> = Vec::new();
    for name in reader.field_map() {
        if name != NULL_FIELD && !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }
    if !names.is_empty() {
        wtr.write_record(&names)?;
    }

    for record in records {
        match record {
            Record::Fields(_) => wtr.serialize(record)?,
            Record::Mapped(map) => wtr.write_record(
                names
                    .iter()
                    .map(|name| map.get(*name).map(String::as_str).unwrap_or("")),
            )?,
        }
    }

    wtr.flush()?;

    Ok(())
}
