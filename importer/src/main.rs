use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use songsift_core::load::{files_with_extensions, load_catalog};
use songsift_core::Catalog;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Columns converted to integers. A row where any of them fails to parse is dropped.
const NUMERICAL_COLUMNS: &[&str] = &[
    "#",
    "popularity",
    "dance",
    "energy",
    "acoustic",
    "instrumental",
    "happy",
    "speech",
    "live",
    "tempo",
];

const STRIPPED_COLUMNS: &[&str] = &["song", "#"];

const INPUT_EXTENSIONS: &[&str] = &["csv", "json", "jsonl"];

type Row = Map<String, Value>;

#[derive(Parser)]
#[command(name = "importer")]
#[command(about = "Convert spreadsheet exports into catalog data files and check data directories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a spreadsheet export (CSV, or JSON/JSONL rows of strings) into a typed JSON array
    Convert {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output JSON file
        #[arg(long)]
        output: String,
    },
    /// Load a catalog data directory and report what the server would serve
    Check {
        #[arg(long, default_value = "data/")]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { input, output } => convert(Path::new(&input), Path::new(&output)),
        Commands::Check { data_dir } => check(Path::new(&data_dir)),
    }
}

fn slugify(key: &str) -> String {
    key.trim().replace(' ', "_").to_lowercase()
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalize keys and type the numeric columns. Err names the first column that failed.
fn convert_row(row: Row) -> Result<Row, String> {
    let mut out = Row::new();
    for (key, value) in row {
        let key = slugify(&key);
        let mut value = value;
        if STRIPPED_COLUMNS.contains(&key.as_str()) {
            if let Value::String(s) = &value {
                value = Value::String(s.trim().to_string());
            }
        }
        if NUMERICAL_COLUMNS.contains(&key.as_str()) {
            let n = to_integer(&value).ok_or_else(|| key.clone())?;
            value = Value::from(n);
        }
        out.insert(key, value);
    }
    Ok(out)
}

/// Every CSV record becomes a row of strings keyed by the header line.
fn read_csv_rows(file: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(file).with_context(|| format!("opening {}", file.display()))?;
    let headers = reader.headers().with_context(|| format!("{}: missing header row", file.display()))?.clone();
    let mut rows = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: bad CSV record {}", file.display(), n + 1))?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect(),
        );
    }
    Ok(rows)
}

fn read_rows(file: &Path) -> Result<Vec<Row>> {
    if file.extension().and_then(|s| s.to_str()) == Some("csv") {
        return read_csv_rows(file);
    }
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut rows = Vec::new();
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(serde_json::from_str(&line).with_context(|| format!("{}: row is not an object", file.display()))?);
        }
    } else {
        match serde_json::from_reader(reader).with_context(|| format!("{}: invalid JSON", file.display()))? {
            Value::Array(arr) => {
                for v in arr {
                    if let Value::Object(row) = v {
                        rows.push(row);
                    }
                }
            }
            Value::Object(row) => rows.push(row),
            _ => {}
        }
    }
    Ok(rows)
}

fn convert_rows(rows: Vec<Row>) -> (Vec<Row>, usize) {
    let mut converted = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for (n, row) in rows.into_iter().enumerate() {
        match convert_row(row) {
            Ok(row) => converted.push(row),
            Err(column) => {
                tracing::warn!(row = n, column = %column, "skipping row with non-integer value");
                skipped += 1;
            }
        }
    }
    (converted, skipped)
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let mut rows = Vec::new();
    for file in files_with_extensions(input, INPUT_EXTENSIONS) {
        rows.extend(read_rows(&file)?);
    }
    let (converted, skipped) = convert_rows(rows);

    let mut out = BufWriter::new(File::create(output).with_context(|| format!("creating {}", output.display()))?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    converted.serialize(&mut ser)?;
    out.flush()?;

    tracing::info!(rows = converted.len(), skipped, output = %output.display(), "conversion complete");
    Ok(())
}

/// Problems that make some weights unusable against `catalog`.
fn catalog_warnings(catalog: &Catalog) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if catalog.is_empty() {
        return warnings;
    }
    if catalog.normalization().max_tempo() == 0 {
        warnings.push("every track has tempo 0, tempo weights will be rejected");
    }
    if catalog.normalization().max_duration_seconds() == 0 {
        warnings.push("every track has duration 0:00, duration weights will be rejected");
    }
    warnings
}

fn check(data_dir: &Path) -> Result<()> {
    let catalog = load_catalog(data_dir)?;
    let warnings = catalog_warnings(&catalog);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    let artists: std::collections::HashSet<&str> = catalog.tracks().iter().map(|t| t.artist.as_str()).collect();
    let albums: std::collections::HashSet<&str> = catalog.tracks().iter().map(|t| t.album.as_str()).collect();
    tracing::info!(
        tracks = catalog.len(),
        artists = artists.len(),
        albums = albums.len(),
        max_tempo = catalog.normalization().max_tempo(),
        max_duration_seconds = catalog.normalization().max_duration_seconds(),
        warnings = warnings.len(),
        "catalog checked"
    );
    Ok(())
}
