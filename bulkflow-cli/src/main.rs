//! bulkflow CLI - Command-line tool for MessagePack record streams
//!
//! This binary provides command-line interfaces for:
//! - encode: NDJSON → concatenated MessagePack records
//! - decode: MessagePack records → NDJSON, pretty JSON or type outlines
//! - inspect: record count and per-type tally

mod formatters;

use std::error::Error;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bulkflow_codec::{encode_to_slice, encoded_len, Decoder};
use bulkflow_exec::{Buffer, BufferPool, PluginKind, PoolConfig};
use bulkflow_format::{Value, ValueType};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bulkflow")]
#[command(about = "Encode, decode and inspect MessagePack record streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Pool page size in bytes (overrides the config file)
    #[arg(long, global = true)]
    page_size: Option<usize>,
    /// Pool configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log pool activity to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode NDJSON records to MessagePack
    Encode {
        /// Input file (NDJSON)
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Decode MessagePack records
    ///
    /// Examples:
    ///   bulkflow decode data.bin -o data.ndjson
    ///   bulkflow decode data.bin -o outline.txt --format types
    Decode {
        /// Input file (concatenated MessagePack values)
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = DecodeFormat::Ndjson)]
        format: DecodeFormat,
    },
    /// Count records and tally value types
    Inspect {
        /// Input file (concatenated MessagePack values)
        input: PathBuf,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = InspectFormat::Table)]
        format: InspectFormat,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DecodeFormat {
    Ndjson,
    Pretty,
    Types,
}

impl DecodeFormat {
    fn plugin_name(self) -> &'static str {
        match self {
            DecodeFormat::Ndjson => "ndjson",
            DecodeFormat::Pretty => "pretty",
            DecodeFormat::Types => "types",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InspectFormat {
    Table,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let pool = build_pool(cli.config.as_deref(), cli.page_size)?;

    match cli.command {
        Commands::Encode { input, output } => handle_encode(&pool, &input, &output)?,
        Commands::Decode {
            input,
            output,
            format,
        } => handle_decode(&pool, &input, &output, format)?,
        Commands::Inspect { input, format } => handle_inspect(&pool, &input, format)?,
    }

    debug!(stats = ?pool.stats(), "pool statistics at exit");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_pool(config: Option<&Path>, page_size: Option<usize>) -> Result<BufferPool, Box<dyn Error>> {
    let mut pool_config = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
            toml::from_str::<PoolConfig>(&text)
                .map_err(|e| format!("invalid config {}: {e}", path.display()))?
        }
        None => PoolConfig::default(),
    };
    if let Some(page_size) = page_size {
        pool_config.page_size = page_size;
    }
    Ok(BufferPool::new(pool_config)?)
}

/// Read a whole file into a pooled buffer.
fn read_pooled(pool: &BufferPool, path: &Path) -> Result<Buffer, Box<dyn Error>> {
    let mut file = File::open(path)?;
    let len = usize::try_from(file.metadata()?.len())?;
    let mut buffer = pool.allocate_with_capacity(len)?;
    let read = file.read_exact(&mut buffer.as_mut_slice()[..len]);
    if let Err(err) = read {
        buffer.release();
        return Err(err.into());
    }
    buffer.set_len(len)?;
    Ok(buffer)
}

fn handle_encode(pool: &BufferPool, input: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut records = 0usize;
    let mut bytes = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let json: serde_json::Value = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: {e}", index + 1))?;
        let value = Value::from_json(json);

        let mut buffer = pool.allocate_with_capacity(encoded_len(&value)?)?;
        let result = write_record(&value, &mut buffer, &mut writer);
        buffer.release();
        let written = result?;

        records += 1;
        bytes += written;
    }
    writer.flush()?;

    info!(records, bytes, "encoded records");
    writeln!(
        std::io::stderr().lock(),
        "Encoded {} records to {} (bytes written: {}, elapsed: {:.2?})",
        records,
        output.display(),
        bytes,
        start.elapsed()
    )?;
    Ok(())
}

/// Encode `value` into `buffer` and copy the bytes to `writer`.
fn write_record(value: &Value, buffer: &mut Buffer, writer: &mut impl Write) -> Result<usize, Box<dyn Error>> {
    let written = encode_to_slice(value, buffer.as_mut_slice())?;
    buffer.set_len(written)?;
    writer.write_all(buffer.as_slice())?;
    Ok(written)
}

fn handle_decode(
    pool: &BufferPool,
    input: &Path,
    output: &Path,
    format: DecodeFormat,
) -> Result<(), Box<dyn Error>> {
    let formatter = formatters::builtin_registry().lookup(PluginKind::Formatter, format.plugin_name())?;
    let buffer = read_pooled(pool, input)?;
    let result = decode_into(&buffer, output, formatter.as_ref());
    buffer.release();
    let records = result?;

    writeln!(
        std::io::stderr().lock(),
        "Decoded {} records to {}",
        records,
        output.display()
    )?;
    Ok(())
}

fn decode_into(
    buffer: &Buffer,
    output: &Path,
    formatter: &dyn formatters::RecordFormatter,
) -> Result<usize, Box<dyn Error>> {
    let mut writer = BufWriter::new(File::create(output)?);
    let mut records = 0usize;
    for value in Decoder::new(buffer.as_slice()) {
        formatter.write_record(&value?, &mut writer)?;
        records += 1;
    }
    writer.flush()?;
    Ok(records)
}

/// Per-type counts over every value of every record.
#[derive(Debug, serde::Serialize)]
struct Tally {
    records: usize,
    bytes: usize,
    types: Vec<TypeCount>,
}

#[derive(Debug, serde::Serialize)]
struct TypeCount {
    name: &'static str,
    count: usize,
}

fn count_types(value: &Value, counts: &mut [usize; 9]) {
    counts[value.value_type() as usize] += 1;
    match value {
        Value::Array(items) => items.iter().for_each(|item| count_types(item, counts)),
        Value::Map(entries) => {
            for (key, value) in entries {
                count_types(key, counts);
                count_types(value, counts);
            }
        }
        _ => {}
    }
}

fn tally(bytes: &[u8]) -> Result<Tally, Box<dyn Error>> {
    let mut counts = [0usize; 9];
    let mut records = 0usize;
    for value in Decoder::new(bytes) {
        count_types(&value?, &mut counts);
        records += 1;
    }
    Ok(Tally {
        records,
        bytes: bytes.len(),
        types: ValueType::ALL
            .iter()
            .map(|ty| TypeCount {
                name: ty.name(),
                count: counts[*ty as usize],
            })
            .collect(),
    })
}

fn handle_inspect(pool: &BufferPool, input: &Path, format: InspectFormat) -> Result<(), Box<dyn Error>> {
    let buffer = read_pooled(pool, input)?;
    let result = tally(buffer.as_slice());
    buffer.release();
    let tally = result?;

    let mut stdout = std::io::stdout().lock();
    match format {
        InspectFormat::Table => {
            writeln!(stdout, "records: {}", tally.records)?;
            writeln!(stdout, "bytes: {}", tally.bytes)?;
            writeln!(stdout, "{:<10} {:>10}", "type", "count")?;
            for entry in tally.types.iter().filter(|entry| entry.count > 0) {
                writeln!(stdout, "{:<10} {:>10}", entry.name, entry.count)?;
            }
        }
        InspectFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &tally)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
