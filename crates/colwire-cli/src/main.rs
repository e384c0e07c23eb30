//! colwire CLI: convert tabular text between formats through the streaming
//! read and write pipelines.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use colwire_core::block::Block;
use colwire_core::config::{PipelineConfig, Settings};
use colwire_core::schema::Schema;
use colwire_exec::{block_stream_read, block_stream_write, join_read_write, CancelToken, ExecError};
use colwire_io::Format;
use colwire_mem::PoolRegistry;

#[derive(Parser)]
#[command(name = "colwire")]
#[command(about = "Stream tabular text through typed column blocks", long_about = None)]
struct Cli {
    /// Show diagnostic logs (honours RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all logs and the summary line
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert input text in one format into another
    Convert {
        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input format name (case-insensitive)
        #[arg(long, default_value = "CSV")]
        input_format: String,

        /// Output format name (case-insensitive)
        #[arg(long, default_value = "Pretty")]
        output_format: String,

        /// Column schema, e.g. "id UInt64, name String"
        #[arg(short, long)]
        schema: String,

        /// Rows per block (overrides COLWIRE_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Conversion workers (overrides COLWIRE_WORKERS)
        #[arg(long)]
        workers: Option<usize>,

        /// Format settings as a JSON object, e.g. '{"format_csv_delimiter": "|"}'
        #[arg(long)]
        settings: Option<String>,

        /// Cancel the conversion after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List supported formats
    Formats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] colwire_core::error::Error),

    #[error(transparent)]
    Format(#[from] colwire_io::Error),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("format {0} cannot be read")]
    NotReadable(Format),
}

impl CliError {
    fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::Core(e) => e.suggestions(),
            CliError::Format(e) => e.suggestions(),
            CliError::Exec(e) => e.suggestions(),
            CliError::NotReadable(_) => vec!["Run 'colwire formats' to see readable formats".into()],
            _ => vec![],
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match &cli.command {
        Commands::Convert {
            input,
            output,
            input_format,
            output_format,
            schema,
            batch_size,
            workers,
            settings,
            timeout_ms,
        } => convert(ConvertArgs {
            input: input.clone(),
            output: output.clone(),
            input_format,
            output_format,
            schema,
            batch_size: *batch_size,
            workers: *workers,
            settings: settings.as_deref(),
            timeout: timeout_ms.map(Duration::from_millis),
        })
        .map(|(read, written)| {
            if !cli.quiet {
                eprintln!("read {read} rows, wrote {written} rows");
            }
        }),
        Commands::Formats { json } => list_formats(*json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        for hint in e.suggestions() {
            eprintln!("  hint: {hint}");
        }
        std::process::exit(1);
    }
}

struct ConvertArgs<'a> {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    input_format: &'a str,
    output_format: &'a str,
    schema: &'a str,
    batch_size: Option<usize>,
    workers: Option<usize>,
    settings: Option<&'a str>,
    timeout: Option<Duration>,
}

fn convert(args: ConvertArgs<'_>) -> Result<(u64, u64), CliError> {
    let input_format = Format::from_name(args.input_format)?;
    let output_format = Format::from_name(args.output_format)?;
    if !input_format.can_read() {
        return Err(CliError::NotReadable(input_format));
    }

    let settings = match args.settings {
        Some(json) => Settings::from_json(json)?,
        None => Settings::new(),
    };
    let schema = Schema::parse(args.schema)?;
    let sample = Block::from_schema(&schema);

    let mut cfg = PipelineConfig::from_env();
    if let Some(n) = args.batch_size {
        cfg = cfg.with_batch_size(n);
    }
    if let Some(n) = args.workers {
        cfg = cfg.with_workers(n);
    }
    cfg.validate()?;

    let src: Box<dyn Read + Send> = match &args.input {
        Some(path) => Box::new(File::open(path).map_err(|source| CliError::File {
            path: path.clone(),
            source,
        })?),
        None => Box::new(io::stdin()),
    };
    let sink: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(File::create(path).map_err(|source| CliError::File {
            path: path.clone(),
            source,
        })?),
        None => Box::new(io::stdout()),
    };

    let root = CancelToken::new();
    let cancel = match args.timeout {
        Some(d) => root.with_timeout(d),
        None => root,
    };
    let pools = Arc::new(PoolRegistry::new());

    tracing::info!(
        input = %input_format,
        output = %output_format,
        columns = schema.len(),
        batch_size = cfg.batch_size,
        workers = cfg.workers,
        "starting conversion"
    );

    let reader = input_format.reader(src, &settings)?;
    let writer = output_format.writer(sink, &settings)?;
    let (blocks, read_handle) = block_stream_read(reader, &sample, &cfg, Arc::clone(&pools), &cancel)?;
    let write_handle = block_stream_write(blocks, writer, &cfg, Arc::clone(&pools), &cancel)?;

    let written = write_handle.wait();
    let (read, written) = join_read_write(read_handle.wait(), written)?;

    let stats = pools.arenas.stats();
    tracing::debug!(hits = stats.hits, misses = stats.misses, dropped = stats.dropped, "arena pool");
    Ok((read, written))
}

fn list_formats(json: bool) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    if json {
        let formats: Vec<serde_json::Value> = Format::all()
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name(),
                    "read": f.can_read(),
                    "write": f.can_write(),
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::Value::Array(formats))?;
        return Ok(());
    }
    writeln!(out, "{:<14} {:<6} {:<6}", "FORMAT", "READ", "WRITE")?;
    for f in Format::all() {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        writeln!(out, "{:<14} {:<6} {:<6}", f.name(), yes_no(f.can_read()), yes_no(f.can_write()))?;
    }
    Ok(())
}
