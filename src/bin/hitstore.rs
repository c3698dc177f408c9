//! hitstore CLI
//!
//! Command-line interface for importing, inspecting, and repairing hit stores.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use hitstore::{Config, Engine, Hit, HitStoreError, HitType, Strand, SyncStrategy};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// hitstore CLI
#[derive(Parser, Debug)]
#[command(name = "hitstore")]
#[command(about = "Per-chromosome sorted store for aligned sequencing hits")]
#[command(version)]
struct Args {
    /// Storage path prefix (directory with trailing separator, or dir/name_)
    #[arg(short, long, default_value = "./hitstore_data/")]
    prefix: String,

    /// Skip fsync on commit and append
    #[arg(long)]
    no_sync: bool,

    /// Append buffer size in KB
    #[arg(long, default_value = "64")]
    buffer_kb: usize,

    #[command(subcommand)]
    command: Commands,
}

/// Selects one store under the prefix
#[derive(clap::Args, Debug)]
struct StoreArgs {
    /// Chromosome id
    #[arg(short, long)]
    chrom: u32,

    /// Use the type-2 (secondary) namespace
    #[arg(long)]
    type2: bool,
}

impl StoreArgs {
    fn hit_type(&self) -> HitType {
        HitType::from_type2(self.type2)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import "position strand length weight" lines into a store
    Import {
        #[command(flatten)]
        store: StoreArgs,

        /// Input file (stdin if omitted)
        input: Option<PathBuf>,

        /// Hits per ingest batch
        #[arg(short, long, default_value = "1000000")]
        batch_size: usize,

        /// Reject unsorted input instead of sorting each batch
        #[arg(long)]
        sorted: bool,
    },

    /// Rebuild a store's position order
    Resort {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show record count and ordering of a store
    Info {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print hits as text
    Dump {
        #[command(flatten)]
        store: StoreArgs,

        /// Stop after this many hits
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Remove stale temporaries and trim ragged columns
    Recover {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// List stores under the prefix
    List,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] HitStoreError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hitstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let sort_incoming = !matches!(args.command, Commands::Import { sorted: true, .. });
    let write_buffer_size = buffer_bytes(args.buffer_kb)?;

    let config = Config::builder()
        .prefix(&args.prefix)
        .sync_strategy(if args.no_sync {
            SyncStrategy::Never
        } else {
            SyncStrategy::Always
        })
        .write_buffer_size(write_buffer_size)
        .sort_incoming(sort_incoming)
        .build();

    let engine = Engine::open(config)?;

    match args.command {
        Commands::Import {
            store,
            input,
            batch_size,
            ..
        } => {
            let reader: Box<dyn BufRead> = match &input {
                Some(path) => Box::new(BufReader::new(File::open(path)?)),
                None => Box::new(BufReader::new(io::stdin().lock())),
            };
            import(&engine, &store, reader, batch_size.max(1))
        }
        Commands::Resort { store } => {
            let resorted = engine.resort(store.chrom, store.hit_type())?;
            println!("resorted {} hits", resorted.len());
            Ok(())
        }
        Commands::Info { store } => {
            let report = engine.verify(store.chrom, store.hit_type())?;
            for column in &report.columns {
                println!(
                    "{:<10} {:>12} records  {:>14} bytes  {}",
                    column.column.to_string(),
                    column.records,
                    column.bytes,
                    column.path.display()
                );
            }
            if !report.is_clean() {
                println!("store needs recovery (run `hitstore recover`)");
                return Ok(());
            }

            let hits = engine.open_store(store.chrom, store.hit_type())?;
            println!("records:  {}", hits.len());
            println!("sorted:   {}", hits.is_sorted());
            if let (Some(first), Some(last)) = (hits.first_position(), hits.last_position()) {
                println!("first:    {}", first);
                println!("last:     {}", last);
            }
            Ok(())
        }
        Commands::Dump { store, limit } => {
            let hits = engine.open_store(store.chrom, store.hit_type())?;
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for hit in hits.iter().take(limit.unwrap_or(usize::MAX)) {
                writeln!(out, "{}\t{}\t{}\t{}", hit.position, hit.strand, hit.length, hit.weight)?;
            }
            out.flush()?;
            Ok(())
        }
        Commands::Recover { store } => {
            let report = engine.recover(store.chrom, store.hit_type())?;
            println!("records:             {}", report.consistent_records);
            println!("truncated:           {}", report.was_truncated);
            println!("rolled forward:      {}", report.rolled_forward);
            let removed = if report.temporaries_removed {
                report.stale_temporaries.len()
            } else {
                0
            };
            println!("temporaries removed: {}", removed);
            Ok(())
        }
        Commands::List => {
            for (chrom, hit_type) in engine.stores()? {
                println!("{}\t{}", chrom, hit_type);
            }
            Ok(())
        }
    }
}

/// `--buffer-kb` in bytes
fn buffer_bytes(buffer_kb: usize) -> Result<usize, HitStoreError> {
    buffer_kb.checked_mul(1024).ok_or_else(|| {
        HitStoreError::Config(format!("buffer of {} KB does not fit in memory", buffer_kb))
    })
}

/// Stream hits from `reader` into the store in batches
fn import(
    engine: &Engine,
    store: &StoreArgs,
    reader: Box<dyn BufRead>,
    batch_size: usize,
) -> Result<(), CliError> {
    let mut batch = Vec::with_capacity(batch_size.min(1 << 20));
    let mut total = 0usize;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let hit = parse_hit(trimmed).map_err(|message| CliError::Parse {
            line: number + 1,
            message,
        })?;
        batch.push(hit);

        if batch.len() >= batch_size {
            engine.ingest(store.chrom, store.hit_type(), &batch)?;
            total += batch.len();
            batch.clear();
        }
    }

    if !batch.is_empty() {
        engine.ingest(store.chrom, store.hit_type(), &batch)?;
        total += batch.len();
    }

    tracing::info!(chrom = store.chrom, hit_type = %store.hit_type(), total, "import finished");
    Ok(())
}

/// "position strand length weight"
fn parse_hit(line: &str) -> Result<Hit, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }

    let position = fields[0]
        .parse::<i32>()
        .map_err(|e| format!("bad position {:?}: {}", fields[0], e))?;
    let strand = fields[1].parse::<Strand>().map_err(|e| e.to_string())?;
    let length = fields[2]
        .parse::<u32>()
        .map_err(|e| format!("bad length {:?}: {}", fields[2], e))?;
    let weight = fields[3]
        .parse::<f32>()
        .map_err(|e| format!("bad weight {:?}: {}", fields[3], e))?;

    Ok(Hit::new(position, strand, length, weight))
}
