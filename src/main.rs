//! CLI for brute-force nearest-neighbor search over `.fvecs` files

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use bruteforce_knn::fvecs::{fill_to_count, read_fvecs, write_fvecs};
use bruteforce_knn::metrics::SearchTimings;
use bruteforce_knn::{BruteForceSearcher, RankedResultList, SearchConfig, Vector};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_NUM_VECTORS: usize = 100;

#[derive(Parser)]
#[command(name = "knn")]
#[command(about = "Exact brute-force k-nearest-neighbor search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a base file for the nearest neighbors of one query vector
    Search {
        /// Database vectors (.fvecs)
        #[arg(long, default_value = "sift_base.fvecs")]
        base: PathBuf,
        /// Query vectors (.fvecs)
        #[arg(long, default_value = "sift_query.fvecs")]
        query: PathBuf,
        /// Number of database vectors to load
        #[arg(short, long, default_value_t = DEFAULT_NUM_VECTORS)]
        num_vectors: usize,
        /// Number of results to return
        #[arg(short, long, default_value_t = 10)]
        k: usize,
        /// Which record of the query file to use
        #[arg(long, default_value_t = 0)]
        query_index: usize,
        /// Literal query vector as comma-separated values (e.g. "1.0,2.0,3.0"),
        /// used instead of the query file
        #[arg(long, conflicts_with = "query_index")]
        query_vector: Option<String>,
        /// Duplicate loaded vectors cyclically when the file holds fewer than requested
        #[arg(long)]
        fill: bool,
        /// Scan in parallel across this many shards
        #[arg(long)]
        shards: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Do not print scan progress
        #[arg(long)]
        no_progress: bool,
    },
    /// Write random vectors to an .fvecs file
    Generate {
        /// Output path
        #[arg(long)]
        out: PathBuf,
        /// Number of vectors
        #[arg(long)]
        count: usize,
        /// Vector dimension
        #[arg(long, default_value_t = 128)]
        dim: usize,
        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Serialize)]
struct JsonReport<'a> {
    k: usize,
    scanned: usize,
    skipped: usize,
    results: &'a RankedResultList,
}

struct SearchArgs {
    base: PathBuf,
    query: PathBuf,
    num_vectors: usize,
    query_index: usize,
    query_vector: Option<String>,
    fill: bool,
    json: bool,
    config: SearchConfig,
}

fn load_inputs(args: &SearchArgs, timings: &mut SearchTimings) -> Result<(Vec<Vector>, Vector)> {
    let database = timings.time_load(|| -> Result<Vec<Vector>> {
        let mut database = read_fvecs(&args.base, Some(args.num_vectors))
            .with_context(|| format!("reading {}", args.base.display()))?;
        if args.fill && !database.is_empty() && database.len() < args.num_vectors {
            database = fill_to_count(database, args.num_vectors);
        }
        Ok(database)
    })?;
    if database.is_empty() {
        bail!("no database vectors loaded from {}", args.base.display());
    }

    let query = load_query(args, timings)?;
    if !query.has_same_dimension(&database[0]) {
        warn!(
            query = query.dimension(),
            database = database[0].dimension(),
            "query dimension differs from the first database vector"
        );
    }

    Ok((database, query))
}

fn load_query(args: &SearchArgs, timings: &mut SearchTimings) -> Result<Vector> {
    if let Some(literal) = &args.query_vector {
        return Vector::parse(literal).context("parsing --query-vector");
    }

    let queries = timings
        .time_load(|| read_fvecs(&args.query, Some(args.query_index + 1)))
        .with_context(|| format!("reading {}", args.query.display()))?;
    let Some(query) = queries.into_iter().nth(args.query_index) else {
        bail!(
            "query file {} has no record #{}",
            args.query.display(),
            args.query_index
        );
    };
    Ok(query)
}

fn run_search(args: SearchArgs) -> Result<()> {
    let mut timings = SearchTimings::new();
    let (database, query) = load_inputs(&args, &mut timings)?;
    let k = args.config.k;

    if !args.json {
        println!("Loaded {} vectors ({} dimensions)", database.len(), database[0].dimension());
        let preview: Vec<String> = query.as_slice().iter().take(5).map(|v| v.to_string()).collect();
        println!("Query vector (dimension {}): [{}, ...]", query.dimension(), preview.join(", "));
        println!("Finding top {} nearest neighbors...", k);
    }

    let show_progress = args.config.report_progress && !args.json;
    let mut progress = |scanned: usize, total: usize| {
        if show_progress {
            println!("  Progress: {}/{} vectors", scanned, total);
        }
    };

    let searcher = BruteForceSearcher::euclidean();
    let start = Instant::now();
    let outcome = searcher.run(&database, &query, &args.config, &mut progress)?;
    timings.record_search(start.elapsed(), outcome.scanned);

    if args.json {
        let report = JsonReport {
            k,
            scanned: outcome.scanned,
            skipped: outcome.skipped,
            results: &outcome.results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if outcome.all_mismatched() {
        println!(
            "No results: all {} vectors had a dimension different from the query ({})",
            outcome.scanned,
            query.dimension()
        );
        return Ok(());
    }
    if outcome.skipped > 0 {
        println!("Skipped {} vectors with mismatched dimensions", outcome.skipped);
    }

    println!("Top {} nearest neighbors:", outcome.results.len());
    for (rank, result) in outcome.results.iter().enumerate() {
        println!(
            "Rank {}: Vector #{} (distance: {:.4})",
            rank + 1,
            result.index,
            result.distance
        );
    }
    println!(
        "Load: {:.3?}  Search: {:.3?}  ({:.0} vectors/sec)",
        timings.load(),
        timings.search(),
        timings.vectors_per_sec()
    );
    Ok(())
}

fn run_generate(out: PathBuf, count: usize, dim: usize, seed: Option<u64>) -> Result<()> {
    if dim == 0 {
        bail!("dimension must be at least 1");
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let vectors: Vec<Vector> = (0..count)
        .map(|_| Vector::new((0..dim).map(|_| rng.gen::<f32>()).collect()))
        .collect();
    write_fvecs(&out, &vectors).with_context(|| format!("writing {}", out.display()))?;
    println!("Wrote {} vectors ({} dimensions) to {}", count, dim, out.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            base,
            query,
            num_vectors,
            k,
            query_index,
            query_vector,
            fill,
            shards,
            json,
            no_progress,
        } => {
            let num_vectors = if num_vectors == 0 {
                warn!("invalid number of vectors, using default ({})", DEFAULT_NUM_VECTORS);
                DEFAULT_NUM_VECTORS
            } else {
                num_vectors
            };
            run_search(SearchArgs {
                base,
                query,
                num_vectors,
                query_index,
                query_vector,
                fill,
                json,
                config: SearchConfig {
                    k,
                    shards,
                    report_progress: !no_progress,
                },
            })
        }
        Commands::Generate {
            out,
            count,
            dim,
            seed,
        } => run_generate(out, count, dim, seed),
    }
}
