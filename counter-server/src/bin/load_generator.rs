use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use counter_server::load::{self, RunSummary, Sequence, Workload};
use tokio::net::lookup_host;
use tracing::{info, warn};

/// Load generator for the counter server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of concurrent clients
    #[arg(short, long, default_value = "10")]
    clients: usize,

    /// Server address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// READ requests per client
    #[arg(long, default_value = "100")]
    reads: usize,

    /// WRITE requests per client
    #[arg(long, default_value = "100")]
    writes: usize,

    /// Operation order: rw, wr or interleaved
    #[arg(long, default_value = "rw")]
    sequence: Sequence,

    /// Export per-client outcomes to a CSV file
    #[arg(long, value_name = "PATH")]
    output_csv: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    counter_server::init_logging(args.verbose, args.quiet);

    let addr: SocketAddr = lookup_host((args.host.as_str(), args.port))
        .await?
        .next()
        .ok_or_else(|| format!("could not resolve {}:{}", args.host, args.port))?;

    let workload = Workload {
        reads: args.reads,
        writes: args.writes,
        sequence: args.sequence,
    };
    info!(%addr, clients = args.clients, ?workload, "starting load");

    let started = Instant::now();
    let outcomes = load::run_clients(addr, args.clients, workload).await;
    let elapsed = started.elapsed();

    for (client, outcome) in outcomes.iter().enumerate() {
        if let Err(err) = outcome {
            warn!(client, %err, "client failed");
        }
    }

    let summary = RunSummary::from_outcomes(&outcomes);
    info!(
        completed = summary.completed,
        failed = summary.failed,
        counter = summary.counter,
        sum = summary.sum,
        ?elapsed,
        "final report"
    );

    if let Some(csv_path) = args.output_csv {
        let completed: Vec<_> = outcomes.into_iter().filter_map(Result::ok).collect();
        load::export_csv(&completed, &csv_path)?;
        info!(path = %csv_path.display(), "outcomes exported");
    }

    Ok(())
}
