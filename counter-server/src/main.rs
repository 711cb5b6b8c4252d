use clap::Parser;
use core::num::NonZeroUsize;
use std::time::Duration;

use counter_server::dispatch::{DispatchPolicy, DEFAULT_MAX_SESSIONS};
use counter_server::server;
use counter_store::config::{
    BackendKind, CacheConfig, SessionConfig, StoreConfig, DEFAULT_MAX_LINE_LEN,
};
use counter_store::metrics::CacheMetrics;
use counter_store::{Store, StoreError, Strategy};
use tokio::net::TcpListener;
use tracing::info;

/// Shared counter vector served over TCP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of cells in the vector
    #[arg(long, default_value = "1000")]
    size: i64,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// Concurrency strategy (none, global, per-index, reader-writer)
    #[arg(short, long, default_value = "per-index")]
    strategy: Strategy,

    /// Put a FIFO read cache in front of the vector
    #[arg(long)]
    cache: bool,

    /// Cache capacity (number of entries)
    #[arg(long, default_value = "128")]
    cache_capacity: usize,

    /// On a cache miss, answer `index * M` instead of reading the cell
    #[arg(long, value_name = "M")]
    backend_multiplier: Option<i64>,

    /// Seconds to wait for a client line before closing the session (0 disables)
    #[arg(long, default_value = "30")]
    idle_timeout: u64,

    /// Longest accepted client line in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
    max_line_len: usize,

    /// How sessions are dispatched (spawn, pooled, inline)
    #[arg(long, default_value = "spawn")]
    dispatch: String,

    /// Concurrent session limit for the pooled dispatch policy
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn store_config(&self) -> Result<StoreConfig, StoreError> {
        let cache = if self.cache {
            let capacity =
                NonZeroUsize::new(self.cache_capacity).ok_or_else(|| StoreError::InvalidConfig {
                    reason: "--cache-capacity must be at least 1".to_string(),
                })?;
            let backend = match self.backend_multiplier {
                Some(multiplier) => BackendKind::Simulated { multiplier },
                None => BackendKind::Controller,
            };
            Some(CacheConfig { capacity, backend })
        } else {
            None
        };

        Ok(StoreConfig {
            size: self.size,
            strategy: self.strategy,
            cache,
        })
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout)),
            max_line_len: self.max_line_len,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    counter_server::init_logging(args.verbose, args.quiet);

    let config = args.store_config()?;
    let dispatch = DispatchPolicy::parse(&args.dispatch, args.max_sessions)?;
    info!(?config, %dispatch, "starting");

    let store = Store::open(config)?;
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;

    server::run(
        listener,
        store.clone(),
        args.session_config(),
        dispatch,
        tokio::signal::ctrl_c(),
    )
    .await;

    let stats = store.stats();
    info!(
        write_count = store.write_count(),
        sum = store.total_sum(),
        sessions_opened = stats.opened,
        sessions_completed = stats.completed,
        sessions_failed = stats.failed,
        "final state"
    );
    if let Some(cache) = store.cache() {
        for (name, value) in cache.metrics() {
            info!(algorithm = cache.algorithm_name(), metric = %name, value, "cache metric");
        }
    }

    Ok(())
}
