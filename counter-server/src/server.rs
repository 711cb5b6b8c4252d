use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use counter_store::config::SessionConfig;
use counter_store::{Session, Store};
use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, info_span, warn, Instrument};

use crate::dispatch::{DispatchPolicy, Gate};

/// Longest pause between retries after a failed `accept`.
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(64);

#[derive(Debug)]
struct Listener {
    listener: TcpListener,
    store: Arc<Store>,
    session: SessionConfig,
    dispatch: DispatchPolicy,
    gate: Gate,
}

#[derive(Debug)]
struct Handler {
    session: Session,
    socket: TcpStream,
    peer: SocketAddr,
}

/// Accepts connections on `listener` until `shutdown` completes.
///
/// Sessions still running when `shutdown` fires are abandoned with the
/// runtime. The accept loop itself only returns early if `accept` keeps
/// failing past the backoff limit.
pub async fn run(
    listener: TcpListener,
    store: Arc<Store>,
    session: SessionConfig,
    dispatch: DispatchPolicy,
    shutdown: impl Future,
) {
    let mut server = Listener {
        listener,
        store,
        session,
        gate: dispatch.gate(),
        dispatch,
    };

    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!(%err, "failed to accept");
            }
        }
        _ = shutdown => {
            info!("shutting down");
        }
    }
}

impl Listener {
    /// Accepts connections and hands each to the dispatch policy.
    ///
    /// Under [`DispatchPolicy::Pooled`] the loop waits for a free slot before
    /// accepting, so connections beyond the limit queue in the OS backlog.
    async fn run(&mut self) -> io::Result<()> {
        info!(
            addr = %self.listener.local_addr()?,
            dispatch = %self.dispatch,
            strategy = %self.store.strategy(),
            size = self.store.len(),
            "accepting connections"
        );

        loop {
            let permit = self.gate.admit().await;
            let (socket, peer) = self.accept().await?;

            let handler = Handler {
                session: Session::new(self.store.clone(), self.session),
                socket,
                peer,
            };

            match self.dispatch {
                DispatchPolicy::Inline => handler.run().await,
                DispatchPolicy::Spawn | DispatchPolicy::Pooled { .. } => {
                    tokio::spawn(async move {
                        handler.run().await;
                        drop(permit);
                    });
                }
            }
        }
    }

    /// Retries transient accept failures with exponential backoff.
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        let mut backoff = Duration::from_secs(1);

        loop {
            match self.listener.accept().await {
                Ok(accepted) => return Ok(accepted),
                Err(err) => {
                    if backoff > MAX_ACCEPT_BACKOFF {
                        return Err(err);
                    }
                    warn!(%err, ?backoff, "accept failed, retrying");
                }
            }

            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

impl Handler {
    async fn run(self) {
        let span = info_span!("session", peer = %self.peer);
        let Handler {
            session, socket, ..
        } = self;

        async move {
            info!("session opened");
            let (reader, writer) = socket.into_split();
            match session
                .run(BufReader::new(reader), BufWriter::new(writer))
                .await
            {
                Ok(report) => info!(
                    requested = report.requested,
                    reads = report.reads,
                    writes = report.writes,
                    rejected = report.rejected,
                    write_count = report.write_count,
                    sum = report.sum,
                    "session completed"
                ),
                Err(err) => warn!(%err, "session ended early"),
            }
        }
        .instrument(span)
        .await
    }
}
