//! Line-based client sessions.
//!
//! A session speaks a fixed, line-terminated dialogue:
//!
//! ```text
//!   server ─▶  N                 vector size
//!   client ─▶  K                 number of requests
//!   client ─▶  READ i | WRITE i  K times, each answered before the next is read
//!   server ─▶  <write count>
//!   server ─▶  <sum>
//! ```
//!
//! Lines end in `\n`; a trailing `\r` is ignored. A request that cannot be
//! parsed or names an index outside `[0, N)` gets an `ERROR ...` reply and
//! still counts toward `K`. Anything that breaks the dialogue itself (an early
//! disconnect, a bad count line, an idle timeout) ends the session with an
//! error and no report.
//!
//! [`Session::run`] is generic over the transport, so the same code serves TCP
//! connections and in-memory pipes.

mod request;

pub use request::{Operation, Reply, Request};

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::Store;

/// What a completed session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Requests the client announced.
    pub requested: u64,
    /// Reads answered with a value.
    pub reads: u64,
    /// Writes applied.
    pub writes: u64,
    /// Requests answered with `ERROR`.
    pub rejected: u64,
    /// Write count sent in the report.
    pub write_count: u64,
    /// Sum sent in the report.
    pub sum: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Handshake,
    RequestCount,
    Requests { remaining: u64 },
    Report,
    Closed,
}

/// Serves one client against a shared [`Store`].
#[derive(Debug, Clone)]
pub struct Session {
    store: Arc<Store>,
    config: SessionConfig,
}

impl Session {
    /// Creates a session handler.
    pub fn new(store: Arc<Store>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Runs the dialogue to completion.
    ///
    /// # Errors
    ///
    /// [`StoreError::ProtocolViolation`] if the client disconnects early or
    /// sends a bad count, [`StoreError::IdleTimeout`] if a line does not arrive
    /// in time, and [`StoreError::Transport`] for I/O failures.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> StoreResult<SessionReport>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.store.session_opened();
        let outcome = self.drive(&mut reader, &mut writer).await;
        self.store.session_closed(outcome.is_ok());
        outcome
    }

    async fn drive<R, W>(&self, reader: &mut R, writer: &mut W) -> StoreResult<SessionReport>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut report = SessionReport::default();
        let mut state = State::Handshake;

        while state != State::Closed {
            state = match state {
                State::Handshake => {
                    send(writer, &self.store.len().to_string()).await?;
                    State::RequestCount
                }
                State::RequestCount => {
                    let line = match self.next_line(reader).await? {
                        Some(Line::Complete(line)) => line,
                        Some(Line::TooLong(_)) => {
                            return Err(StoreError::protocol(format!(
                                "request count line longer than {} bytes",
                                self.config.max_line_len
                            )))
                        }
                        None => {
                            return Err(StoreError::protocol(
                                "connection closed before request count",
                            ))
                        }
                    };
                    let count = line.trim().parse::<u64>().map_err(|_| {
                        StoreError::protocol(format!("expected a request count, got {line:?}"))
                    })?;
                    debug!(count, "request count received");
                    report.requested = count;
                    if count == 0 {
                        State::Report
                    } else {
                        State::Requests { remaining: count }
                    }
                }
                State::Requests { remaining } => {
                    let line = self.next_line(reader).await?.ok_or_else(|| {
                        StoreError::protocol(format!(
                            "connection closed with {remaining} requests outstanding"
                        ))
                    })?;
                    let reply = match line {
                        Line::Complete(line) => self.apply(&line, &mut report),
                        Line::TooLong(head) => {
                            let skipped = self.skip_rest_of_line(reader).await?;
                            debug!(skipped, "over-long request line rejected");
                            report.rejected += 1;
                            Reply::Error(StoreError::MalformedRequest { line: head })
                        }
                    };
                    send(writer, &reply.to_string()).await?;
                    if remaining == 1 {
                        State::Report
                    } else {
                        State::Requests {
                            remaining: remaining - 1,
                        }
                    }
                }
                State::Report => {
                    report.write_count = self.store.write_count();
                    report.sum = self.store.total_sum();
                    send(writer, &report.write_count.to_string()).await?;
                    send(writer, &report.sum.to_string()).await?;
                    State::Closed
                }
                State::Closed => State::Closed,
            };
        }

        Ok(report)
    }

    fn apply(&self, line: &str, report: &mut SessionReport) -> Reply {
        let outcome = line.parse::<Request>().and_then(|request| {
            trace!(%request, "applying request");
            match request.op {
                Operation::Read => self.store.read(request.index).map(|value| Reply::Read {
                    index: request.index,
                    value,
                }),
                Operation::Write => self.store.write(request.index).map(|value| Reply::Write {
                    index: request.index,
                    value,
                }),
            }
        });

        match outcome {
            Ok(reply) => {
                match reply {
                    Reply::Read { .. } => report.reads += 1,
                    Reply::Write { .. } => report.writes += 1,
                    Reply::Error(_) => report.rejected += 1,
                }
                reply
            }
            Err(err) => {
                debug!(%err, "request rejected");
                report.rejected += 1;
                Reply::Error(err)
            }
        }
    }

    /// Reads one line without its terminator. `Ok(None)` means end of stream.
    ///
    /// At most `max_line_len + 1` bytes are buffered. A line that does not end
    /// within that limit comes back as [`Line::TooLong`] with the rest of it
    /// still unread.
    async fn next_line<R>(&self, reader: &mut R) -> StoreResult<Option<Line>>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = self.config.max_line_len.saturating_add(1);
        let mut buf = Vec::new();
        let mut bounded = (&mut *reader).take(limit as u64);
        let read = match self.config.idle_timeout {
            Some(after) => with_deadline(after, bounded.read_until(b'\n', &mut buf)).await?,
            None => bounded.read_until(b'\n', &mut buf).await?,
        };
        if read == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        } else if buf.len() >= limit {
            buf.truncate(self.config.max_line_len);
            return Ok(Some(Line::TooLong(String::from_utf8_lossy(&buf).into_owned())));
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(Some(Line::Complete(String::from_utf8_lossy(&buf).into_owned())))
    }

    /// Discards input up to and including the next `\n`, returning the number
    /// of bytes dropped. Nothing is buffered beyond the reader's own buffer.
    async fn skip_rest_of_line<R>(&self, reader: &mut R) -> StoreResult<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        match self.config.idle_timeout {
            Some(after) => with_deadline(after, discard_line(reader)).await,
            None => Ok(discard_line(reader).await?),
        }
    }
}

/// One line as read from the client.
#[derive(Debug)]
enum Line {
    Complete(String),
    /// The first `max_line_len` bytes of a line that ran past the limit.
    TooLong(String),
}

async fn discard_line<R>(reader: &mut R) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(skipped);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(at) => (at + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(used);
        skipped += used;
        if done {
            return Ok(skipped);
        }
    }
}

async fn with_deadline<F>(after: Duration, read: F) -> StoreResult<usize>
where
    F: core::future::Future<Output = std::io::Result<usize>>,
{
    match tokio::time::timeout(after, read).await {
        Ok(read) => Ok(read?),
        Err(_) => Err(StoreError::IdleTimeout { after }),
    }
}

async fn send<W>(writer: &mut W, line: &str) -> StoreResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
