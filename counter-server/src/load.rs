// Load generation: concurrent clients that speak the session protocol

use core::fmt;
use core::str::FromStr;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use counter_store::session::{Operation, Request};
use counter_store::{StoreError, StoreResult};
use rand::Rng;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info_span, Instrument};

/// Order in which a client issues its reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sequence {
    /// All reads, then all writes.
    #[default]
    ReadsThenWrites,
    /// All writes, then all reads.
    WritesThenReads,
    /// Alternate, starting with a read, for the whole request count.
    Interleaved,
}

impl Sequence {
    /// CLI name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sequence::ReadsThenWrites => "rw",
            Sequence::WritesThenReads => "wr",
            Sequence::Interleaved => "interleaved",
        }
    }

    /// Operation for request number `step` out of `reads + writes`.
    pub fn operation(&self, step: usize, reads: usize, writes: usize) -> Operation {
        let is_read = match self {
            Sequence::ReadsThenWrites => step < reads,
            Sequence::WritesThenReads => step >= writes,
            Sequence::Interleaved => step % 2 == 0,
        };
        if is_read {
            Operation::Read
        } else {
            Operation::Write
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sequence {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rw" => Ok(Sequence::ReadsThenWrites),
            "wr" => Ok(Sequence::WritesThenReads),
            "interleaved" | "intercalado" | "alt" => Ok(Sequence::Interleaved),
            other => Err(StoreError::InvalidConfig {
                reason: format!("unknown sequence '{other}' (expected rw, wr or interleaved)"),
            }),
        }
    }
}

/// Workload shared by every client of a run.
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    /// Reads per client.
    pub reads: usize,
    /// Writes per client.
    pub writes: usize,
    /// Operation order.
    pub sequence: Sequence,
}

impl Workload {
    /// Total requests each client sends.
    pub fn total(&self) -> usize {
        self.reads + self.writes
    }

    /// Requests for one client starting at `start`, advancing one cell per
    /// request and wrapping at `len`.
    pub fn plan(&self, start: i64, len: i64) -> Vec<Request> {
        let mut pos = start;
        (0..self.total())
            .map(|step| {
                let request = Request {
                    op: self.sequence.operation(step, self.reads, self.writes),
                    index: pos,
                };
                pos = (pos + 1) % len;
                request
            })
            .collect()
    }
}

/// Result of one client session.
#[derive(Debug, Clone, Serialize)]
pub struct ClientOutcome {
    /// Client number within the run.
    pub client: usize,
    /// Vector size announced by the server.
    pub vector_size: i64,
    /// First index the client touched.
    pub start: i64,
    /// Replies carrying a value.
    pub replies: u64,
    /// Replies starting with `ERROR`.
    pub errors: u64,
    /// Write count in the final report.
    pub counter: u64,
    /// Sum in the final report.
    pub sum: i64,
    /// Wall time for the whole session in milliseconds.
    pub elapsed_ms: u64,
}

/// Runs one client session against `addr`.
pub async fn run_client(
    addr: SocketAddr,
    client: usize,
    workload: Workload,
) -> StoreResult<ClientOutcome> {
    let started = Instant::now();
    let stream = TcpStream::connect(addr).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let greeting = expect_line(lines.next_line().await?, "vector size")?;
    let vector_size = parse_number::<i64>(&greeting, "vector size")?;
    if vector_size <= 0 {
        return Err(StoreError::InvalidSize { size: vector_size });
    }

    let start = rand::thread_rng().gen_range(0..vector_size);
    let plan = workload.plan(start, vector_size);

    writer
        .write_all(format!("{}\n", plan.len()).as_bytes())
        .await?;

    let mut replies = 0;
    let mut errors = 0;
    for request in &plan {
        writer.write_all(format!("{request}\n").as_bytes()).await?;
        let reply = expect_line(lines.next_line().await?, "reply")?;
        debug!(%request, %reply, "reply received");
        if reply.starts_with("ERROR") {
            errors += 1;
        } else {
            replies += 1;
        }
    }

    let counter = expect_line(lines.next_line().await?, "counter")?;
    let counter = parse_number::<u64>(&counter, "counter")?;
    let sum = expect_line(lines.next_line().await?, "sum")?;
    let sum = parse_number::<i64>(&sum, "sum")?;

    Ok(ClientOutcome {
        client,
        vector_size,
        start,
        replies,
        errors,
        counter,
        sum,
        elapsed_ms: duration_ms(started.elapsed()),
    })
}

/// Runs `clients` concurrent sessions and returns every outcome, in client order.
///
/// A failed client is reported as its error; the others keep going.
pub async fn run_clients(
    addr: SocketAddr,
    clients: usize,
    workload: Workload,
) -> Vec<StoreResult<ClientOutcome>> {
    let handles: Vec<_> = (0..clients)
        .map(|client| {
            let span = info_span!("client", client);
            tokio::spawn(run_client(addr, client, workload).instrument(span))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(clients);
    for handle in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join) => Err(StoreError::protocol(format!("client task failed: {join}"))),
        };
        outcomes.push(outcome);
    }
    outcomes
}

/// Writes outcomes to a CSV file with a header row.
pub fn export_csv(outcomes: &[ClientOutcome], path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for outcome in outcomes {
        writer.serialize(outcome)?;
    }
    writer.flush()?;
    Ok(())
}

/// Summary across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Clients that completed.
    pub completed: usize,
    /// Clients that failed.
    pub failed: usize,
    /// Highest write count reported by any client.
    pub counter: u64,
    /// Sum reported alongside that write count.
    pub sum: i64,
}

impl RunSummary {
    /// Summarises a run. The report with the highest counter is the latest one.
    pub fn from_outcomes(outcomes: &[StoreResult<ClientOutcome>]) -> Self {
        let mut summary = RunSummary {
            completed: 0,
            failed: 0,
            counter: 0,
            sum: 0,
        };
        for outcome in outcomes {
            match outcome {
                Ok(done) => {
                    summary.completed += 1;
                    if done.counter >= summary.counter {
                        summary.counter = done.counter;
                        summary.sum = done.sum;
                    }
                }
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

fn expect_line(line: Option<String>, what: &str) -> StoreResult<String> {
    line.ok_or_else(|| StoreError::protocol(format!("server closed before sending {what}")))
}

fn parse_number<T: FromStr>(line: &str, what: &str) -> StoreResult<T> {
    line.trim()
        .parse()
        .map_err(|_| StoreError::protocol(format!("expected {what}, got {line:?}")))
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(plan: &[Request]) -> String {
        plan.iter()
            .map(|request| match request.op {
                Operation::Read => 'R',
                Operation::Write => 'W',
            })
            .collect()
    }

    #[test]
    fn test_sequences_order_operations() {
        let rw = Workload {
            reads: 3,
            writes: 2,
            sequence: Sequence::ReadsThenWrites,
        };
        assert_eq!(ops(&rw.plan(0, 10)), "RRRWW");

        let wr = Workload {
            sequence: Sequence::WritesThenReads,
            ..rw
        };
        assert_eq!(ops(&wr.plan(0, 10)), "WWRRR");

        let interleaved = Workload {
            sequence: Sequence::Interleaved,
            ..rw
        };
        assert_eq!(ops(&interleaved.plan(0, 10)), "RWRWR");
    }

    #[test]
    fn test_plan_wraps_positions() {
        let workload = Workload {
            reads: 2,
            writes: 2,
            sequence: Sequence::ReadsThenWrites,
        };
        let indices: Vec<i64> = workload.plan(3, 5).iter().map(|r| r.index).collect();
        assert_eq!(indices, [3, 4, 0, 1]);
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!("RW".parse::<Sequence>().unwrap(), Sequence::ReadsThenWrites);
        assert_eq!("wr".parse::<Sequence>().unwrap(), Sequence::WritesThenReads);
        assert_eq!(
            "Interleaved".parse::<Sequence>().unwrap(),
            Sequence::Interleaved
        );
        assert!("zigzag".parse::<Sequence>().is_err());
    }

    #[test]
    fn test_summary_keeps_latest_report() {
        let outcome = |counter, sum| ClientOutcome {
            client: 0,
            vector_size: 10,
            start: 0,
            replies: 0,
            errors: 0,
            counter,
            sum,
            elapsed_ms: 1,
        };
        let outcomes = vec![
            Ok(outcome(4, 4)),
            Err(StoreError::protocol("boom")),
            Ok(outcome(9, 8)),
            Ok(outcome(6, 6)),
        ];
        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!((summary.counter, summary.sum), (9, 8));
    }

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.csv");
        let outcomes = [ClientOutcome {
            client: 2,
            vector_size: 10,
            start: 7,
            replies: 4,
            errors: 1,
            counter: 3,
            sum: 3,
            elapsed_ms: 12,
        }];
        export_csv(&outcomes, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("client,vector_size,start,replies,errors,counter,sum,elapsed_ms")
        );
        assert_eq!(lines.next(), Some("2,10,7,4,1,3,3,12"));
    }
}
