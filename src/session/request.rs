//! Request and reply lines.

use core::fmt;
use core::str::FromStr;

use crate::error::StoreError;

/// The two operations a client can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read a cell.
    Read,
    /// Increment a cell.
    Write,
}

impl Operation {
    /// Wire keyword for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "READ",
            Operation::Write => "WRITE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed `<OP> <index>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// What to do.
    pub op: Operation,
    /// Which cell. Range is checked by the store, not the parser.
    pub index: i64,
}

impl Request {
    /// Builds a `READ <index>` request.
    pub fn read(index: i64) -> Self {
        Self {
            op: Operation::Read,
            index,
        }
    }

    /// Builds a `WRITE <index>` request.
    pub fn write(index: i64) -> Self {
        Self {
            op: Operation::Write,
            index,
        }
    }
}

impl FromStr for Request {
    type Err = StoreError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || StoreError::MalformedRequest {
            line: line.to_string(),
        };

        let mut tokens = line.split_whitespace();
        let (Some(op), Some(index), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(malformed());
        };

        let op = if op.eq_ignore_ascii_case("READ") {
            Operation::Read
        } else if op.eq_ignore_ascii_case("WRITE") {
            Operation::Write
        } else {
            return Err(malformed());
        };
        let index = index.parse::<i64>().map_err(|_| malformed())?;

        Ok(Request { op, index })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.index)
    }
}

/// One server reply line.
#[derive(Debug)]
pub enum Reply {
    /// `READ <index>: <value>`
    Read {
        /// Cell read.
        index: i64,
        /// Value observed.
        value: i64,
    },
    /// `WRITE <index>: <value>`
    Write {
        /// Cell written.
        index: i64,
        /// Value after the increment.
        value: i64,
    },
    /// `ERROR <reason>`
    Error(StoreError),
}

impl Reply {
    /// Returns `true` for error replies.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Read { index, value } => write!(f, "READ {index}: {value}"),
            Reply::Write { index, value } => write!(f, "WRITE {index}: {value}"),
            Reply::Error(err) => write!(f, "ERROR {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("READ 3".parse::<Request>().unwrap(), Request::read(3));
        assert_eq!("write 7".parse::<Request>().unwrap(), Request::write(7));
        assert_eq!("WrItE -1".parse::<Request>().unwrap(), Request::write(-1));
        assert_eq!("  READ   12  ".parse::<Request>().unwrap(), Request::read(12));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        for line in [
            "",
            "READ",
            "WRITE abc",
            "READ 1 2",
            "DELETE 1",
            "READ 1.5",
            "READ 99999999999999999999",
        ] {
            match line.parse::<Request>() {
                Err(StoreError::MalformedRequest { line: got }) => assert_eq!(got, line),
                other => panic!("expected malformed for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_reply_lines() {
        assert_eq!(Reply::Read { index: 2, value: 5 }.to_string(), "READ 2: 5");
        assert_eq!(Reply::Write { index: 0, value: 1 }.to_string(), "WRITE 0: 1");

        let out_of_range = Reply::Error(StoreError::IndexOutOfRange { index: 10, len: 10 });
        assert_eq!(out_of_range.to_string(), "ERROR index 10 out of range [0, 10)");
        assert!(out_of_range.is_error());

        let malformed = Reply::Error(StoreError::MalformedRequest {
            line: "WRITE abc".to_string(),
        });
        assert_eq!(
            malformed.to_string(),
            "ERROR malformed request: \"WRITE abc\""
        );
    }
}
