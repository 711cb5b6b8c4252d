// How accepted connections are handed to workers

use core::fmt;
use core::num::NonZeroUsize;
use std::sync::Arc;

use counter_store::{StoreError, StoreResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default bound on concurrent sessions for [`DispatchPolicy::Pooled`].
pub const DEFAULT_MAX_SESSIONS: usize = 5;

/// Assignment of accepted connections to workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// One task per connection, no upper bound.
    #[default]
    Spawn,
    /// One task per connection, at most `max_sessions` at a time. Further
    /// connections wait in the listen backlog.
    Pooled {
        /// Concurrent session limit.
        max_sessions: NonZeroUsize,
    },
    /// Sessions run one after another on the accept loop.
    Inline,
}

impl DispatchPolicy {
    /// Parses a policy name. `max_sessions` is only used by `pooled`.
    pub fn parse(name: &str, max_sessions: usize) -> StoreResult<Self> {
        match name.to_lowercase().as_str() {
            "spawn" | "task" | "thread" => Ok(DispatchPolicy::Spawn),
            "pooled" | "pool" | "process" => {
                let max_sessions =
                    NonZeroUsize::new(max_sessions).ok_or_else(|| StoreError::InvalidConfig {
                        reason: "--max-sessions must be at least 1".to_string(),
                    })?;
                Ok(DispatchPolicy::Pooled { max_sessions })
            }
            "inline" | "sequential" => Ok(DispatchPolicy::Inline),
            other => Err(StoreError::InvalidConfig {
                reason: format!("unknown dispatch policy '{other}'"),
            }),
        }
    }

    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchPolicy::Spawn => "spawn",
            DispatchPolicy::Pooled { .. } => "pooled",
            DispatchPolicy::Inline => "inline",
        }
    }

    pub(crate) fn gate(&self) -> Gate {
        match self {
            DispatchPolicy::Pooled { max_sessions } => {
                Gate::Bounded(Arc::new(Semaphore::new(max_sessions.get())))
            }
            DispatchPolicy::Spawn | DispatchPolicy::Inline => Gate::Open,
        }
    }
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPolicy::Pooled { max_sessions } => write!(f, "pooled({max_sessions})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Admission control for the accept loop.
#[derive(Debug, Clone)]
pub(crate) enum Gate {
    Open,
    Bounded(Arc<Semaphore>),
}

impl Gate {
    /// Waits for a free slot. `None` means the gate does not limit sessions.
    pub(crate) async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        match self {
            Gate::Open => None,
            // Never closed.
            Gate::Bounded(slots) => slots.clone().acquire_owned().await.ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policies() {
        assert_eq!(DispatchPolicy::parse("spawn", 5).unwrap(), DispatchPolicy::Spawn);
        assert_eq!(DispatchPolicy::parse("INLINE", 5).unwrap(), DispatchPolicy::Inline);
        assert_eq!(
            DispatchPolicy::parse("pooled", 3).unwrap(),
            DispatchPolicy::Pooled {
                max_sessions: NonZeroUsize::new(3).unwrap()
            }
        );
        assert!(matches!(
            DispatchPolicy::parse("pooled", 0),
            Err(StoreError::InvalidConfig { .. })
        ));
        assert!(DispatchPolicy::parse("forked", 1).is_err());
    }

    #[tokio::test]
    async fn test_bounded_gate_limits_permits() {
        let gate = DispatchPolicy::parse("pooled", 2).unwrap().gate();
        let first = gate.admit().await;
        let second = gate.admit().await;
        assert!(first.is_some() && second.is_some());

        let Gate::Bounded(slots) = &gate else {
            panic!("pooled policy must be bounded");
        };
        assert_eq!(slots.available_permits(), 0);
        drop(first);
        assert_eq!(slots.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_open_gate() {
        assert!(DispatchPolicy::Spawn.gate().admit().await.is_none());
        assert!(DispatchPolicy::Inline.gate().admit().await.is_none());
    }
}
