/*!
report.rs - what happened to one input line.

`Dispatcher::execute` never returns an error; instead every candidate it
attempted is recorded here with its outcome. Reports serialize to JSON for
the CLI's `--json` mode.

JSON shape:
{
  "line": "heal",
  "head": "heal",
  "attempts": [
    { "command": "heal", "priority": 10,
      "outcome": { "status": "rejected",
                   "reason": { "kind": "precondition_failed", ... } } },
    { "command": "heal", "priority": 5, "outcome": { "status": "invoked" } }
  ]
}
*/

use serde::Serialize;
use std::fmt;

/// Why a candidate was skipped before its handler ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    PreconditionFailed {
        /// Index of the first failing precondition.
        index: usize,
        failed: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        cooldown: Option<CooldownState>,
    },
    ArityMismatch {
        expected: usize,
        got: usize,
    },
    ParseFailure {
        param: String,
        expected_type: String,
        token: String,
    },
    EnsureFailure {
        param: String,
        error: String,
    },
}

/// Snapshot of a blocking cooldown at rejection time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CooldownState {
    pub remaining_uses: u32,
    pub reset_in_ms: u64,
    pub message: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::PreconditionFailed {
                cooldown: Some(cd), ..
            } => write!(
                f,
                "on cooldown ({} uses left, resets in {}ms)",
                cd.remaining_uses, cd.reset_in_ms
            ),
            Rejection::PreconditionFailed { index, failed, .. } => {
                write!(f, "{failed} precondition(s) failed (first at #{index})")
            }
            Rejection::ArityMismatch { expected, got } => {
                write!(f, "expected {expected} argument(s), got {got}")
            }
            Rejection::ParseFailure {
                param,
                expected_type,
                token,
            } => write!(f, "'{token}' is not a valid {expected_type} for <{param}>"),
            Rejection::EnsureFailure { param, error } => {
                write!(f, "<{param}> rejected: {error}")
            }
        }
    }
}

/// Final state of one attempted candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Synchronous handler ran to completion.
    Invoked,
    /// Suspending handler handed to the scheduler.
    Scheduled,
    Rejected { reason: Rejection },
    /// Handler returned an error or panicked; already logged.
    Failed { error: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Invoked | Outcome::Scheduled)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Invoked => f.write_str("invoked"),
            Outcome::Scheduled => f.write_str("scheduled"),
            Outcome::Rejected { reason } => write!(f, "rejected: {reason}"),
            Outcome::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub command: String,
    pub priority: i32,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub line: String,
    pub head: String,
    pub attempts: Vec<Attempt>,
}

impl DispatchReport {
    pub fn new(line: &str, head: &str) -> Self {
        Self {
            line: line.to_string(),
            head: head.to_string(),
            attempts: Vec::new(),
        }
    }

    /// No registered command carried the head token's name.
    pub fn is_no_match(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Number of handlers that ran or were scheduled.
    pub fn successes(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome.is_success())
            .count()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.attempts.iter().map(|a| &a.outcome)
    }
}
