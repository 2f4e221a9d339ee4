//! Outcome of one readiness evaluation

use crate::common::Error;

/// Result of judging a component (or the whole cluster) on one tick.
///
/// `NotReady` is always retried on the next tick. `Error` carries a defect
/// that waiting cannot fix and stops the poller.
#[derive(Debug)]
pub enum Verdict {
    Ready,
    NotReady(String),
    Error(Error),
}

impl Verdict {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Verdict::NotReady(reason.into())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Verdict::Ready)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    /// Reason for a non-ready verdict, if any.
    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Ready => None,
            Verdict::NotReady(reason) => Some(reason.clone()),
            Verdict::Error(e) => Some(e.to_string()),
        }
    }
}

impl From<Error> for Verdict {
    fn from(e: Error) -> Self {
        if e.is_fatal() {
            Verdict::Error(e)
        } else {
            Verdict::NotReady(e.to_string())
        }
    }
}
