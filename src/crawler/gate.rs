//! Incremental stop decision
//!
//! Pages are visited newest first. After a page has been processed the gate looks at
//! the start date of the next, older page: once that date falls before the cutoff
//! every remaining page is older still, so the list is done.

use chrono::{DateTime, Utc};

/// Outcome of observing the next page's start date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Process the next page
    Continue,
    /// Stop this list; the next page starts before the cutoff
    Stop { next_start: DateTime<Utc> },
}

/// Per-list cutoff state
#[derive(Debug, Clone)]
pub struct IncrementalGate {
    cutoff: Option<DateTime<Utc>>,
    stopped: bool,
}

impl IncrementalGate {
    /// A gate without a cutoff never stops
    pub fn new(cutoff: Option<DateTime<Utc>>) -> Self {
        Self {
            cutoff,
            stopped: false,
        }
    }

    /// Whether the next page's start date is needed at all
    pub fn needs_lookahead(&self) -> bool {
        self.cutoff.is_some() && !self.stopped
    }

    /// Decides whether to go on to the page starting at `next_start`
    ///
    /// A page starting exactly at the cutoff is still processed.
    pub fn observe(&mut self, next_start: DateTime<Utc>) -> GateDecision {
        match self.cutoff {
            Some(cutoff) if next_start < cutoff => {
                self.stopped = true;
                GateDecision::Stop { next_start }
            }
            _ => GateDecision::Continue,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
