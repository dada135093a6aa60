use crate::discover::DiscoveredFile;
use serde::Serialize;

/// Result of processing one file. Immutable once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub file: DiscoveredFile,
    pub succeeded: bool,
    pub diagnostic: String,
}

/// Append-only accumulation of outcomes for one batch, partitioned as they
/// arrive. Cleanup and the summary read it; nothing ever removes or rewrites
/// a recorded outcome.
#[derive(Debug, Default)]
pub struct RunLedger {
    successes: Vec<Outcome>,
    failures: Vec<Outcome>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        if outcome.succeeded {
            self.successes.push(outcome);
        } else {
            self.failures.push(outcome);
        }
    }

    pub fn successes(&self) -> &[Outcome] {
        &self.successes
    }

    pub fn failures(&self) -> &[Outcome] {
        &self.failures
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}
