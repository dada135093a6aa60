pub mod command;

use crate::context::ProcessingContext;

pub use command::{CommandProcessor, ProcessorDiag};

/// One external processing routine. Implementations launch whatever does the
/// actual work; the orchestrator only cares about the verdict.
pub trait Processor {
    fn process(&self, ctx: &ProcessingContext) -> Verdict;
}

#[derive(Debug, Clone)]
pub struct Verdict {
    pub status: ProcessStatus,
    pub diagnostic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Succeeded,
    Failed,
    TimedOut,
    Interrupted,
}

impl Verdict {
    pub fn succeeded(&self) -> bool {
        self.status == ProcessStatus::Succeeded
    }
}
