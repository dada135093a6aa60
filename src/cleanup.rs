use crate::ledger::RunLedger;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: Vec<DeletionFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Remove the source file behind every successful outcome. Best-effort per
/// file: a failed deletion is logged and counted, never aborts the pass, and
/// never reclassifies the processing success. Works off the ledger only; the
/// input directory is not re-scanned.
pub fn delete_sources(ledger: &RunLedger) -> CleanupReport {
    let mut report = CleanupReport::default();

    for outcome in ledger.successes() {
        match std::fs::remove_file(&outcome.file.path) {
            Ok(()) => {
                report.deleted += 1;
                info!("deleted: {}", outcome.file.file_name());
            }
            Err(err) => {
                warn!("failed to delete {}: {err}", outcome.file.path.display());
                report.failed.push(DeletionFailure {
                    path: outcome.file.path.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    report
}
