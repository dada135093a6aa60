use crate::{cleanup::CleanupReport, discover::DiscoveredSet, ledger::RunLedger};
use serde::Serialize;

/// Final accounting for one batch. Built once from the ledger after the run;
/// reading it has no side effects on any other component.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub images_discovered: usize,
    pub documents_discovered: usize,
    pub total_discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// None when deletion was not requested for this run.
    pub deleted: Option<usize>,
    pub failed_files: Vec<String>,
    pub failures_not_listed: usize,
    pub started: String,
    pub finished: String,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn build(
        files: &DiscoveredSet,
        ledger: &RunLedger,
        cleanup: Option<&CleanupReport>,
        max_failures_listed: usize,
        started: String,
        finished: String,
        interrupted: bool,
    ) -> Self {
        let failures = ledger.failures();
        let failed_files: Vec<String> = failures
            .iter()
            .take(max_failures_listed)
            .map(|o| o.file.file_name())
            .collect();
        let failures_not_listed = failures.len().saturating_sub(failed_files.len());

        Self {
            images_discovered: files.images.len(),
            documents_discovered: files.documents.len(),
            total_discovered: files.total(),
            succeeded: ledger.successes().len(),
            failed: failures.len(),
            deleted: cleanup.map(|c| c.deleted),
            failed_files,
            failures_not_listed,
            started,
            finished,
            interrupted,
        }
    }

    pub fn render(&self) -> String {
        let bar = "=".repeat(70);
        let mut out = String::new();
        out.push_str(&format!("{bar}\nProcessing Summary\n{bar}\n"));
        out.push_str(&format!(
            "  Discovered: {} image(s), {} document(s) [{} total]\n",
            self.images_discovered, self.documents_discovered, self.total_discovered
        ));
        out.push_str(&format!(
            "  Succeeded:  {}/{}\n",
            self.succeeded, self.total_discovered
        ));
        if let Some(deleted) = self.deleted {
            out.push_str(&format!("  Deleted:    {deleted}\n"));
        }
        if self.failed > 0 {
            out.push_str(&format!("  Failed:     {}\n", self.failed));
            for name in &self.failed_files {
                out.push_str(&format!("    - {name}\n"));
            }
            if self.failures_not_listed > 0 {
                out.push_str(&format!(
                    "    ({} more not listed)\n",
                    self.failures_not_listed
                ));
            }
        }
        if self.interrupted {
            out.push_str("  Interrupted before all files were processed\n");
        }
        out.push_str(&bar);
        out
    }
}
