use crate::{
    config::BatchRequest,
    context,
    discover::{DiscoveredSet, FileCategory},
    ledger::{Outcome, RunLedger},
    processor::{ProcessStatus, Processor, Verdict},
    util::truncate_for_display,
};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct BatchResult {
    pub ledger: RunLedger,
    pub interrupted: bool,
}

/// Sequential driver for one batch: builds a context per file, invokes the
/// matching processor, and records exactly one outcome per file reached.
/// One child process at a time; the ledger is touched only from this loop.
pub struct BatchRunner<P: Processor> {
    image: Option<P>,
    document: Option<P>,
    interrupt: Arc<AtomicBool>,
}

impl<P: Processor> BatchRunner<P> {
    pub fn new(image: Option<P>, document: Option<P>, interrupt: Arc<AtomicBool>) -> Self {
        Self {
            image,
            document,
            interrupt,
        }
    }

    pub fn run(&self, request: &BatchRequest, files: &DiscoveredSet) -> Result<BatchResult> {
        let total = files.total();
        let mut ledger = RunLedger::new();
        let mut interrupted = false;

        info!(
            "processing {} image(s), {} document(s) [{} total]",
            files.images.len(),
            files.documents.len(),
            total
        );

        for (idx, file) in files.iter().enumerate() {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!("interrupt received; stopping before remaining files");
                interrupted = true;
                break;
            }

            info!("[{}/{}] {}", idx + 1, total, file.file_name());

            let ctx = match context::build(file, &request.output_dir) {
                Ok(ctx) => ctx,
                Err(err) => {
                    error!("  failed: {err:#}");
                    ledger.record(Outcome {
                        file: file.clone(),
                        succeeded: false,
                        diagnostic: format!("{err:#}"),
                    });
                    continue;
                }
            };

            let processor = match file.category {
                FileCategory::Image => self.image.as_ref(),
                FileCategory::Document => self.document.as_ref(),
            };
            let verdict = match processor {
                Some(p) => p.process(&ctx),
                None => Verdict {
                    status: ProcessStatus::Failed,
                    diagnostic: "no processor configured for this category".to_string(),
                },
            };

            match verdict.status {
                ProcessStatus::Succeeded => info!("  completed"),
                ProcessStatus::TimedOut => error!("  failed: {}", verdict.diagnostic),
                ProcessStatus::Failed => error!(
                    "  failed: {}",
                    truncate_for_display(&verdict.diagnostic, 100)
                ),
                ProcessStatus::Interrupted => {
                    warn!("  interrupted");
                    interrupted = true;
                }
            }

            ledger.record(Outcome {
                file: file.clone(),
                succeeded: verdict.succeeded(),
                diagnostic: verdict.diagnostic,
            });

            if interrupted {
                break;
            }
        }

        Ok(BatchResult {
            ledger,
            interrupted,
        })
    }
}
