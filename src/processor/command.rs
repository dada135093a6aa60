use super::{ProcessStatus, Processor, Verdict};
use crate::{config::Config, context::ProcessingContext, discover::DiscoveredSet};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

enum Waited {
    Finished(Output),
    TimedOut,
    Interrupted,
}

/// Runs one category's external script as a child process. The context's
/// variables are merged over a copy of the inherited environment, so no
/// invocation can observe another's overrides.
pub struct CommandProcessor {
    name: &'static str,
    python_exe: PathBuf,
    script: PathBuf,
    scripts_dir: PathBuf,
    extra_env: BTreeMap<String, String>,
    timeout: Duration,
    log_stderr: bool,
    interrupt: Arc<AtomicBool>,
}

impl CommandProcessor {
    pub fn image(cfg: &Config, interrupt: Arc<AtomicBool>) -> Result<Self> {
        Self::new(cfg, "image", &cfg.processors.image_script, interrupt)
    }

    pub fn document(cfg: &Config, interrupt: Arc<AtomicBool>) -> Result<Self> {
        Self::new(cfg, "pdf", &cfg.processors.pdf_script, interrupt)
    }

    /// Build processors only for the categories that have work, so a missing
    /// script for an absent category cannot abort the batch.
    pub fn for_discovered(
        cfg: &Config,
        files: &DiscoveredSet,
        interrupt: Arc<AtomicBool>,
    ) -> Result<(Option<Self>, Option<Self>)> {
        let image = if files.images.is_empty() {
            None
        } else {
            Some(Self::image(cfg, interrupt.clone())?)
        };
        let document = if files.documents.is_empty() {
            None
        } else {
            Some(Self::document(cfg, interrupt)?)
        };
        Ok((image, document))
    }

    fn new(
        cfg: &Config,
        name: &'static str,
        script_name: &str,
        interrupt: Arc<AtomicBool>,
    ) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.processors.scripts_dir);
        let script = scripts_dir.join(script_name);
        if !script.exists() {
            return Err(anyhow!("missing processor script: {}", script.display()));
        }
        Ok(Self {
            name,
            python_exe: resolve_python_exe(&cfg.processors.python_exe),
            script,
            scripts_dir,
            extra_env: cfg.processors.env.clone(),
            timeout: Duration::from_secs(cfg.processors.timeout_seconds),
            log_stderr: cfg.debug.keep_processor_stderr,
            interrupt,
        })
    }
}

impl Processor for CommandProcessor {
    fn process(&self, ctx: &ProcessingContext) -> Verdict {
        debug!(
            "{} processor: {} -> {}",
            self.name,
            ctx.file.path.display(),
            ctx.destination_dir.display()
        );

        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.script);
        cmd.current_dir(&self.scripts_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.extra_env {
            cmd.env(k, v);
        }
        for (k, v) in &ctx.env {
            cmd.env(k, v);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return Verdict {
                    status: ProcessStatus::Failed,
                    diagnostic: format!("failed to launch {}: {err}", self.script.display()),
                };
            }
        };

        match wait_with_timeout(&mut child, self.timeout, &self.interrupt) {
            Ok(Waited::Finished(output)) => self.verdict_from_output(output),
            Ok(Waited::TimedOut) => Verdict {
                status: ProcessStatus::TimedOut,
                diagnostic: format!(
                    "processing timed out after {}s",
                    self.timeout.as_secs()
                ),
            },
            Ok(Waited::Interrupted) => Verdict {
                status: ProcessStatus::Interrupted,
                diagnostic: "interrupted by user".to_string(),
            },
            Err(err) => Verdict {
                status: ProcessStatus::Failed,
                diagnostic: format!("{err:#}"),
            },
        }
    }
}

impl CommandProcessor {
    fn verdict_from_output(&self, output: Output) -> Verdict {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            if self.log_stderr && !stderr.trim().is_empty() {
                debug!("{} processor stderr: {}", self.name, stderr.trim());
            }
            return Verdict {
                status: ProcessStatus::Succeeded,
                diagnostic: stdout,
            };
        }

        let diagnostic = if !stderr.trim().is_empty() {
            stderr
        } else if !stdout.trim().is_empty() {
            stdout
        } else {
            format!("processor exited with {}", output.status)
        };

        Verdict {
            status: ProcessStatus::Failed,
            diagnostic,
        }
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() {
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    interrupt: &AtomicBool,
) -> Result<Waited> {
    // Drain pipes while waiting so a chatty processor can't deadlock itself
    // on a full stdout/stderr buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Waited::Finished(Output {
                status,
                stdout,
                stderr,
            }));
        }

        if interrupt.load(Ordering::SeqCst) {
            warn!("interrupt received; terminating in-flight processor");
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_thread.join();
            let _ = stderr_thread.join();
            return Ok(Waited::Interrupted);
        }

        if start.elapsed() > timeout {
            warn!("processor timed out after {:?}", timeout);
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_thread.join();
            let _ = stderr_thread.join();
            return Ok(Waited::TimedOut);
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessorDiag {
    pub python_exe: String,
    pub scripts_dir: String,
    pub image_script: String,
    pub image_script_found: bool,
    pub pdf_script: String,
    pub pdf_script_found: bool,
    pub timeout_seconds: u64,
}

/// Setup check for the `doctor` subcommand; reports rather than fails.
pub fn diagnose(cfg: &Config) -> ProcessorDiag {
    let scripts_dir = PathBuf::from(&cfg.processors.scripts_dir);
    let image = scripts_dir.join(&cfg.processors.image_script);
    let pdf = scripts_dir.join(&cfg.processors.pdf_script);
    ProcessorDiag {
        python_exe: resolve_python_exe(&cfg.processors.python_exe)
            .display()
            .to_string(),
        scripts_dir: scripts_dir.display().to_string(),
        image_script: image.display().to_string(),
        image_script_found: image.exists(),
        pdf_script: pdf.display().to_string(),
        pdf_script_found: pdf.exists(),
        timeout_seconds: cfg.processors.timeout_seconds,
    }
}
