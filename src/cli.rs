use crate::{
    batch::BatchRunner,
    cleanup,
    config::{self, Config, EnvOverrides},
    discover,
    processor::{self, CommandProcessor},
    summary::RunSummary,
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "ocr-batch")]
#[command(about = "Folder batch orchestrator for external OCR processors (images + PDFs)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./ocr-batch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the processor scripts and interpreter are in place.
    Doctor {},
    /// List the files a run would process, without touching anything.
    Scan {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Process every image and PDF in the input directory.
    ///
    /// Sources that process successfully are DELETED afterwards unless
    /// --no-delete is given or cleanup.delete_on_success is false.
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep successfully processed source files.
        #[arg(long)]
        no_delete: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            doctor(&cfg)
        }
        Command::Scan { input } => {
            let _guard = init_logging(&args, &cfg, None)?;
            scan(&cfg, input.as_deref())
        }
        Command::Run {
            input,
            output,
            no_delete,
        } => run(&args, &cfg, input.as_deref(), output.as_deref(), *no_delete),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("ocr-batch.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("ocr-batch.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let diag = processor::command::diagnose(cfg);
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn scan(cfg: &Config, input: Option<&Path>) -> Result<()> {
    let env = EnvOverrides::from_process_env();
    let input_dir = config::resolve_input_dir(input, &env, cfg)?;
    let files = discover::discover(&input_dir)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input_dir": input_dir,
            "images": files.images,
            "documents": files.documents,
            "total": files.total(),
        }))?
    );
    Ok(())
}

fn run(
    args: &Args,
    cfg: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    no_delete: bool,
) -> Result<()> {
    let env = EnvOverrides::from_process_env();
    let request = config::resolve_request(input, output, no_delete, &env, cfg)?;

    ensure_dir(&request.output_dir)?;

    let log_path = resolve_log_path(cfg, &request.output_dir);
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!(
        "input={} output={} delete_on_success={}",
        request.input_dir.display(),
        request.output_dir.display(),
        request.delete_on_success
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(request.output_dir.join("effective-config.toml"), raw)?;
    }

    let files = discover::discover(&request.input_dir)?;
    if files.is_empty() {
        info!("no files to process");
        return Ok(());
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupt.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .with_context(|| "installing interrupt handler")?;
    }

    let (image, document) = CommandProcessor::for_discovered(cfg, &files, interrupt.clone())?;
    let runner = BatchRunner::new(image, document, interrupt);

    let started = now_rfc3339();
    let result = runner.run(&request, &files)?;

    let cleanup_report = if request.delete_on_success && !result.interrupted {
        Some(cleanup::delete_sources(&result.ledger))
    } else {
        if result.interrupted && request.delete_on_success {
            warn!("run interrupted; skipping source cleanup");
        }
        None
    };

    let summary = RunSummary::build(
        &files,
        &result.ledger,
        cleanup_report.as_ref(),
        cfg.summary.max_failures_listed,
        started,
        now_rfc3339(),
        result.interrupted,
    );

    if cfg.summary.print_text {
        println!("{}", summary.render());
        println!("Results saved to: {}", request.output_dir.display());
    }
    if cfg.summary.print_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if result.interrupted {
        bail!("run interrupted by user");
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, output_dir: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(output_dir.join("ocr-batch.log"))
}
