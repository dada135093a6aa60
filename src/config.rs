use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted when a path is not given on the command
/// line. Config file values are the final fallback.
pub const ENV_INPUT_DIR: &str = "OCR_BATCH_INPUT_DIR";
pub const ENV_OUTPUT_DIR: &str = "OCR_BATCH_OUTPUT_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub processors: Processors,
    #[serde(default)]
    pub cleanup: Cleanup,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Default::default(),
            processors: Default::default(),
            cleanup: Default::default(),
            summary: Default::default(),
            logging: Default::default(),
            debug: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub input_dir: String,
    pub output_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            input_dir: "".into(),
            output_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Processors {
    pub python_exe: String,
    pub scripts_dir: String,
    pub image_script: String,
    pub pdf_script: String,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Processors {
    fn default() -> Self {
        Self {
            python_exe: "python3".into(),
            scripts_dir: "scripts".into(),
            image_script: "run_ocr_image.py".into(),
            pdf_script: "run_ocr_pdf.py".into(),
            timeout_seconds: 3600,
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cleanup {
    pub delete_on_success: bool,
}
impl Default for Cleanup {
    fn default() -> Self {
        Self {
            delete_on_success: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub print_text: bool,
    pub print_json: bool,
    pub max_failures_listed: usize,
}
impl Default for Summary {
    fn default() -> Self {
        Self {
            print_text: true,
            print_json: false,
            max_failures_listed: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub keep_processor_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_processor_stderr: true,
            dump_effective_config: false,
        }
    }
}

/// Effective parameters for one batch, immutable once resolved.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub delete_on_success: bool,
}

/// Environment-level path overrides, separated from the process environment
/// so resolution stays testable.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub input_dir: Option<String>,
    pub output_dir: Option<String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        Self {
            input_dir: std::env::var(ENV_INPUT_DIR).ok(),
            output_dir: std::env::var(ENV_OUTPUT_DIR).ok(),
        }
    }
}

/// Resolve the batch request field by field: CLI argument, then environment
/// variable, then config file. Empty strings count as unset at every level.
pub fn resolve_request(
    cli_input: Option<&Path>,
    cli_output: Option<&Path>,
    no_delete: bool,
    env: &EnvOverrides,
    cfg: &Config,
) -> Result<BatchRequest> {
    let input_dir = resolve_input_dir(cli_input, env, cfg)?;

    let Some(output_dir) =
        resolve_path(cli_output, env.output_dir.as_deref(), &cfg.paths.output_dir)
    else {
        bail!(
            "no output directory: pass --output, set {}, or set paths.output_dir in the config",
            ENV_OUTPUT_DIR
        );
    };

    Ok(BatchRequest {
        input_dir,
        output_dir,
        delete_on_success: cfg.cleanup.delete_on_success && !no_delete,
    })
}

/// Input-only resolution, for commands that never write anything.
pub fn resolve_input_dir(
    cli_input: Option<&Path>,
    env: &EnvOverrides,
    cfg: &Config,
) -> Result<PathBuf> {
    let Some(input_dir) = resolve_path(cli_input, env.input_dir.as_deref(), &cfg.paths.input_dir)
    else {
        bail!(
            "no input directory: pass --input, set {}, or set paths.input_dir in the config",
            ENV_INPUT_DIR
        );
    };

    if !input_dir.is_dir() {
        bail!("input path is not a directory: {}", input_dir.display());
    }

    Ok(input_dir)
}

fn resolve_path(cli: Option<&Path>, env: Option<&str>, cfg: &str) -> Option<PathBuf> {
    if let Some(p) = cli {
        if !p.as_os_str().is_empty() {
            return Some(p.to_path_buf());
        }
    }
    if let Some(v) = env {
        let v = v.trim();
        if !v.is_empty() {
            return Some(PathBuf::from(v));
        }
    }
    let cfg = cfg.trim();
    if !cfg.is_empty() {
        return Some(PathBuf::from(cfg));
    }
    None
}
