use crate::{discover::DiscoveredFile, util::ensure_dir};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Variable names the external processors read their parameters from.
pub const ENV_INPUT_PATH: &str = "OCR_INPUT_PATH";
pub const ENV_OUTPUT_PATH: &str = "OCR_OUTPUT_PATH";

/// Everything one processor invocation needs, owned by that invocation alone.
/// The override map is merged into a copy of the child's environment; the
/// orchestrator's own environment is never touched.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub file: DiscoveredFile,
    pub destination_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Build the per-file context: `<output_root>/<stem>/` with an `images/`
/// subdirectory, both created if absent. Files sharing a stem map to the
/// same destination; discovery warns about that case.
pub fn build(file: &DiscoveredFile, output_root: &Path) -> Result<ProcessingContext> {
    let stem = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    let destination_dir = output_root.join(&stem);
    ensure_dir(&destination_dir)?;
    ensure_dir(&destination_dir.join("images"))?;

    let input_abs = file
        .path
        .canonicalize()
        .with_context(|| format!("resolving input path: {}", file.path.display()))?;
    let dest_abs = destination_dir
        .canonicalize()
        .with_context(|| format!("resolving destination: {}", destination_dir.display()))?;

    let mut env = BTreeMap::new();
    env.insert(ENV_INPUT_PATH.to_string(), input_abs.display().to_string());
    env.insert(ENV_OUTPUT_PATH.to_string(), dest_abs.display().to_string());

    Ok(ProcessingContext {
        file: file.clone(),
        destination_dir,
        env,
    })
}
