#![cfg(unix)]

use ocr_batch::config::Config;
use ocr_batch::context;
use ocr_batch::discover::{DiscoveredFile, FileCategory};
use ocr_batch::processor::{CommandProcessor, ProcessStatus, Processor};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Shell scripts stand in for the external Python processors.
fn sh_config(scripts: &TempDir, image_body: &str) -> Config {
    std::fs::write(scripts.path().join("image.sh"), image_body).unwrap();
    let mut cfg = Config::default();
    cfg.processors.python_exe = "/bin/sh".into();
    cfg.processors.scripts_dir = scripts.path().display().to_string();
    cfg.processors.image_script = "image.sh".into();
    cfg.processors.pdf_script = "image.sh".into();
    cfg
}

fn image_context(input: &TempDir, output: &TempDir) -> context::ProcessingContext {
    let path = input.path().join("x.png");
    std::fs::write(&path, b"x").unwrap();
    let file = DiscoveredFile {
        path,
        category: FileCategory::Image,
    };
    context::build(&file, output.path()).unwrap()
}

fn flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn exit_zero_succeeds_with_stdout_diagnostic() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let cfg = sh_config(&scripts, "printf 'all good'\n");
    let proc = CommandProcessor::image(&cfg, flag()).unwrap();

    let verdict = proc.process(&image_context(&input, &output));
    assert_eq!(verdict.status, ProcessStatus::Succeeded);
    assert!(verdict.diagnostic.contains("all good"));
}

#[test]
fn nonzero_exit_fails_with_stderr_diagnostic() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let cfg = sh_config(&scripts, "echo noise\necho boom >&2\nexit 3\n");
    let proc = CommandProcessor::image(&cfg, flag()).unwrap();

    let verdict = proc.process(&image_context(&input, &output));
    assert_eq!(verdict.status, ProcessStatus::Failed);
    assert!(verdict.diagnostic.contains("boom"));
}

#[test]
fn silent_failure_reports_exit_status() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let cfg = sh_config(&scripts, "exit 7\n");
    let proc = CommandProcessor::image(&cfg, flag()).unwrap();

    let verdict = proc.process(&image_context(&input, &output));
    assert_eq!(verdict.status, ProcessStatus::Failed);
    assert!(verdict.diagnostic.contains("exited"));
}

#[test]
fn timeout_kills_child_and_never_succeeds() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let mut cfg = sh_config(&scripts, "sleep 30\n");
    cfg.processors.timeout_seconds = 1;
    let proc = CommandProcessor::image(&cfg, flag()).unwrap();

    let verdict = proc.process(&image_context(&input, &output));
    assert_eq!(verdict.status, ProcessStatus::TimedOut);
    assert!(verdict.diagnostic.contains("timed out"));
}

#[test]
fn interrupt_flag_terminates_in_flight_child() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let cfg = sh_config(&scripts, "sleep 30\n");
    let interrupt = flag();
    let proc = CommandProcessor::image(&cfg, interrupt.clone()).unwrap();

    let setter = {
        let interrupt = interrupt.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            interrupt.store(true, Ordering::SeqCst);
        })
    };

    let verdict = proc.process(&image_context(&input, &output));
    setter.join().unwrap();
    assert_eq!(verdict.status, ProcessStatus::Interrupted);
}

#[test]
fn processor_receives_paths_via_environment() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let cfg = sh_config(&scripts, "printf '%s|%s' \"$OCR_INPUT_PATH\" \"$OCR_OUTPUT_PATH\"\n");
    let proc = CommandProcessor::image(&cfg, flag()).unwrap();

    let verdict = proc.process(&image_context(&input, &output));
    assert_eq!(verdict.status, ProcessStatus::Succeeded);
    assert!(verdict.diagnostic.contains("x.png"));
    let out_part = verdict.diagnostic.split('|').nth(1).unwrap();
    assert!(Path::new(out_part).join("images").is_dir());
}

#[test]
fn stderr_logging_toggle_does_not_affect_verdicts() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let mut cfg = sh_config(&scripts, "echo model warmup >&2\nprintf 'done'\n");
    assert!(cfg.debug.keep_processor_stderr);

    for keep in [true, false] {
        cfg.debug.keep_processor_stderr = keep;
        let proc = CommandProcessor::image(&cfg, flag()).unwrap();
        let verdict = proc.process(&image_context(&input, &output));
        assert_eq!(verdict.status, ProcessStatus::Succeeded);
        assert_eq!(verdict.diagnostic, "done");
    }
}

#[test]
fn missing_script_fails_construction() {
    let scripts = tempdir().unwrap();
    let mut cfg = Config::default();
    cfg.processors.python_exe = "/bin/sh".into();
    cfg.processors.scripts_dir = scripts.path().display().to_string();
    cfg.processors.image_script = "nope.sh".into();

    assert!(CommandProcessor::image(&cfg, flag()).is_err());
}

#[test]
fn unlaunchable_interpreter_is_a_failure_verdict() {
    let (scripts, input, output) = (tempdir().unwrap(), tempdir().unwrap(), tempdir().unwrap());
    let mut cfg = sh_config(&scripts, "exit 0\n");
    cfg.processors.python_exe = "/no/such/interpreter".into();
    let proc = CommandProcessor::image(&cfg, flag()).unwrap();

    let verdict = proc.process(&image_context(&input, &output));
    assert_eq!(verdict.status, ProcessStatus::Failed);
    assert!(verdict.diagnostic.contains("failed to launch"));
}
