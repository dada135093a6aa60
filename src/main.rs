use anyhow::Result;
use clap::Parser;
use ocr_batch::cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Fatal errors can predate logging init, so report on stderr directly.
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
