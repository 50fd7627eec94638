//! `omnipacker output-dir` – print where finished downloads land.

use anyhow::Result;
use omnipacker_core::config::OmniConfig;

pub fn run_output_dir(cfg: &OmniConfig) -> Result<()> {
    println!("{}", cfg.runner.resolve_output_dir()?.display());
    Ok(())
}
