//! `hsched config` – show config path and effective values.

use anyhow::Result;
use hsched_core::config::{self, SchedulerConfig};

pub fn run_config(cfg: &SchedulerConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
