//! `canvasdive config`: print the effective configuration

use anyhow::{Context, Result};

use crate::config::AppConfig;

pub fn show(config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}
