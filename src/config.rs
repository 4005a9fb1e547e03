//! Driver configuration, loaded from a YAML file at startup.

use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

/// Update rate, in Hz, used when the config does not specify one.
const DEFAULT_UPDATE_HZ: f64 = 30.;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Network address of the bridge.
    pub address: String,
    /// Pre-provisioned API key for the bridge.
    pub api_key: String,
    /// How often to flush dirty fixture state, in Hz.
    #[serde(default = "default_update_hz")]
    pub update_hz: f64,
}

fn default_update_hz() -> f64 {
    DEFAULT_UPDATE_HZ
}

impl Config {
    /// Load and validate a config file.
    ///
    /// All validation failures here are fatal; the driver never starts
    /// ticking with a bad bridge configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening config file {}", path.display()))?;
        let config: Self = serde_yaml::from_reader(file).context("parsing config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.address.is_empty(), "bridge address is empty");
        ensure!(!self.api_key.is_empty(), "bridge api key is empty");
        ensure!(
            self.update_hz.is_finite() && self.update_hz > 0.,
            "update rate must be positive, got {}",
            self.update_hz
        );
        Ok(())
    }
}
