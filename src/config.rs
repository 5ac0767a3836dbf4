// SPDX-License-Identifier: Apache-2.0

//! TOML run configuration. Every section and every key is optional.
//!
//! ```toml
//! exclude = ["code_style"]
//!
//! [sampling]
//! num_samples = 100
//! ks = [1, 5, 10]
//!
//! [pool]
//! workers = 8
//! timeout_secs = 20.0
//!
//! [oracle]
//! command = "python3"
//! args = ["oracle.py"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use stembench_mutate::{parse_category_list, ConfigError, MutationCategory};

use crate::canonical::CanonicalConfig;
use crate::pipeline::SamplingConfig;
use crate::pool::PoolConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Mutation categories to leave out, by snake_case name.
    pub exclude: Vec<String>,
    pub sampling: SamplingConfig,
    pub canonical: CanonicalConfig,
    pub pool: PoolSection,
    pub oracle: CommandSection,
    pub generator: GeneratorSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSection {
    /// Defaults to the number of CPUs.
    pub workers: Option<usize>,
    /// `0` disables retirement.
    pub max_tasks_per_worker: usize,
    /// `0` disables restarts.
    pub restart_every: usize,
    pub watchdog_window_secs: f64,
    pub timeout_secs: f64,
    pub timeout_growth: f64,
    pub max_retries: usize,
    pub queue_capacity: Option<usize>,
}

impl Default for PoolSection {
    fn default() -> Self {
        let defaults = PoolConfig::default();
        Self {
            workers: None,
            max_tasks_per_worker: defaults.max_tasks_per_worker.unwrap_or(0),
            restart_every: defaults.restart_every.unwrap_or(0),
            watchdog_window_secs: defaults.watchdog_window.as_secs_f64(),
            timeout_secs: defaults.timeout.as_secs_f64(),
            timeout_growth: defaults.timeout_growth,
            max_retries: defaults.max_retries,
            queue_capacity: defaults.queue_capacity,
        }
    }
}

fn nonzero(n: usize) -> Option<usize> {
    (n > 0).then_some(n)
}

fn seconds(secs: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid {}: {}", what, secs))
}

impl PoolSection {
    pub fn to_pool_config(&self) -> Result<PoolConfig> {
        Ok(PoolConfig {
            workers: self.workers.unwrap_or_else(num_cpus::get),
            max_tasks_per_worker: nonzero(self.max_tasks_per_worker),
            restart_every: nonzero(self.restart_every),
            watchdog_window: seconds(self.watchdog_window_secs, "pool.watchdog_window_secs")?,
            timeout: seconds(self.timeout_secs, "pool.timeout_secs")?,
            timeout_growth: self.timeout_growth,
            max_retries: self.max_retries,
            queue_capacity: self.queue_capacity,
        })
    }
}

/// An external program and its arguments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSection {
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSection {
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Recorded samples to serve instead of running a command.
    pub replay: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

impl BenchConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing benchmark config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn excluded_categories(&self) -> Result<Vec<MutationCategory>, ConfigError> {
        parse_category_list(&self.exclude.join(","))
    }
}
