// SPDX-License-Identifier: Apache-2.0

//! Helpers that take a setting from its command line flag when given and
//! fall back to the `--config` file otherwise.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use stembench::config::BenchConfig;
use stembench::{
    CanonicalConfig, CodeGenerator, CommandGenerator, CommandOracle, PoolConfig, ReplayGenerator,
    SamplingConfig,
};
use stembench_mutate::{parse_category_list, MutationCategory};

/// Reads the config file named by `--config`.
pub fn load(path: &str) -> Result<BenchConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
    toml::from_str::<BenchConfig>(&text).with_context(|| format!("parsing config {}", path))
}

fn flag<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a String> {
    matches.try_get_one::<String>(id).ok().flatten()
}

fn parsed_flag<T: std::str::FromStr>(matches: &ArgMatches, id: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match flag(matches, id) {
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid --{} value {:?}: {}", id, s, e)),
        None => Ok(None),
    }
}

/// Splits a command line given as one flag value on whitespace.
fn split_command(line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("empty command: {:?}", line))?;
    Ok((program, parts.collect()))
}

pub fn get_exclude(
    matches: &ArgMatches,
    config: &Option<BenchConfig>,
) -> Result<Vec<MutationCategory>> {
    if let Some(exclude) = flag(matches, "exclude") {
        Ok(parse_category_list(exclude)?)
    } else if let Some(config) = config {
        Ok(config.excluded_categories()?)
    } else {
        Ok(Vec::new())
    }
}

pub fn get_output_dir(matches: &ArgMatches, config: &Option<BenchConfig>) -> PathBuf {
    if let Some(dir) = flag(matches, "output") {
        PathBuf::from(dir)
    } else if let Some(config) = config {
        config.output.dir.clone()
    } else {
        PathBuf::from("results")
    }
}

pub fn get_sampling(matches: &ArgMatches, config: &Option<BenchConfig>) -> Result<SamplingConfig> {
    let mut sampling = config
        .as_ref()
        .map(|c| c.sampling.clone())
        .unwrap_or_default();
    if let Some(n) = parsed_flag::<usize>(matches, "num_samples")? {
        sampling.num_samples = n;
    }
    if let Some(t) = parsed_flag::<f64>(matches, "temperature")? {
        sampling.temperature = t;
    }
    Ok(sampling)
}

pub fn get_canonical(matches: &ArgMatches, config: &Option<BenchConfig>) -> CanonicalConfig {
    let mut canonical = config
        .as_ref()
        .map(|c| c.canonical.clone())
        .unwrap_or_default();
    if let Some(dir) = flag(matches, "cache_dir") {
        canonical.cache_dir = PathBuf::from(dir);
    }
    canonical
}

pub fn get_pool_config(matches: &ArgMatches, config: &Option<BenchConfig>) -> Result<PoolConfig> {
    let mut pool = match config {
        Some(config) => config.pool.to_pool_config()?,
        None => PoolConfig::default(),
    };
    if let Some(workers) = parsed_flag::<usize>(matches, "workers")? {
        pool.workers = workers;
    }
    Ok(pool)
}

pub fn get_oracle(matches: &ArgMatches, config: &Option<BenchConfig>) -> Result<CommandOracle> {
    if let Some(line) = flag(matches, "oracle_cmd") {
        let (program, args) = split_command(line)?;
        return Ok(CommandOracle::new(program, args));
    }
    match config.as_ref().and_then(|c| {
        c.oracle
            .command
            .as_ref()
            .map(|command| (command, &c.oracle.args))
    }) {
        Some((command, args)) => Ok(CommandOracle::new(command.clone(), args.clone())),
        None => Err(anyhow!(
            "no oracle configured; pass --oracle_cmd or set [oracle] command in the config"
        )),
    }
}

fn replay(path: &Path) -> Result<Box<dyn CodeGenerator>> {
    Ok(Box::new(ReplayGenerator::open(path)?))
}

pub fn get_generator(
    matches: &ArgMatches,
    config: &Option<BenchConfig>,
) -> Result<Box<dyn CodeGenerator>> {
    if let Some(path) = flag(matches, "replay") {
        return replay(Path::new(path));
    }
    if let Some(line) = flag(matches, "generator_cmd") {
        let (program, args) = split_command(line)?;
        return Ok(Box::new(CommandGenerator::new(program, args)));
    }
    if let Some(config) = config {
        if let Some(path) = &config.generator.replay {
            return replay(path);
        }
        if let Some(command) = &config.generator.command {
            return Ok(Box::new(CommandGenerator::new(
                command.clone(),
                config.generator.args.clone(),
            )));
        }
    }
    Err(anyhow!(
        "no generator configured; pass --replay or --generator_cmd, or set [generator] in the config"
    ))
}
