// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use clap::ArgMatches;
use stembench::config::BenchConfig;
use stembench_mutate::{get_transformer, Engine};

/// Printed between variants.
pub const VARIANT_SEPARATOR: &str = "# ----";

pub fn engine_for(matches: &ArgMatches) -> anyhow::Result<Engine> {
    match matches.get_one::<String>("seed") {
        Some(seed) => {
            let seed = seed
                .parse::<u64>()
                .with_context(|| format!("invalid --seed value {:?}", seed))?;
            Ok(Engine::with_seed(seed))
        }
        None => Ok(Engine::new()),
    }
}

pub fn read_source(matches: &ArgMatches) -> anyhow::Result<String> {
    let path = matches
        .get_one::<String>("python_file")
        .context("missing input file")?;
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path))
}

pub fn handle_mutate(matches: &ArgMatches, _config: &Option<BenchConfig>) -> anyhow::Result<()> {
    log::info!("handle_mutate");
    let source = read_source(matches)?;
    let name = matches
        .get_one::<String>("mutation")
        .context("missing --mutation")?;
    let transformer = get_transformer(name)?;
    let engine = engine_for(matches)?;
    let variants = engine.transform_all(&source, transformer.as_ref())?;
    log::info!("{}: {} variant(s)", name, variants.len());
    for (i, variant) in variants.iter().enumerate() {
        if i > 0 {
            println!("{}", VARIANT_SEPARATOR);
        }
        println!("{}", variant);
    }
    Ok(())
}
