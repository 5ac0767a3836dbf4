// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use clap::ArgMatches;
use stembench::config::BenchConfig;
use stembench::pipeline::collect_stems;
use stembench_mutate::{build_default_registry, get_transformer, MutationRegistry};

use crate::bench_config::get_exclude;
use crate::mutate::{engine_for, read_source};

pub fn handle_stems(matches: &ArgMatches, config: &Option<BenchConfig>) -> anyhow::Result<()> {
    log::info!("handle_stems");
    let source = read_source(matches)?;
    let registry = match matches.get_one::<String>("mutation") {
        Some(name) => {
            let transformer = get_transformer(name)?;
            let category = transformer.category();
            let mut registry = MutationRegistry::new();
            registry.register(transformer, category)?;
            registry
        }
        None => build_default_registry()?,
    };
    let exclude = get_exclude(matches, config)?;
    let engine = engine_for(matches)?;
    let cases = collect_stems(&registry, &engine, &exclude, &source)
        .context("input does not parse as Python")?;
    for case in &cases {
        println!("{}", serde_json::to_string(case)?);
    }
    Ok(())
}
