// SPDX-License-Identifier: Apache-2.0

use clap::ArgMatches;
use stembench::config::BenchConfig;
use stembench_mutate::build_default_registry;

use crate::bench_config::get_exclude;

pub fn handle_list_mutations(
    matches: &ArgMatches,
    config: &Option<BenchConfig>,
) -> anyhow::Result<()> {
    log::info!("handle_list_mutations");
    let exclude = get_exclude(matches, config)?;
    let registry = build_default_registry()?;
    for (category, transformers) in registry.get(Some(exclude.as_slice())) {
        if transformers.is_empty() {
            continue;
        }
        println!("{}:", category);
        for transformer in transformers {
            let mut notes = Vec::new();
            if !transformer.deterministic() {
                notes.push("non-deterministic".to_string());
            }
            if transformer.stem_extra_skips() > 0 {
                notes.push(format!("extra skips: {}", transformer.stem_extra_skips()));
            }
            if notes.is_empty() {
                println!("  {}", transformer.name());
            } else {
                println!("  {} ({})", transformer.name(), notes.join(", "));
            }
        }
    }
    Ok(())
}
