// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use clap::ArgMatches;
use stembench::config::BenchConfig;
use stembench::pipeline::summarize_by_mutation;
use stembench::{Benchmark, JsonlResultStore, ProblemStore, SupervisedPool};
use stembench_mutate::build_default_registry;

use crate::bench_config::{
    get_canonical, get_exclude, get_generator, get_oracle, get_output_dir, get_pool_config,
    get_sampling,
};
use crate::canonical::open_problems;
use crate::mutate::engine_for;

pub fn handle_run(matches: &ArgMatches, config: &Option<BenchConfig>) -> anyhow::Result<()> {
    log::info!("handle_run");
    let problems = open_problems(matches)?;
    let ids: Vec<String> = match matches.get_many::<String>("problem_id") {
        Some(ids) => ids.cloned().collect(),
        None => problems.ids(),
    };
    let registry = build_default_registry()?;
    let generator = get_generator(matches, config)?;
    let sampling = get_sampling(matches, config)?;
    let first_k = sampling.ks.first().copied().unwrap_or(1);
    let bench = Benchmark::new(
        &registry,
        generator.as_ref(),
        sampling,
        get_canonical(matches, config),
    )
    .with_exclude(get_exclude(matches, config)?)
    .with_engine(engine_for(matches)?);

    let output = get_output_dir(matches, config);
    let mut store = JsonlResultStore::new(&output)?;
    let mut pool = SupervisedPool::new(get_oracle(matches, config)?, get_pool_config(matches, config)?);
    let summary = bench
        .run(&mut pool, &problems, &ids, &mut store)
        .context("benchmark run failed")?;

    let stats = pool.stats();
    log::info!("pool: {:?}", stats);
    println!(
        "{} result(s) for {} problem(s), {} incomplete, written to {}",
        summary.results.len(),
        ids.len() - summary.skipped.len(),
        summary.incomplete(),
        store.results_path().display()
    );
    for (id, reason) in &summary.skipped {
        println!("skipped {}: {}", id, reason);
    }
    for row in summarize_by_mutation(&summary.results, first_k) {
        println!(
            "{:<28} stems={:<4} pass@{} original={:.3} mutated={:.3} log_ratio={:+.3} change={:+.1}%",
            row.mutation,
            row.stems,
            first_k,
            row.mean_original,
            row.mean_mutated,
            row.log_ratio,
            row.symmetric_percent_change
        );
    }
    Ok(())
}
