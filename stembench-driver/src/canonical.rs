// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::Context;
use clap::ArgMatches;
use stembench::config::BenchConfig;
use stembench::{CanonicalSelector, JsonlProblemStore, ProblemStore, SupervisedPool};

use crate::bench_config::{get_canonical, get_generator, get_oracle, get_pool_config};

pub fn open_problems(matches: &ArgMatches) -> anyhow::Result<JsonlProblemStore> {
    let path = matches
        .get_one::<String>("problems")
        .context("missing --problems")?;
    JsonlProblemStore::open(Path::new(path))
}

pub fn handle_canonical(matches: &ArgMatches, config: &Option<BenchConfig>) -> anyhow::Result<()> {
    log::info!("handle_canonical");
    let problems = open_problems(matches)?;
    let id = matches
        .get_one::<String>("problem_id")
        .context("missing --problem-id")?;
    let problem = problems.get_problem(id)?;
    let generator = get_generator(matches, config)?;
    let canonical = get_canonical(matches, config);
    let mut pool = SupervisedPool::new(get_oracle(matches, config)?, get_pool_config(matches, config)?);
    let mut selector = CanonicalSelector::new(generator.as_ref(), &mut pool, &canonical);
    let solution = selector
        .canonical_solution(&problem)
        .with_context(|| format!("selecting canonical solution for {}", id))?;
    println!("{}", solution.code);
    Ok(())
}
