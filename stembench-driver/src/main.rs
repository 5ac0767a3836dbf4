// SPDX-License-Identifier: Apache-2.0

//! Command line driver for stembench.
//!
//! Commands are given like:
//!
//! ```text
//! stembench-driver <global-options> <command> <command-args-and-options>
//! ```
//!
//! Commands are:
//!
//! - list-mutations: Lists the registered mutations by category.
//! - mutate: Prints every variant of a Python file under one mutation.
//! - stems: Prints the stem pairs of a Python file as JSON lines.
//! - pass-at-k: Evaluates the unbiased pass@k estimator.
//! - canonical: Selects (or loads the cached) canonical solution of a
//!   problem.
//! - run: Runs the benchmark over a problem file.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- list-mutations --exclude code_style
//! $ cargo run -- mutate solution.py --mutation InvertIf
//! $ cargo run -- --config bench.toml \
//!     run --problems humaneval.jsonl --problem-id HumanEval/0 --output results
//! ```

mod bench_config;
mod canonical;
mod list_mutations;
mod mutate;
mod pass_at_k;
mod report_cli_error;
mod run;
mod stems;

use clap::{Arg, ArgAction};
use report_cli_error::report_cli_error_and_exit;
use stembench::config::BenchConfig;

trait AppExt {
    fn add_python_file_arg(self) -> Self;
    fn add_exclude_arg(self) -> Self;
    fn add_seed_arg(self) -> Self;
    fn add_problem_args(self) -> Self;
    fn add_evaluation_args(self) -> Self;
    fn add_bool_arg(self, long: &'static str, help: &'static str) -> Self;
}

impl AppExt for clap::Command {
    fn add_python_file_arg(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("python_file")
                .value_name("PYTHON_FILE")
                .help("The input Python file")
                .required(true)
                .index(1),
        )
    }

    fn add_exclude_arg(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("CATEGORIES")
                .help("Comma-separated mutation categories to leave out, e.g. booleans,code_style")
                .action(ArgAction::Set),
        )
    }

    fn add_seed_arg(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for mutations that draw random names")
                .action(ArgAction::Set),
        )
    }

    fn add_problem_args(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("problems")
                .long("problems")
                .value_name("PROBLEMS_JSONL")
                .help("Problem file with one JSON object per line")
                .required(true)
                .action(ArgAction::Set),
        )
    }

    fn add_evaluation_args(self) -> Self {
        (self as clap::Command)
            .arg(
                Arg::new("oracle_cmd")
                    .long("oracle_cmd")
                    .value_name("COMMAND")
                    .help("Correctness oracle command line; overrides [oracle] in the config")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("generator_cmd")
                    .long("generator_cmd")
                    .value_name("COMMAND")
                    .help("Sampling command line; overrides [generator] in the config")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("replay")
                    .long("replay")
                    .value_name("SAMPLES_JSONL")
                    .help("Serve recorded samples instead of running a generator")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("workers")
                    .long("workers")
                    .value_name("N")
                    .help("Number of oracle worker threads")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("cache_dir")
                    .long("cache_dir")
                    .value_name("DIR")
                    .help("Directory for cached canonical solutions")
                    .action(ArgAction::Set),
            )
    }

    fn add_bool_arg(self, long: &'static str, help: &'static str) -> Self {
        (self as clap::Command).arg(
            Arg::new(long)
                .long(long)
                .value_name("BOOL")
                .action(ArgAction::Set)
                .value_parser(["true", "false"])
                .num_args(1)
                .help(help),
        )
    }
}

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "stembench-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("stembench-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Command line driver for the stembench robustness benchmark")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("CONFIG_TOML")
                .help("Path to a benchmark config TOML file")
                .action(ArgAction::Set),
        )
        .subcommand(
            clap::Command::new("list-mutations")
                .about("Lists the registered mutations by category")
                .add_exclude_arg(),
        )
        .subcommand(
            clap::Command::new("mutate")
                .about("Prints every variant of a Python file under one mutation")
                .add_python_file_arg()
                .arg(
                    Arg::new("mutation")
                        .long("mutation")
                        .value_name("NAME")
                        .help("The mutation to apply, e.g. InvertIf")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .add_seed_arg(),
        )
        .subcommand(
            clap::Command::new("stems")
                .about("Prints the stem pairs of a Python file as JSON lines")
                .add_python_file_arg()
                .arg(
                    Arg::new("mutation")
                        .long("mutation")
                        .value_name("NAME")
                        .help("Only this mutation (default: all registered)")
                        .action(ArgAction::Set),
                )
                .add_exclude_arg()
                .add_seed_arg(),
        )
        .subcommand(
            clap::Command::new("pass-at-k")
                .about("Evaluates the unbiased pass@k estimator")
                .arg(
                    Arg::new("n")
                        .long("n")
                        .value_name("N")
                        .help("Number of samples")
                        .required(true),
                )
                .arg(
                    Arg::new("c")
                        .long("c")
                        .value_name("C")
                        .help("Number of correct samples")
                        .required(true),
                )
                .arg(
                    Arg::new("k")
                        .long("k")
                        .value_name("K")
                        .help("Number of draws")
                        .required(true),
                )
                .add_bool_arg("json", "Print the result as a JSON object"),
        )
        .subcommand(
            clap::Command::new("canonical")
                .about("Selects the canonical solution of a problem")
                .add_problem_args()
                .arg(
                    Arg::new("problem_id")
                        .long("problem-id")
                        .value_name("ID")
                        .help("The problem to select for, e.g. HumanEval/0")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .add_evaluation_args(),
        )
        .subcommand(
            clap::Command::new("run")
                .about("Runs the benchmark over a problem file")
                .add_problem_args()
                .arg(
                    Arg::new("problem_id")
                        .long("problem-id")
                        .value_name("ID")
                        .help("Problem to evaluate; may be repeated (default: every problem)")
                        .action(ArgAction::Append),
                )
                .add_exclude_arg()
                .add_seed_arg()
                .add_evaluation_args()
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("DIR")
                        .help("Directory the results are appended to")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("num_samples")
                        .long("num_samples")
                        .value_name("N")
                        .help("Completions sampled per prefix")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("temperature")
                        .long("temperature")
                        .value_name("T")
                        .help("Sampling temperature")
                        .action(ArgAction::Set),
                ),
        )
        .get_matches();

    let config: Option<BenchConfig> = matches.get_one::<String>("config").map(|path| {
        bench_config::load(path).unwrap_or_else(|e| {
            report_cli_error_and_exit(&format!("{:#}", e), None, vec![("config", path.as_str())])
        })
    });

    let (name, result) = if let Some(sub) = matches.subcommand_matches("list-mutations") {
        ("list-mutations", list_mutations::handle_list_mutations(sub, &config))
    } else if let Some(sub) = matches.subcommand_matches("mutate") {
        ("mutate", mutate::handle_mutate(sub, &config))
    } else if let Some(sub) = matches.subcommand_matches("stems") {
        ("stems", stems::handle_stems(sub, &config))
    } else if let Some(sub) = matches.subcommand_matches("pass-at-k") {
        ("pass-at-k", pass_at_k::handle_pass_at_k(sub))
    } else if let Some(sub) = matches.subcommand_matches("canonical") {
        ("canonical", canonical::handle_canonical(sub, &config))
    } else if let Some(sub) = matches.subcommand_matches("run") {
        ("run", run::handle_run(sub, &config))
    } else {
        report_cli_error_and_exit("no command given; see --help", None, vec![]);
    };

    if let Err(e) = result {
        report_cli_error_and_exit(&format!("{:#}", e), Some(name), vec![]);
    }
}
