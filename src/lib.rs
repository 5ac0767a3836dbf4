// SPDX-License-Identifier: Apache-2.0

//! Robustness benchmark for code models: compares pass@k of completions of
//! a canonical solution's stems against completions of the same stems after
//! a semantics-preserving rewrite.

pub mod canonical;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod oracle;
pub mod pipeline;
pub mod pool;
pub mod postprocess;
pub mod results;
pub mod store;

pub use canonical::{CanonicalConfig, CanonicalError, CanonicalSelector};
pub use config::BenchConfig;
pub use generator::{CodeGenerator, CommandGenerator, ReplayGenerator, Sample};
pub use metrics::pass_at_k;
pub use oracle::{
    CancelToken, CommandOracle, CorrectnessOracle, FnOracle, OracleError, OracleFactory,
    OracleReport,
};
pub use pipeline::{Benchmark, RunSummary, SamplingConfig, StemCase};
pub use pool::{PoolConfig, SupervisedPool, Task, TaskResult};
pub use results::{BenchmarkResult, Solution, SolutionType, StemSide};
pub use store::{JsonlProblemStore, JsonlResultStore, Problem, ProblemStore, ResultStore};

pub use stembench_mutate;
pub use stembench_pyast;
