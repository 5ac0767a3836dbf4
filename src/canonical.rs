// SPDX-License-Identifier: Apache-2.0

//! Picks the reference solution that mutations start from: the most likely
//! (by cumulative log-probability) of the model's own passing samples.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::generator::{CodeGenerator, Sample};
use crate::metrics::Summary;
use crate::oracle::OracleFactory;
use crate::pool::{PoolError, SupervisedPool, Task, TaskResult};
use crate::postprocess::{postprocess_sequence, program_concat};
use crate::results::Solution;
use crate::store::{file_stem_for, Problem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    /// Minimum fraction of tests a sample must pass to count as correct.
    pub passing_threshold: f64,
    pub num_samples: usize,
    pub batch_size: usize,
    pub min_correct_samples: usize,
    pub temperature: f64,
    pub cache_dir: PathBuf,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            passing_threshold: 1.0,
            num_samples: 300,
            batch_size: 50,
            min_correct_samples: 10,
            temperature: 0.8,
            cache_dir: PathBuf::from(".cache"),
        }
    }
}

#[derive(Debug)]
pub enum CanonicalError {
    NoPassingSolution { needed: usize, found: usize },
    Generator(String),
    Pool(PoolError),
    Cache(String),
}

impl fmt::Display for CanonicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalError::NoPassingSolution { needed, found } => write!(
                f,
                "CanonicalError: needed {} correct solutions, but found {}",
                needed, found
            ),
            CanonicalError::Generator(msg) => write!(f, "CanonicalError: generator: {}", msg),
            CanonicalError::Pool(e) => write!(f, "CanonicalError: {}", e),
            CanonicalError::Cache(msg) => write!(f, "CanonicalError: cache: {}", msg),
        }
    }
}

impl std::error::Error for CanonicalError {}

impl From<PoolError> for CanonicalError {
    fn from(e: PoolError) -> Self {
        CanonicalError::Pool(e)
    }
}

pub struct CanonicalSelector<'a, G: CodeGenerator + ?Sized, F: OracleFactory> {
    generator: &'a G,
    pool: &'a mut SupervisedPool<F>,
    config: &'a CanonicalConfig,
}

impl<'a, G: CodeGenerator + ?Sized, F: OracleFactory> CanonicalSelector<'a, G, F> {
    pub fn new(
        generator: &'a G,
        pool: &'a mut SupervisedPool<F>,
        config: &'a CanonicalConfig,
    ) -> Self {
        Self {
            generator,
            pool,
            config,
        }
    }

    pub fn cache_path(&self, problem_id: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("{}.json", file_stem_for(problem_id)))
    }

    /// Returns the cached canonical solution for `problem` or selects and
    /// caches a new one.
    pub fn canonical_solution(&mut self, problem: &Arc<Problem>) -> Result<Solution, CanonicalError> {
        let cache = self.cache_path(&problem.task_id);
        if cache.exists() {
            log::debug!("Loading cached canonical solution for {}", problem.task_id);
            let solution = read_cache(&cache)?;
            log::info!("Canonical solution:\n{}", solution.code);
            return Ok(solution);
        }
        let solution = self.select(problem)?;
        write_cache(&cache, &solution)?;
        Ok(solution)
    }

    /// Samples, checks and picks without touching the cache.
    pub fn select(&mut self, problem: &Arc<Problem>) -> Result<Solution, CanonicalError> {
        log::info!("Finding canonical solution for {}", problem.task_id);
        let samples = self.generate(&problem.prompt)?;

        let mut candidates = Vec::with_capacity(samples.len());
        for sample in samples {
            let joined = program_concat(&problem.prompt, &sample.text);
            match postprocess_sequence(&joined) {
                Ok(code) => candidates.push(Solution::new(code, sample.cumulative_logprob)),
                Err(e) => log::debug!("Dropping sample that failed postprocessing: {}", e),
            }
        }
        let tasks = candidates
            .iter()
            .map(|c| Task {
                problem: problem.clone(),
                candidate: c.code.clone(),
                base_only: false,
            })
            .collect();
        let report = self.pool.run_batch(tasks)?;

        let mut passing = Vec::new();
        let mut failed_ratios = Vec::new();
        for (mut candidate, result) in candidates.into_iter().zip(report.results) {
            let report = match result {
                TaskResult::Report(report) => report,
                TaskResult::Error(e) => {
                    log::debug!("Oracle error on sample: {}", e);
                    continue;
                }
                TaskResult::Unresolved => continue,
            };
            let Some(ratio) = report.pass_ratio() else {
                log::warn!(
                    "No test results for a syntactically incorrect solution:\n{}",
                    candidate.code
                );
                continue;
            };
            candidate.failed_tests = Some(report.failed_tests());
            if ratio >= self.config.passing_threshold {
                passing.push(candidate);
            } else {
                failed_ratios.push(ratio);
            }
        }

        if passing.len() < self.config.min_correct_samples {
            return Err(CanonicalError::NoPassingSolution {
                needed: self.config.min_correct_samples,
                found: passing.len(),
            });
        }
        self.log_failure_stats(&failed_ratios);

        let best = passing
            .into_iter()
            .max_by(|a, b| a.cumulative_logprob.total_cmp(&b.cumulative_logprob))
            .ok_or(CanonicalError::NoPassingSolution {
                needed: self.config.min_correct_samples,
                found: 0,
            })?;
        log::info!(
            "Max probability solution (logprob={}):\n{}",
            best.cumulative_logprob,
            best.code
        );
        Ok(best)
    }

    fn generate(&self, prompt: &str) -> Result<Vec<Sample>, CanonicalError> {
        let mut samples = Vec::with_capacity(self.config.num_samples);
        let mut remaining = self.config.num_samples;
        let batch_size = self.config.batch_size.max(1);
        while remaining > 0 {
            let to_gen = std::cmp::min(batch_size, remaining);
            let batch = self
                .generator
                .generate(prompt, to_gen, self.config.temperature)
                .map_err(|e| CanonicalError::Generator(format!("{:#}", e)))?;
            samples.extend(batch);
            remaining -= to_gen;
        }
        Ok(samples)
    }

    fn log_failure_stats(&self, failed_ratios: &[f64]) {
        let rate = failed_ratios.len() as f64 / self.config.num_samples.max(1) as f64;
        let mut message = format!("Failure rate stats\nFailure rate: {:.2}%", rate * 100.0);
        if let Some(summary) = Summary::of(failed_ratios) {
            message.push_str(&format!(
                "\nMean: {}\nMedian: {}\nStddev: {}",
                summary.mean, summary.median, summary.stddev
            ));
        }
        log::info!("{}", message);
    }
}

fn read_cache(path: &Path) -> Result<Solution, CanonicalError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CanonicalError::Cache(format!("reading {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| CanonicalError::Cache(format!("parsing {}: {}", path.display(), e)))
}

fn write_cache(path: &Path, solution: &Solution) -> Result<(), CanonicalError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| CanonicalError::Cache(format!("creating {}: {}", dir.display(), e)))?;
    }
    let text = serde_json::to_string_pretty(solution)
        .map_err(|e| CanonicalError::Cache(e.to_string()))?;
    fs::write(path, text)
        .map_err(|e| CanonicalError::Cache(format!("writing {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ReplayGenerator;
    use crate::oracle::{FnOracle, OracleReport};
    use crate::pool::PoolConfig;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const PROMPT: &str = "def add(a, b):\n";

    fn generator(samples: &[(&str, f64)]) -> ReplayGenerator {
        let samples = samples
            .iter()
            .map(|(text, logprob)| Sample {
                text: text.to_string(),
                cumulative_logprob: *logprob,
            })
            .collect();
        ReplayGenerator::from_map(HashMap::from([(PROMPT.to_string(), samples)]))
    }

    fn sums_oracle() -> FnOracle {
        FnOracle::new(|_, candidate| {
            let ok = candidate.contains("a + b") || candidate.contains("b + a");
            Ok(OracleReport {
                base: vec![1, u8::from(ok)],
                plus: vec![u8::from(ok)],
            })
        })
    }

    fn pool(oracle: FnOracle) -> SupervisedPool<FnOracle> {
        SupervisedPool::new(
            oracle,
            PoolConfig {
                workers: 2,
                ..PoolConfig::default()
            },
        )
    }

    fn config(dir: &Path) -> CanonicalConfig {
        CanonicalConfig {
            num_samples: 3,
            batch_size: 2,
            min_correct_samples: 2,
            cache_dir: dir.to_path_buf(),
            ..CanonicalConfig::default()
        }
    }

    fn problem() -> Arc<Problem> {
        Arc::new(Problem::new("HumanEval/53", PROMPT, "add"))
    }

    #[test]
    fn most_likely_passing_sample_wins() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&[
            ("    return a + b", -3.0),
            ("    return b + a", -1.0),
            ("    return a - b", -0.5),
        ]);
        let mut pool = pool(sums_oracle());
        let config = config(dir.path());
        let mut selector = CanonicalSelector::new(&generator, &mut pool, &config);
        let best = selector.select(&problem()).unwrap();
        let want = postprocess_sequence(&program_concat(PROMPT, "    return b + a")).unwrap();
        assert_eq!(best.code, want);
        assert_eq!(best.cumulative_logprob, -1.0);
        assert_eq!(best.failed_tests, Some(Vec::new()));
    }

    #[test]
    fn too_few_passing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&[
            ("    return a + b", -3.0),
            ("    return a - b", -1.0),
            ("    return a * b", -0.5),
        ]);
        let mut pool = pool(sums_oracle());
        let config = config(dir.path());
        let mut selector = CanonicalSelector::new(&generator, &mut pool, &config);
        let err = selector.select(&problem()).unwrap_err();
        assert!(matches!(
            err,
            CanonicalError::NoPassingSolution { needed: 2, found: 1 }
        ));
    }

    #[test]
    fn partial_pass_meets_a_lower_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&[("    return a - b", -2.0), ("    return b - a", -1.0)]);
        let half = FnOracle::new(|_, _| {
            Ok(OracleReport {
                base: vec![1, 0],
                plus: Vec::new(),
            })
        });
        let mut pool = pool(half);
        let config = CanonicalConfig {
            num_samples: 2,
            passing_threshold: 0.5,
            ..config(dir.path())
        };
        let mut selector = CanonicalSelector::new(&generator, &mut pool, &config);
        let best = selector.select(&problem()).unwrap();
        assert!(best.code.contains("b - a"));
        assert_eq!(best.failed_tests, Some(vec![1]));
    }

    #[test]
    fn samples_without_tests_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&[("    return a + b", -1.0), ("    return a +", -0.1)]);
        let oracle = FnOracle::new(|_, candidate| {
            if candidate.trim_end().ends_with('+') {
                return Ok(OracleReport::default());
            }
            Ok(OracleReport {
                base: vec![1],
                plus: Vec::new(),
            })
        });
        let mut pool = pool(oracle);
        let config = CanonicalConfig {
            num_samples: 2,
            min_correct_samples: 1,
            ..config(dir.path())
        };
        let mut selector = CanonicalSelector::new(&generator, &mut pool, &config);
        let best = selector.select(&problem()).unwrap();
        assert_eq!(best.cumulative_logprob, -1.0);
    }

    #[test]
    fn selection_is_cached_per_problem() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let first = {
            let generator = generator(&[
                ("    return a + b", -3.0),
                ("    return b + a", -1.0),
                ("    return a + b", -2.0),
            ]);
            let mut pool = pool(sums_oracle());
            let mut selector = CanonicalSelector::new(&generator, &mut pool, &config);
            selector.canonical_solution(&problem()).unwrap()
        };
        assert!(dir.path().join("HumanEval_53.json").exists());

        // A generator with nothing recorded would fail if it were asked.
        let empty = ReplayGenerator::from_map(HashMap::new());
        let mut pool = pool(sums_oracle());
        let mut selector = CanonicalSelector::new(&empty, &mut pool, &config);
        let second = selector.canonical_solution(&problem()).unwrap();
        assert_eq!(second, first);
    }
}
