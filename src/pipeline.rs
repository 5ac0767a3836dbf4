// SPDX-License-Identifier: Apache-2.0

//! The benchmark proper. For each problem:
//!
//! 1. pick a canonical solution and derive stem pairs from every applicable
//!    mutation of it;
//! 2. sample completions for both prefixes of each stem and postprocess them;
//! 3. check the candidates on the supervised pool;
//! 4. classify the outcomes and compute pass@k for each side.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stembench_mutate::{stems_for, Engine, MutatedStem, MutationCategory, MutationRegistry};
use stembench_pyast::ParseError;

use crate::canonical::{CanonicalConfig, CanonicalError, CanonicalSelector};
use crate::generator::CodeGenerator;
use crate::metrics::{percent_change, safe_log_ratio, symmetric_percent_change};
use crate::oracle::OracleFactory;
use crate::pool::{SupervisedPool, Task, TaskResult};
use crate::postprocess::{postprocess_sequence, program_concat, remove_pass};
use crate::results::{BenchmarkResult, SolutionType, StemSide};
use crate::store::{Problem, ProblemStore, ResultStore};

/// Length of the hash part of a stem id, in hex digits.
const STEM_HASH_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Completions requested per prefix.
    pub num_samples: usize,
    pub temperature: f64,
    pub ks: Vec<usize>,
    /// Run only the base tests of each problem.
    pub base_only: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_samples: 100,
            temperature: 0.5,
            ks: vec![1, 5, 10],
            base_only: false,
        }
    }
}

/// One stem pair with the names that identify it in the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StemCase {
    pub mutation: String,
    pub category: String,
    pub mutation_id: String,
    pub stem_id: String,
    pub original_prefix: String,
    pub mutated_prefix: String,
}

impl StemCase {
    pub fn stem(&self) -> MutatedStem {
        MutatedStem {
            original_stem: self.original_prefix.clone(),
            mutated_stem: self.mutated_prefix.clone(),
        }
    }

    pub fn prefix(&self, side: StemSide) -> &str {
        match side {
            StemSide::Original => &self.original_prefix,
            StemSide::Mutated => &self.mutated_prefix,
        }
    }
}

/// `<index>-<hash>`, where the hash covers both prefixes.
pub fn stem_id(index: usize, stem: &MutatedStem) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(stem.original_stem.as_bytes());
    hasher.update(&[0]);
    hasher.update(stem.mutated_stem.as_bytes());
    let hex = hasher.finalize().to_hex();
    format!("{}-{}", index, &hex.as_str()[..STEM_HASH_LEN])
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<BenchmarkResult>,
    /// Problems left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl RunSummary {
    pub fn incomplete(&self) -> usize {
        self.results.iter().filter(|r| r.incomplete).count()
    }
}

/// Per-mutation aggregate of pass@k over all its stems.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationSummary {
    pub mutation: String,
    pub stems: usize,
    pub mean_original: f64,
    pub mean_mutated: f64,
    pub log_ratio: f64,
    pub percent_change: f64,
    pub symmetric_percent_change: f64,
}

pub fn summarize_by_mutation(results: &[BenchmarkResult], k: usize) -> Vec<MutationSummary> {
    let mut groups: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for result in results {
        if let (Some(o), Some(m)) = (result.pass_at_original.get(&k), result.pass_at_mutated.get(&k)) {
            groups.entry(&result.mutation).or_default().push((*o, *m));
        }
    }
    groups
        .into_iter()
        .map(|(mutation, pairs)| {
            let n = pairs.len() as f64;
            let original = pairs.iter().map(|p| p.0).sum::<f64>() / n;
            let mutated = pairs.iter().map(|p| p.1).sum::<f64>() / n;
            MutationSummary {
                mutation: mutation.to_string(),
                stems: pairs.len(),
                mean_original: original,
                mean_mutated: mutated,
                log_ratio: safe_log_ratio(mutated, original),
                percent_change: percent_change(mutated, original),
                symmetric_percent_change: symmetric_percent_change(mutated, original),
            }
        })
        .collect()
}

/// Every stem pair of every registered mutation outside `exclude`, in
/// registry order.
pub fn collect_stems(
    registry: &MutationRegistry,
    engine: &Engine,
    exclude: &[MutationCategory],
    canonical: &str,
) -> Result<Vec<StemCase>, ParseError> {
    let mut cases = Vec::new();
    for (category, transformers) in registry.get(Some(exclude)) {
        for transformer in transformers {
            let name = transformer.name();
            let outputs = engine.transform(canonical, transformer.as_ref())?;
            let stems = stems_for(transformer.as_ref(), canonical, outputs)?;
            log::info!("{}: {} stem(s)", name, stems.len());
            for (i, stem) in stems.into_iter().enumerate() {
                cases.push(StemCase {
                    mutation: name.clone(),
                    category: category.to_string(),
                    mutation_id: format!("{}-{}", name, i),
                    stem_id: stem_id(cases.len(), &stem),
                    original_prefix: stem.original_stem,
                    mutated_prefix: stem.mutated_stem,
                });
            }
        }
    }
    Ok(cases)
}

pub struct Benchmark<'a, G: CodeGenerator + ?Sized> {
    registry: &'a MutationRegistry,
    generator: &'a G,
    engine: Engine,
    exclude: Vec<MutationCategory>,
    sampling: SamplingConfig,
    canonical: CanonicalConfig,
}

impl<'a, G: CodeGenerator + ?Sized> Benchmark<'a, G> {
    pub fn new(
        registry: &'a MutationRegistry,
        generator: &'a G,
        sampling: SamplingConfig,
        canonical: CanonicalConfig,
    ) -> Self {
        Self {
            registry,
            generator,
            engine: Engine::new(),
            exclude: Vec::new(),
            sampling,
            canonical,
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<MutationCategory>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Phase 1 for a canonical solution.
    pub fn collect_stems(&self, canonical: &str) -> Result<Vec<StemCase>, ParseError> {
        collect_stems(self.registry, &self.engine, &self.exclude, canonical)
    }

    /// Phases 2 to 4 for one stem. The result is persisted before it is
    /// returned.
    pub fn evaluate_stem<F: OracleFactory>(
        &self,
        pool: &mut SupervisedPool<F>,
        store: &mut dyn ResultStore,
        problem: &Arc<Problem>,
        case: &StemCase,
    ) -> Result<BenchmarkResult> {
        let mut result = BenchmarkResult::new(
            &problem.task_id,
            &case.mutation,
            &case.mutation_id,
            &case.stem_id,
        );
        result.add_stem(&case.stem());

        let mut candidates: Vec<(StemSide, String)> = Vec::new();
        let mut raw = serde_json::Map::new();
        for side in StemSide::BOTH {
            let prompt = remove_pass(case.prefix(side));
            let samples = self
                .generator
                .generate(&prompt, self.sampling.num_samples, self.sampling.temperature)
                .with_context(|| format!("sampling {} prefix of {}", side, case.stem_id))?;
            raw.insert(
                side.to_string(),
                json!(samples.iter().map(|s| &s.text).collect::<Vec<_>>()),
            );
            for sample in samples {
                let joined = program_concat(&prompt, &sample.text);
                match postprocess_sequence(&joined) {
                    Ok(code) => candidates.push((side, code)),
                    Err(e) => {
                        log::debug!("{} {}: {}", case.stem_id, side, e);
                        result.add_example(joined, SolutionType::BadPostProcess, side);
                    }
                }
            }
        }

        let tasks = candidates
            .iter()
            .map(|(_, code)| Task {
                problem: problem.clone(),
                candidate: code.clone(),
                base_only: self.sampling.base_only,
            })
            .collect();
        let report = pool
            .run_batch(tasks)
            .with_context(|| format!("checking candidates of {}", case.stem_id))?;

        for ((side, code), outcome) in candidates.into_iter().zip(report.results) {
            match outcome {
                TaskResult::Report(report) => result.add_example(code, report.classify(), side),
                TaskResult::Error(e) => {
                    log::error!("{} {}: oracle error: {}", case.stem_id, side, e);
                    result.add_example(code, SolutionType::Error, side);
                }
                TaskResult::Unresolved => result.add_unresolved(side, 1),
            }
        }
        result.compute_metrics(&self.sampling.ks);
        if result.incomplete {
            log::warn!(
                "{}: {} original and {} mutated candidates unresolved",
                case.stem_id,
                result.unresolved.original,
                result.unresolved.mutated
            );
        }

        raw.insert("stem_id".to_string(), json!(case.stem_id));
        raw.insert("mutation_id".to_string(), json!(case.mutation_id));
        store.persist_raw(&problem.task_id, &serde_json::Value::Object(raw))?;
        store.persist(&result)?;
        log::info!(
            "{} {}: pass@k original {:?} mutated {:?}",
            problem.task_id,
            case.mutation_id,
            result.pass_at_original,
            result.pass_at_mutated
        );
        Ok(result)
    }

    /// Runs every listed problem. Problems without a usable canonical
    /// solution are logged and skipped; any other failure stops the run.
    pub fn run<F: OracleFactory>(
        &self,
        pool: &mut SupervisedPool<F>,
        problems: &dyn ProblemStore,
        ids: &[String],
        store: &mut dyn ResultStore,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for id in ids {
            log::info!("Evaluating problem: {}", id);
            let problem = problems.get_problem(id)?;
            let canonical = {
                let mut selector = CanonicalSelector::new(self.generator, pool, &self.canonical);
                match selector.canonical_solution(&problem) {
                    Ok(solution) => solution,
                    Err(e @ CanonicalError::NoPassingSolution { .. }) => {
                        log::error!("Skipping {}: {}", id, e);
                        summary.skipped.push((id.clone(), e.to_string()));
                        continue;
                    }
                    Err(e) => {
                        return Err(e).with_context(|| format!("canonical solution for {}", id))
                    }
                }
            };
            let cases = match self.collect_stems(&canonical.code) {
                Ok(cases) => cases,
                Err(e) => {
                    log::error!("Skipping {}: canonical solution does not parse: {}", id, e);
                    summary.skipped.push((id.clone(), e.to_string()));
                    continue;
                }
            };
            log::info!("{}: {} stems to evaluate", id, cases.len());
            for case in &cases {
                let result = self.evaluate_stem(pool, store, &problem, case)?;
                summary.results.push(result);
            }
        }
        Ok(summary)
    }
}
