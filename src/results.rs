// SPDX-License-Identifier: Apache-2.0

//! Records produced by the benchmark: sampled solutions and the per-stem
//! result with its classified examples and derived pass@k metrics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use stembench_mutate::MutatedStem;

use crate::metrics::{average_levenshtein, pass_at_k, pass_ratio};

/// Generated code with the model's cumulative log-probability for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub code: String,
    pub cumulative_logprob: f64,
    /// Indices of the tests the code failed, once it has been checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_tests: Option<Vec<usize>>,
}

impl Solution {
    pub fn new(code: impl Into<String>, cumulative_logprob: f64) -> Self {
        Self {
            code: code.into(),
            cumulative_logprob,
            failed_tests: None,
        }
    }
}

/// Which prefix of a stem pair a completion continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemSide {
    Original,
    Mutated,
}

impl StemSide {
    pub const BOTH: [StemSide; 2] = [StemSide::Original, StemSide::Mutated];
}

impl fmt::Display for StemSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StemSide::Original => write!(f, "original"),
            StemSide::Mutated => write!(f, "mutated"),
        }
    }
}

/// Outcome class of one checked completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionType {
    Passed,
    Failed,
    /// The oracle ran no tests.
    BadSyntax,
    /// Postprocessing rejected the completion before it was checked.
    BadPostProcess,
    /// The oracle crashed on it.
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidePair<T> {
    pub original: T,
    pub mutated: T,
}

impl<T> SidePair<T> {
    pub fn get(&self, side: StemSide) -> &T {
        match side {
            StemSide::Original => &self.original,
            StemSide::Mutated => &self.mutated,
        }
    }

    pub fn get_mut(&mut self, side: StemSide) -> &mut T {
        match side {
            StemSide::Original => &mut self.original,
            StemSide::Mutated => &mut self.mutated,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Examples {
    pub passed: SidePair<Vec<String>>,
    pub failed: SidePair<Vec<String>>,
    pub bad_syntax: SidePair<Vec<String>>,
    pub bad_post_process: SidePair<Vec<String>>,
    pub error: SidePair<Vec<String>>,
}

impl Examples {
    pub fn bucket(&self, kind: SolutionType) -> &SidePair<Vec<String>> {
        match kind {
            SolutionType::Passed => &self.passed,
            SolutionType::Failed => &self.failed,
            SolutionType::BadSyntax => &self.bad_syntax,
            SolutionType::BadPostProcess => &self.bad_post_process,
            SolutionType::Error => &self.error,
        }
    }

    fn bucket_mut(&mut self, kind: SolutionType) -> &mut SidePair<Vec<String>> {
        match kind {
            SolutionType::Passed => &mut self.passed,
            SolutionType::Failed => &mut self.failed,
            SolutionType::BadSyntax => &mut self.bad_syntax,
            SolutionType::BadPostProcess => &mut self.bad_post_process,
            SolutionType::Error => &mut self.error,
        }
    }

    pub fn count(&self, kind: SolutionType, side: StemSide) -> usize {
        self.bucket(kind).get(side).len()
    }
}

/// Outcome of one (problem, mutation, stem) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub problem_id: String,
    pub mutation: String,
    pub mutation_id: String,
    pub stem_id: String,
    pub original_prefix: Option<String>,
    pub mutated_prefix: Option<String>,
    pub pass_at_original: BTreeMap<usize, f64>,
    pub pass_at_mutated: BTreeMap<usize, f64>,
    pub pass_at_diff: BTreeMap<String, f64>,
    pub pass_at_ratio: BTreeMap<String, f64>,
    pub average_levenshtein: Option<f64>,
    /// Set when some completion of either side was never resolved.
    pub incomplete: bool,
    pub unresolved: SidePair<usize>,
    pub examples: Examples,
}

impl BenchmarkResult {
    pub fn new(
        problem_id: impl Into<String>,
        mutation: impl Into<String>,
        mutation_id: impl Into<String>,
        stem_id: impl Into<String>,
    ) -> Self {
        Self {
            problem_id: problem_id.into(),
            mutation: mutation.into(),
            mutation_id: mutation_id.into(),
            stem_id: stem_id.into(),
            original_prefix: None,
            mutated_prefix: None,
            pass_at_original: BTreeMap::new(),
            pass_at_mutated: BTreeMap::new(),
            pass_at_diff: BTreeMap::new(),
            pass_at_ratio: BTreeMap::new(),
            average_levenshtein: None,
            incomplete: false,
            unresolved: SidePair::default(),
            examples: Examples::default(),
        }
    }

    pub fn add_stem(&mut self, stem: &MutatedStem) {
        self.original_prefix = Some(stem.original_stem.clone());
        self.mutated_prefix = Some(stem.mutated_stem.clone());
    }

    pub fn add_example(&mut self, example: impl Into<String>, kind: SolutionType, side: StemSide) {
        self.examples
            .bucket_mut(kind)
            .get_mut(side)
            .push(example.into());
    }

    pub fn add_unresolved(&mut self, side: StemSide, count: usize) {
        *self.unresolved.get_mut(side) += count;
    }

    /// Completions of `side` that count toward pass@k: passed, failed and bad
    /// syntax. Rejected, crashed and unresolved ones are left out.
    pub fn evaluated(&self, side: StemSide) -> usize {
        self.examples.count(SolutionType::Passed, side)
            + self.examples.count(SolutionType::Failed, side)
            + self.examples.count(SolutionType::BadSyntax, side)
    }

    fn pass_at(&self, side: StemSide, ks: &[usize]) -> BTreeMap<usize, f64> {
        let n = self.evaluated(side);
        let c = self.examples.count(SolutionType::Passed, side);
        ks.iter()
            .map(|&k| {
                let value = if n == 0 { 0.0 } else { pass_at_k(n, c, k) };
                (k, value)
            })
            .collect()
    }

    /// Derives pass@k, differences, ratios and the edit distance between
    /// passing examples from the classified buckets. Only derived fields are
    /// written, so calling this again gives the same result.
    pub fn compute_metrics(&mut self, ks: &[usize]) {
        self.pass_at_original = self.pass_at(StemSide::Original, ks);
        self.pass_at_mutated = self.pass_at(StemSide::Mutated, ks);
        self.pass_at_diff.clear();
        self.pass_at_ratio.clear();
        for k in ks {
            let original = self.pass_at_original[k];
            let mutated = self.pass_at_mutated[k];
            let key = format!("pass@{}", k);
            self.pass_at_diff.insert(key.clone(), mutated - original);
            self.pass_at_ratio.insert(key, pass_ratio(mutated, original));
        }
        self.average_levenshtein = Some(average_levenshtein(
            &self.examples.passed.original,
            &self.examples.passed.mutated,
        ));
        self.incomplete = self.unresolved.original > 0 || self.unresolved.mutated > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled() -> BenchmarkResult {
        let mut result = BenchmarkResult::new("HumanEval/0", "InvertIf", "InvertIf-0", "0-abc");
        for i in 0..7 {
            result.add_example(format!("p{}", i), SolutionType::Passed, StemSide::Original);
        }
        for i in 0..3 {
            result.add_example(format!("f{}", i), SolutionType::Failed, StemSide::Original);
        }
        result.add_example("x", SolutionType::BadPostProcess, StemSide::Original);
        result.add_example("p", SolutionType::Passed, StemSide::Mutated);
        result.add_example("q", SolutionType::BadSyntax, StemSide::Mutated);
        result.add_example("boom", SolutionType::Error, StemSide::Mutated);
        result
    }

    #[test]
    fn denominators_leave_out_rejected_and_crashed() {
        let result = filled();
        assert_eq!(result.evaluated(StemSide::Original), 10);
        assert_eq!(result.evaluated(StemSide::Mutated), 2);
    }

    #[test]
    fn compute_metrics_fills_derived_fields() {
        let mut result = filled();
        result.compute_metrics(&[1, 5]);
        assert!((result.pass_at_original[&1] - 0.7).abs() < 1e-9);
        assert_eq!(result.pass_at_original[&5], 1.0);
        assert_eq!(result.pass_at_mutated[&1], 0.5);
        assert!((result.pass_at_diff["pass@1"] - (0.5 - 0.7)).abs() < 1e-9);
        assert!(result.pass_at_ratio["pass@1"] < 1.0);
        assert!(!result.incomplete);
        assert!(result.average_levenshtein.is_some());
    }

    #[test]
    fn compute_metrics_is_idempotent() {
        let mut result = filled();
        result.add_unresolved(StemSide::Mutated, 2);
        result.compute_metrics(&[1, 2]);
        let once = result.clone();
        result.compute_metrics(&[1, 2]);
        assert_eq!(result, once);
        assert!(result.incomplete);
    }

    #[test]
    fn side_with_nothing_evaluated_scores_zero() {
        let mut result = BenchmarkResult::new("p", "m", "m-0", "s");
        result.add_example("x", SolutionType::Passed, StemSide::Mutated);
        result.compute_metrics(&[1]);
        assert_eq!(result.pass_at_original[&1], 0.0);
        assert_eq!(result.pass_at_mutated[&1], 1.0);
        assert!(result.pass_at_ratio["pass@1"].is_finite());
    }

    #[test]
    fn serializes_as_a_flat_json_record() {
        let mut result = filled();
        result.add_stem(&MutatedStem {
            original_stem: "a = []".to_string(),
            mutated_stem: "a = [None]".to_string(),
        });
        result.compute_metrics(&[1]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["problem_id"], "HumanEval/0");
        assert_eq!(value["mutated_prefix"], "a = [None]");
        assert_eq!(value["examples"]["bad_post_process"]["original"][0], "x");
        assert_eq!(value["pass_at_mutated"]["1"], 0.5);
        let back: BenchmarkResult = serde_json::from_value(value).unwrap();
        assert_eq!(back.examples, result.examples);
        assert_eq!(back.pass_at_mutated, result.pass_at_mutated);
    }
}
