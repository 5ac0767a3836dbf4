// SPDX-License-Identifier: Apache-2.0

//! Runs the whole benchmark over a small problem file with an in-process
//! generator and oracle.

use std::sync::Mutex;

use pretty_assertions::assert_eq;
use stembench::{
    Benchmark, CanonicalConfig, CodeGenerator, FnOracle, JsonlProblemStore, JsonlResultStore,
    OracleReport, PoolConfig, Sample, SamplingConfig, SupervisedPool,
};
use stembench_mutate::{build_default_registry, MutationCategory};

const PROBLEMS: &str = r#"{"task_id": "Toy/double", "prompt": "def double(x):\n", "entry_point": "double"}
{"task_id": "Toy/never", "prompt": "def never():\n", "entry_point": "never"}
"#;

/// Answers every prompt with the same two completions, except prompts for
/// `never`, which only ever get broken code.
#[derive(Default)]
struct FixedGenerator {
    prompts: Mutex<Vec<String>>,
}

impl FixedGenerator {
    fn calls_for(&self, prompt: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == prompt)
            .count()
    }
}

impl CodeGenerator for FixedGenerator {
    fn generate(
        &self,
        prompt: &str,
        num_samples: usize,
        _temperature: f64,
    ) -> anyhow::Result<Vec<Sample>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let texts: &[(&str, f64)] = if prompt.starts_with("def never") {
            &[("    broken()", -0.1)]
        } else {
            &[("    return x * 2", -0.5), ("    return x + x", -0.1)]
        };
        Ok(texts
            .iter()
            .cycle()
            .take(num_samples)
            .map(|(text, logprob)| Sample {
                text: text.to_string(),
                cumulative_logprob: *logprob,
            })
            .collect())
    }
}

fn oracle() -> FnOracle {
    FnOracle::new(|_, candidate| {
        Ok(OracleReport {
            base: vec![u8::from(!candidate.contains("broken"))],
            plus: vec![1],
        })
    })
}

#[test]
fn run_evaluates_passing_problems_and_skips_the_rest() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let problems = JsonlProblemStore::from_jsonl(PROBLEMS).unwrap();
    let registry = build_default_registry().unwrap();
    let generator = FixedGenerator::default();
    let sampling = SamplingConfig {
        num_samples: 2,
        ks: vec![1, 2],
        ..SamplingConfig::default()
    };
    let canonical = CanonicalConfig {
        num_samples: 2,
        batch_size: 2,
        min_correct_samples: 1,
        cache_dir: dir.path().join("cache"),
        ..CanonicalConfig::default()
    };
    let bench = Benchmark::new(&registry, &generator, sampling, canonical)
        .with_exclude(vec![MutationCategory::CodeStyle]);
    let mut pool = SupervisedPool::new(
        oracle(),
        PoolConfig {
            workers: 2,
            ..PoolConfig::default()
        },
    );
    let ids = vec!["Toy/double".to_string(), "Toy/never".to_string()];

    let mut store = JsonlResultStore::new(&dir.path().join("first")).unwrap();
    let summary = bench.run(&mut pool, &problems, &ids, &mut store).unwrap();

    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, "Toy/never");
    assert!(!summary.results.is_empty());
    assert_eq!(summary.incomplete(), 0);
    assert!(summary
        .results
        .iter()
        .any(|r| r.mutation == "AdditionInversion"));
    for result in &summary.results {
        assert_eq!(result.problem_id, "Toy/double");
        assert_eq!(result.pass_at_original[&1], 1.0);
        assert_eq!(result.pass_at_mutated[&2], 1.0);
        assert_eq!(
            result.original_prefix.as_deref().map(|p| p.starts_with("def double(x):")),
            Some(true)
        );
    }
    let written = std::fs::read_to_string(store.results_path()).unwrap();
    assert_eq!(written.lines().count(), summary.results.len());
    assert!(dir.path().join("cache").join("Toy_double.json").exists());
    assert!(!dir.path().join("cache").join("Toy_never.json").exists());

    // The second run takes the canonical solution from the cache.
    assert_eq!(generator.calls_for("def double(x):\n"), 1);
    let mut store = JsonlResultStore::new(&dir.path().join("second")).unwrap();
    let again = bench
        .run(&mut pool, &problems, &ids[..1], &mut store)
        .unwrap();
    assert_eq!(generator.calls_for("def double(x):\n"), 1);
    assert_eq!(again.results.len(), summary.results.len());
    assert_eq!(pool.stats().restarts, 0);
}
