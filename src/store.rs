// SPDX-License-Identifier: Apache-2.0

//! Problem and result stores backed by JSON-lines files.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::results::BenchmarkResult;

/// One benchmark problem. Fields the pipeline does not use are carried
/// through to the oracle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub task_id: String,
    pub prompt: String,
    pub entry_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Problem {
    pub fn new(
        task_id: impl Into<String>,
        prompt: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            prompt: prompt.into(),
            entry_point: entry_point.into(),
            expected_output: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Problem ids may contain `/` (`HumanEval/0`); file names use `_` instead.
pub fn file_stem_for(problem_id: &str) -> String {
    problem_id.replace('/', "_")
}

pub trait ProblemStore {
    fn get_problem(&self, id: &str) -> Result<Arc<Problem>>;

    fn get_expected_output(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.get_problem(id)?.expected_output.clone())
    }

    /// Every problem id, in store order.
    fn ids(&self) -> Vec<String>;
}

pub struct JsonlProblemStore {
    order: Vec<String>,
    problems: HashMap<String, Arc<Problem>>,
}

impl JsonlProblemStore {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading problems from {}", path.display()))?;
        Self::from_jsonl(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_jsonl(text: &str) -> Result<Self> {
        let mut order = Vec::new();
        let mut problems = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let problem: Problem = serde_json::from_str(line)
                .with_context(|| format!("problem on line {}", lineno + 1))?;
            if problems.contains_key(&problem.task_id) {
                return Err(anyhow!("duplicate problem id {}", problem.task_id));
            }
            order.push(problem.task_id.clone());
            problems.insert(problem.task_id.clone(), Arc::new(problem));
        }
        Ok(Self { order, problems })
    }
}

impl ProblemStore for JsonlProblemStore {
    fn get_problem(&self, id: &str) -> Result<Arc<Problem>> {
        self.problems
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown problem {}", id))
    }

    fn ids(&self) -> Vec<String> {
        self.order.clone()
    }
}

pub trait ResultStore {
    fn persist(&mut self, result: &BenchmarkResult) -> Result<()>;

    fn persist_raw(&mut self, problem_id: &str, data: &Value) -> Result<()>;
}

/// Appends results to `<dir>/results.jsonl` and raw records to
/// `<dir>/raw/<problem>.jsonl`.
pub struct JsonlResultStore {
    dir: PathBuf,
}

impl JsonlResultStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir.join("raw"))
            .with_context(|| format!("creating result directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join("results.jsonl")
    }

    pub fn raw_path(&self, problem_id: &str) -> PathBuf {
        self.dir
            .join("raw")
            .join(format!("{}.jsonl", file_stem_for(problem_id)))
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "{}", line).with_context(|| format!("writing {}", path.display()))
}

impl ResultStore for JsonlResultStore {
    fn persist(&mut self, result: &BenchmarkResult) -> Result<()> {
        let line = serde_json::to_string(result)?;
        append_line(&self.results_path(), &line)
    }

    fn persist_raw(&mut self, problem_id: &str, data: &Value) -> Result<()> {
        let line = serde_json::to_string(data)?;
        append_line(&self.raw_path(problem_id), &line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PROBLEMS: &str = r#"
{"task_id": "HumanEval/0", "prompt": "def f():\n", "entry_point": "f", "expected_output": [1]}
{"task_id": "HumanEval/1", "prompt": "def g():\n", "entry_point": "g", "base_input": [[1]]}
"#;

    #[test]
    fn problems_load_in_order_with_extra_fields() {
        let store = JsonlProblemStore::from_jsonl(PROBLEMS).unwrap();
        assert_eq!(store.ids(), vec!["HumanEval/0", "HumanEval/1"]);
        let p = store.get_problem("HumanEval/1").unwrap();
        assert_eq!(p.entry_point, "g");
        assert_eq!(p.extra["base_input"], json!([[1]]));
        assert_eq!(
            store.get_expected_output("HumanEval/0").unwrap(),
            Some(json!([1]))
        );
        assert!(store.get_problem("HumanEval/9").is_err());
    }

    #[test]
    fn duplicate_and_malformed_lines_are_rejected() {
        let dup = format!("{}\n{}", PROBLEMS.trim(), PROBLEMS.trim());
        assert!(JsonlProblemStore::from_jsonl(&dup).is_err());
        assert!(JsonlProblemStore::from_jsonl("{not json}").is_err());
    }

    #[test]
    fn results_are_appended_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonlResultStore::new(dir.path()).unwrap();
        store
            .persist(&BenchmarkResult::new("HumanEval/0", "InvertIf", "InvertIf-0", "0-a"))
            .unwrap();
        store
            .persist(&BenchmarkResult::new("HumanEval/0", "InvertIf", "InvertIf-1", "1-b"))
            .unwrap();
        store
            .persist_raw("HumanEval/0", &json!({"samples": 3}))
            .unwrap();

        let text = fs::read_to_string(store.results_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: BenchmarkResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.stem_id, "1-b");
        let raw = fs::read_to_string(dir.path().join("raw/HumanEval_0.jsonl")).unwrap();
        assert_eq!(raw.trim(), r#"{"samples":3}"#);
    }
}
