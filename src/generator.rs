// SPDX-License-Identifier: Apache-2.0

//! Sources of code completions.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::oracle::{spawn_writer, write_outcome};

/// One sampled completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub text: String,
    #[serde(default)]
    pub cumulative_logprob: f64,
}

pub trait CodeGenerator {
    fn generate(&self, prompt: &str, num_samples: usize, temperature: f64) -> Result<Vec<Sample>>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    num_samples: usize,
    temperature: f64,
}

/// Runs a command per request. The command reads
/// `{"prompt", "num_samples", "temperature"}` on stdin and prints a JSON
/// array of samples.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl CodeGenerator for CommandGenerator {
    fn generate(&self, prompt: &str, num_samples: usize, temperature: f64) -> Result<Vec<Sample>> {
        let request = serde_json::to_vec(&GenerateRequest {
            prompt,
            num_samples,
            temperature,
        })?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning generator {}", self.program))?;
        let writer = child
            .stdin
            .take()
            .map(|stdin| spawn_writer(stdin, request));
        let output = child
            .wait_with_output()
            .context("waiting for generator")?;
        if let Some(writer) = writer {
            write_outcome(writer)
                .map_err(|e| anyhow!("generator {}: {}", self.program, e))?;
        }
        if !output.status.success() {
            bail!(
                "generator {} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let samples: Vec<Sample> = serde_json::from_slice(&output.stdout)
            .context("parsing generator output as a JSON array of samples")?;
        log::debug!(
            "generator returned {} of {} samples",
            samples.len(),
            num_samples
        );
        Ok(samples)
    }
}

#[derive(Deserialize)]
struct ReplayRecord {
    prompt: String,
    samples: Vec<Sample>,
}

/// Serves recorded samples keyed by prompt. Each call hands out the next
/// unused samples for that prompt, so repeated requests see fresh ones.
pub struct ReplayGenerator {
    samples: HashMap<String, Vec<Sample>>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl ReplayGenerator {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading recorded samples from {}", path.display()))?;
        Self::from_jsonl(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// One `{"prompt": ..., "samples": [...]}` record per line. Records with
    /// the same prompt are concatenated.
    pub fn from_jsonl(text: &str) -> Result<Self> {
        let mut samples: HashMap<String, Vec<Sample>> = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(line)
                .with_context(|| format!("record on line {}", lineno + 1))?;
            samples
                .entry(record.prompt)
                .or_default()
                .extend(record.samples);
        }
        Ok(Self::from_map(samples))
    }

    pub fn from_map(samples: HashMap<String, Vec<Sample>>) -> Self {
        Self {
            samples,
            cursors: Mutex::new(HashMap::new()),
        }
    }
}

impl CodeGenerator for ReplayGenerator {
    fn generate(&self, prompt: &str, num_samples: usize, _temperature: f64) -> Result<Vec<Sample>> {
        let recorded = self
            .samples
            .get(prompt)
            .ok_or_else(|| anyhow!("no recorded samples for prompt {:?}", prompt))?;
        let mut cursors = self
            .cursors
            .lock()
            .map_err(|_| anyhow!("replay cursor lock poisoned"))?;
        let cursor = cursors.entry(prompt.to_string()).or_insert(0);
        let start = *cursor;
        let end = std::cmp::min(start + num_samples, recorded.len());
        *cursor = end;
        if end - start < num_samples {
            log::warn!(
                "replay: wanted {} samples, {} left for prompt",
                num_samples,
                end - start
            );
        }
        Ok(recorded[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replay_hands_out_fresh_samples() {
        let text = r#"
{"prompt": "def f():\n", "samples": [{"text": "    return 1", "cumulative_logprob": -1.5}]}
{"prompt": "def f():\n", "samples": [{"text": "    return 2"}, {"text": "    return 3"}]}
"#;
        let generator = ReplayGenerator::from_jsonl(text).unwrap();
        let first = generator.generate("def f():\n", 2, 0.8).unwrap();
        assert_eq!(
            first,
            vec![
                Sample {
                    text: "    return 1".to_string(),
                    cumulative_logprob: -1.5
                },
                Sample {
                    text: "    return 2".to_string(),
                    cumulative_logprob: 0.0
                },
            ]
        );
        let rest = generator.generate("def f():\n", 5, 0.8).unwrap();
        assert_eq!(rest.len(), 1);
        assert!(generator.generate("def f():\n", 1, 0.8).unwrap().is_empty());
        assert!(generator.generate("def g():\n", 1, 0.8).is_err());
    }

    #[test]
    fn command_generator_round_trip() {
        let generator = CommandGenerator::new(
            "sh",
            vec![
                "-c".to_string(),
                "grep -q '\"num_samples\":2' && echo '[{\"text\": \"a\", \"cumulative_logprob\": -0.5}, {\"text\": \"b\"}]'"
                    .to_string(),
            ],
        );
        let samples = generator.generate("x = ", 2, 0.2).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].cumulative_logprob, -0.5);
        assert_eq!(samples[1].text, "b");
    }

    #[test]
    fn large_prompt_and_large_output_do_not_deadlock() {
        // The child fills its stdout before it reads any of its input.
        let script = "printf '['; head -c 200000 /dev/zero | tr '\\0' ' '; \
                      printf '{\"text\": \"ok\", \"cumulative_logprob\": -1.0}]'; \
                      cat > /dev/null";
        let generator = CommandGenerator::new("sh", vec!["-c".to_string(), script.to_string()]);
        let prompt = "x = 1\n".repeat(200_000);
        let samples = generator.generate(&prompt, 1, 0.0).unwrap();
        assert_eq!(
            samples,
            vec![Sample {
                text: "ok".to_string(),
                cumulative_logprob: -1.0,
            }]
        );
    }

    #[test]
    fn failing_command_generator_is_an_error() {
        let generator = CommandGenerator::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; exit 1".to_string()],
        );
        assert!(generator.generate("x", 1, 0.0).is_err());
    }
}
