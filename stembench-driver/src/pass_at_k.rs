// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Context};
use clap::ArgMatches;
use serde::Serialize;
use stembench::pass_at_k;

#[derive(Serialize)]
struct PassAtK {
    n: usize,
    c: usize,
    k: usize,
    pass_at_k: f64,
}

fn count(matches: &ArgMatches, id: &str) -> anyhow::Result<usize> {
    let value = matches
        .get_one::<String>(id)
        .with_context(|| format!("missing --{}", id))?;
    value
        .parse::<usize>()
        .with_context(|| format!("invalid --{} value {:?}", id, value))
}

pub fn handle_pass_at_k(matches: &ArgMatches) -> anyhow::Result<()> {
    let n = count(matches, "n")?;
    let c = count(matches, "c")?;
    let k = count(matches, "k")?;
    if c > n {
        return Err(anyhow!("--c ({}) must not exceed --n ({})", c, n));
    }
    if k == 0 {
        return Err(anyhow!("--k must be positive"));
    }
    let value = pass_at_k(n, c, k);
    let json = matches.get_one::<String>("json").map(|s| s.as_str()) == Some("true");
    if json {
        let report = PassAtK {
            n,
            c,
            k,
            pass_at_k: value,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("pass@{}: {}", k, value);
    }
    Ok(())
}
