// SPDX-License-Identifier: Apache-2.0

//! Runs the whole catalog over a realistic solution.

use pretty_assertions::assert_eq;
use stembench_mutate::{build_default_registry, stems_for, Engine, MutationCategory};
use stembench_pyast::Program;

const SOLUTION: &str = r#"
from typing import List


def separate_paren_groups(paren_string: str) -> List[str]:
    """ Split balanced groups of parentheses into separate strings.
    >>> separate_paren_groups('( ) (( ))')
    ['()', '(())']
    """
    result = []
    current_string = []
    current_depth = 0

    for c in paren_string:
        if c == '(':
            current_depth += 1
            current_string.append(c)
        elif c == ')':
            current_depth -= 1
            current_string.append(c)

            if current_depth == 0 and len(current_string) > 0:
                result.append(''.join(current_string))
                current_string.clear()

    return result


def count_up(n):
    total = 0
    for i in range(1, n, 2):
        total = total + i * 2
    while total > 100 or not n:
        total //= 2
    label = 'total: ' + str(total)
    lookup = {'a': 1, 'b': -4}
    return label if total % 3 != 0 else lookup
"#;

#[test]
fn every_output_parses_and_has_a_stem() {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = build_default_registry().unwrap();
    let engine = Engine::new();
    let normalized = Program::parse(SOLUTION).unwrap().unparse();
    let mut productive = 0;
    for transformers in registry.get(None).values() {
        for transformer in transformers {
            let outputs = engine
                .transform_all(SOLUTION, transformer.as_ref())
                .unwrap();
            for output in &outputs {
                assert!(
                    Program::parse(output).is_ok(),
                    "{} produced unparsable text:\n{}",
                    transformer.name(),
                    output
                );
                assert_ne!(output, &normalized);
            }
            let stems = stems_for(transformer.as_ref(), SOLUTION, outputs.clone()).unwrap();
            assert_eq!(stems.len(), outputs.len(), "{}", transformer.name());
            for (stem, output) in stems.iter().zip(&outputs) {
                assert!(normalized.starts_with(&stem.original_stem));
                assert!(output.starts_with(&stem.mutated_stem));
            }
            if !outputs.is_empty() {
                productive += 1;
            }
        }
    }
    assert!(productive > 30, "only {} transformers applied", productive);
}

#[test]
fn deterministic_transformers_repeat_exactly() {
    let registry = build_default_registry().unwrap();
    for transformers in registry.get(None).values() {
        for transformer in transformers.iter().filter(|t| t.deterministic()) {
            let first = Engine::with_seed(1)
                .transform_all(SOLUTION, transformer.as_ref())
                .unwrap();
            let second = Engine::with_seed(99)
                .transform_all(SOLUTION, transformer.as_ref())
                .unwrap();
            assert_eq!(first, second, "{}", transformer.name());
        }
    }
}

#[test]
fn outputs_are_unique() {
    let registry = build_default_registry().unwrap();
    for transformer in registry.get_category(MutationCategory::CodeStyle) {
        let outputs = Engine::new()
            .transform_all(SOLUTION, transformer.as_ref())
            .unwrap();
        let mut deduped = outputs.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), outputs.len(), "{}", transformer.name());
    }
}
