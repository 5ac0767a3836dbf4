// SPDX-License-Identifier: Apache-2.0

//! Truncation of an original/mutated program pair at their first point of
//! divergence.

use stembench_pyast::{ParseError, Program};

use crate::transforms::Transformer;

/// Completion prompts cut from an original program and one of its mutations.
/// Both share every line before the divergence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutatedStem {
    pub original_stem: String,
    pub mutated_stem: String,
}

/// Blank lines, comments and lines that open a string literal carry no
/// code a model could diverge on.
fn is_filler(line: &str) -> bool {
    let line = line.trim();
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("\"\"\"")
        || line.starts_with("'''")
}

fn skip_filler(lines: &[&str], mut index: usize) -> usize {
    while index < lines.len() && is_filler(lines[index]) {
        index += 1;
    }
    index
}

/// Finds the first line at which `mutated` departs from `original` and cuts
/// both just past it.
///
/// Each side keeps its first substantive line after the divergence.
/// `extra_skips` further non-blank lines are kept on the mutated side, for
/// rewrites that insert statements before the changed one. Returns `None`
/// when both texts have the same lines.
pub fn parse_stem(original: &str, mutated: &str, extra_skips: usize) -> Option<MutatedStem> {
    let old_lines: Vec<&str> = original.lines().collect();
    let new_lines: Vec<&str> = mutated.lines().collect();
    if old_lines == new_lines {
        return None;
    }

    let mut old_index = 0;
    let mut new_index = 0;
    while old_index < old_lines.len() && new_index < new_lines.len() {
        let old_line = old_lines[old_index];
        if old_line.trim() != new_lines[new_index].trim() && !is_filler(old_line) {
            break;
        }
        old_index += 1;
        new_index += 1;
    }

    old_index = skip_filler(&old_lines, old_index);
    new_index = skip_filler(&new_lines, new_index);
    if old_index < old_lines.len() {
        old_index += 1;
    }
    if new_index < new_lines.len() {
        new_index += 1;
    }

    let mut skipped = 0;
    while skipped < extra_skips && new_index < new_lines.len() {
        if !new_lines[new_index].trim().is_empty() {
            skipped += 1;
        }
        new_index += 1;
    }

    Some(MutatedStem {
        original_stem: old_lines[..old_index].join("\n"),
        mutated_stem: new_lines[..new_index].join("\n"),
    })
}

/// Extracts a stem for every mutated output of `transformer`.
///
/// `original` is put through the parser first so that it is rendered the same
/// way the engine renders its outputs. Outputs that do not diverge are
/// dropped.
pub fn stems_for<I>(
    transformer: &dyn Transformer,
    original: &str,
    outputs: I,
) -> Result<Vec<MutatedStem>, ParseError>
where
    I: IntoIterator<Item = String>,
{
    let normalized = Program::parse(original)?.unparse();
    let extra_skips = transformer.stem_extra_skips();
    let mut stems = Vec::new();
    for output in outputs {
        match parse_stem(&normalized, &output, extra_skips) {
            Some(stem) => stems.push(stem),
            None => log::warn!(
                "{}: mutated output has no divergence, dropping it",
                transformer.name()
            ),
        }
    }
    Ok(stems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::transforms::{arrays, loops};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn stem(original: &str, mutated: &str) -> MutatedStem {
        MutatedStem {
            original_stem: original.to_string(),
            mutated_stem: mutated.to_string(),
        }
    }

    #[test]
    fn single_line_divergence() {
        assert_eq!(
            parse_stem("a = []", "a = [None]", 0),
            Some(stem("a = []", "a = [None]"))
        );
    }

    #[test_case("a = 1\nb = 2" ; "plain")]
    #[test_case("" ; "empty")]
    #[test_case("def f():\n    '''doc'''\n    return 1" ; "docstring")]
    fn identical_text_has_no_stem(text: &str) {
        assert_eq!(parse_stem(text, text, 0), None);
        assert_eq!(parse_stem(text, text, 3), None);
    }

    #[test]
    fn stem_of_a_stem_has_no_divergence() {
        let s = parse_stem("x = 1\ny = 2\nz = 3", "x = 1\ny = 5\nz = 3", 0).unwrap();
        assert_eq!(parse_stem(&s.original_stem, &s.original_stem, 0), None);
        assert_eq!(parse_stem(&s.mutated_stem, &s.mutated_stem, 0), None);
    }

    #[test]
    fn cut_just_past_the_divergence() {
        assert_eq!(
            parse_stem("x = 1\ny = 2\nz = 3", "x = 1\ny = 5\nz = 3", 0),
            Some(stem("x = 1\ny = 2", "x = 1\ny = 5"))
        );
    }

    #[test]
    fn comments_and_blanks_after_divergence_are_skipped() {
        let original = "def f():\n    # note\n\n    return 1\nprint(f())";
        let mutated = "def g():\n    # note\n\n    return 1\nprint(f())";
        assert_eq!(
            parse_stem(original, mutated, 0),
            Some(stem("def f():", "def g():"))
        );
        let original = "x = 1\ny = 2";
        let mutated = "x = 1\n# I am a block comment\n\ny = 2";
        assert_eq!(
            parse_stem(original, mutated, 0),
            Some(stem("x = 1\ny = 2", "x = 1\n# I am a block comment\n\ny = 2"))
        );
    }

    #[test]
    fn docstring_lines_in_the_original_do_not_diverge() {
        let original = "def f():\n    '''Doc.'''\n    return 1";
        let mutated = "def f():\n    x = 0\n    return 2";
        assert_eq!(
            parse_stem(original, mutated, 0),
            Some(stem(
                "def f():\n    '''Doc.'''\n    return 1",
                "def f():\n    x = 0\n    return 2"
            ))
        );
    }

    #[test]
    fn extra_skips_extend_the_mutated_side() {
        let original = "for i in range(n):\n    print(i)\nx = 1";
        let mutated = "i = 0\nwhile i < n:\n    print(i)\n    i += 1\nx = 1";
        assert_eq!(
            parse_stem(original, mutated, 0),
            Some(stem("for i in range(n):", "i = 0"))
        );
        assert_eq!(
            parse_stem(original, mutated, 1),
            Some(stem("for i in range(n):", "i = 0\nwhile i < n:"))
        );
        // Skips stop at the end of the text.
        assert_eq!(
            parse_stem(original, mutated, 50),
            Some(stem("for i in range(n):", mutated))
        );
    }

    #[test]
    fn single_element_initializer_stems() {
        let transformer = arrays::SingleElementInitializer;
        let outputs = Engine::new().transform_all("a = []", &transformer).unwrap();
        assert_eq!(outputs, vec!["a = [None]".to_string()]);
        let stems = stems_for(&transformer, "a = []", outputs).unwrap();
        assert_eq!(stems, vec![stem("a = []", "a = [None]")]);
    }

    #[test]
    fn repeated_statements_diverge_on_distinct_lines() {
        let transformer = crate::transforms::numbers::IntegerReplacement;
        let source = "a = 1\na = 1";
        let outputs = Engine::new().transform_all(source, &transformer).unwrap();
        assert_eq!(outputs.len(), 2);
        let stems = stems_for(&transformer, source, outputs).unwrap();
        assert_eq!(
            stems,
            vec![
                stem("a = 1", "a = 6 + -5"),
                stem("a = 1\na = 1", "a = 1\na = 6 + -5")
            ]
        );
    }

    #[test]
    fn for_to_while_stem_keeps_the_inserted_counter() {
        let transformer = loops::ForToWhile;
        let source = "def f(n):\n    for i in range(n):\n        print(i)\n    return n\n";
        let outputs = Engine::new().transform_all(source, &transformer).unwrap();
        let stems = stems_for(&transformer, source, outputs).unwrap();
        assert_eq!(
            stems,
            vec![stem(
                "def f(n):\n    for i in range(n):",
                "def f(n):\n    i = 0\n    while i < n:"
            )]
        );
    }

    #[test]
    fn non_divergent_outputs_are_dropped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let stems = stems_for(
            &arrays::SingleElementInitializer,
            "a   =  []",
            vec!["a = []".to_string(), "a = [None]".to_string()],
        )
        .unwrap();
        assert_eq!(stems, vec![stem("a = []", "a = [None]")]);
    }

    #[test]
    fn unparsable_original_is_an_error() {
        assert!(stems_for(&arrays::SingleElementInitializer, "def (", Vec::new()).is_err());
    }
}
