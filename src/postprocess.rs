// SPDX-License-Identifier: Apache-2.0

//! Cleanup of stems before prompting and of sampled completions before they
//! are checked.

use std::fmt;

/// Comments starting with this prefix were put there by a rewrite and are
/// part of the program under test.
pub const MUTATION_COMMENT_PREFIX: &str = "# I am a";

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostprocessError {
    UnterminatedString { line: usize },
    Empty,
}

impl fmt::Display for PostprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostprocessError::UnterminatedString { line } => {
                write!(f, "PostprocessError: unterminated string starting on line {}", line)
            }
            PostprocessError::Empty => write!(f, "PostprocessError: no code left"),
        }
    }
}

impl std::error::Error for PostprocessError {}

/// Drops a trailing `pass` line.
///
/// Rewrites that empty out a block leave a `pass` behind to keep the program
/// valid; the model should write that block itself.
pub fn remove_pass(prompt: &str) -> String {
    let lines: Vec<&str> = prompt.trim().lines().collect();
    match lines.split_last() {
        Some((last, rest)) if last.trim() == "pass" => rest.join("\n"),
        _ => prompt.to_string(),
    }
}

/// Appends a completion to its stem on a new line.
pub fn program_concat(stem: &str, completion: &str) -> String {
    let completion = completion.trim_start_matches('\n');
    if stem.ends_with('\n') {
        format!("{}{}", stem, completion)
    } else {
        format!("{}\n{}", stem, completion)
    }
}

/// Length of a string prefix (`r`, `b`, `f`, `rb`, ...) followed by a quote
/// at the start of `rest`, or `None` if `rest` does not open a string.
fn string_start(rest: &[char]) -> Option<usize> {
    let prefix = rest
        .iter()
        .take(2)
        .take_while(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
        .count();
    match rest.get(prefix) {
        Some('\'') | Some('"') => Some(prefix),
        _ => None,
    }
}

/// Index just past the string literal whose opening quote is at `start`.
fn string_end(chars: &[char], start: usize, line: usize) -> Result<usize, PostprocessError> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = if triple { start + 3 } else { start + 1 };
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' if !triple => break,
            c if c == quote => {
                if !triple {
                    return Ok(i + 1);
                }
                if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                    return Ok(i + 3);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    Err(PostprocessError::UnterminatedString { line })
}

fn leading_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Strips comments, except those left by rewrites, and optionally the
/// docstrings that open an indented block or the module. Blank lines go away
/// and the whole text is shifted left by the indentation of its first line.
pub fn remove_comments_and_docstrings(
    source: &str,
    remove_docstrings: bool,
) -> Result<String, PostprocessError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut line = 1;
    let mut depth = 0usize;
    let mut continued = false;
    let mut at_line_start = true;
    // Indentation of the last logical line; `None` before the first one.
    let mut last_indent: Option<usize> = None;
    let mut i = 0;
    while i < chars.len() {
        if at_line_start && depth == 0 && !continued {
            let indent = chars[i..]
                .iter()
                .take_while(|c| **c == ' ' || **c == '\t')
                .count();
            let first = i + indent;
            let blank = matches!(chars.get(first), None | Some('\n') | Some('#'));
            if !blank {
                let opens_block = last_indent.map_or(true, |last| indent > last);
                last_indent = Some(indent);
                if remove_docstrings && opens_block {
                    if let Some(prefix) = string_start(&chars[first..]) {
                        let end = string_end(&chars, first + prefix, line)?;
                        let tail_blank = chars[end..]
                            .iter()
                            .take_while(|c| **c != '\n')
                            .all(|c| c.is_whitespace());
                        if tail_blank {
                            line += chars[first..end].iter().filter(|c| **c == '\n').count();
                            i = end;
                            at_line_start = false;
                            continue;
                        }
                    }
                }
            }
        }
        at_line_start = false;
        let c = chars[i];
        match c {
            '\n' => {
                out.push(c);
                line += 1;
                at_line_start = true;
                i += 1;
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                out.push_str("\\\n");
                line += 1;
                continued = true;
                at_line_start = true;
                i += 2;
                continue;
            }
            '#' => {
                let end = chars[i..]
                    .iter()
                    .position(|c| *c == '\n')
                    .map_or(chars.len(), |p| i + p);
                let comment: String = chars[i..end].iter().collect();
                if comment.starts_with(MUTATION_COMMENT_PREFIX) {
                    out.push_str(&comment);
                }
                i = end;
            }
            '\'' | '"' => {
                let end = string_end(&chars, i, line)?;
                line += chars[i..end].iter().filter(|c| **c == '\n').count();
                out.extend(&chars[i..end]);
                i = end;
            }
            '(' | '[' | '{' => {
                depth += 1;
                out.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
        if c != '\\' {
            continued = false;
        }
    }

    let lines: Vec<&str> = out
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let base = lines.first().map_or(0, |l| leading_width(l));
    let cleaned: Vec<&str> = lines
        .into_iter()
        .map(|l| if l.len() > base { l.get(base..).unwrap_or(l) } else { l })
        .collect();
    Ok(cleaned.join("\n"))
}

/// Removes the whitespace prefix shared by every non-blank line; blank lines
/// become empty.
fn dedent(code: &str) -> Vec<String> {
    let margin = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..leading_width(l)])
        .reduce(|a, b| {
            let common = a
                .chars()
                .zip(b.chars())
                .take_while(|(x, y)| x == y)
                .map(|(x, _)| x.len_utf8())
                .sum::<usize>();
            &a[..common]
        })
        .unwrap_or("");
    code.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                l[margin.len()..].to_string()
            }
        })
        .collect()
}

/// Rescales indentation so that nesting levels are multiples of four
/// spaces. Model output sometimes indents by two or three.
pub fn normalize_indentation(code: &str) -> String {
    let mut lines: Vec<String> = dedent(code)
        .into_iter()
        .map(|l| l.replace('\t', INDENT).trim_end().to_string())
        .collect();
    let first_code = lines.iter().position(|l| !l.trim().is_empty());
    let Some(first_code) = first_code else {
        return String::new();
    };
    lines.drain(..first_code);

    let mut widths: Vec<usize> = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_width(l))
        .collect();
    widths.sort_unstable();
    widths.dedup();
    let a = widths[0];
    let b = widths.get(1).copied().unwrap_or(a);

    if a != 0 {
        let margin = " ".repeat(a);
        for l in lines.iter_mut() {
            if l.starts_with(&margin) {
                *l = l[a..].to_string();
            }
        }
    }

    lines
        .iter()
        .map(|l| {
            let width = leading_width(l);
            if width == 0 {
                return l.clone();
            }
            let spaces = if width == a { 0 } else { (width / b) * 4 };
            format!("{}{}", " ".repeat(spaces), l.trim_start())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalizes a sampled program before it is checked: comments and
/// docstrings go, indentation is rescaled.
pub fn postprocess_sequence(code: &str) -> Result<String, PostprocessError> {
    let stripped = remove_comments_and_docstrings(code, true)?;
    let normalized = normalize_indentation(&stripped);
    if normalized.trim().is_empty() {
        return Err(PostprocessError::Empty);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("while True:\n    pass", "while True:" ; "trailing pass")]
    #[test_case("while True:\n    pass\n\n", "while True:" ; "trailing blank lines")]
    #[test_case("x = 1\ny = 2", "x = 1\ny = 2" ; "no pass")]
    #[test_case("pass", "" ; "only pass")]
    fn remove_pass_cases(prompt: &str, want: &str) {
        assert_eq!(remove_pass(prompt), want);
    }

    #[test]
    fn concat_inserts_one_newline() {
        assert_eq!(program_concat("def f():", "\n\n    return 1"), "def f():\n    return 1");
        assert_eq!(program_concat("def f():\n", "    return 1"), "def f():\n    return 1");
    }

    #[test]
    fn comments_go_but_mutation_comments_stay() {
        let source = "
def f(x):
    # explain
    y = x  # trailing
    # I am a block comment
    return y  # I am a comment
";
        assert_eq!(
            remove_comments_and_docstrings(source, false).unwrap(),
            "def f(x):\n    y = x\n    # I am a block comment\n    return y  # I am a comment"
        );
    }

    #[test]
    fn hash_inside_strings_is_kept() {
        assert_eq!(
            remove_comments_and_docstrings("s = '# not a comment'  # gone", false).unwrap(),
            "s = '# not a comment'"
        );
    }

    #[test]
    fn docstrings_are_removed_on_request() {
        let source = "def f(x):\n    \"\"\"Doc\n    more.\n    \"\"\"\n    return 'x'\n";
        assert_eq!(
            remove_comments_and_docstrings(source, true).unwrap(),
            "def f(x):\n    return 'x'"
        );
        assert_eq!(
            remove_comments_and_docstrings(source, false).unwrap(),
            "def f(x):\n    \"\"\"Doc\n    more.\n    \"\"\"\n    return 'x'"
        );
    }

    #[test]
    fn string_statements_that_do_not_open_a_block_stay() {
        let source = "def f():\n    x = 1\n    'not a docstring'\n    return x";
        assert_eq!(remove_comments_and_docstrings(source, true).unwrap(), source);
    }

    #[test]
    fn base_indentation_is_removed() {
        assert_eq!(
            remove_comments_and_docstrings("    x = 1\n    if x:\n        y = 2", false).unwrap(),
            "x = 1\nif x:\n    y = 2"
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            remove_comments_and_docstrings("x = 1\ny = '''open", true),
            Err(PostprocessError::UnterminatedString { line: 2 })
        );
    }

    #[test]
    fn two_space_indentation_is_rescaled() {
        assert_eq!(
            normalize_indentation("def f(x):\n  if x:\n    return 1\n  return 2"),
            "def f(x):\n    if x:\n        return 1\n    return 2"
        );
    }

    #[test]
    fn tabs_and_margins_are_normalized() {
        assert_eq!(
            normalize_indentation("\n\n  def f():\n  \treturn 1   \n"),
            "def f():\n    return 1"
        );
        assert_eq!(normalize_indentation("   \n\n"), "");
    }

    #[test]
    fn postprocess_sequence_pipeline() {
        let code = "def f(a):\n  \"\"\"Adds one.\"\"\"\n  # bump\n  return a + 1\n";
        assert_eq!(postprocess_sequence(code).unwrap(), "def f(a):\n    return a + 1");
        assert_eq!(postprocess_sequence("# only a comment\n"), Err(PostprocessError::Empty));
    }
}
