// SPDX-License-Identifier: Apache-2.0

use pretty_assertions::assert_eq;
use stembench_pyast::Program;
use test_case::test_case;

/// Canonical output must be a fixed point: parsing and unparsing it again
/// yields the same text.
fn assert_fixed_point(text: &str) {
    let first = Program::parse(text).expect("parse").unparse();
    let second = Program::parse(&first).expect("reparse").unparse();
    assert_eq!(first, second);
}

#[test]
fn realistic_solution_is_a_fixed_point() {
    let text = r#"
from typing import List


def has_close_elements(numbers: List[float], threshold: float) -> bool:
    """ Check if in given list of numbers, are any two numbers closer to each other than
    given threshold.
    >>> has_close_elements([1.0, 2.0, 3.0], 0.5)
    False
    """
    for idx, elem in enumerate(numbers):
        for idx2, elem2 in enumerate(numbers):
            if idx != idx2:
                distance = abs(elem - elem2)
                if distance < threshold:
                    return True

    return False
"#;
    assert_fixed_point(text);
    let out = Program::parse(text).unwrap().unparse();
    assert!(out.starts_with("from typing import List\n\ndef has_close_elements("));
    assert!(out.contains("    for (idx, elem) in enumerate(numbers):"));
}

#[test]
fn assorted_syntax_is_a_fixed_point() {
    let cases = [
        "x = lambda a, *b, c=1, **d: (a, b, c, d)",
        "async def f():\n    async with a as b:\n        await g()\n    async for i in h():\n        yield i",
        "@decorator(1)\nclass A(B, metaclass=M):\n    x: int = 3\n    def m(self):\n        return super().m()",
        "while True:\n    try:\n        break\n    except (A, B):\n        continue\n    else:\n        pass",
        "print(*args, sep='', **kw)",
        "y = {k: v for (k, v) in d.items() if v}",
        "z = (i for i in range(10))",
        "global a, b\ndel a[0], b.c",
        "assert x > 0, 'positive'",
        "w = a if b else c if d else e",
        "if (n := len(a)) > 10:\n    pass",
        "s = b'\\x00ab' + rb'\\d'",
        "t = x[::-1]",
        "u = not (a and b) or c",
    ];
    for case in cases {
        assert_fixed_point(case);
    }
}

#[test]
fn semicolons_and_inline_blocks_normalize() {
    let out = Program::parse("a = 1; b = 2\nif a: b = 3\n").unwrap().unparse();
    assert_eq!(out, "a = 1\nb = 2\nif a:\n    b = 3");
}

#[test_case("f'{x=}'", "f'x={x!r}'" ; "self documenting")]
#[test_case("f'a{x + 1 = :>4}'", "f'ax + 1 = {x + 1:>4}'" ; "self documenting with spec")]
#[test_case("f'{x=!s}'", "f'x={x!s}'" ; "self documenting with conversion")]
#[test_case("f'{a!=b}'", "f'{a != b}'" ; "not equal is not self documenting")]
#[test_case("f'{a==b}'", "f'{a == b}'" ; "equality is not self documenting")]
#[test_case("x = u'abc'", "x = u'abc'" ; "unicode prefix")]
#[test_case("x = U\"it's\" 'more'", "x = u\"it'smore\"" ; "unicode prefix on first part")]
#[test_case("x = 'a' u'b'", "x = 'ab'" ; "unicode prefix on later part")]
#[test_case("def f():\n    u\"\"\"doc\"\"\"", "def f():\n    u\"\"\"doc\"\"\"" ; "unicode docstring")]
fn string_forms_match_python(source: &str, want: &str) {
    let out = Program::parse(source).unwrap().unparse();
    assert_eq!(out, want);
    assert_fixed_point(source);
}
