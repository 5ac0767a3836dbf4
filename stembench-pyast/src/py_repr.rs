// SPDX-License-Identifier: Apache-2.0

//! Python-compatible literal rendering (`repr` of str, bytes, and float).

pub const ALL_QUOTES: &[&str] = &["'", "\"", "\"\"\"", "'''"];
pub const MULTI_QUOTES: &[&str] = &["\"\"\"", "'''"];

/// Approximates `str.isprintable` for a single character.
pub fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control() || c.is_whitespace() || c == '\u{ad}')
}

fn escape_code(c: char) -> String {
    let v = c as u32;
    if v < 0x100 {
        format!("\\x{:02x}", v)
    } else if v < 0x10000 {
        format!("\\u{:04x}", v)
    } else {
        format!("\\U{:08x}", v)
    }
}

/// Renders `s` between `quote` characters, escaping as `repr` does.
pub fn quote_str(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => out.push_str(&escape_code(c)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

pub fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    quote_str(s, quote)
}

pub fn bytes_repr(b: &[u8]) -> String {
    let quote = if b.contains(&b'\'') && !b.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::from("b");
    out.push(quote as char);
    for &c in b {
        match c {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c as char);
            }
            0x20..=0x7e => out.push(c as char),
            c => out.push_str(&format!("\\x{:02x}", c)),
        }
    }
    out.push(quote as char);
    out
}

/// Shortest round-trip rendering in the format of Python's `float.__repr__`.
pub fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let sci = format!("{:e}", v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(-4..16).contains(&exp) {
        let mut m = digits[..1].to_string();
        if digits.len() > 1 {
            m.push('.');
            m.push_str(&digits[1..]);
        }
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{}{}e{}{:02}", sign, m, exp_sign, exp.abs())
    } else if exp < 0 {
        format!("{}0.{}{}", sign, "0".repeat((-exp - 1) as usize), digits)
    } else {
        let point = (exp + 1) as usize;
        if digits.len() <= point {
            format!("{}{}{}.0", sign, digits, "0".repeat(point - digits.len()))
        } else {
            format!("{}{}.{}", sign, &digits[..point], &digits[point..])
        }
    }
}

/// Picks a quote from `quote_types` that lets `s` be written without
/// escaping its newlines or tabs, falling back to `repr` when none fits.
/// Returns the full literal including quotes.
pub fn literal_avoiding_backslashes(s: &str, quote_types: &[&'static str]) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' | '\t' => escaped.push(c),
            '\\' => escaped.push_str("\\\\"),
            '\r' => escaped.push_str("\\r"),
            c if !is_printable(c) => escaped.push_str(&escape_code(c)),
            c => escaped.push(c),
        }
    }
    let mut possible: Vec<&str> = quote_types.to_vec();
    if escaped.contains('\n') {
        possible.retain(|q| q.len() == 3);
    }
    possible.retain(|q| !escaped.contains(q));
    if possible.is_empty() {
        let r = str_repr(s);
        let first = r.chars().next().unwrap_or('\'');
        let quote = quote_types
            .iter()
            .find(|q| q.contains(first))
            .map(|q| q.to_string())
            .unwrap_or_else(|| first.to_string());
        return format!("{}{}{}", quote, &r[1..r.len() - 1], quote);
    }
    if let Some(last) = escaped.chars().last() {
        possible.sort_by_key(|q| q.starts_with(last));
        if possible[0].starts_with(last) {
            escaped.pop();
            escaped.push('\\');
            escaped.push(last);
        }
    }
    format!("{}{}{}", possible[0], escaped, possible[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("abc", "'abc'"; "plain")]
    #[test_case("it's", "\"it's\""; "single quote inside")]
    #[test_case("'\"", "'\\'\"'"; "both quotes")]
    #[test_case("a\nb\\", "'a\\nb\\\\'"; "escapes")]
    #[test_case("\x01", "'\\x01'"; "control")]
    #[test_case("a\u{ad}b", "'a\\xadb'"; "soft hyphen")]
    #[test_case("h\u{e9}\u{4e2d}", "'h\u{e9}\u{4e2d}'"; "printable non ascii")]
    #[test_case("\u{2028}", "'\\u2028'"; "line separator")]
    fn str_repr_matches_python(input: &str, want: &str) {
        assert_eq!(str_repr(input), want);
    }

    #[test_case(1.0, "1.0")]
    #[test_case(0.5, "0.5")]
    #[test_case(1e20, "1e+20")]
    #[test_case(1e16, "1e+16")]
    #[test_case(1e15, "1000000000000000.0")]
    #[test_case(0.0001, "0.0001")]
    #[test_case(0.00001, "1e-05")]
    #[test_case(-2.5, "-2.5")]
    #[test_case(123.456, "123.456")]
    fn float_repr_matches_python(v: f64, want: &str) {
        assert_eq!(float_repr(v), want);
    }

    #[test]
    fn bytes_repr_escapes_high_bytes() {
        assert_eq!(bytes_repr(b"hi\xff'"), "b\"hi\\xff'\"");
    }

    #[test]
    fn docstring_quotes_prefer_triple_double() {
        assert_eq!(
            literal_avoiding_backslashes("line\nnext", MULTI_QUOTES),
            "\"\"\"line\nnext\"\"\""
        );
        assert_eq!(
            literal_avoiding_backslashes("ends with \"", MULTI_QUOTES),
            "'''ends with \"'''"
        );
    }

    #[test]
    fn fstring_body_switches_quote() {
        assert_eq!(literal_avoiding_backslashes("{d['k']}", ALL_QUOTES), "\"{d['k']}\"");
    }
}
