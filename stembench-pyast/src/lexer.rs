// SPDX-License-Identifier: Apache-2.0

//! Tokenizer for Python source, including the indentation tokens that the
//! parser uses for block structure.

use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrToken {
    /// Lowercased string prefix, e.g. `""`, `"r"`, `"b"`, `"rb"`, `"f"`.
    pub prefix: String,
    /// Raw text between the quotes, escapes left untouched.
    pub body: String,
    pub quote: char,
    pub triple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number(String),
    Str(StrToken),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Longest operators first so a linear scan picks the maximal munch.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", ">>", "<<", "<=", ">=", "==", "!=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "&", "|", "^",
    "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "@", "=",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(input);
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer {
    chars: Vec<char>,
    offset: usize,
    line: usize,
    paren_depth: usize,
    indent_stack: Vec<usize>,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            offset: 0,
            line: 1,
            paren_depth: 0,
            indent_stack: vec![0],
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn peekc(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    fn peekc_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.offset + n).copied()
    }

    fn peek_is(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peekc_at(i) == Some(c))
    }

    fn dropc(&mut self) -> Option<char> {
        let c = self.peekc()?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
    }

    fn error(&self, msg: &str) -> ParseError {
        ParseError::new(msg.to_string(), self.line)
    }

    fn drop_comment(&mut self) {
        while let Some(c) = self.peekc() {
            if c == '\n' {
                break;
            }
            self.offset += 1;
        }
    }

    /// Measures indentation at the start of a logical line and emits
    /// `Indent`/`Dedent` tokens. Returns false if the line is blank.
    fn handle_line_start(&mut self) -> Result<bool, ParseError> {
        let mut column = 0;
        loop {
            match self.peekc() {
                Some(' ') => column += 1,
                Some('\t') => column = (column / 8 + 1) * 8,
                Some('\x0c') => column = 0,
                Some('\r') => {}
                _ => break,
            }
            self.offset += 1;
        }
        match self.peekc() {
            None => return Ok(false),
            Some('\n') => {
                self.dropc();
                return Ok(false);
            }
            Some('#') => {
                self.drop_comment();
                return Ok(false);
            }
            _ => {}
        }
        let top = *self.indent_stack.last().unwrap_or(&0);
        if column > top {
            self.indent_stack.push(column);
            self.push(TokenKind::Indent);
        } else if column < top {
            while column < *self.indent_stack.last().unwrap_or(&0) {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent);
            }
            if column != *self.indent_stack.last().unwrap_or(&0) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        Ok(true)
    }

    fn run(&mut self) -> Result<(), ParseError> {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                if !self.handle_line_start()? {
                    if self.peekc().is_none() {
                        break;
                    }
                    continue;
                }
                self.at_line_start = false;
            }
            let c = match self.peekc() {
                Some(c) => c,
                None => break,
            };
            match c {
                ' ' | '\t' | '\x0c' | '\r' => {
                    self.offset += 1;
                }
                '\n' => {
                    if self.paren_depth == 0 {
                        self.push(TokenKind::Newline);
                        self.at_line_start = true;
                    }
                    self.dropc();
                }
                '#' => self.drop_comment(),
                '\\' => {
                    if self.peek_is("\\\n") {
                        self.dropc();
                        self.dropc();
                    } else if self.peek_is("\\\r\n") {
                        self.dropc();
                        self.dropc();
                        self.dropc();
                    } else {
                        return Err(self.error("unexpected character after line continuation"));
                    }
                }
                '"' | '\'' => self.lex_string(String::new())?,
                c if c.is_ascii_digit()
                    || (c == '.' && self.peekc_at(1).map_or(false, |d| d.is_ascii_digit())) =>
                {
                    self.lex_number()?
                }
                c if c == '_' || c.is_alphabetic() => {
                    let start = self.offset;
                    while let Some(c) = self.peekc() {
                        if c == '_' || c.is_alphanumeric() {
                            self.offset += 1;
                        } else {
                            break;
                        }
                    }
                    let name: String = self.chars[start..self.offset].iter().collect();
                    let lowered = name.to_ascii_lowercase();
                    if STRING_PREFIXES.contains(&lowered.as_str())
                        && matches!(self.peekc(), Some('"') | Some('\''))
                    {
                        self.lex_string(lowered)?;
                    } else {
                        self.push(TokenKind::Name(name));
                    }
                }
                _ => {
                    let op = OPERATORS
                        .iter()
                        .find(|op| self.peek_is(op))
                        .copied()
                        .ok_or_else(|| self.error(&format!("unexpected character {:?}", c)))?;
                    self.offset += op.chars().count();
                    match op {
                        "(" | "[" | "{" => self.paren_depth += 1,
                        ")" | "]" | "}" => self.paren_depth = self.paren_depth.saturating_sub(1),
                        _ => {}
                    }
                    self.push(TokenKind::Op(op));
                }
            }
        }
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        ) {
            self.push(TokenKind::Newline);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::EndMarker);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let start = self.offset;
        let radix_prefix = self.peekc() == Some('0')
            && matches!(
                self.peekc_at(1),
                Some('x') | Some('X') | Some('o') | Some('O') | Some('b') | Some('B')
            );
        if radix_prefix {
            self.offset += 2;
            while let Some(c) = self.peekc() {
                if c.is_ascii_hexdigit() || c == '_' {
                    self.offset += 1;
                } else {
                    break;
                }
            }
        } else {
            self.eat_digits();
            if self.peekc() == Some('.') {
                self.offset += 1;
                self.eat_digits();
            }
            if matches!(self.peekc(), Some('e') | Some('E')) {
                let sign_len = match self.peekc_at(1) {
                    Some('+') | Some('-') => 1,
                    _ => 0,
                };
                if self
                    .peekc_at(1 + sign_len)
                    .map_or(false, |d| d.is_ascii_digit())
                {
                    self.offset += 1 + sign_len;
                    self.eat_digits();
                }
            }
            if matches!(self.peekc(), Some('j') | Some('J')) {
                self.offset += 1;
            }
        }
        let text: String = self.chars[start..self.offset].iter().collect();
        if self.peekc().map_or(false, |c| c.is_alphanumeric() || c == '_') {
            return Err(self.error(&format!("invalid number literal {:?}", text)));
        }
        self.push(TokenKind::Number(text));
        Ok(())
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peekc() {
            if c.is_ascii_digit() || c == '_' {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, prefix: String) -> Result<(), ParseError> {
        let start_line = self.line;
        let quote = match self.dropc() {
            Some(q) => q,
            None => return Err(self.error("expected string quote")),
        };
        let triple = self.peekc() == Some(quote) && self.peekc_at(1) == Some(quote);
        if triple {
            self.offset += 2;
        }
        let mut body = String::new();
        loop {
            let c = match self.dropc() {
                Some(c) => c,
                None => {
                    return Err(ParseError::new(
                        "unterminated string literal".to_string(),
                        start_line,
                    ))
                }
            };
            if c == '\\' {
                body.push(c);
                match self.dropc() {
                    Some(next) => body.push(next),
                    None => {
                        return Err(ParseError::new(
                            "unterminated string literal".to_string(),
                            start_line,
                        ))
                    }
                }
                continue;
            }
            if c == quote {
                if !triple {
                    break;
                }
                if self.peekc() == Some(quote) && self.peekc_at(1) == Some(quote) {
                    self.offset += 2;
                    break;
                }
            }
            if c == '\n' && !triple {
                return Err(ParseError::new(
                    "unterminated string literal".to_string(),
                    start_line,
                ));
            }
            body.push(c);
        }
        self.tokens.push(Token {
            kind: TokenKind::Str(StrToken {
                prefix,
                body,
                quote,
                triple,
            }),
            line: start_line,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn indentation_produces_indent_and_dedent() {
        let got = kinds("if a:\n    b\nc\n");
        assert_eq!(
            got,
            vec![
                TokenKind::Name("if".to_string()),
                TokenKind::Name("a".to_string()),
                TokenKind::Op(":"),
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name("b".to_string()),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name("c".to_string()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_joined() {
        let got = kinds("x = [1,\n     2]\n");
        assert!(!got[..got.len() - 2].contains(&TokenKind::Newline));
    }

    #[test]
    fn comments_and_blank_lines_are_dropped() {
        let got = kinds("# header\n\na = 1  # trailing\n\n");
        assert_eq!(
            got,
            vec![
                TokenKind::Name("a".to_string()),
                TokenKind::Op("="),
                TokenKind::Number("1".to_string()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn string_prefixes_and_triple_quotes() {
        let got = kinds("rb'\\d' '''a\nb'''");
        assert_eq!(
            got[0],
            TokenKind::Str(StrToken {
                prefix: "rb".to_string(),
                body: "\\d".to_string(),
                quote: '\'',
                triple: false,
            })
        );
        assert_eq!(
            got[1],
            TokenKind::Str(StrToken {
                prefix: String::new(),
                body: "a\nb".to_string(),
                quote: '\'',
                triple: true,
            })
        );
    }

    #[test]
    fn numbers_keep_their_spelling() {
        let got = kinds("0x_ff 1_000 1.5e-3 2j .5");
        let nums: Vec<String> = got
            .into_iter()
            .filter_map(|k| match k {
                TokenKind::Number(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(nums, vec!["0x_ff", "1_000", "1.5e-3", "2j", ".5"]);
    }

    #[test]
    fn unterminated_string_reports_line() {
        let err = tokenize("a = 1\nb = 'oops\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let err = tokenize("if a:\n        b\n    c\n").unwrap_err();
        assert!(err.to_string().contains("unindent"));
    }
}
