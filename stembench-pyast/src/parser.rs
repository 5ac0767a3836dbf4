// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser for Python modules.

use crate::ast::{
    Alias, BinOperator, BoolOperator, CmpOperator, Constant, LiteralStyle, NodePayload, NodeRef,
    UnaryOperator,
};
use crate::lexer::{self, StrToken, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    msg: String,
    line: usize,
}

impl ParseError {
    pub fn new(msg: String, line: usize) -> Self {
        Self { msg, line }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParseError: {} (line {})", self.msg, self.line)
    }
}

impl std::error::Error for ParseError {}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const AUG_ASSIGN_OPS: &[&str] = &[
    "+=", "-=", "*=", "@=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "**=", "//=",
];

pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nodes: Vec<NodePayload>,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: lexer::tokenize(input)?,
            pos: 0,
            nodes: Vec::new(),
        })
    }

    fn add(&mut self, payload: NodePayload) -> NodeRef {
        let index = self.nodes.len();
        self.nodes.push(payload);
        NodeRef { index }
    }

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let i = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, msg: &str) -> ParseError {
        ParseError::new(format!("{}; found {:?}", msg, self.peek()), self.line())
    }

    fn peek_is(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn peek_keyword_is(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(n) if n == kw)
    }

    fn try_drop(&mut self, op: &str) -> bool {
        if self.peek_is(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_drop_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword_is(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn drop_or_error(&mut self, op: &str, ctx: &str) -> Result<(), ParseError> {
        if self.try_drop(op) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?} in {}", op, ctx)))
        }
    }

    fn drop_keyword_or_error(&mut self, kw: &str, ctx: &str) -> Result<(), ParseError> {
        if self.try_drop_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(&format!("expected keyword {:?} in {}", kw, ctx)))
        }
    }

    fn parse_identifier(&mut self, ctx: &str) -> Result<String, ParseError> {
        match self.peek().clone() {
            TokenKind::Name(n) if !is_keyword(&n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.error(&format!("expected identifier in {}", ctx))),
        }
    }

    fn at_newline(&self) -> bool {
        matches!(self.peek(), TokenKind::Newline | TokenKind::EndMarker)
    }

    /// Whether the current token can begin an expression.
    fn at_expression_start(&self) -> bool {
        match self.peek() {
            TokenKind::Name(n) => {
                !is_keyword(n)
                    || matches!(
                        n.as_str(),
                        "not" | "lambda" | "await" | "None" | "True" | "False" | "yield"
                    )
            }
            TokenKind::Number(_) | TokenKind::Str(_) => true,
            TokenKind::Op(o) => matches!(*o, "(" | "[" | "{" | "-" | "+" | "~" | "*" | "..."),
            _ => false,
        }
    }

    /// Parses an entire module, returning the arena payloads and the root.
    pub fn parse_module(&mut self) -> Result<(Vec<NodePayload>, NodeRef), ParseError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                TokenKind::EndMarker => break,
                TokenKind::Newline => {
                    self.advance();
                }
                _ => self.parse_statement(&mut body)?,
            }
        }
        let root = self.add(NodePayload::Module { body });
        Ok((std::mem::take(&mut self.nodes), root))
    }

    fn parse_statement(&mut self, out: &mut Vec<NodeRef>) -> Result<(), ParseError> {
        if self.peek_is("@") {
            let stmt = self.parse_decorated()?;
            out.push(stmt);
            return Ok(());
        }
        let kw = match self.peek() {
            TokenKind::Name(n) => n.clone(),
            TokenKind::Indent => return Err(self.error("unexpected indent")),
            _ => String::new(),
        };
        let stmt = match kw.as_str() {
            "if" => self.parse_if()?,
            "while" => self.parse_while()?,
            "for" => self.parse_for(false)?,
            "try" => self.parse_try()?,
            "with" => self.parse_with(false)?,
            "def" => self.parse_funcdef(Vec::new(), false)?,
            "class" => self.parse_classdef(Vec::new())?,
            "async" => {
                self.advance();
                match self.peek() {
                    TokenKind::Name(n) if n == "def" => self.parse_funcdef(Vec::new(), true)?,
                    TokenKind::Name(n) if n == "for" => self.parse_for(true)?,
                    TokenKind::Name(n) if n == "with" => self.parse_with(true)?,
                    _ => return Err(self.error("expected def, for, or with after async")),
                }
            }
            _ => return self.parse_simple_statements(out),
        };
        out.push(stmt);
        Ok(())
    }

    fn parse_simple_statements(&mut self, out: &mut Vec<NodeRef>) -> Result<(), ParseError> {
        loop {
            let stmt = self.parse_simple_statement()?;
            out.push(stmt);
            if !self.try_drop(";") || self.at_newline() {
                break;
            }
        }
        match self.peek() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::EndMarker => Ok(()),
            _ => Err(self.error("expected end of statement")),
        }
    }

    /// Parses `: <block>` where the block is either an indented suite or
    /// simple statements on the same line.
    fn parse_block(&mut self, ctx: &str) -> Result<Vec<NodeRef>, ParseError> {
        self.drop_or_error(":", ctx)?;
        let mut body = Vec::new();
        if matches!(self.peek(), TokenKind::Newline) {
            self.advance();
            if !matches!(self.peek(), TokenKind::Indent) {
                return Err(self.error(&format!("expected an indented block in {}", ctx)));
            }
            self.advance();
            loop {
                match self.peek() {
                    TokenKind::Dedent => {
                        self.advance();
                        break;
                    }
                    TokenKind::EndMarker => break,
                    TokenKind::Newline => {
                        self.advance();
                    }
                    _ => self.parse_statement(&mut body)?,
                }
            }
        } else {
            self.parse_simple_statements(&mut body)?;
        }
        Ok(body)
    }

    fn parse_if(&mut self) -> Result<NodeRef, ParseError> {
        // Either "if" or "elif".
        self.advance();
        let test = self.parse_named_expr()?;
        let body = self.parse_block("if statement")?;
        let orelse = if self.peek_keyword_is("elif") {
            vec![self.parse_if()?]
        } else if self.try_drop_keyword("else") {
            self.parse_block("else clause")?
        } else {
            Vec::new()
        };
        Ok(self.add(NodePayload::If { test, body, orelse }))
    }

    fn parse_while(&mut self) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("while", "while statement")?;
        let test = self.parse_named_expr()?;
        let body = self.parse_block("while statement")?;
        let orelse = if self.try_drop_keyword("else") {
            self.parse_block("while-else clause")?
        } else {
            Vec::new()
        };
        Ok(self.add(NodePayload::While { test, body, orelse }))
    }

    fn parse_for(&mut self, is_async: bool) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("for", "for statement")?;
        let target = self.parse_target_list()?;
        self.drop_keyword_or_error("in", "for statement")?;
        let iter = self.parse_star_expressions()?;
        let body = self.parse_block("for statement")?;
        let orelse = if self.try_drop_keyword("else") {
            self.parse_block("for-else clause")?
        } else {
            Vec::new()
        };
        Ok(self.add(NodePayload::For {
            target,
            iter,
            body,
            orelse,
            is_async,
        }))
    }

    fn parse_try(&mut self) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("try", "try statement")?;
        let body = self.parse_block("try statement")?;
        let mut handlers = Vec::new();
        while self.try_drop_keyword("except") {
            let (typ, name) = if self.peek_is(":") {
                (None, None)
            } else {
                let typ = self.parse_test()?;
                let typ = if self.peek_is(",") {
                    let mut elts = vec![typ];
                    while self.try_drop(",") {
                        if self.peek_is(":") || self.peek_keyword_is("as") {
                            break;
                        }
                        elts.push(self.parse_test()?);
                    }
                    self.add(NodePayload::Tuple { elts })
                } else {
                    typ
                };
                let name = if self.try_drop_keyword("as") {
                    Some(self.parse_identifier("except clause")?)
                } else {
                    None
                };
                (Some(typ), name)
            };
            let handler_body = self.parse_block("except clause")?;
            handlers.push(self.add(NodePayload::ExceptHandler {
                typ,
                name,
                body: handler_body,
            }));
        }
        let orelse = if self.try_drop_keyword("else") {
            self.parse_block("try-else clause")?
        } else {
            Vec::new()
        };
        let finalbody = if self.try_drop_keyword("finally") {
            self.parse_block("finally clause")?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error("expected except or finally clause"));
        }
        Ok(self.add(NodePayload::Try {
            body,
            handlers,
            orelse,
            finalbody,
        }))
    }

    fn parse_with(&mut self, is_async: bool) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("with", "with statement")?;
        let mut items = Vec::new();
        loop {
            let context_expr = self.parse_test()?;
            let optional_vars = if self.try_drop_keyword("as") {
                Some(self.parse_target()?)
            } else {
                None
            };
            items.push(self.add(NodePayload::WithItem {
                context_expr,
                optional_vars,
            }));
            if !self.try_drop(",") {
                break;
            }
        }
        let body = self.parse_block("with statement")?;
        Ok(self.add(NodePayload::With {
            items,
            body,
            is_async,
        }))
    }

    fn parse_decorated(&mut self) -> Result<NodeRef, ParseError> {
        let mut decorators = Vec::new();
        while self.try_drop("@") {
            decorators.push(self.parse_named_expr()?);
            if !matches!(self.peek(), TokenKind::Newline) {
                return Err(self.error("expected newline after decorator"));
            }
            self.advance();
        }
        if self.peek_keyword_is("class") {
            self.parse_classdef(decorators)
        } else if self.try_drop_keyword("async") {
            self.parse_funcdef(decorators, true)
        } else {
            self.parse_funcdef(decorators, false)
        }
    }

    fn parse_funcdef(
        &mut self,
        decorators: Vec<NodeRef>,
        is_async: bool,
    ) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("def", "function definition")?;
        let name = self.parse_identifier("function definition")?;
        self.drop_or_error("(", "function definition")?;
        let args = self.parse_arguments(")", true)?;
        self.drop_or_error(")", "function definition")?;
        let returns = if self.try_drop("->") {
            Some(self.parse_test()?)
        } else {
            None
        };
        let body = self.parse_block("function definition")?;
        Ok(self.add(NodePayload::FunctionDef {
            name,
            args,
            body,
            decorators,
            returns,
            is_async,
        }))
    }

    fn parse_classdef(&mut self, decorators: Vec<NodeRef>) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("class", "class definition")?;
        let name = self.parse_identifier("class definition")?;
        let (bases, keywords) = if self.try_drop("(") {
            self.parse_call_arguments()?
        } else {
            (Vec::new(), Vec::new())
        };
        let body = self.parse_block("class definition")?;
        Ok(self.add(NodePayload::ClassDef {
            name,
            bases,
            keywords,
            body,
            decorators,
        }))
    }

    /// Parses a parameter list up to (not including) `closer`.
    fn parse_arguments(
        &mut self,
        closer: &str,
        allow_annotations: bool,
    ) -> Result<NodeRef, ParseError> {
        let mut posonlyargs = Vec::new();
        let mut args = Vec::new();
        let mut vararg = None;
        let mut kwonlyargs = Vec::new();
        let mut kw_defaults = Vec::new();
        let mut kwarg = None;
        let mut defaults = Vec::new();
        let mut seen_star = false;
        while !self.peek_is(closer) {
            if self.try_drop("/") {
                posonlyargs.append(&mut args);
            } else if self.try_drop("**") {
                kwarg = Some(self.parse_param(allow_annotations)?);
            } else if self.try_drop("*") {
                seen_star = true;
                if !self.peek_is(",") && !self.peek_is(closer) {
                    vararg = Some(self.parse_param(allow_annotations)?);
                }
            } else {
                let param = self.parse_param(allow_annotations)?;
                let default = if self.try_drop("=") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                if seen_star {
                    kwonlyargs.push(param);
                    kw_defaults.push(default);
                } else {
                    args.push(param);
                    if let Some(d) = default {
                        defaults.push(d);
                    } else if !defaults.is_empty() {
                        return Err(self.error("non-default argument follows default argument"));
                    }
                }
            }
            if !self.try_drop(",") {
                break;
            }
        }
        Ok(self.add(NodePayload::Arguments {
            posonlyargs,
            args,
            vararg,
            kwonlyargs,
            kw_defaults,
            kwarg,
            defaults,
        }))
    }

    fn parse_param(&mut self, allow_annotations: bool) -> Result<NodeRef, ParseError> {
        let name = self.parse_identifier("parameter list")?;
        let annotation = if allow_annotations && self.try_drop(":") {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(self.add(NodePayload::Arg { name, annotation }))
    }

    fn parse_simple_statement(&mut self) -> Result<NodeRef, ParseError> {
        let kw = match self.peek() {
            TokenKind::Name(n) => n.clone(),
            _ => String::new(),
        };
        match kw.as_str() {
            "pass" => {
                self.advance();
                Ok(self.add(NodePayload::Pass))
            }
            "break" => {
                self.advance();
                Ok(self.add(NodePayload::Break))
            }
            "continue" => {
                self.advance();
                Ok(self.add(NodePayload::Continue))
            }
            "return" => {
                self.advance();
                let value = if self.at_newline() || self.peek_is(";") {
                    None
                } else {
                    Some(self.parse_star_expressions()?)
                };
                Ok(self.add(NodePayload::Return { value }))
            }
            "raise" => {
                self.advance();
                let (exc, cause) = if self.at_newline() || self.peek_is(";") {
                    (None, None)
                } else {
                    let exc = self.parse_test()?;
                    let cause = if self.try_drop_keyword("from") {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    (Some(exc), cause)
                };
                Ok(self.add(NodePayload::Raise { exc, cause }))
            }
            "global" | "nonlocal" => {
                self.advance();
                let mut names = vec![self.parse_identifier("global statement")?];
                while self.try_drop(",") {
                    names.push(self.parse_identifier("global statement")?);
                }
                if kw == "global" {
                    Ok(self.add(NodePayload::Global { names }))
                } else {
                    Ok(self.add(NodePayload::Nonlocal { names }))
                }
            }
            "del" => {
                self.advance();
                let mut targets = vec![self.parse_target()?];
                while self.try_drop(",") {
                    if self.at_newline() || self.peek_is(";") {
                        break;
                    }
                    targets.push(self.parse_target()?);
                }
                Ok(self.add(NodePayload::Delete { targets }))
            }
            "assert" => {
                self.advance();
                let test = self.parse_test()?;
                let msg = if self.try_drop(",") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(self.add(NodePayload::Assert { test, msg }))
            }
            "import" => {
                self.advance();
                let mut names = Vec::new();
                loop {
                    let name = self.parse_dotted_name()?;
                    let asname = if self.try_drop_keyword("as") {
                        Some(self.parse_identifier("import")?)
                    } else {
                        None
                    };
                    names.push(Alias { name, asname });
                    if !self.try_drop(",") {
                        break;
                    }
                }
                Ok(self.add(NodePayload::Import { names }))
            }
            "from" => self.parse_import_from(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.parse_identifier("dotted name")?;
        while self.try_drop(".") {
            name.push('.');
            name.push_str(&self.parse_identifier("dotted name")?);
        }
        Ok(name)
    }

    fn parse_import_from(&mut self) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("from", "import")?;
        let mut level = 0;
        loop {
            if self.try_drop(".") {
                level += 1;
            } else if self.try_drop("...") {
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.peek_keyword_is("import") {
            None
        } else {
            Some(self.parse_dotted_name()?)
        };
        self.drop_keyword_or_error("import", "from-import")?;
        let mut names = Vec::new();
        if self.try_drop("*") {
            names.push(Alias {
                name: "*".to_string(),
                asname: None,
            });
        } else {
            let parenthesized = self.try_drop("(");
            loop {
                if parenthesized && self.peek_is(")") {
                    break;
                }
                let name = self.parse_identifier("from-import")?;
                let asname = if self.try_drop_keyword("as") {
                    Some(self.parse_identifier("from-import")?)
                } else {
                    None
                };
                names.push(Alias { name, asname });
                if !self.try_drop(",") {
                    break;
                }
            }
            if parenthesized {
                self.drop_or_error(")", "from-import")?;
            }
        }
        Ok(self.add(NodePayload::ImportFrom {
            module,
            names,
            level,
        }))
    }

    fn parse_assignment_value(&mut self) -> Result<NodeRef, ParseError> {
        if self.peek_keyword_is("yield") {
            self.parse_yield()
        } else {
            self.parse_star_expressions()
        }
    }

    fn parse_expression_statement(&mut self) -> Result<NodeRef, ParseError> {
        let first = self.parse_assignment_value()?;
        if self.try_drop(":") {
            let annotation = self.parse_test()?;
            let value = if self.try_drop("=") {
                Some(self.parse_assignment_value()?)
            } else {
                None
            };
            let simple = matches!(self.nodes[first.index], NodePayload::Name { .. });
            return Ok(self.add(NodePayload::AnnAssign {
                target: first,
                annotation,
                value,
                simple,
            }));
        }
        if let TokenKind::Op(o) = self.peek() {
            if AUG_ASSIGN_OPS.contains(o) {
                let symbol = o.trim_end_matches('=');
                let op = BinOperator::from_symbol(symbol)
                    .ok_or_else(|| self.error("unknown augmented assignment"))?;
                self.advance();
                let value = self.parse_assignment_value()?;
                return Ok(self.add(NodePayload::AugAssign {
                    target: first,
                    op,
                    value,
                }));
            }
        }
        if self.peek_is("=") {
            let mut targets = vec![first];
            while self.try_drop("=") {
                targets.push(self.parse_assignment_value()?);
            }
            let value = targets.pop().ok_or_else(|| self.error("missing assignment value"))?;
            return Ok(self.add(NodePayload::Assign { targets, value }));
        }
        Ok(self.add(NodePayload::Expr { value: first }))
    }

    // Expressions.

    fn parse_yield(&mut self) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("yield", "yield expression")?;
        if self.try_drop_keyword("from") {
            let value = self.parse_test()?;
            return Ok(self.add(NodePayload::YieldFrom { value }));
        }
        let value = if self.at_expression_start() {
            Some(self.parse_star_expressions()?)
        } else {
            None
        };
        Ok(self.add(NodePayload::Yield { value }))
    }

    /// Comma-separated expressions; more than one (or a trailing comma)
    /// produces a tuple.
    fn parse_star_expressions(&mut self) -> Result<NodeRef, ParseError> {
        let first = self.parse_star_expression()?;
        if !self.peek_is(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.try_drop(",") {
            if !self.at_expression_start() {
                break;
            }
            elts.push(self.parse_star_expression()?);
        }
        Ok(self.add(NodePayload::Tuple { elts }))
    }

    fn parse_star_expression(&mut self) -> Result<NodeRef, ParseError> {
        if self.try_drop("*") {
            let value = self.parse_bitor()?;
            return Ok(self.add(NodePayload::Starred { value }));
        }
        self.parse_named_expr()
    }

    fn parse_named_expr(&mut self) -> Result<NodeRef, ParseError> {
        if let (TokenKind::Name(n), TokenKind::Op(":=")) = (self.peek(), self.peek_at(1)) {
            if !is_keyword(n) {
                let id = n.clone();
                self.advance();
                self.advance();
                let target = self.add(NodePayload::Name { id });
                let value = self.parse_test()?;
                return Ok(self.add(NodePayload::NamedExpr { target, value }));
            }
        }
        self.parse_test()
    }

    /// Assignment-style target list used by `for` and comprehensions.
    fn parse_target_list(&mut self) -> Result<NodeRef, ParseError> {
        let first = self.parse_target()?;
        if !self.peek_is(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.try_drop(",") {
            if self.peek_keyword_is("in") || !self.at_expression_start() {
                break;
            }
            elts.push(self.parse_target()?);
        }
        Ok(self.add(NodePayload::Tuple { elts }))
    }

    fn parse_target(&mut self) -> Result<NodeRef, ParseError> {
        if self.try_drop("*") {
            let value = self.parse_bitor()?;
            return Ok(self.add(NodePayload::Starred { value }));
        }
        self.parse_bitor()
    }

    pub(crate) fn parse_test(&mut self) -> Result<NodeRef, ParseError> {
        if self.peek_keyword_is("lambda") {
            return self.parse_lambda();
        }
        let body = self.parse_or_test()?;
        if self.peek_keyword_is("if") {
            // A conditional expression needs an `else`; otherwise the `if`
            // belongs to an enclosing comprehension.
            let save = self.pos;
            self.advance();
            let test = self.parse_or_test()?;
            if self.try_drop_keyword("else") {
                let orelse = self.parse_test()?;
                return Ok(self.add(NodePayload::IfExp { test, body, orelse }));
            }
            self.pos = save;
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> Result<NodeRef, ParseError> {
        self.drop_keyword_or_error("lambda", "lambda")?;
        let args = self.parse_arguments(":", false)?;
        self.drop_or_error(":", "lambda")?;
        let body = self.parse_test()?;
        Ok(self.add(NodePayload::Lambda { args, body }))
    }

    fn parse_or_test(&mut self) -> Result<NodeRef, ParseError> {
        let first = self.parse_and_test()?;
        if !self.peek_keyword_is("or") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.try_drop_keyword("or") {
            values.push(self.parse_and_test()?);
        }
        Ok(self.add(NodePayload::BoolOp {
            op: BoolOperator::Or,
            values,
        }))
    }

    fn parse_and_test(&mut self) -> Result<NodeRef, ParseError> {
        let first = self.parse_not_test()?;
        if !self.peek_keyword_is("and") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.try_drop_keyword("and") {
            values.push(self.parse_not_test()?);
        }
        Ok(self.add(NodePayload::BoolOp {
            op: BoolOperator::And,
            values,
        }))
    }

    fn parse_not_test(&mut self) -> Result<NodeRef, ParseError> {
        if self.try_drop_keyword("not") {
            let operand = self.parse_not_test()?;
            return Ok(self.add(NodePayload::UnaryOp {
                op: UnaryOperator::Not,
                operand,
            }));
        }
        self.parse_comparison()
    }

    fn peek_cmp_op(&self) -> Option<(CmpOperator, usize)> {
        match self.peek() {
            TokenKind::Op("==") => Some((CmpOperator::Eq, 1)),
            TokenKind::Op("!=") => Some((CmpOperator::NotEq, 1)),
            TokenKind::Op("<") => Some((CmpOperator::Lt, 1)),
            TokenKind::Op("<=") => Some((CmpOperator::LtE, 1)),
            TokenKind::Op(">") => Some((CmpOperator::Gt, 1)),
            TokenKind::Op(">=") => Some((CmpOperator::GtE, 1)),
            TokenKind::Name(n) if n == "in" => Some((CmpOperator::In, 1)),
            TokenKind::Name(n) if n == "is" => match self.peek_at(1) {
                TokenKind::Name(m) if m == "not" => Some((CmpOperator::IsNot, 2)),
                _ => Some((CmpOperator::Is, 1)),
            },
            TokenKind::Name(n) if n == "not" => match self.peek_at(1) {
                TokenKind::Name(m) if m == "in" => Some((CmpOperator::NotIn, 2)),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> Result<NodeRef, ParseError> {
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some((op, width)) = self.peek_cmp_op() {
            for _ in 0..width {
                self.advance();
            }
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(self.add(NodePayload::Compare {
            left,
            ops,
            comparators,
        }))
    }

    fn parse_binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Parser) -> Result<NodeRef, ParseError>,
    ) -> Result<NodeRef, ParseError> {
        let mut left = next(self)?;
        loop {
            let symbol = match self.peek() {
                TokenKind::Op(o) if ops.contains(o) => *o,
                _ => break,
            };
            self.advance();
            let right = next(self)?;
            let op = BinOperator::from_symbol(symbol)
                .ok_or_else(|| self.error("unknown binary operator"))?;
            left = self.add(NodePayload::BinOp { left, op, right });
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_binary_level(&["|"], Parser::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_binary_level(&["^"], Parser::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_binary_level(&["&"], Parser::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_binary_level(&["<<", ">>"], Parser::parse_arith)
    }

    fn parse_arith(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_binary_level(&["+", "-"], Parser::parse_term)
    }

    fn parse_term(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_binary_level(&["*", "/", "//", "%", "@"], Parser::parse_factor)
    }

    fn parse_factor(&mut self) -> Result<NodeRef, ParseError> {
        let op = match self.peek() {
            TokenKind::Op("-") => Some(UnaryOperator::USub),
            TokenKind::Op("+") => Some(UnaryOperator::UAdd),
            TokenKind::Op("~") => Some(UnaryOperator::Invert),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_factor()?;
            return Ok(self.add(NodePayload::UnaryOp { op, operand }));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<NodeRef, ParseError> {
        let base = if self.try_drop_keyword("await") {
            let value = self.parse_primary()?;
            self.add(NodePayload::Await { value })
        } else {
            self.parse_primary()?
        };
        if self.try_drop("**") {
            let right = self.parse_factor()?;
            return Ok(self.add(NodePayload::BinOp {
                left: base,
                op: BinOperator::Pow,
                right,
            }));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<NodeRef, ParseError> {
        let mut value = self.parse_atom()?;
        loop {
            if self.try_drop(".") {
                let attr = self.parse_identifier("attribute access")?;
                value = self.add(NodePayload::Attribute { value, attr });
            } else if self.try_drop("(") {
                let (args, keywords) = self.parse_call_arguments()?;
                value = self.add(NodePayload::Call {
                    func: value,
                    args,
                    keywords,
                });
            } else if self.try_drop("[") {
                let slice = self.parse_slices()?;
                self.drop_or_error("]", "subscript")?;
                value = self.add(NodePayload::Subscript { value, slice });
            } else {
                break;
            }
        }
        Ok(value)
    }

    /// Parses call arguments after the opening parenthesis, consuming the
    /// closing one.
    fn parse_call_arguments(&mut self) -> Result<(Vec<NodeRef>, Vec<NodeRef>), ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.peek_is(")") {
            if self.try_drop("**") {
                let value = self.parse_test()?;
                keywords.push(self.add(NodePayload::Keyword { arg: None, value }));
            } else if self.try_drop("*") {
                let value = self.parse_test()?;
                args.push(self.add(NodePayload::Starred { value }));
            } else if let (TokenKind::Name(n), TokenKind::Op("=")) = (self.peek(), self.peek_at(1)) {
                let arg = n.clone();
                self.advance();
                self.advance();
                let value = self.parse_test()?;
                keywords.push(self.add(NodePayload::Keyword {
                    arg: Some(arg),
                    value,
                }));
            } else {
                let value = self.parse_named_expr()?;
                if self.peek_keyword_is("for") || self.peek_keyword_is("async") {
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(self.add(NodePayload::GeneratorExp {
                        elt: value,
                        generators,
                    }));
                } else {
                    args.push(value);
                }
            }
            if !self.try_drop(",") {
                break;
            }
        }
        self.drop_or_error(")", "call arguments")?;
        Ok((args, keywords))
    }

    fn parse_slices(&mut self) -> Result<NodeRef, ParseError> {
        let first = self.parse_slice()?;
        if !self.peek_is(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.try_drop(",") {
            if self.peek_is("]") {
                break;
            }
            elts.push(self.parse_slice()?);
        }
        Ok(self.add(NodePayload::Tuple { elts }))
    }

    fn parse_slice(&mut self) -> Result<NodeRef, ParseError> {
        let lower = if self.peek_is(":") {
            None
        } else {
            let e = self.parse_star_expression()?;
            if !self.peek_is(":") {
                return Ok(e);
            }
            Some(e)
        };
        self.drop_or_error(":", "slice")?;
        let upper = if self.peek_is(":") || self.peek_is("]") || self.peek_is(",") {
            None
        } else {
            Some(self.parse_test()?)
        };
        let step = if self.try_drop(":") {
            if self.peek_is("]") || self.peek_is(",") {
                None
            } else {
                Some(self.parse_test()?)
            }
        } else {
            None
        };
        Ok(self.add(NodePayload::Slice { lower, upper, step }))
    }

    fn parse_comprehension_clauses(&mut self) -> Result<Vec<NodeRef>, ParseError> {
        let mut generators = Vec::new();
        loop {
            let is_async = if self.peek_keyword_is("async") {
                self.advance();
                true
            } else {
                false
            };
            if !self.try_drop_keyword("for") {
                if is_async {
                    return Err(self.error("expected for after async"));
                }
                break;
            }
            let target = self.parse_target_list()?;
            self.drop_keyword_or_error("in", "comprehension")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.try_drop_keyword("if") {
                ifs.push(self.parse_or_test()?);
            }
            generators.push(self.add(NodePayload::Comprehension {
                target,
                iter,
                ifs,
                is_async,
            }));
        }
        Ok(generators)
    }

    fn parse_atom(&mut self) -> Result<NodeRef, ParseError> {
        match self.peek().clone() {
            TokenKind::Name(n) => {
                let constant = match n.as_str() {
                    "None" => Some(Constant::None),
                    "True" => Some(Constant::Bool(true)),
                    "False" => Some(Constant::Bool(false)),
                    _ => None,
                };
                if let Some(value) = constant {
                    self.advance();
                    return Ok(self.add(NodePayload::Constant {
                        value,
                        style: LiteralStyle::default(),
                    }));
                }
                if is_keyword(&n) {
                    return Err(self.error("unexpected keyword in expression"));
                }
                self.advance();
                Ok(self.add(NodePayload::Name { id: n }))
            }
            TokenKind::Number(text) => {
                self.advance();
                let value = self.parse_number(&text)?;
                Ok(self.add(NodePayload::Constant {
                    value,
                    style: LiteralStyle::default(),
                }))
            }
            TokenKind::Str(_) => self.parse_strings(),
            TokenKind::Op("...") => {
                self.advance();
                Ok(self.add(NodePayload::Constant {
                    value: Constant::Ellipsis,
                    style: LiteralStyle::default(),
                }))
            }
            TokenKind::Op("(") => {
                self.advance();
                if self.try_drop(")") {
                    return Ok(self.add(NodePayload::Tuple { elts: Vec::new() }));
                }
                if self.peek_keyword_is("yield") {
                    let y = self.parse_yield()?;
                    self.drop_or_error(")", "parenthesized yield")?;
                    return Ok(y);
                }
                let first = self.parse_star_expression()?;
                if self.peek_keyword_is("for") || self.peek_keyword_is("async") {
                    let generators = self.parse_comprehension_clauses()?;
                    self.drop_or_error(")", "generator expression")?;
                    return Ok(self.add(NodePayload::GeneratorExp {
                        elt: first,
                        generators,
                    }));
                }
                if self.try_drop(")") {
                    return Ok(first);
                }
                let mut elts = vec![first];
                while self.try_drop(",") {
                    if self.peek_is(")") {
                        break;
                    }
                    elts.push(self.parse_star_expression()?);
                }
                self.drop_or_error(")", "tuple")?;
                Ok(self.add(NodePayload::Tuple { elts }))
            }
            TokenKind::Op("[") => {
                self.advance();
                if self.try_drop("]") {
                    return Ok(self.add(NodePayload::List { elts: Vec::new() }));
                }
                let first = self.parse_star_expression()?;
                if self.peek_keyword_is("for") || self.peek_keyword_is("async") {
                    let generators = self.parse_comprehension_clauses()?;
                    self.drop_or_error("]", "list comprehension")?;
                    return Ok(self.add(NodePayload::ListComp {
                        elt: first,
                        generators,
                    }));
                }
                let mut elts = vec![first];
                while self.try_drop(",") {
                    if self.peek_is("]") {
                        break;
                    }
                    elts.push(self.parse_star_expression()?);
                }
                self.drop_or_error("]", "list")?;
                Ok(self.add(NodePayload::List { elts }))
            }
            TokenKind::Op("{") => {
                self.advance();
                self.parse_brace_display()
            }
            _ => Err(self.error("expected expression")),
        }
    }

    /// Parses a dict, set, or their comprehensions after `{`.
    fn parse_brace_display(&mut self) -> Result<NodeRef, ParseError> {
        if self.try_drop("}") {
            return Ok(self.add(NodePayload::Dict {
                keys: Vec::new(),
                values: Vec::new(),
            }));
        }
        let mut keys = Vec::new();
        let mut values = Vec::new();
        if self.try_drop("**") {
            keys.push(None);
            values.push(self.parse_bitor()?);
        } else {
            let first = self.parse_star_expression()?;
            if self.try_drop(":") {
                let value = self.parse_test()?;
                if self.peek_keyword_is("for") || self.peek_keyword_is("async") {
                    let generators = self.parse_comprehension_clauses()?;
                    self.drop_or_error("}", "dict comprehension")?;
                    return Ok(self.add(NodePayload::DictComp {
                        key: first,
                        value,
                        generators,
                    }));
                }
                keys.push(Some(first));
                values.push(value);
            } else {
                if self.peek_keyword_is("for") || self.peek_keyword_is("async") {
                    let generators = self.parse_comprehension_clauses()?;
                    self.drop_or_error("}", "set comprehension")?;
                    return Ok(self.add(NodePayload::SetComp {
                        elt: first,
                        generators,
                    }));
                }
                let mut elts = vec![first];
                while self.try_drop(",") {
                    if self.peek_is("}") {
                        break;
                    }
                    elts.push(self.parse_star_expression()?);
                }
                self.drop_or_error("}", "set")?;
                return Ok(self.add(NodePayload::Set { elts }));
            }
        }
        while self.try_drop(",") {
            if self.peek_is("}") {
                break;
            }
            if self.try_drop("**") {
                keys.push(None);
                values.push(self.parse_bitor()?);
            } else {
                let key = self.parse_test()?;
                self.drop_or_error(":", "dict")?;
                keys.push(Some(key));
                values.push(self.parse_test()?);
            }
        }
        self.drop_or_error("}", "dict")?;
        Ok(self.add(NodePayload::Dict { keys, values }))
    }

    /// Reads a numeric literal. The radix it was written in is not kept.
    fn parse_number(&self, text: &str) -> Result<Constant, ParseError> {
        let cleaned: String = text.chars().filter(|c| *c != '_').collect();
        let lower = cleaned.to_ascii_lowercase();
        let base = if lower.starts_with("0x") {
            Some(16)
        } else if lower.starts_with("0o") {
            Some(8)
        } else if lower.starts_with("0b") {
            Some(2)
        } else {
            None
        };
        if let Some(base) = base {
            let value = i128::from_str_radix(&lower[2..], base).map_err(|e| {
                ParseError::new(format!("invalid integer literal {:?}: {}", text, e), self.line())
            })?;
            return Ok(Constant::Int(value));
        }
        if let Some(imag) = lower.strip_suffix('j') {
            let value: f64 = imag.parse().map_err(|_| {
                ParseError::new(format!("invalid imaginary literal {:?}", text), self.line())
            })?;
            return Ok(Constant::Imaginary(value));
        }
        if lower.contains('.') || lower.contains('e') {
            let value: f64 = lower.parse().map_err(|_| {
                ParseError::new(format!("invalid float literal {:?}", text), self.line())
            })?;
            return Ok(Constant::Float(value));
        }
        let value = match lower.parse::<i128>() {
            Ok(v) => Constant::Int(v),
            Err(_) => Constant::BigInt(lower.trim_start_matches('0').to_string()),
        };
        Ok(value)
    }

    /// Parses one or more adjacent string tokens (implicit concatenation).
    fn parse_strings(&mut self) -> Result<NodeRef, ParseError> {
        let mut parts: Vec<StrToken> = Vec::new();
        while let TokenKind::Str(s) = self.peek() {
            parts.push(s.clone());
            self.advance();
        }
        let line = self.line();
        let is_bytes = parts[0].prefix.contains('b');
        if parts.iter().any(|p| p.prefix.contains('b') != is_bytes) {
            return Err(ParseError::new(
                "cannot mix bytes and nonbytes literals".to_string(),
                line,
            ));
        }
        if is_bytes {
            let mut bytes = Vec::new();
            for p in &parts {
                let decoded = if p.prefix.contains('r') {
                    p.body.clone()
                } else {
                    decode_escapes(&p.body, true)
                };
                bytes.extend(decoded.chars().map(|c| c as u32 as u8));
            }
            return Ok(self.add(NodePayload::Constant {
                value: Constant::Bytes(bytes),
                style: LiteralStyle::default(),
            }));
        }
        if parts.iter().any(|p| p.prefix.contains('f')) {
            let mut values: Vec<NodeRef> = Vec::new();
            let mut pending = String::new();
            for p in &parts {
                let raw = p.prefix.contains('r');
                if p.prefix.contains('f') {
                    self.parse_fstring_body(&p.body, raw, &mut pending, &mut values)?;
                } else if raw {
                    pending.push_str(&p.body);
                } else {
                    pending.push_str(&decode_escapes(&p.body, false));
                }
            }
            self.flush_literal(&mut pending, &mut values);
            return Ok(self.add(NodePayload::JoinedStr { values }));
        }
        let mut text = String::new();
        for p in &parts {
            if p.prefix.contains('r') {
                text.push_str(&p.body);
            } else {
                text.push_str(&decode_escapes(&p.body, false));
            }
        }
        Ok(self.add(NodePayload::Constant {
            value: Constant::Str(text),
            style: LiteralStyle {
                unicode_prefix: parts[0].prefix.contains('u'),
                ..LiteralStyle::default()
            },
        }))
    }

    fn flush_literal(&mut self, pending: &mut String, values: &mut Vec<NodeRef>) {
        if pending.is_empty() {
            return;
        }
        let text = std::mem::take(pending);
        values.push(self.add(NodePayload::Constant {
            value: Constant::Str(text),
            style: LiteralStyle::default(),
        }));
    }

    /// Splits an f-string body into literal text and replacement fields.
    fn parse_fstring_body(
        &mut self,
        body: &str,
        raw: bool,
        pending: &mut String,
        values: &mut Vec<NodeRef>,
    ) -> Result<(), ParseError> {
        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;
        let mut literal = String::new();
        let decode = |s: &str| {
            if raw {
                s.to_string()
            } else {
                decode_escapes(s, false)
            }
        };
        while i < chars.len() {
            let c = chars[i];
            if c == '{' && chars.get(i + 1) == Some(&'{') {
                literal.push('{');
                i += 2;
                continue;
            }
            if c == '}' && chars.get(i + 1) == Some(&'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            if c == '{' {
                pending.push_str(&decode(&literal));
                literal.clear();
                // `{x=}` also emits its own source text, `x=`.
                if let Some(end) = fstring_expr_end(&chars, i + 1) {
                    let text: String = chars[i + 1..end].iter().collect();
                    if is_self_documenting(&text) {
                        pending.push_str(&text);
                    }
                }
                self.flush_literal(pending, values);
                let (field, next) = self.parse_fstring_field(&chars, i + 1, raw)?;
                values.push(field);
                i = next;
                continue;
            }
            if c == '}' {
                return Err(ParseError::new(
                    "f-string: single '}' is not allowed".to_string(),
                    self.line(),
                ));
            }
            literal.push(c);
            i += 1;
        }
        pending.push_str(&decode(&literal));
        Ok(())
    }

    /// Parses `expr[=][!conv][:spec]}` starting at `start`; returns the
    /// `FormattedValue` and the index after the closing brace.
    fn parse_fstring_field(
        &mut self,
        chars: &[char],
        start: usize,
        raw: bool,
    ) -> Result<(NodeRef, usize), ParseError> {
        let expr_end = fstring_expr_end(chars, start).ok_or_else(|| {
            ParseError::new("f-string: expecting '}'".to_string(), self.line())
        })?;
        let expr_text: String = chars[start..expr_end].iter().collect();
        let self_documenting = is_self_documenting(&expr_text);
        let value = if self_documenting {
            let trimmed = expr_text.trim_end();
            self.parse_embedded_expression(&trimmed[..trimmed.len() - 1])?
        } else {
            self.parse_embedded_expression(&expr_text)?
        };
        let mut i = expr_end;
        let mut conversion = None;
        if chars[i] == '!' {
            conversion = chars.get(i + 1).copied();
            i += 2;
        } else if self_documenting && chars.get(i) != Some(&':') {
            conversion = Some('r');
        }
        let mut format_spec = None;
        if chars.get(i) == Some(&':') {
            let spec_start = i + 1;
            let mut depth = 0usize;
            let mut j = spec_start;
            while j < chars.len() {
                match chars[j] {
                    '{' => depth += 1,
                    '}' if depth > 0 => depth -= 1,
                    '}' => break,
                    _ => {}
                }
                j += 1;
            }
            let spec: String = chars[spec_start..j.min(chars.len())].iter().collect();
            let mut spec_values = Vec::new();
            let mut spec_pending = String::new();
            self.parse_fstring_body(&spec, raw, &mut spec_pending, &mut spec_values)?;
            self.flush_literal(&mut spec_pending, &mut spec_values);
            format_spec = Some(self.add(NodePayload::JoinedStr {
                values: spec_values,
            }));
            i = j;
        }
        if chars.get(i) != Some(&'}') {
            return Err(ParseError::new(
                "f-string: expecting '}'".to_string(),
                self.line(),
            ));
        }
        let node = self.add(NodePayload::FormattedValue {
            value,
            conversion,
            format_spec,
        });
        Ok((node, i + 1))
    }

    fn parse_embedded_expression(&mut self, text: &str) -> Result<NodeRef, ParseError> {
        let line = self.line();
        let tokens = lexer::tokenize(&format!("({})", text.trim()))
            .map_err(|e| ParseError::new(format!("f-string: {}", e.message()), line))?;
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let result = self.parse_star_expressions();
        let trailing_ok = matches!(self.peek(), TokenKind::Newline | TokenKind::EndMarker);
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        let value = result?;
        if !trailing_ok {
            return Err(ParseError::new(
                format!("f-string: invalid expression {:?}", text),
                line,
            ));
        }
        Ok(value)
    }
}

/// Decodes backslash escapes. For bytes literals `\u`, `\U`, and `\N` are not
/// escapes and are kept verbatim.
pub fn decode_escapes(body: &str, bytes: bool) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 >= chars.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let next = chars[i + 1];
        i += 2;
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                let mut taken = 1;
                while taken < 3 && i < chars.len() && chars[i].is_digit(8) {
                    value = value * 8 + chars[i].to_digit(8).unwrap_or(0);
                    i += 1;
                    taken += 1;
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'x' | 'u' | 'U' if next == 'x' || !bytes => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars[i..(i + width).min(chars.len())].iter().collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) if hex.len() == width => {
                        out.push(ch);
                        i += width;
                    }
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Index of the character ending the expression of an f-string field that
/// starts at `start`: the closing `}`, a `!` conversion or a `:` spec.
fn fstring_expr_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '}' if depth > 0 => depth -= 1,
            '}' => return Some(i),
            '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => return Some(i),
            ':' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// True for a field expression written as `expr=`, which renders as its own
/// text followed by the value.
fn is_self_documenting(expr_text: &str) -> bool {
    let trimmed = expr_text.trim_end();
    match trimmed.strip_suffix('=') {
        Some(rest) => {
            !rest.trim().is_empty()
                && !rest.ends_with(|c: char| matches!(c, '=' | '!' | '<' | '>'))
        }
        None => false,
    }
}
