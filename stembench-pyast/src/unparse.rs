// SPDX-License-Identifier: Apache-2.0

//! Renders a `Program` back to canonical Python source.
//!
//! Output follows the conventions of CPython's `ast.unparse`: four-space
//! indentation, a blank line before function and class definitions, minimal
//! parenthesization driven by operator precedence, and `repr`-style literals
//! unless the literal carries a rendering hint.

use crate::ast::{
    BinOperator, BoolOperator, Constant, LiteralStyle, NodePayload, NodeRef, Program, QuoteStyle,
    Radix, UnaryOperator,
};
use crate::py_repr;

type Prec = u8;

const NAMED_EXPR: Prec = 1;
const TUPLE: Prec = 2;
const YIELD: Prec = 3;
const TEST: Prec = 4;
const OR: Prec = 5;
const AND: Prec = 6;
const NOT: Prec = 7;
const CMP: Prec = 8;
const EXPR: Prec = 9;
const BOR: Prec = 9;
const BXOR: Prec = 10;
const BAND: Prec = 11;
const SHIFT: Prec = 12;
const ARITH: Prec = 13;
const TERM: Prec = 14;
const FACTOR: Prec = 15;
const POWER: Prec = 16;
const AWAIT: Prec = 17;
const ATOM: Prec = 18;

const INFSTR: &str = "1e309";

fn binop_precedence(op: BinOperator) -> Prec {
    match op {
        BinOperator::Add | BinOperator::Sub => ARITH,
        BinOperator::Mult
        | BinOperator::MatMult
        | BinOperator::Div
        | BinOperator::Mod
        | BinOperator::FloorDiv => TERM,
        BinOperator::LShift | BinOperator::RShift => SHIFT,
        BinOperator::BitOr => BOR,
        BinOperator::BitXor => BXOR,
        BinOperator::BitAnd => BAND,
        BinOperator::Pow => POWER,
    }
}

fn unop_precedence(op: UnaryOperator) -> Prec {
    match op {
        UnaryOperator::Not => NOT,
        _ => FACTOR,
    }
}

fn boolop_precedence(op: BoolOperator) -> Prec {
    match op {
        BoolOperator::And => AND,
        BoolOperator::Or => OR,
    }
}

fn is_negative_number(value: &Constant) -> bool {
    match value {
        Constant::Int(v) => *v < 0,
        Constant::Float(v) | Constant::Imaginary(v) => v.is_sign_negative(),
        Constant::BigInt(s) => s.starts_with('-'),
        _ => false,
    }
}

pub struct Unparser<'a> {
    program: &'a Program,
    out: String,
    indent: usize,
    avoid_backslashes: bool,
}

impl<'a> Unparser<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            out: String::new(),
            indent: 0,
            avoid_backslashes: false,
        }
    }

    pub fn unparse(mut self) -> String {
        let root = self.program.root;
        self.statement(root);
        self.out
    }

    /// Renders a single expression node in a context that never requires
    /// parentheses.
    pub fn expression(&self, r: NodeRef) -> String {
        self.expr(r, NAMED_EXPR)
    }

    fn payload(&self, r: NodeRef) -> &'a NodePayload {
        self.program.payload(r)
    }

    // Statement output.

    fn maybe_newline(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn fill(&mut self, text: &str) {
        self.maybe_newline();
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn block(&mut self, body: &[NodeRef]) {
        self.write(":");
        self.indent += 1;
        for s in body {
            self.statement(*s);
        }
        self.indent -= 1;
    }

    fn block_with_docstring(&mut self, owner: NodeRef, body: &[NodeRef]) {
        match self.program.docstring_of(owner) {
            Some(doc) => {
                self.write(":");
                self.indent += 1;
                let (text, prefix) = match self.payload(doc) {
                    NodePayload::Expr { value } => match self.payload(*value) {
                        NodePayload::Constant {
                            value: Constant::Str(s),
                            style,
                        } => (s.as_str(), if style.unicode_prefix { "u" } else { "" }),
                        _ => ("", ""),
                    },
                    _ => ("", ""),
                };
                let literal = py_repr::literal_avoiding_backslashes(text, py_repr::MULTI_QUOTES);
                self.fill(&format!("{}{}", prefix, literal));
                for s in &body[1..] {
                    self.statement(*s);
                }
                self.indent -= 1;
            }
            None => self.block(body),
        }
    }

    /// Renders a simple statement on its own, without indentation.
    fn statement_text(&self, r: NodeRef) -> String {
        let mut sub = Unparser::new(self.program);
        sub.statement(r);
        sub.out.trim_start_matches('\n').to_string()
    }

    fn statement(&mut self, r: NodeRef) {
        let program = self.program;
        match program.payload(r) {
            NodePayload::Module { body } => {
                if program.docstring_of(r).is_some() {
                    let text = match program.payload(body[0]) {
                        NodePayload::Expr { value } => {
                            program.payload(*value).as_str_constant().unwrap_or_default()
                        }
                        _ => "",
                    };
                    let literal =
                        py_repr::literal_avoiding_backslashes(text, py_repr::MULTI_QUOTES);
                    self.fill(&literal);
                    for s in &body[1..] {
                        self.statement(*s);
                    }
                } else {
                    for s in body {
                        self.statement(*s);
                    }
                }
            }
            NodePayload::FunctionDef {
                name,
                args,
                body,
                decorators,
                returns,
                is_async,
            } => {
                self.maybe_newline();
                for d in decorators {
                    let text = format!("@{}", self.expr(*d, TEST));
                    self.fill(&text);
                }
                let keyword = if *is_async { "async def" } else { "def" };
                let mut head = format!("{} {}({})", keyword, name, self.arguments(*args));
                if let Some(ret) = returns {
                    head.push_str(" -> ");
                    head.push_str(&self.expr(*ret, TEST));
                }
                self.fill(&head);
                self.block_with_docstring(r, body);
            }
            NodePayload::ClassDef {
                name,
                bases,
                keywords,
                body,
                decorators,
            } => {
                self.maybe_newline();
                for d in decorators {
                    let text = format!("@{}", self.expr(*d, TEST));
                    self.fill(&text);
                }
                let mut head = format!("class {}", name);
                if !bases.is_empty() || !keywords.is_empty() {
                    let parts: Vec<String> = bases
                        .iter()
                        .chain(keywords.iter())
                        .map(|b| self.expr(*b, TEST))
                        .collect();
                    head.push_str(&format!("({})", parts.join(", ")));
                }
                self.fill(&head);
                self.block_with_docstring(r, body);
            }
            NodePayload::Return { value } => {
                let text = match value {
                    Some(v) => format!("return {}", self.expr(*v, TEST)),
                    None => "return".to_string(),
                };
                self.fill(&text);
            }
            NodePayload::Delete { targets } => {
                let text = format!("del {}", self.join(targets, TEST));
                self.fill(&text);
            }
            NodePayload::Assign { targets, value } => {
                let mut text = String::new();
                for t in targets {
                    text.push_str(&self.expr(*t, TEST));
                    text.push_str(" = ");
                }
                text.push_str(&self.expr(*value, TEST));
                self.fill(&text);
            }
            NodePayload::AugAssign { target, op, value } => {
                let text = format!(
                    "{} {}= {}",
                    self.expr(*target, TEST),
                    op.symbol(),
                    self.expr(*value, TEST)
                );
                self.fill(&text);
            }
            NodePayload::AnnAssign {
                target,
                annotation,
                value,
                simple,
            } => {
                let mut text = self.expr(*target, TEST);
                if !*simple && matches!(program.payload(*target), NodePayload::Name { .. }) {
                    text = format!("({})", text);
                }
                text.push_str(": ");
                text.push_str(&self.expr(*annotation, TEST));
                if let Some(v) = value {
                    text.push_str(" = ");
                    text.push_str(&self.expr(*v, TEST));
                }
                self.fill(&text);
            }
            NodePayload::For {
                target,
                iter,
                body,
                orelse,
                is_async,
            } => {
                let keyword = if *is_async { "async for" } else { "for" };
                let text = format!(
                    "{} {} in {}",
                    keyword,
                    self.expr(*target, TUPLE),
                    self.expr(*iter, TEST)
                );
                self.fill(&text);
                self.block(body);
                if !orelse.is_empty() {
                    self.fill("else");
                    self.block(orelse);
                }
            }
            NodePayload::While { test, body, orelse } => {
                let text = format!("while {}", self.expr(*test, TEST));
                self.fill(&text);
                self.block(body);
                if !orelse.is_empty() {
                    self.fill("else");
                    self.block(orelse);
                }
            }
            NodePayload::If { test, body, orelse } => {
                let text = format!("if {}", self.expr(*test, TEST));
                self.fill(&text);
                self.block(body);
                let mut orelse = orelse;
                while orelse.len() == 1 {
                    match program.payload(orelse[0]) {
                        NodePayload::If {
                            test,
                            body,
                            orelse: next,
                        } => {
                            let text = format!("elif {}", self.expr(*test, TEST));
                            self.fill(&text);
                            self.block(body);
                            orelse = next;
                        }
                        _ => break,
                    }
                }
                if !orelse.is_empty() {
                    self.fill("else");
                    self.block(orelse);
                }
            }
            NodePayload::With {
                items,
                body,
                is_async,
            } => {
                let keyword = if *is_async { "async with" } else { "with" };
                let text = format!("{} {}", keyword, self.join(items, TEST));
                self.fill(&text);
                self.block(body);
            }
            NodePayload::Raise { exc, cause } => {
                let mut text = "raise".to_string();
                if let Some(e) = exc {
                    text.push(' ');
                    text.push_str(&self.expr(*e, TEST));
                }
                if let Some(c) = cause {
                    text.push_str(" from ");
                    text.push_str(&self.expr(*c, TEST));
                }
                self.fill(&text);
            }
            NodePayload::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.fill("try");
                self.block(body);
                for h in handlers {
                    self.statement(*h);
                }
                if !orelse.is_empty() {
                    self.fill("else");
                    self.block(orelse);
                }
                if !finalbody.is_empty() {
                    self.fill("finally");
                    self.block(finalbody);
                }
            }
            NodePayload::ExceptHandler { typ, name, body } => {
                let mut text = "except".to_string();
                if let Some(t) = typ {
                    text.push(' ');
                    text.push_str(&self.expr(*t, TEST));
                }
                if let Some(n) = name {
                    text.push_str(" as ");
                    text.push_str(n);
                }
                self.fill(&text);
                self.block(body);
            }
            NodePayload::Assert { test, msg } => {
                let mut text = format!("assert {}", self.expr(*test, TEST));
                if let Some(m) = msg {
                    text.push_str(", ");
                    text.push_str(&self.expr(*m, TEST));
                }
                self.fill(&text);
            }
            NodePayload::Import { names } => {
                let text = format!("import {}", aliases(names));
                self.fill(&text);
            }
            NodePayload::ImportFrom {
                module,
                names,
                level,
            } => {
                let text = format!(
                    "from {}{} import {}",
                    ".".repeat(*level),
                    module.as_deref().unwrap_or(""),
                    aliases(names)
                );
                self.fill(&text);
            }
            NodePayload::Global { names } => {
                let text = format!("global {}", names.join(", "));
                self.fill(&text);
            }
            NodePayload::Nonlocal { names } => {
                let text = format!("nonlocal {}", names.join(", "));
                self.fill(&text);
            }
            NodePayload::Expr { value } => {
                let text = self.expr(*value, YIELD);
                self.fill(&text);
            }
            NodePayload::Pass => self.fill("pass"),
            NodePayload::Break => self.fill("break"),
            NodePayload::Continue => self.fill("continue"),
            NodePayload::StatementGroup { body } => {
                for s in body {
                    self.statement(*s);
                }
            }
            NodePayload::Comment { text } => {
                let line = format!("# {}", text);
                self.fill(&line);
            }
            NodePayload::TrailingComment { stmt, text } => {
                let start = self.out.len();
                self.statement(*stmt);
                let rendered = &self.out[start..];
                let skip = rendered.len() - rendered.trim_start_matches('\n').len();
                let line_end = rendered[skip..]
                    .find('\n')
                    .map(|i| start + skip + i)
                    .unwrap_or(self.out.len());
                self.out.insert_str(line_end, &format!("  # {}", text));
            }
            NodePayload::SimpleLine { body } => {
                let parts: Vec<String> = body.iter().map(|s| self.statement_text(*s)).collect();
                self.fill(&parts.join("; "));
            }
            other => {
                // An expression in statement position.
                log::debug!("unparse: {} in statement position", other.get_operator());
                let text = self.expr(r, YIELD);
                self.fill(&text);
            }
        }
    }

    // Expression output.

    fn join(&self, refs: &[NodeRef], prec: Prec) -> String {
        refs.iter()
            .map(|r| self.expr(*r, prec))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The precedence a node binds at; context precedence above this needs
    /// parentheses.
    fn own_precedence(&self, r: NodeRef) -> Prec {
        match self.payload(r) {
            NodePayload::NamedExpr { .. } => NAMED_EXPR,
            NodePayload::Yield { .. } | NodePayload::YieldFrom { .. } => YIELD,
            NodePayload::Lambda { .. } | NodePayload::IfExp { .. } => TEST,
            NodePayload::BoolOp { op, .. } => boolop_precedence(*op),
            NodePayload::UnaryOp { op, .. } => unop_precedence(*op),
            NodePayload::Compare { .. } => CMP,
            NodePayload::BinOp { op, .. } => binop_precedence(*op),
            NodePayload::Await { .. } => AWAIT,
            NodePayload::Constant { value, .. } if is_negative_number(value) => POWER,
            NodePayload::Paren { value } => self.own_precedence(*value),
            _ => ATOM,
        }
    }

    fn expr(&self, r: NodeRef, ctx: Prec) -> String {
        let body = self.expr_body(r);
        if ctx > self.own_precedence(r) {
            format!("({})", body)
        } else {
            body
        }
    }

    fn expr_body(&self, r: NodeRef) -> String {
        match self.payload(r) {
            NodePayload::NamedExpr { target, value } => {
                format!("{} := {}", self.expr(*target, ATOM), self.expr(*value, ATOM))
            }
            NodePayload::BoolOp { op, values } => {
                let mut prec = boolop_precedence(*op);
                let sep = format!(" {} ", op.keyword());
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| {
                        prec += 1;
                        self.expr(*v, prec)
                    })
                    .collect();
                parts.join(&sep)
            }
            NodePayload::BinOp { left, op, right } => {
                let prec = binop_precedence(*op);
                let (lp, rp) = if *op == BinOperator::Pow {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                format!(
                    "{} {} {}",
                    self.expr(*left, lp),
                    op.symbol(),
                    self.expr(*right, rp)
                )
            }
            NodePayload::UnaryOp { op, operand } => {
                let prec = unop_precedence(*op);
                let sep = if *op == UnaryOperator::Not { " " } else { "" };
                format!("{}{}{}", op.symbol(), sep, self.expr(*operand, prec))
            }
            NodePayload::Lambda { args, body } => {
                let args = self.arguments(*args);
                if args.is_empty() {
                    format!("lambda: {}", self.expr(*body, TEST))
                } else {
                    format!("lambda {}: {}", args, self.expr(*body, TEST))
                }
            }
            NodePayload::IfExp { test, body, orelse } => format!(
                "{} if {} else {}",
                self.expr(*body, TEST + 1),
                self.expr(*test, TEST + 1),
                self.expr(*orelse, TEST)
            ),
            NodePayload::Dict { keys, values } => {
                let parts: Vec<String> = keys
                    .iter()
                    .zip(values.iter())
                    .map(|(k, v)| match k {
                        Some(k) => format!("{}: {}", self.expr(*k, TEST), self.expr(*v, TEST)),
                        None => format!("**{}", self.expr(*v, EXPR)),
                    })
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            NodePayload::Set { elts } => {
                if elts.is_empty() {
                    "{*()}".to_string()
                } else {
                    format!("{{{}}}", self.join(elts, TEST))
                }
            }
            NodePayload::ListComp { elt, generators } => {
                format!("[{}{}]", self.expr(*elt, TEST), self.generators(generators))
            }
            NodePayload::SetComp { elt, generators } => {
                format!("{{{}{}}}", self.expr(*elt, TEST), self.generators(generators))
            }
            NodePayload::GeneratorExp { elt, generators } => {
                format!("({}{})", self.expr(*elt, TEST), self.generators(generators))
            }
            NodePayload::DictComp {
                key,
                value,
                generators,
            } => format!(
                "{{{}: {}{}}}",
                self.expr(*key, TEST),
                self.expr(*value, TEST),
                self.generators(generators)
            ),
            NodePayload::Await { value } => format!("await {}", self.expr(*value, ATOM)),
            NodePayload::Yield { value } => match value {
                Some(v) => format!("yield {}", self.expr(*v, TEST)),
                None => "yield".to_string(),
            },
            NodePayload::YieldFrom { value } => format!("yield from {}", self.expr(*value, TEST)),
            NodePayload::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut text = self.expr(*left, CMP + 1);
                for (op, c) in ops.iter().zip(comparators.iter()) {
                    text.push(' ');
                    text.push_str(op.symbol());
                    text.push(' ');
                    text.push_str(&self.expr(*c, CMP + 1));
                }
                text
            }
            NodePayload::Call {
                func,
                args,
                keywords,
            } => {
                let parts: Vec<String> = args
                    .iter()
                    .chain(keywords.iter())
                    .map(|a| self.expr(*a, TEST))
                    .collect();
                format!("{}({})", self.expr(*func, ATOM), parts.join(", "))
            }
            NodePayload::Keyword { arg, value } => match arg {
                Some(name) => format!("{}={}", name, self.expr(*value, TEST)),
                None => format!("**{}", self.expr(*value, TEST)),
            },
            NodePayload::FormattedValue { .. } => {
                let mut body = String::new();
                self.fstring_part(r, &mut body);
                format!("f{}", py_repr::literal_avoiding_backslashes(&body, py_repr::ALL_QUOTES))
            }
            NodePayload::JoinedStr { values } => {
                let mut body = String::new();
                for v in values {
                    self.fstring_part(*v, &mut body);
                }
                format!("f{}", py_repr::literal_avoiding_backslashes(&body, py_repr::ALL_QUOTES))
            }
            NodePayload::Constant { value, style } => self.constant(value, style),
            NodePayload::Attribute { value, attr } => {
                let base = self.expr(*value, ATOM);
                let sep = match self.payload(*value) {
                    NodePayload::Constant {
                        value: Constant::Int(_) | Constant::BigInt(_),
                        ..
                    } => " .",
                    _ => ".",
                };
                format!("{}{}{}", base, sep, attr)
            }
            NodePayload::Subscript { value, slice } => {
                let index = match self.payload(*slice) {
                    NodePayload::Tuple { elts }
                        if !elts.is_empty()
                            && !elts
                                .iter()
                                .any(|e| matches!(self.payload(*e), NodePayload::Starred { .. })) =>
                    {
                        if elts.len() == 1 {
                            format!("{},", self.expr(elts[0], TEST))
                        } else {
                            self.join(elts, TEST)
                        }
                    }
                    _ => self.expr(*slice, TEST),
                };
                format!("{}[{}]", self.expr(*value, ATOM), index)
            }
            NodePayload::Starred { value } => format!("*{}", self.expr(*value, EXPR)),
            NodePayload::Name { id } => id.clone(),
            NodePayload::List { elts } => format!("[{}]", self.join(elts, TEST)),
            NodePayload::Tuple { elts } => {
                if elts.len() == 1 {
                    format!("({},)", self.expr(elts[0], TEST))
                } else {
                    format!("({})", self.join(elts, TEST))
                }
            }
            NodePayload::Slice { lower, upper, step } => {
                let mut text = String::new();
                if let Some(l) = lower {
                    text.push_str(&self.expr(*l, TEST));
                }
                text.push(':');
                if let Some(u) = upper {
                    text.push_str(&self.expr(*u, TEST));
                }
                if let Some(s) = step {
                    text.push(':');
                    text.push_str(&self.expr(*s, TEST));
                }
                text
            }
            NodePayload::Paren { value } => format!("({})", self.expr(*value, NAMED_EXPR)),
            NodePayload::Arguments { .. } => self.arguments(r),
            NodePayload::Arg { name, annotation } => match annotation {
                Some(a) => format!("{}: {}", name, self.expr(*a, TEST)),
                None => name.clone(),
            },
            NodePayload::Comprehension { .. } => self.generators(&[r]).trim_start().to_string(),
            NodePayload::WithItem {
                context_expr,
                optional_vars,
            } => match optional_vars {
                Some(v) => format!(
                    "{} as {}",
                    self.expr(*context_expr, TEST),
                    self.expr(*v, TEST)
                ),
                None => self.expr(*context_expr, TEST),
            },
            other => {
                // A statement in expression position renders as its own text.
                log::debug!("unparse: {} in expression position", other.get_operator());
                self.statement_text(r)
            }
        }
    }

    fn constant(&self, value: &Constant, style: &LiteralStyle) -> String {
        match value {
            Constant::None => "None".to_string(),
            Constant::Bool(true) => "True".to_string(),
            Constant::Bool(false) => "False".to_string(),
            Constant::Ellipsis => "...".to_string(),
            Constant::Int(v) => match style.radix {
                Some(radix) => {
                    let sign = if *v < 0 { "-" } else { "" };
                    let magnitude = v.unsigned_abs();
                    match radix {
                        Radix::Bin => format!("{}0b{:b}", sign, magnitude),
                        Radix::Oct => format!("{}0o{:o}", sign, magnitude),
                        Radix::Hex => format!("{}0x{:x}", sign, magnitude),
                    }
                }
                None => v.to_string(),
            },
            Constant::BigInt(digits) => digits.clone(),
            Constant::Float(v) => float_literal(*v),
            Constant::Imaginary(v) => {
                if v.is_nan() {
                    format!("({}j - {}j)", INFSTR, INFSTR)
                } else {
                    let text = float_literal(*v);
                    format!("{}j", text.strip_suffix(".0").unwrap_or(&text))
                }
            }
            Constant::Str(s) => {
                let literal = match style.quote {
                    Some(QuoteStyle::Single) => py_repr::quote_str(s, '\''),
                    Some(QuoteStyle::Double) => py_repr::quote_str(s, '"'),
                    None if self.avoid_backslashes => {
                        py_repr::literal_avoiding_backslashes(s, py_repr::ALL_QUOTES)
                    }
                    None => py_repr::str_repr(s),
                };
                if style.unicode_prefix {
                    format!("u{}", literal)
                } else {
                    literal
                }
            }
            Constant::Bytes(b) => py_repr::bytes_repr(b),
        }
    }

    fn fstring_part(&self, r: NodeRef, out: &mut String) {
        match self.payload(r) {
            NodePayload::Constant {
                value: Constant::Str(s),
                ..
            } => out.push_str(&s.replace('{', "{{").replace('}', "}}")),
            NodePayload::JoinedStr { values } => {
                for v in values {
                    self.fstring_part(*v, out);
                }
            }
            NodePayload::FormattedValue {
                value,
                conversion,
                format_spec,
            } => {
                out.push('{');
                let inner = Unparser {
                    program: self.program,
                    out: String::new(),
                    indent: 0,
                    avoid_backslashes: true,
                };
                let expr = inner.expr(*value, TEST + 1);
                if expr.starts_with('{') {
                    out.push(' ');
                }
                out.push_str(&expr);
                if let Some(c) = conversion {
                    out.push('!');
                    out.push(*c);
                }
                if let Some(spec) = format_spec {
                    out.push(':');
                    self.fstring_part(*spec, out);
                }
                out.push('}');
            }
            _ => out.push_str(&self.expr(r, TEST + 1)),
        }
    }

    fn generators(&self, generators: &[NodeRef]) -> String {
        let mut text = String::new();
        for g in generators {
            if let NodePayload::Comprehension {
                target,
                iter,
                ifs,
                is_async,
            } = self.payload(*g)
            {
                text.push_str(if *is_async { " async for " } else { " for " });
                text.push_str(&self.expr(*target, TUPLE));
                text.push_str(" in ");
                text.push_str(&self.expr(*iter, TEST + 1));
                for cond in ifs {
                    text.push_str(" if ");
                    text.push_str(&self.expr(*cond, TEST + 1));
                }
            }
        }
        text
    }

    fn arguments(&self, r: NodeRef) -> String {
        let NodePayload::Arguments {
            posonlyargs,
            args,
            vararg,
            kwonlyargs,
            kw_defaults,
            kwarg,
            defaults,
        } = self.payload(r)
        else {
            return self.expr(r, TEST);
        };
        let mut parts: Vec<String> = Vec::new();
        let all_args: Vec<NodeRef> = posonlyargs.iter().chain(args.iter()).copied().collect();
        let first_default = all_args.len().saturating_sub(defaults.len());
        for (i, a) in all_args.iter().enumerate() {
            let mut text = self.expr_body(*a);
            if i >= first_default {
                text.push('=');
                text.push_str(&self.expr(defaults[i - first_default], TEST));
            }
            parts.push(text);
            if i + 1 == posonlyargs.len() {
                parts.push("/".to_string());
            }
        }
        if vararg.is_some() || !kwonlyargs.is_empty() {
            match vararg {
                Some(v) => parts.push(format!("*{}", self.expr_body(*v))),
                None => parts.push("*".to_string()),
            }
        }
        for (a, d) in kwonlyargs.iter().zip(kw_defaults.iter()) {
            let mut text = self.expr_body(*a);
            if let Some(d) = d {
                text.push('=');
                text.push_str(&self.expr(*d, TEST));
            }
            parts.push(text);
        }
        if let Some(k) = kwarg {
            parts.push(format!("**{}", self.expr_body(*k)));
        }
        parts.join(", ")
    }
}

fn float_literal(v: f64) -> String {
    if v.is_nan() {
        return format!("({} - {})", INFSTR, INFSTR);
    }
    py_repr::float_repr(v).replace("inf", INFSTR)
}

fn aliases(names: &[crate::ast::Alias]) -> String {
    names
        .iter()
        .map(|a| match &a.asname {
            Some(asname) => format!("{} as {}", a.name, asname),
            None => a.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn roundtrip(text: &str) -> String {
        Program::parse(text).unwrap().unparse()
    }

    #[test_case("a + b * c", "a + b * c"; "no parens needed")]
    #[test_case("(a + b) * c", "(a + b) * c"; "parens kept where needed")]
    #[test_case("((a))", "a"; "redundant parens dropped")]
    #[test_case("a - (b - c)", "a - (b - c)"; "right associativity")]
    #[test_case("(a ** b) ** c", "(a ** b) ** c"; "pow left")]
    #[test_case("a ** b ** c", "a ** b ** c"; "pow right")]
    #[test_case("-x ** 2", "-x ** 2"; "unary binds looser than pow")]
    #[test_case("not a == b", "not a == b"; "not over compare")]
    #[test_case("(not a) == b", "(not a) == b"; "compare over not")]
    #[test_case("a or b and c", "a or (b and c)"; "boolop nesting")]
    #[test_case("not 3 < 2 and not 4 > 5", "not 3 < 2 and (not 4 > 5)"; "increasing boolop levels")]
    #[test_case("x if y else z", "x if y else z"; "conditional")]
    #[test_case("(lambda: 1)()", "(lambda: 1)()"; "lambda call")]
    #[test_case("1 .real", "1 .real"; "int attribute")]
    fn expression_precedence(input: &str, want: &str) {
        assert_eq!(roundtrip(input), want);
    }

    #[test_case("a, b = 1, 2", "(a, b) = (1, 2)"; "tuples are parenthesized")]
    #[test_case("for i, j in x:\n    pass", "for (i, j) in x:\n    pass"; "for target")]
    #[test_case("x[1, 2]", "x[1, 2]"; "subscript tuple")]
    #[test_case("x[1:2, ::3]", "x[1:2, ::3]"; "slices")]
    #[test_case("t = (1,)", "t = (1,)"; "singleton")]
    fn tuple_rendering(input: &str, want: &str) {
        assert_eq!(roundtrip(input), want);
    }

    #[test]
    fn blank_line_before_definitions() {
        let got = roundtrip("x = 1\ndef f(a, b=2, *args, c, **kw):\n    return a\nclass C(B):\n    pass\n");
        assert_eq!(
            got,
            "x = 1\n\ndef f(a, b=2, *args, c, **kw):\n    return a\n\nclass C(B):\n    pass"
        );
    }

    #[test]
    fn first_definition_has_no_leading_blank() {
        assert_eq!(roundtrip("def f():\n    pass\n"), "def f():\n    pass");
    }

    #[test]
    fn elif_chain_is_collapsed() {
        let src = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        assert_eq!(
            roundtrip(src),
            "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3"
        );
    }

    #[test]
    fn docstrings_use_triple_quotes() {
        let src = "def f():\n    'Returns one.\n\n    More.'\n    return 1\n";
        let src = src.replace("'Returns one.\n\n    More.'", "\"\"\"Returns one.\n\n    More.\"\"\"");
        assert_eq!(
            roundtrip(&src),
            "def f():\n    \"\"\"Returns one.\n\n    More.\"\"\"\n    return 1"
        );
    }

    #[test]
    fn parsed_literals_render_canonically() {
        assert_eq!(roundtrip("x = \"a\""), "x = 'a'");
        assert_eq!(roundtrip("x = '''a'''"), "x = 'a'");
        assert_eq!(roundtrip("x = 0xFF"), "x = 255");
        assert_eq!(roundtrip("x = \"it's\""), "x = \"it's\"");
    }

    #[test]
    fn literal_hints_are_respected() {
        let mut program = Program::parse("x = ('a', -0x10, 100)").unwrap();
        for r in program.dfs() {
            if let NodePayload::Constant { value, style } = &mut program.get_node_mut(r).payload {
                match value {
                    Constant::Str(_) => style.quote = Some(QuoteStyle::Double),
                    Constant::Int(100) => style.radix = Some(Radix::Bin),
                    Constant::Int(_) => style.radix = Some(Radix::Hex),
                    _ => {}
                }
            }
        }
        assert_eq!(program.unparse(), "x = (\"a\", -0x10, 0b1100100)");
    }

    #[test]
    fn numbers_render_like_repr() {
        assert_eq!(roundtrip("x = 1e20 + 1.50 + 2j + 1e400"), "x = 1e+20 + 1.5 + 2j + 1e309");
    }

    #[test]
    fn fstrings_roundtrip() {
        assert_eq!(roundtrip("f'x={x!r:>10} {{y}}'"), "f'x={x!r:>10} {{y}}'");
        assert_eq!(roundtrip("f\"{d['k']}\""), "f\"{d['k']}\"");
    }

    #[test]
    fn comprehensions_and_dicts() {
        assert_eq!(
            roundtrip("y = [i * 2 for i in range(3) if i]"),
            "y = [i * 2 for i in range(3) if i]"
        );
        assert_eq!(roundtrip("d = {'a': 1, **e}"), "d = {'a': 1, **e}");
        assert_eq!(roundtrip("s = {1, 2}"), "s = {1, 2}");
    }

    #[test]
    fn try_with_and_imports() {
        let src = "import os, sys as s\nfrom . import a\ntry:\n    with open(p) as f:\n        pass\nexcept ValueError as e:\n    raise\nfinally:\n    pass\n";
        assert_eq!(
            roundtrip(src),
            "import os, sys as s\nfrom . import a\ntry:\n    with open(p) as f:\n        pass\nexcept ValueError as e:\n    raise\nfinally:\n    pass"
        );
    }

    #[test]
    fn synthetic_nodes_render() {
        let mut program = Program::parse("if a:\n    b = 1\n").unwrap();
        let assign = program
            .dfs()
            .into_iter()
            .find(|r| matches!(program.payload(*r), NodePayload::Assign { .. }))
            .unwrap();
        let copy = program.deep_copy_subtree(assign);
        let comment = program.add_node(NodePayload::Comment {
            text: "note".to_string(),
        });
        let trailing = program.add_node(NodePayload::TrailingComment {
            stmt: copy,
            text: "why".to_string(),
        });
        let group = program.add_node(NodePayload::StatementGroup {
            body: vec![comment, trailing],
        });
        program.substitute(assign, group);
        assert_eq!(program.unparse(), "if a:\n    # note\n    b = 1  # why");
    }

    #[test]
    fn paren_node_adds_explicit_parens() {
        let mut program = Program::parse("x = 1 + 2 + 3").unwrap();
        let inner = program
            .dfs()
            .into_iter()
            .filter(|r| matches!(program.payload(*r), NodePayload::BinOp { .. }))
            .nth(1)
            .unwrap();
        let copy = program.deep_copy_subtree(inner);
        let paren = program.add_node(NodePayload::Paren { value: copy });
        program.substitute(inner, paren);
        assert_eq!(program.unparse(), "x = (1 + 2) + 3");
    }

    #[test]
    fn simple_line_joins_with_semicolons() {
        let mut program = Program::parse("a = 1\nb = 2\n").unwrap();
        let body = match program.payload(program.root) {
            NodePayload::Module { body } => body.clone(),
            _ => unreachable!(),
        };
        let first = program.deep_copy_subtree(body[0]);
        let second = program.deep_copy_subtree(body[1]);
        let line = program.add_node(NodePayload::SimpleLine {
            body: vec![first, second],
        });
        program.get_node_mut(program.root).payload = NodePayload::Module { body: vec![line] };
        assert_eq!(program.unparse(), "a = 1; b = 2");
    }
}
