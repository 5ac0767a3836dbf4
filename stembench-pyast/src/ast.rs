// SPDX-License-Identifier: Apache-2.0

//! Arena representation of a parsed Python module.
//!
//! Every node lives in `Program::nodes` and refers to its children through
//! `NodeRef` indices. Each node also carries a `NodeId` identity token which is
//! unique across the process; rewrites locate their target by comparing these
//! tokens, never by structural equality.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ast_utils;
use crate::parser::{ParseError, Parser};
use crate::unparse::Unparser;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(u64);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct NodeRef {
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

impl BinOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOperator::Add => "+",
            BinOperator::Sub => "-",
            BinOperator::Mult => "*",
            BinOperator::MatMult => "@",
            BinOperator::Div => "/",
            BinOperator::Mod => "%",
            BinOperator::Pow => "**",
            BinOperator::LShift => "<<",
            BinOperator::RShift => ">>",
            BinOperator::BitOr => "|",
            BinOperator::BitXor => "^",
            BinOperator::BitAnd => "&",
            BinOperator::FloorDiv => "//",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        let op = match s {
            "+" => BinOperator::Add,
            "-" => BinOperator::Sub,
            "*" => BinOperator::Mult,
            "@" => BinOperator::MatMult,
            "/" => BinOperator::Div,
            "%" => BinOperator::Mod,
            "**" => BinOperator::Pow,
            "<<" => BinOperator::LShift,
            ">>" => BinOperator::RShift,
            "|" => BinOperator::BitOr,
            "^" => BinOperator::BitXor,
            "&" => BinOperator::BitAnd,
            "//" => BinOperator::FloorDiv,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Invert,
    Not,
    UAdd,
    USub,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Invert => "~",
            UnaryOperator::Not => "not",
            UnaryOperator::UAdd => "+",
            UnaryOperator::USub => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn keyword(&self) -> &'static str {
        match self {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            BoolOperator::And => BoolOperator::Or,
            BoolOperator::Or => BoolOperator::And,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOperator::Eq => "==",
            CmpOperator::NotEq => "!=",
            CmpOperator::Lt => "<",
            CmpOperator::LtE => "<=",
            CmpOperator::Gt => ">",
            CmpOperator::GtE => ">=",
            CmpOperator::Is => "is",
            CmpOperator::IsNot => "is not",
            CmpOperator::In => "in",
            CmpOperator::NotIn => "not in",
        }
    }

    /// The operator that yields the logical complement of this one.
    pub fn negated(&self) -> Self {
        match self {
            CmpOperator::Eq => CmpOperator::NotEq,
            CmpOperator::NotEq => CmpOperator::Eq,
            CmpOperator::Lt => CmpOperator::GtE,
            CmpOperator::LtE => CmpOperator::Gt,
            CmpOperator::Gt => CmpOperator::LtE,
            CmpOperator::GtE => CmpOperator::Lt,
            CmpOperator::Is => CmpOperator::IsNot,
            CmpOperator::IsNot => CmpOperator::Is,
            CmpOperator::In => CmpOperator::NotIn,
            CmpOperator::NotIn => CmpOperator::In,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i128),
    /// Integer literal too wide for `i128`; kept as its decimal digits.
    BigInt(String),
    Float(f64),
    Imaginary(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    Bin,
    Oct,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    Single,
    Double,
}

/// Rendering hints attached to a literal. They never change the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LiteralStyle {
    pub radix: Option<Radix>,
    pub quote: Option<QuoteStyle>,
    /// The source spelled the string with a `u` prefix.
    pub unicode_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Module {
        body: Vec<NodeRef>,
    },

    // Statements.
    FunctionDef {
        name: String,
        args: NodeRef,
        body: Vec<NodeRef>,
        decorators: Vec<NodeRef>,
        returns: Option<NodeRef>,
        is_async: bool,
    },
    ClassDef {
        name: String,
        bases: Vec<NodeRef>,
        keywords: Vec<NodeRef>,
        body: Vec<NodeRef>,
        decorators: Vec<NodeRef>,
    },
    Return {
        value: Option<NodeRef>,
    },
    Delete {
        targets: Vec<NodeRef>,
    },
    Assign {
        targets: Vec<NodeRef>,
        value: NodeRef,
    },
    AugAssign {
        target: NodeRef,
        op: BinOperator,
        value: NodeRef,
    },
    AnnAssign {
        target: NodeRef,
        annotation: NodeRef,
        value: Option<NodeRef>,
        simple: bool,
    },
    For {
        target: NodeRef,
        iter: NodeRef,
        body: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
        is_async: bool,
    },
    While {
        test: NodeRef,
        body: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
    },
    If {
        test: NodeRef,
        body: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
    },
    With {
        items: Vec<NodeRef>,
        body: Vec<NodeRef>,
        is_async: bool,
    },
    Raise {
        exc: Option<NodeRef>,
        cause: Option<NodeRef>,
    },
    Try {
        body: Vec<NodeRef>,
        handlers: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
        finalbody: Vec<NodeRef>,
    },
    Assert {
        test: NodeRef,
        msg: Option<NodeRef>,
    },
    Import {
        names: Vec<Alias>,
    },
    ImportFrom {
        module: Option<String>,
        names: Vec<Alias>,
        level: usize,
    },
    Global {
        names: Vec<String>,
    },
    Nonlocal {
        names: Vec<String>,
    },
    Expr {
        value: NodeRef,
    },
    Pass,
    Break,
    Continue,

    /// Several statements that are spliced into the enclosing block.
    StatementGroup {
        body: Vec<NodeRef>,
    },
    /// A standalone `# text` line.
    Comment {
        text: String,
    },
    /// `stmt` followed by `  # text` on its first line.
    TrailingComment {
        stmt: NodeRef,
        text: String,
    },
    /// Simple statements rendered on one line, separated by `; `.
    SimpleLine {
        body: Vec<NodeRef>,
    },

    // Expressions.
    BoolOp {
        op: BoolOperator,
        values: Vec<NodeRef>,
    },
    NamedExpr {
        target: NodeRef,
        value: NodeRef,
    },
    BinOp {
        left: NodeRef,
        op: BinOperator,
        right: NodeRef,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: NodeRef,
    },
    Lambda {
        args: NodeRef,
        body: NodeRef,
    },
    IfExp {
        test: NodeRef,
        body: NodeRef,
        orelse: NodeRef,
    },
    /// A `None` key denotes `**value` unpacking.
    Dict {
        keys: Vec<Option<NodeRef>>,
        values: Vec<NodeRef>,
    },
    Set {
        elts: Vec<NodeRef>,
    },
    ListComp {
        elt: NodeRef,
        generators: Vec<NodeRef>,
    },
    SetComp {
        elt: NodeRef,
        generators: Vec<NodeRef>,
    },
    DictComp {
        key: NodeRef,
        value: NodeRef,
        generators: Vec<NodeRef>,
    },
    GeneratorExp {
        elt: NodeRef,
        generators: Vec<NodeRef>,
    },
    Await {
        value: NodeRef,
    },
    Yield {
        value: Option<NodeRef>,
    },
    YieldFrom {
        value: NodeRef,
    },
    Compare {
        left: NodeRef,
        ops: Vec<CmpOperator>,
        comparators: Vec<NodeRef>,
    },
    Call {
        func: NodeRef,
        args: Vec<NodeRef>,
        keywords: Vec<NodeRef>,
    },
    FormattedValue {
        value: NodeRef,
        conversion: Option<char>,
        format_spec: Option<NodeRef>,
    },
    JoinedStr {
        values: Vec<NodeRef>,
    },
    Constant {
        value: Constant,
        style: LiteralStyle,
    },
    Attribute {
        value: NodeRef,
        attr: String,
    },
    Subscript {
        value: NodeRef,
        slice: NodeRef,
    },
    Starred {
        value: NodeRef,
    },
    Name {
        id: String,
    },
    List {
        elts: Vec<NodeRef>,
    },
    Tuple {
        elts: Vec<NodeRef>,
    },
    Slice {
        lower: Option<NodeRef>,
        upper: Option<NodeRef>,
        step: Option<NodeRef>,
    },
    /// Explicit parentheses around `value`, kept even where precedence would
    /// not require them.
    Paren {
        value: NodeRef,
    },

    // Auxiliary nodes.
    Arguments {
        posonlyargs: Vec<NodeRef>,
        args: Vec<NodeRef>,
        vararg: Option<NodeRef>,
        kwonlyargs: Vec<NodeRef>,
        kw_defaults: Vec<Option<NodeRef>>,
        kwarg: Option<NodeRef>,
        defaults: Vec<NodeRef>,
    },
    Arg {
        name: String,
        annotation: Option<NodeRef>,
    },
    Keyword {
        arg: Option<String>,
        value: NodeRef,
    },
    Comprehension {
        target: NodeRef,
        iter: NodeRef,
        ifs: Vec<NodeRef>,
        is_async: bool,
    },
    ExceptHandler {
        typ: Option<NodeRef>,
        name: Option<String>,
        body: Vec<NodeRef>,
    },
    WithItem {
        context_expr: NodeRef,
        optional_vars: Option<NodeRef>,
    },
}

impl NodePayload {
    pub fn get_operator(&self) -> &'static str {
        match self {
            NodePayload::Module { .. } => "Module",
            NodePayload::FunctionDef { .. } => "FunctionDef",
            NodePayload::ClassDef { .. } => "ClassDef",
            NodePayload::Return { .. } => "Return",
            NodePayload::Delete { .. } => "Delete",
            NodePayload::Assign { .. } => "Assign",
            NodePayload::AugAssign { .. } => "AugAssign",
            NodePayload::AnnAssign { .. } => "AnnAssign",
            NodePayload::For { .. } => "For",
            NodePayload::While { .. } => "While",
            NodePayload::If { .. } => "If",
            NodePayload::With { .. } => "With",
            NodePayload::Raise { .. } => "Raise",
            NodePayload::Try { .. } => "Try",
            NodePayload::Assert { .. } => "Assert",
            NodePayload::Import { .. } => "Import",
            NodePayload::ImportFrom { .. } => "ImportFrom",
            NodePayload::Global { .. } => "Global",
            NodePayload::Nonlocal { .. } => "Nonlocal",
            NodePayload::Expr { .. } => "Expr",
            NodePayload::Pass => "Pass",
            NodePayload::Break => "Break",
            NodePayload::Continue => "Continue",
            NodePayload::StatementGroup { .. } => "StatementGroup",
            NodePayload::Comment { .. } => "Comment",
            NodePayload::TrailingComment { .. } => "TrailingComment",
            NodePayload::SimpleLine { .. } => "SimpleLine",
            NodePayload::BoolOp { .. } => "BoolOp",
            NodePayload::NamedExpr { .. } => "NamedExpr",
            NodePayload::BinOp { .. } => "BinOp",
            NodePayload::UnaryOp { .. } => "UnaryOp",
            NodePayload::Lambda { .. } => "Lambda",
            NodePayload::IfExp { .. } => "IfExp",
            NodePayload::Dict { .. } => "Dict",
            NodePayload::Set { .. } => "Set",
            NodePayload::ListComp { .. } => "ListComp",
            NodePayload::SetComp { .. } => "SetComp",
            NodePayload::DictComp { .. } => "DictComp",
            NodePayload::GeneratorExp { .. } => "GeneratorExp",
            NodePayload::Await { .. } => "Await",
            NodePayload::Yield { .. } => "Yield",
            NodePayload::YieldFrom { .. } => "YieldFrom",
            NodePayload::Compare { .. } => "Compare",
            NodePayload::Call { .. } => "Call",
            NodePayload::FormattedValue { .. } => "FormattedValue",
            NodePayload::JoinedStr { .. } => "JoinedStr",
            NodePayload::Constant { .. } => "Constant",
            NodePayload::Attribute { .. } => "Attribute",
            NodePayload::Subscript { .. } => "Subscript",
            NodePayload::Starred { .. } => "Starred",
            NodePayload::Name { .. } => "Name",
            NodePayload::List { .. } => "List",
            NodePayload::Tuple { .. } => "Tuple",
            NodePayload::Slice { .. } => "Slice",
            NodePayload::Paren { .. } => "Paren",
            NodePayload::Arguments { .. } => "Arguments",
            NodePayload::Arg { .. } => "Arg",
            NodePayload::Keyword { .. } => "Keyword",
            NodePayload::Comprehension { .. } => "Comprehension",
            NodePayload::ExceptHandler { .. } => "ExceptHandler",
            NodePayload::WithItem { .. } => "WithItem",
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodePayload::FunctionDef { .. }
                | NodePayload::ClassDef { .. }
                | NodePayload::Return { .. }
                | NodePayload::Delete { .. }
                | NodePayload::Assign { .. }
                | NodePayload::AugAssign { .. }
                | NodePayload::AnnAssign { .. }
                | NodePayload::For { .. }
                | NodePayload::While { .. }
                | NodePayload::If { .. }
                | NodePayload::With { .. }
                | NodePayload::Raise { .. }
                | NodePayload::Try { .. }
                | NodePayload::Assert { .. }
                | NodePayload::Import { .. }
                | NodePayload::ImportFrom { .. }
                | NodePayload::Global { .. }
                | NodePayload::Nonlocal { .. }
                | NodePayload::Expr { .. }
                | NodePayload::Pass
                | NodePayload::Break
                | NodePayload::Continue
                | NodePayload::StatementGroup { .. }
                | NodePayload::Comment { .. }
                | NodePayload::TrailingComment { .. }
                | NodePayload::SimpleLine { .. }
        )
    }

    /// Returns the statement blocks owned by this node, in field order.
    pub fn blocks(&self) -> Vec<&Vec<NodeRef>> {
        match self {
            NodePayload::Module { body }
            | NodePayload::FunctionDef { body, .. }
            | NodePayload::ClassDef { body, .. }
            | NodePayload::With { body, .. }
            | NodePayload::ExceptHandler { body, .. }
            | NodePayload::StatementGroup { body } => vec![body],
            NodePayload::For { body, orelse, .. }
            | NodePayload::While { body, orelse, .. }
            | NodePayload::If { body, orelse, .. } => vec![body, orelse],
            NodePayload::Try {
                body,
                orelse,
                finalbody,
                ..
            } => vec![body, orelse, finalbody],
            _ => vec![],
        }
    }

    /// Mutable counterpart of `blocks`.
    pub fn blocks_mut(&mut self) -> Vec<&mut Vec<NodeRef>> {
        match self {
            NodePayload::Module { body }
            | NodePayload::FunctionDef { body, .. }
            | NodePayload::ClassDef { body, .. }
            | NodePayload::With { body, .. }
            | NodePayload::ExceptHandler { body, .. }
            | NodePayload::StatementGroup { body } => vec![body],
            NodePayload::For { body, orelse, .. }
            | NodePayload::While { body, orelse, .. }
            | NodePayload::If { body, orelse, .. } => vec![body, orelse],
            NodePayload::Try {
                body,
                orelse,
                finalbody,
                ..
            } => vec![body, orelse, finalbody],
            _ => vec![],
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            NodePayload::Name { id } => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            NodePayload::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_str_constant(&self) -> Option<&str> {
        match self {
            NodePayload::Constant {
                value: Constant::Str(s),
                ..
            } => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub payload: NodePayload,
}

/// A parsed Python module held in an arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub nodes: Vec<Node>,
    pub root: NodeRef,
}

impl Program {
    /// Parses `text` and assigns every node a fresh identity token in a
    /// single pre-order pass.
    pub fn parse(text: &str) -> Result<Program, ParseError> {
        let mut parser = Parser::new(text)?;
        let (payloads, root) = parser.parse_module()?;
        Ok(Program::from_payloads(payloads, root))
    }

    /// Builds a program from raw payloads; identities follow pre-order from
    /// `root`. Unreachable payloads still receive an identity.
    pub fn from_payloads(payloads: Vec<NodePayload>, root: NodeRef) -> Program {
        let mut ids: Vec<Option<NodeId>> = vec![None; payloads.len()];
        let mut stack = vec![root];
        while let Some(r) = stack.pop() {
            if ids[r.index].is_some() {
                continue;
            }
            ids[r.index] = Some(NodeId::fresh());
            let mut children = ast_utils::children(&payloads[r.index]);
            children.reverse();
            stack.extend(children);
        }
        let nodes = payloads
            .into_iter()
            .zip(ids)
            .map(|(payload, id)| Node {
                id: id.unwrap_or_else(NodeId::fresh),
                payload,
            })
            .collect();
        Program { nodes, root }
    }

    pub fn unparse(&self) -> String {
        Unparser::new(self).unparse()
    }

    pub fn node_refs(&self) -> Vec<NodeRef> {
        (0..self.nodes.len())
            .map(|i| NodeRef { index: i })
            .collect()
    }

    pub fn get_node(&self, node_ref: NodeRef) -> &Node {
        &self.nodes[node_ref.index]
    }

    pub fn get_node_mut(&mut self, node_ref: NodeRef) -> &mut Node {
        &mut self.nodes[node_ref.index]
    }

    pub fn payload(&self, node_ref: NodeRef) -> &NodePayload {
        &self.nodes[node_ref.index].payload
    }

    pub fn add_node(&mut self, payload: NodePayload) -> NodeRef {
        let index = self.nodes.len();
        self.nodes.push(Node {
            id: NodeId::fresh(),
            payload,
        });
        NodeRef { index }
    }

    pub fn find_by_id(&self, id: NodeId) -> Option<NodeRef> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .map(|index| NodeRef { index })
    }

    /// Nodes reachable from the root in depth-first pre-order.
    pub fn dfs(&self) -> Vec<NodeRef> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(r) = stack.pop() {
            order.push(r);
            let mut children = ast_utils::children(self.payload(r));
            children.reverse();
            stack.extend(children);
        }
        order
    }

    /// Parent table indexed by arena slot. The root and unreachable nodes
    /// have no parent.
    pub fn parents(&self) -> Vec<Option<NodeRef>> {
        let mut parents = vec![None; self.nodes.len()];
        for r in self.dfs() {
            for child in ast_utils::children(self.payload(r)) {
                parents[child.index] = Some(r);
            }
        }
        parents
    }

    /// Copies the subtree rooted at `node_ref` into fresh arena slots with
    /// fresh identities and returns the new root.
    pub fn deep_copy_subtree(&mut self, node_ref: NodeRef) -> NodeRef {
        let payload = self.payload(node_ref).clone();
        let remapped = ast_utils::remap_payload_with(&payload, |child| self.deep_copy_subtree(child));
        self.add_node(remapped)
    }

    /// Puts `replacement` in the slot of `target`. Parents of `target` now
    /// see the replacement node, including its identity; the old node is
    /// moved to the replacement's former slot where nothing refers to it.
    pub fn substitute(&mut self, target: NodeRef, replacement: NodeRef) {
        if target != replacement {
            self.nodes.swap(target.index, replacement.index);
        }
    }

    /// Splices every `StatementGroup` into the block that contains it.
    pub fn flatten_statement_groups(&mut self) {
        for r in self.dfs() {
            if self.payload(r).blocks().is_empty() {
                continue;
            }
            let mut payload = self.payload(r).clone();
            let mut changed = false;
            for block in payload.blocks_mut() {
                if block
                    .iter()
                    .any(|s| matches!(self.payload(*s), NodePayload::StatementGroup { .. }))
                {
                    let flattened = self.flatten_block(block);
                    *block = flattened;
                    changed = true;
                }
            }
            if changed {
                self.get_node_mut(r).payload = payload;
            }
        }
    }

    fn flatten_block(&self, block: &[NodeRef]) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for s in block {
            match self.payload(*s) {
                NodePayload::StatementGroup { body } => out.extend(self.flatten_block(body)),
                _ => out.push(*s),
            }
        }
        out
    }

    /// Returns the docstring statement of a module, class, or function body.
    pub fn docstring_of(&self, owner: NodeRef) -> Option<NodeRef> {
        let body = match self.payload(owner) {
            NodePayload::Module { body }
            | NodePayload::FunctionDef { body, .. }
            | NodePayload::ClassDef { body, .. } => body,
            _ => return None,
        };
        let first = *body.first()?;
        match self.payload(first) {
            NodePayload::Expr { value } if self.payload(*value).as_str_constant().is_some() => {
                Some(first)
            }
            _ => None,
        }
    }

    /// True if `node_ref` is a docstring statement or lies inside one.
    pub fn is_in_docstring(&self, node_ref: NodeRef, parents: &[Option<NodeRef>]) -> bool {
        let mut current = Some(node_ref);
        while let Some(r) = current {
            let parent = parents[r.index];
            if let Some(p) = parent {
                if self.docstring_of(p) == Some(r) {
                    return true;
                }
            }
            current = parent;
        }
        false
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unparse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identities_are_unique_and_preorder() {
        let program = Program::parse("a = 1\nb = a + 2\n").unwrap();
        let order = program.dfs();
        let ids: Vec<u64> = order
            .iter()
            .map(|r| program.get_node(*r).id.value())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn parse_twice_gives_distinct_identities() {
        let a = Program::parse("x = 1").unwrap();
        let b = Program::parse("x = 1").unwrap();
        assert_ne!(a.get_node(a.root).id, b.get_node(b.root).id);
        assert_eq!(a.unparse(), b.unparse());
    }

    #[test]
    fn parents_point_back_to_owner() {
        let program = Program::parse("def f(a):\n    return a\n").unwrap();
        let parents = program.parents();
        let ret = program
            .dfs()
            .into_iter()
            .find(|r| matches!(program.payload(*r), NodePayload::Return { .. }))
            .unwrap();
        let owner = parents[ret.index].unwrap();
        assert!(matches!(
            program.payload(owner),
            NodePayload::FunctionDef { .. }
        ));
        assert_eq!(parents[program.root.index], None);
    }

    #[test]
    fn deep_copy_gets_fresh_identities() {
        let mut program = Program::parse("x = [1, 2]").unwrap();
        let list = program
            .dfs()
            .into_iter()
            .find(|r| matches!(program.payload(*r), NodePayload::List { .. }))
            .unwrap();
        let copy = program.deep_copy_subtree(list);
        assert_ne!(program.get_node(copy).id, program.get_node(list).id);
        let copy_children = ast_utils::children(program.payload(copy));
        let orig_children = ast_utils::children(program.payload(list));
        for (c, o) in copy_children.iter().zip(orig_children.iter()) {
            assert_ne!(c.index, o.index);
            assert_eq!(program.payload(*c), program.payload(*o));
        }
    }

    #[test]
    fn flatten_statement_groups_splices_into_block() {
        let mut program = Program::parse("a = 1\nb = 2\n").unwrap();
        let body = match program.payload(program.root) {
            NodePayload::Module { body } => body.clone(),
            _ => unreachable!(),
        };
        let first_copy = program.deep_copy_subtree(body[0]);
        let pass = program.add_node(NodePayload::Pass);
        let group = program.add_node(NodePayload::StatementGroup {
            body: vec![first_copy, pass],
        });
        program.substitute(body[0], group);
        program.flatten_statement_groups();
        match program.payload(program.root) {
            NodePayload::Module { body } => assert_eq!(body.len(), 3),
            _ => unreachable!(),
        }
        assert_eq!(program.unparse(), "a = 1\npass\nb = 2");
    }

    #[test]
    fn docstring_membership() {
        let program = Program::parse("def f():\n    'doc'\n    return 1\n").unwrap();
        let parents = program.parents();
        let doc_const = program
            .dfs()
            .into_iter()
            .find(|r| program.payload(*r).as_str_constant() == Some("doc"))
            .unwrap();
        assert!(program.is_in_docstring(doc_const, &parents));
        let one = program
            .dfs()
            .into_iter()
            .find(|r| program.payload(*r).as_constant() == Some(&Constant::Int(1)))
            .unwrap();
        assert!(!program.is_in_docstring(one, &parents));
    }
}
