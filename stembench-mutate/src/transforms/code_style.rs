// SPDX-License-Identifier: Apache-2.0

//! Layout and naming rewrites that leave program behavior alone: extra
//! parentheses, comments, renamed declarations, merged lines, quoting and
//! inert statements.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use rand::Rng;
use stembench_pyast::ast::{NodePayload, QuoteStyle};
use stembench_pyast::parser::is_keyword;
use stembench_pyast::unparse::Unparser;
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::{followed_by, in_plain_block, is_rewritable_literal, is_unary_assign};
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// Wraps operator expressions in a redundant pair of parentheses.
#[derive(Debug, Default)]
pub struct AddParens;

impl Transformer for AddParens {
    fn kind(&self) -> MutationKind {
        MutationKind::AddParens
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            ctx.payload(node),
            NodePayload::BinOp { .. }
                | NodePayload::UnaryOp { .. }
                | NodePayload::BoolOp { .. }
                | NodePayload::Compare { .. }
        ) && !ctx.in_docstring(node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        vec![builder.add(NodePayload::Paren { value: node })]
    }
}

/// True for an `if` that renders as the `elif` of its parent.
fn is_elif(ctx: &TransformContext, node: NodeRef) -> bool {
    match ctx.parent_payload(node) {
        Some(NodePayload::If { orelse, .. }) => {
            orelse.as_slice() == [node] && matches!(ctx.payload(node), NodePayload::If { .. })
        }
        _ => false,
    }
}

/// Statements that start on an indented line of their own.
fn is_commentable(ctx: &TransformContext, node: NodeRef) -> bool {
    ctx.is_indented_statement(node)
        && !ctx.in_docstring(node)
        && !is_elif(ctx, node)
        && !matches!(ctx.payload(node), NodePayload::Comment { .. })
}

const BLOCK_COMMENT: &str = "I am a block comment";
const BLOCK_COMMENT_LINES: usize = 2;

/// Puts a block comment above an indented statement.
#[derive(Debug, Default)]
pub struct BlockComments;

impl Transformer for BlockComments {
    fn kind(&self) -> MutationKind {
        MutationKind::BlockComments
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_commentable(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let mut body: Vec<NodeRef> = (0..BLOCK_COMMENT_LINES)
            .map(|_| {
                builder.add(NodePayload::Comment {
                    text: BLOCK_COMMENT.to_string(),
                })
            })
            .collect();
        body.push(node);
        vec![builder.group(body)]
    }
}

const INLINE_COMMENT: &str = "I am a comment";

/// Appends a comment to the first line of an indented statement.
#[derive(Debug, Default)]
pub struct InlineComments;

impl Transformer for InlineComments {
    fn kind(&self) -> MutationKind {
        MutationKind::InlineComments
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_commentable(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        vec![builder.add(NodePayload::TrailingComment {
            stmt: node,
            text: INLINE_COMMENT.to_string(),
        })]
    }

    fn deterministic(&self) -> bool {
        false
    }
}

/// `x op= v` becomes `x = x op v`.
#[derive(Debug, Default)]
pub struct ExpandAugmentedAssign;

impl Transformer for ExpandAugmentedAssign {
    fn kind(&self) -> MutationKind {
        MutationKind::ExpandAugmentedAssign
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(ctx.payload(node), NodePayload::AugAssign { .. })
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let (target, op, value) = match builder.payload(node) {
            NodePayload::AugAssign { target, op, value } => (*target, *op, *value),
            _ => return Vec::new(),
        };
        let operand = builder.copy(target);
        let expanded = builder.binop(operand, op, value);
        vec![builder.assign(target, expanded)]
    }
}

/// Builtins a generated short name must not shadow.
static RESERVED_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abs", "all", "any", "bin", "bool", "chr", "dict", "dir", "divmod", "enumerate", "eval",
        "filter", "float", "format", "hash", "hex", "id", "input", "int", "iter", "len", "list",
        "map", "max", "min", "next", "object", "oct", "open", "ord", "pow", "print", "range",
        "repr", "round", "set", "sorted", "str", "sum", "super", "tuple", "type", "zip",
    ]
    .into_iter()
    .collect()
});

/// Names bound by parameters, assignments, loop targets and `with` clauses.
fn declared_identifiers(program: &Program) -> HashSet<String> {
    fn add_name(program: &Program, node: NodeRef, declared: &mut HashSet<String>) {
        if let Some(name) = program.payload(node).as_name() {
            declared.insert(name.to_string());
        }
    }
    let mut declared = HashSet::new();
    for node in program.dfs() {
        match program.payload(node) {
            NodePayload::FunctionDef { args, .. } | NodePayload::Lambda { args, .. } => {
                for name in positional_parameters(program, *args) {
                    declared.insert(name);
                }
            }
            NodePayload::Assign { targets, .. } => {
                for target in targets {
                    match program.payload(*target) {
                        NodePayload::Tuple { elts } => {
                            for elt in elts {
                                add_name(program, *elt, &mut declared);
                            }
                        }
                        _ => add_name(program, *target, &mut declared),
                    }
                }
            }
            NodePayload::For { target, .. } => add_name(program, *target, &mut declared),
            NodePayload::WithItem {
                optional_vars: Some(vars),
                ..
            } => add_name(program, *vars, &mut declared),
            _ => {}
        }
    }
    declared
}

fn positional_parameters(program: &Program, arguments: NodeRef) -> Vec<String> {
    match program.payload(arguments) {
        NodePayload::Arguments { args, .. } => args
            .iter()
            .filter_map(|a| match program.payload(*a) {
                NodePayload::Arg { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `a` to `z`, then `aa` to `zz`.
fn short_names() -> impl Iterator<Item = String> {
    let letters = || (b'a'..=b'z').map(char::from);
    letters()
        .map(|c| c.to_string())
        .chain(letters().flat_map(move |first| letters().map(move |second| format!("{}{}", first, second))))
}

/// Declarations a rename applies to: every positional parameter of a
/// function, the name of a `for` loop, or the target of a unary assignment.
fn is_renamable(ctx: &TransformContext, node: NodeRef) -> bool {
    let program = ctx.program();
    match program.payload(node) {
        NodePayload::FunctionDef { .. } => true,
        NodePayload::For { target, .. } => program.payload(*target).as_name().is_some(),
        NodePayload::Assign { .. } => is_unary_assign(program, node),
        _ => false,
    }
}

/// How many fresh names renaming `node` consumes.
fn names_needed(program: &Program, node: NodeRef) -> usize {
    match program.payload(node) {
        NodePayload::FunctionDef { args, .. } => positional_parameters(program, *args).len(),
        _ => 1,
    }
}

/// Renames the declaration in `node`, drawing names in order.
fn rename_declaration(builder: &mut NodeBuilder, node: NodeRef, names: Vec<String>) -> Vec<NodeRef> {
    let mut names = names.into_iter();
    match builder.payload(node).clone() {
        NodePayload::FunctionDef { args, .. } => {
            let params = match builder.payload(args) {
                NodePayload::Arguments { args, .. } => args.clone(),
                _ => return Vec::new(),
            };
            for param in params {
                let fresh = match names.next() {
                    Some(n) => n,
                    None => break,
                };
                if let NodePayload::Arg { name, .. } = builder.payload_mut(param) {
                    *name = fresh;
                }
            }
            vec![node]
        }
        NodePayload::For { target, .. } => {
            if let (Some(fresh), NodePayload::Name { id }) = (names.next(), builder.payload_mut(target)) {
                *id = fresh;
            }
            vec![node]
        }
        NodePayload::Assign { value, .. } => match names.next() {
            Some(fresh) => {
                let target = builder.name(&fresh);
                vec![builder.assign(target, value)]
            }
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Renames a declaration to the first short name nobody in the program uses.
#[derive(Debug, Default)]
pub struct IdentifierRename;

impl Transformer for IdentifierRename {
    fn kind(&self) -> MutationKind {
        MutationKind::IdentifierRename
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_renamable(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let declared = declared_identifiers(builder.program());
        let needed = names_needed(builder.program(), node);
        let names: Vec<String> = short_names()
            .filter(|n| !declared.contains(n) && !is_keyword(n) && !RESERVED_NAMES.contains(n.as_str()))
            .take(needed)
            .collect();
        rename_declaration(builder, node, names)
    }
}

const OBFUSCATED_LEN: usize = 8;
const ASCII_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn random_identifier<R: Rng>(rng: &mut R) -> String {
    loop {
        let name: String = (0..OBFUSCATED_LEN)
            .map(|_| char::from(ASCII_LETTERS[rng.gen_range(0..ASCII_LETTERS.len())]))
            .collect();
        if !is_keyword(&name) {
            return name;
        }
    }
}

/// Renames a declaration to a random string of letters.
#[derive(Debug, Default)]
pub struct IdentifierObfuscate;

impl Transformer for IdentifierObfuscate {
    fn kind(&self) -> MutationKind {
        MutationKind::IdentifierObfuscate
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_renamable(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let needed = names_needed(builder.program(), node);
        let names = (0..needed).map(|_| random_identifier(builder.rng())).collect();
        rename_declaration(builder, node, names)
    }

    fn deterministic(&self) -> bool {
        false
    }
}

/// Follows `x = v` with `x = x`.
#[derive(Debug, Default)]
pub struct IdentityAssignment;

impl Transformer for IdentityAssignment {
    fn kind(&self) -> MutationKind {
        MutationKind::IdentityAssignment
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match ctx.payload(node) {
            NodePayload::Assign { targets, .. } => {
                is_unary_assign(ctx.program(), node)
                    && ctx.payload(targets[0]).as_name().is_some()
                    && ctx.is_block_statement(node)
            }
            _ => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let target = match builder.payload(node) {
            NodePayload::Assign { targets, .. } => targets[0],
            _ => return Vec::new(),
        };
        let lhs = builder.copy(target);
        let rhs = builder.copy(target);
        let identity = builder.assign(lhs, rhs);
        followed_by(builder, node, identity)
    }
}

fn is_mergeable(payload: &NodePayload) -> bool {
    matches!(
        payload,
        NodePayload::Expr { .. } | NodePayload::Assign { .. } | NodePayload::AugAssign { .. }
    )
}

/// Index pairs `(block, i)` where statements `i` and `i + 1` of the block
/// can share a line.
fn mergeable_pairs(program: &Program, owner: NodeRef) -> Vec<(usize, usize)> {
    let payload = program.payload(owner);
    if !matches!(
        payload,
        NodePayload::Module { .. }
            | NodePayload::FunctionDef { .. }
            | NodePayload::If { .. }
            | NodePayload::For { .. }
            | NodePayload::While { .. }
    ) {
        return Vec::new();
    }
    let mut pairs = Vec::new();
    for (b, block) in payload.blocks().into_iter().enumerate() {
        for i in 0..block.len().saturating_sub(1) {
            if is_mergeable(program.payload(block[i])) && is_mergeable(program.payload(block[i + 1])) {
                pairs.push((b, i));
            }
        }
    }
    pairs
}

/// Joins two consecutive simple statements with `; `. One alternative per
/// adjacent pair.
#[derive(Debug, Default)]
pub struct MergeStatements;

impl Transformer for MergeStatements {
    fn kind(&self) -> MutationKind {
        MutationKind::MergeStatements
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        !mergeable_pairs(ctx.program(), node).is_empty()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let pairs = mergeable_pairs(builder.program(), node);
        let mut alternatives = Vec::with_capacity(pairs.len());
        for (b, i) in pairs {
            let owner = builder.copy(node);
            let mut payload = builder.payload(owner).clone();
            let pair = match payload.blocks().get(b) {
                Some(block) => vec![block[i], block[i + 1]],
                None => continue,
            };
            let line = builder.add(NodePayload::SimpleLine { body: pair });
            if let Some(block) = payload.blocks_mut().into_iter().nth(b) {
                block[i] = line;
                block.remove(i + 1);
            }
            *builder.payload_mut(owner) = payload;
            alternatives.push(owner);
        }
        alternatives
    }
}

/// Expression statements and assignments directly in a plain block.
fn is_simple_block_statement(ctx: &TransformContext, node: NodeRef) -> bool {
    matches!(
        ctx.payload(node),
        NodePayload::Expr { .. } | NodePayload::Assign { .. }
    ) && in_plain_block(ctx, node)
        && !ctx.in_docstring(node)
}

const DEBUG_MESSAGE: &str = "This line was reached for debugging!";

/// Follows a statement with a debugging `print`.
#[derive(Debug, Default)]
pub struct PrintInjection;

impl Transformer for PrintInjection {
    fn kind(&self) -> MutationKind {
        MutationKind::PrintInjection
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_simple_block_statement(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let message = builder.str(DEBUG_MESSAGE);
        let call = builder.call("print", vec![message]);
        let print = builder.expr_stmt(call);
        followed_by(builder, node, print)
    }

    fn stem_extra_skips(&self) -> usize {
        1
    }
}

/// Follows a statement with an assignment nothing reads.
#[derive(Debug, Default)]
pub struct UnusedVariable;

impl Transformer for UnusedVariable {
    fn kind(&self) -> MutationKind {
        MutationKind::UnusedVariable
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_simple_block_statement(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let target = builder.name("foo");
        let value = builder.int(3);
        let unused = builder.assign(target, value);
        followed_by(builder, node, unused)
    }
}

/// First character of the literal as currently rendered.
fn rendered_quote(program: &Program, node: NodeRef) -> Option<char> {
    Unparser::new(program).expression(node).chars().next()
}

fn requote(builder: &mut NodeBuilder, node: NodeRef, quote: QuoteStyle) -> Vec<NodeRef> {
    if let NodePayload::Constant { style, .. } = builder.payload_mut(node) {
        style.quote = Some(quote);
    }
    vec![node]
}

fn is_quotable(ctx: &TransformContext, node: NodeRef, current: char) -> bool {
    ctx.payload(node).as_str_constant().is_some()
        && is_rewritable_literal(ctx, node)
        && rendered_quote(ctx.program(), node) == Some(current)
}

/// Writes a double-quoted string literal with single quotes.
#[derive(Debug, Default)]
pub struct StringQuoteSingle;

impl Transformer for StringQuoteSingle {
    fn kind(&self) -> MutationKind {
        MutationKind::StringQuoteSingle
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_quotable(ctx, node, '"')
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        requote(builder, node, QuoteStyle::Single)
    }
}

/// Writes a single-quoted string literal with double quotes.
#[derive(Debug, Default)]
pub struct StringQuoteDouble;

impl Transformer for StringQuoteDouble {
    fn kind(&self) -> MutationKind {
        MutationKind::StringQuoteDouble
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::CodeStyle)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_quotable(ctx, node, '\'')
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        requote(builder, node, QuoteStyle::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::transforms::common::testing::{assert_mutations, mutate};
    use pretty_assertions::assert_eq;

    #[test]
    fn add_parens_each_operator() {
        assert_mutations(
            &AddParens,
            "r = 1 + 2 + 3",
            &["r = (1 + 2 + 3)", "r = (1 + 2) + 3"],
        );
        assert_mutations(
            &AddParens,
            "x = not (a or b)",
            &["x = (not (a or b))", "x = not ((a or b))"],
        );
    }

    #[test]
    fn block_comments_only_on_indented_lines() {
        assert_mutations(
            &BlockComments,
            "
            def f(a):
                '''Doc.'''
                return a
            ",
            &["
            def f(a):
                \"\"\"Doc.\"\"\"
                # I am a block comment
                # I am a block comment
                return a
            "],
        );
        assert_mutations(&BlockComments, "x = 1\ny = 2", &[]);
    }

    #[test]
    fn inline_comments_on_compound_headers() {
        assert_mutations(
            &InlineComments,
            "
            def greet(name):
                if name == 'foo':
                    print(name)
            ",
            &[
                "
                def greet(name):
                    if name == 'foo':  # I am a comment
                        print(name)
                ",
                "
                def greet(name):
                    if name == 'foo':
                        print(name)  # I am a comment
                ",
            ],
        );
    }

    #[test]
    fn inline_comments_skip_elif() {
        let got = mutate(&InlineComments, "if a:\n    x = 1\nelif b:\n    x = 2");
        assert_eq!(
            got,
            vec![
                "if a:\n    x = 1  # I am a comment\nelif b:\n    x = 2".to_string(),
                "if a:\n    x = 1\nelif b:\n    x = 2  # I am a comment".to_string(),
            ]
        );
    }

    #[test]
    fn expand_augmented_assign() {
        assert_mutations(
            &ExpandAugmentedAssign,
            "c %= 2\nd.x += 1",
            &["c = c % 2\nd.x += 1", "c %= 2\nd.x = d.x + 1"],
        );
    }

    #[test]
    fn identifier_rename_picks_unused_short_names() {
        assert_mutations(
            &IdentifierRename,
            "
            def foo(a, b):
                c = a + b
                d = c * 2
                return d
            ",
            &[
                "
                def foo(e, f):
                    c = a + b
                    d = c * 2
                    return d
                ",
                "
                def foo(a, b):
                    e = a + b
                    d = c * 2
                    return d
                ",
                "
                def foo(a, b):
                    c = a + b
                    e = c * 2
                    return d
                ",
            ],
        );
    }

    #[test]
    fn identifier_rename_skips_every_declared_name() {
        assert_mutations(
            &IdentifierRename,
            "
            def foo(a, b):
                c, d = a, b
                for e in d:
                    g = e
            ",
            &[
                "
                def foo(f, h):
                    (c, d) = (a, b)
                    for e in d:
                        g = e
                ",
                "
                def foo(a, b):
                    (c, d) = (a, b)
                    for f in d:
                        g = e
                ",
                "
                def foo(a, b):
                    (c, d) = (a, b)
                    for e in d:
                        f = e
                ",
            ],
        );
    }

    #[test]
    fn short_names_skip_keywords() {
        let names: Vec<String> = short_names()
            .filter(|n| !is_keyword(n) && !RESERVED_NAMES.contains(n.as_str()))
            .collect();
        assert_eq!(names.len(), 26 + 26 * 26 - 6);
        assert!(!names.iter().any(|n| n == "if" || n == "id" || n == "or"));
        assert_eq!(names[26], "aa");
    }

    #[test]
    fn identifier_obfuscate_uses_random_letters() {
        let got = Engine::with_seed(3)
            .transform_all("value = 1", &IdentifierObfuscate)
            .unwrap();
        assert_eq!(got.len(), 1);
        let (name, rest) = got[0].split_once(" = ").unwrap();
        assert_eq!(rest, "1");
        assert_eq!(name.len(), OBFUSCATED_LEN);
        assert!(name.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn identity_assignment() {
        assert_mutations(
            &IdentityAssignment,
            "
            def f():
                a = 1
                b[0] = 2
                return a
            ",
            &["
            def f():
                a = 1
                a = a
                b[0] = 2
                return a
            "],
        );
    }

    #[test]
    fn merge_statements_pairs() {
        assert_mutations(
            &MergeStatements,
            "a = 1\nb = 2\nc = 3",
            &["a = 1; b = 2\nc = 3", "a = 1\nb = 2; c = 3"],
        );
    }

    #[test]
    fn merge_statements_in_nested_blocks() {
        assert_mutations(
            &MergeStatements,
            "
            if x:
                a = 1
                a += 2
            else:
                print(a)
                b = a
            ",
            &[
                "
                if x:
                    a = 1; a += 2
                else:
                    print(a)
                    b = a
                ",
                "
                if x:
                    a = 1
                    a += 2
                else:
                    print(a); b = a
                ",
            ],
        );
    }

    #[test]
    fn print_injection() {
        assert_mutations(
            &PrintInjection,
            "
            for i in x:
                total = i
            ",
            &["
            for i in x:
                total = i
                print('This line was reached for debugging!')
            "],
        );
        assert_eq!(PrintInjection.stem_extra_skips(), 1);
    }

    #[test]
    fn unused_variable() {
        assert_mutations(
            &UnusedVariable,
            "x = 1\nprint(x)",
            &["x = 1\nfoo = 3\nprint(x)", "x = 1\nprint(x)\nfoo = 3"],
        );
    }

    #[test]
    fn string_quotes() {
        assert_mutations(
            &StringQuoteDouble,
            "a = 'x'\nb = \"it's\"",
            &["a = \"x\"\nb = \"it's\""],
        );
        assert_mutations(
            &StringQuoteSingle,
            "a = 'x'\nb = \"it's\"",
            &["a = 'x'\nb = 'it\\'s'"],
        );
    }
}
