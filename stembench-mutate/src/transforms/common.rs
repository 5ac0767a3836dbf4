// SPDX-License-Identifier: Apache-2.0

//! Node predicates and small rewrites shared by several transformer families.

use stembench_pyast::ast::{Constant, NodePayload, UnaryOperator};
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};

/// An assignment whose first target is not a tuple.
pub fn is_unary_assign(program: &Program, node: NodeRef) -> bool {
    match program.payload(node) {
        NodePayload::Assign { targets, .. } => match targets.first() {
            Some(first) => !matches!(program.payload(*first), NodePayload::Tuple { .. }),
            None => false,
        },
        _ => false,
    }
}

/// The value of an assignment statement, if `node` is one.
pub fn assign_value(program: &Program, node: NodeRef) -> Option<NodeRef> {
    match program.payload(node) {
        NodePayload::Assign { value, .. } => Some(*value),
        _ => None,
    }
}

/// Arguments of a positional-only call to the builtin `name`.
pub fn call_args<'p>(program: &'p Program, node: NodeRef, name: &str) -> Option<&'p [NodeRef]> {
    match program.payload(node) {
        NodePayload::Call {
            func,
            args,
            keywords,
        } if keywords.is_empty() && program.payload(*func).as_name() == Some(name) => {
            Some(args.as_slice())
        }
        _ => None,
    }
}

pub fn is_call_to(program: &Program, node: NodeRef, name: &str) -> bool {
    call_args(program, node, name).is_some()
}

/// Integer value of a literal, reading `-<int>` as a negative literal.
pub fn int_constant(program: &Program, node: NodeRef) -> Option<i128> {
    match program.payload(node) {
        NodePayload::Constant {
            value: Constant::Int(v),
            ..
        } => Some(*v),
        NodePayload::UnaryOp {
            op: UnaryOperator::USub,
            operand,
        } => match program.payload(*operand) {
            NodePayload::Constant {
                value: Constant::Int(v),
                ..
            } => v.checked_neg(),
            _ => None,
        },
        _ => None,
    }
}

pub fn is_empty_list(program: &Program, node: NodeRef) -> bool {
    matches!(program.payload(node), NodePayload::List { elts } if elts.is_empty())
}

/// True for literals that live in an f-string, where a rewrite would have to
/// respect the surrounding quoting.
pub fn in_fstring(ctx: &TransformContext, node: NodeRef) -> bool {
    ctx.ancestors(node)
        .into_iter()
        .any(|a| matches!(ctx.payload(a), NodePayload::JoinedStr { .. }))
}

/// Literal positions that may be rewritten: outside docstrings and f-strings.
pub fn is_rewritable_literal(ctx: &TransformContext, node: NodeRef) -> bool {
    !ctx.in_docstring(node) && !in_fstring(ctx, node)
}

/// Replaces the value of the assignment `node` with `f(old_value)`.
pub fn rewrite_assign_value<F>(builder: &mut NodeBuilder, node: NodeRef, f: F) -> Vec<NodeRef>
where
    F: FnOnce(&mut NodeBuilder, NodeRef) -> NodeRef,
{
    let old = match assign_value(builder.program(), node) {
        Some(v) => v,
        None => return Vec::new(),
    };
    let new = f(builder, old);
    if let NodePayload::Assign { value, .. } = builder.payload_mut(node) {
        *value = new;
    }
    vec![node]
}

/// Wraps a statement so that `after` follows it in the same block.
pub fn followed_by(builder: &mut NodeBuilder, node: NodeRef, after: NodeRef) -> Vec<NodeRef> {
    vec![builder.group(vec![node, after])]
}

/// True if `node` is listed directly in the body of a module, function or
/// simple compound statement.
pub fn in_plain_block(ctx: &TransformContext, node: NodeRef) -> bool {
    ctx.is_block_statement(node)
        && matches!(
            ctx.parent_payload(node),
            Some(
                NodePayload::Module { .. }
                    | NodePayload::FunctionDef { .. }
                    | NodePayload::If { .. }
                    | NodePayload::For { .. }
                    | NodePayload::While { .. }
            )
        )
}
