// SPDX-License-Identifier: Apache-2.0

//! String literal and concatenation rewrites.

use stembench_pyast::ast::{BinOperator, Constant, NodePayload};
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::{
    assign_value, is_call_to, is_empty_list, is_rewritable_literal, rewrite_assign_value,
};
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// `a = []` becomes `a = ''`.
#[derive(Debug, Default)]
pub struct EmptyArrayToString;

impl Transformer for EmptyArrayToString {
    fn kind(&self) -> MutationKind {
        MutationKind::EmptyArrayToString
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Strings)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        assign_value(ctx.program(), node).is_some_and(|v| is_empty_list(ctx.program(), v))
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, _| b.str(""))
    }
}

/// Characters kept on the left of a split literal.
const SPLIT_AT: usize = 3;

/// `'abcdef'` becomes `'abc' + 'def'`.
#[derive(Debug, Default)]
pub struct ConstantSplitting;

impl Transformer for ConstantSplitting {
    fn kind(&self) -> MutationKind {
        MutationKind::ConstantSplitting
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Strings)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match ctx.payload(node).as_str_constant() {
            Some(s) => s.chars().count() > SPLIT_AT && is_rewritable_literal(ctx, node),
            None => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let text = match builder.payload(node).as_str_constant() {
            Some(s) => s.to_string(),
            None => return Vec::new(),
        };
        let head: String = text.chars().take(SPLIT_AT).collect();
        let tail: String = text.chars().skip(SPLIT_AT).collect();
        let left = builder.str(&head);
        let right = builder.str(&tail);
        vec![builder.binop(left, BinOperator::Add, right)]
    }
}

fn is_str_literal(program: &Program, node: NodeRef) -> bool {
    program.payload(node).as_str_constant().is_some()
}

/// A `+` with a string literal on either side.
fn is_string_concat(ctx: &TransformContext, node: NodeRef) -> bool {
    let program = ctx.program();
    match program.payload(node) {
        NodePayload::BinOp {
            left,
            op: BinOperator::Add,
            right,
        } => {
            (is_str_literal(program, *left) || is_str_literal(program, *right))
                && is_rewritable_literal(ctx, node)
        }
        _ => false,
    }
}

/// Operands of a chain of `+`, left to right.
fn concat_parts(program: &Program, node: NodeRef, out: &mut Vec<NodeRef>) {
    match program.payload(node) {
        NodePayload::BinOp {
            left,
            op: BinOperator::Add,
            right,
        } => {
            concat_parts(program, *left, out);
            concat_parts(program, *right, out);
        }
        _ => out.push(node),
    }
}

/// `'a' + str(x)` becomes `f'a{str(x)}'`.
#[derive(Debug, Default)]
pub struct StringConcatToFString;

impl Transformer for StringConcatToFString {
    fn kind(&self) -> MutationKind {
        MutationKind::StringConcatToFString
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Strings)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_string_concat(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let mut parts = Vec::new();
        concat_parts(builder.program(), node, &mut parts);
        let values = parts
            .into_iter()
            .map(|part| {
                if is_str_literal(builder.program(), part) {
                    part
                } else {
                    builder.add(NodePayload::FormattedValue {
                        value: part,
                        conversion: None,
                        format_spec: None,
                    })
                }
            })
            .collect();
        vec![builder.add(NodePayload::JoinedStr { values })]
    }
}

/// `'a' + str(x)` becomes `''.join(['a', str(x)])`.
#[derive(Debug, Default)]
pub struct StringConcatToJoin;

impl StringConcatToJoin {
    /// Parts that are already strings go into the list unchanged.
    fn is_string_valued(program: &Program, node: NodeRef) -> bool {
        is_str_literal(program, node)
            || matches!(program.payload(node), NodePayload::JoinedStr { .. })
            || is_call_to(program, node, "str")
    }
}

impl Transformer for StringConcatToJoin {
    fn kind(&self) -> MutationKind {
        MutationKind::StringConcatToJoin
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Strings)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_string_concat(ctx, node)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let mut parts = Vec::new();
        concat_parts(builder.program(), node, &mut parts);
        let elts = parts
            .into_iter()
            .map(|part| {
                if Self::is_string_valued(builder.program(), part) {
                    part
                } else {
                    builder.call("str", vec![part])
                }
            })
            .collect();
        let list = builder.add(NodePayload::List { elts });
        let separator = builder.str("");
        let join = builder.add(NodePayload::Attribute {
            value: separator,
            attr: "join".to_string(),
        });
        vec![builder.add(NodePayload::Call {
            func: join,
            args: vec![list],
            keywords: Vec::new(),
        })]
    }
}

/// `s = 'abc'` becomes `s = b'abc'`.
#[derive(Debug, Default)]
pub struct StringToByteString;

impl Transformer for StringToByteString {
    fn kind(&self) -> MutationKind {
        MutationKind::StringToByteString
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Strings)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            assign_value(ctx.program(), node).and_then(|v| ctx.payload(v).as_str_constant()),
            Some(s) if !s.is_empty()
        )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, value| {
            let bytes = b
                .payload(value)
                .as_str_constant()
                .map(|s| s.as_bytes().to_vec())
                .unwrap_or_default();
            b.constant(Constant::Bytes(bytes))
        })
    }
}
