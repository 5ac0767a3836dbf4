// SPDX-License-Identifier: Apache-2.0

//! Alternative spellings of integer literals.

use stembench_pyast::ast::{BinOperator, Constant, NodePayload, Radix};
use stembench_pyast::NodeRef;

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::{assign_value, rewrite_assign_value};
use crate::transforms::transform_trait::{MutationKind, Transformer};

fn int_value(payload: &NodePayload) -> Option<i128> {
    match payload {
        NodePayload::Constant {
            value: Constant::Int(v),
            ..
        } => Some(*v),
        _ => None,
    }
}

/// Writes `v` as `(v + 5) + -5`.
#[derive(Debug, Default)]
pub struct IntegerReplacement;

const REPLACEMENT_OFFSET: i128 = 5;

impl Transformer for IntegerReplacement {
    fn kind(&self) -> MutationKind {
        MutationKind::IntegerReplacement
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Numbers)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        int_value(ctx.payload(node)).is_some()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let shifted = int_value(builder.payload(node)).and_then(|v| v.checked_add(REPLACEMENT_OFFSET));
        let shifted = match shifted {
            Some(v) => v,
            None => return Vec::new(),
        };
        let left = builder.int(shifted);
        let right = builder.int(-REPLACEMENT_OFFSET);
        vec![builder.binop(left, BinOperator::Add, right)]
    }
}

/// Shared body of the radix rewrites.
fn set_radix(builder: &mut NodeBuilder, node: NodeRef, radix: Radix) -> Vec<NodeRef> {
    if let NodePayload::Constant { style, .. } = builder.payload_mut(node) {
        style.radix = Some(radix);
    }
    vec![node]
}

fn is_radix_candidate(ctx: &TransformContext, node: NodeRef) -> bool {
    int_value(ctx.payload(node)).is_some() && !ctx.in_docstring(node)
}

macro_rules! radix_transformer {
    ($name:ident, $radix:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default)]
        pub struct $name;

        impl Transformer for $name {
            fn kind(&self) -> MutationKind {
                MutationKind::$name
            }

            fn category(&self) -> Option<MutationCategory> {
                Some(MutationCategory::Numbers)
            }

            fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
                is_radix_candidate(ctx, node)
            }

            fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
                set_radix(builder, node, $radix)
            }
        }
    };
}

radix_transformer!(IntegerBin, Radix::Bin, "Writes integer literals as `0b...`.");
radix_transformer!(IntegerOct, Radix::Oct, "Writes integer literals as `0o...`.");
radix_transformer!(IntegerHex, Radix::Hex, "Writes integer literals as `0x...`.");

/// `x = 5` becomes `x = 5 * 1e+20 // 1e+20`, pushing the value through a
/// float large enough to lose integer precision.
#[derive(Debug, Default)]
pub struct OverflowInteger;

const OVERFLOW_SCALE: f64 = 1e20;

impl Transformer for OverflowInteger {
    fn kind(&self) -> MutationKind {
        MutationKind::OverflowInteger
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Numbers)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        assign_value(ctx.program(), node)
            .and_then(|v| int_value(ctx.payload(v)))
            .is_some()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, value| {
            let scale = b.constant(Constant::Float(OVERFLOW_SCALE));
            let scaled = b.binop(value, BinOperator::Mult, scale);
            let divisor = b.constant(Constant::Float(OVERFLOW_SCALE));
            b.binop(scaled, BinOperator::FloorDiv, divisor)
        })
    }
}
