// SPDX-License-Identifier: Apache-2.0

//! Arithmetic identities: shifts for powers of two, complements and inverse
//! operations.

use stembench_pyast::ast::{BinOperator, Constant, NodePayload, UnaryOperator};
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// Operands of a binary operation using `op`.
fn binop_operands(program: &Program, node: NodeRef, op: BinOperator) -> Option<(NodeRef, NodeRef)> {
    match program.payload(node) {
        NodePayload::BinOp {
            left,
            op: actual,
            right,
        } if *actual == op => Some((*left, *right)),
        _ => None,
    }
}

fn is_literal_two(program: &Program, node: NodeRef) -> bool {
    matches!(
        program.payload(node),
        NodePayload::Constant {
            value: Constant::Int(2),
            ..
        }
    )
}

/// Rewrites `left <from> 2` as `left <to> 1`.
fn shift_by_one(
    builder: &mut NodeBuilder,
    node: NodeRef,
    from: BinOperator,
    to: BinOperator,
) -> Vec<NodeRef> {
    match binop_operands(builder.program(), node, from) {
        Some((left, _)) => {
            let one = builder.int(1);
            vec![builder.binop(left, to, one)]
        }
        None => Vec::new(),
    }
}

/// `a * 2` becomes `a << 1`.
#[derive(Debug, Default)]
pub struct MultiplyBy2ToBitshift;

impl Transformer for MultiplyBy2ToBitshift {
    fn kind(&self) -> MutationKind {
        MutationKind::MultiplyBy2ToBitshift
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Math)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match binop_operands(ctx.program(), node, BinOperator::Mult) {
            Some((_, right)) => is_literal_two(ctx.program(), right),
            None => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        shift_by_one(builder, node, BinOperator::Mult, BinOperator::LShift)
    }
}

/// `a / 2` becomes `a >> 1`.
#[derive(Debug, Default)]
pub struct DivideBy2ToBitshift;

impl Transformer for DivideBy2ToBitshift {
    fn kind(&self) -> MutationKind {
        MutationKind::DivideBy2ToBitshift
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Math)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match binop_operands(ctx.program(), node, BinOperator::Div) {
            Some((_, right)) => is_literal_two(ctx.program(), right),
            None => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        shift_by_one(builder, node, BinOperator::Div, BinOperator::RShift)
    }
}

/// `-x` becomes `~x + 1`.
#[derive(Debug, Default)]
pub struct NegationToComplement;

impl Transformer for NegationToComplement {
    fn kind(&self) -> MutationKind {
        MutationKind::NegationToComplement
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Math)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            ctx.payload(node),
            NodePayload::UnaryOp {
                op: UnaryOperator::USub,
                ..
            }
        )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let operand = match builder.payload(node) {
            NodePayload::UnaryOp { operand, .. } => *operand,
            _ => return Vec::new(),
        };
        let complement = builder.unary(UnaryOperator::Invert, operand);
        let one = builder.int(1);
        vec![builder.binop(complement, BinOperator::Add, one)]
    }
}

/// Declares a transformer that replaces `left <op> right` by the tree built
/// in `$rewrite`.
macro_rules! inversion_transformer {
    ($(#[$meta:meta])* $name:ident, $op:expr, |$b:ident, $left:ident, $right:ident| $rewrite:block) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name;

        impl Transformer for $name {
            fn kind(&self) -> MutationKind {
                MutationKind::$name
            }

            fn category(&self) -> Option<MutationCategory> {
                Some(MutationCategory::Math)
            }

            fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
                binop_operands(ctx.program(), node, $op).is_some()
            }

            fn transform_node(&self, $b: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
                let ($left, $right) = match binop_operands($b.program(), node, $op) {
                    Some(operands) => operands,
                    None => return Vec::new(),
                };
                vec![$rewrite]
            }
        }
    };
}

inversion_transformer!(
    /// `a + b` becomes `a - -b`.
    AdditionInversion,
    BinOperator::Add,
    |b, left, right| {
        let negated = b.unary(UnaryOperator::USub, right);
        b.binop(left, BinOperator::Sub, negated)
    }
);

inversion_transformer!(
    /// `a - b` becomes `a + -b`.
    SubtractionInversion,
    BinOperator::Sub,
    |b, left, right| {
        let negated = b.unary(UnaryOperator::USub, right);
        b.binop(left, BinOperator::Add, negated)
    }
);

inversion_transformer!(
    /// `a * b` becomes `a / (1.0 / b)`.
    MultiplicationInversion,
    BinOperator::Mult,
    |b, left, right| {
        let one = b.constant(Constant::Float(1.0));
        let reciprocal = b.binop(one, BinOperator::Div, right);
        b.binop(left, BinOperator::Div, reciprocal)
    }
);

inversion_transformer!(
    /// `a / b` becomes `a * b ** -1`.
    DivisionInversion,
    BinOperator::Div,
    |b, left, right| {
        let minus_one = b.int(-1);
        let reciprocal = b.binop(right, BinOperator::Pow, minus_one);
        b.binop(left, BinOperator::Mult, reciprocal)
    }
);

inversion_transformer!(
    /// `a % b` becomes `a - b * (a // b)`.
    ModuloInversion,
    BinOperator::Mod,
    |b, left, right| {
        let dividend = b.copy(left);
        let divisor = b.copy(right);
        let quotient = b.binop(dividend, BinOperator::FloorDiv, divisor);
        let product = b.binop(right, BinOperator::Mult, quotient);
        b.binop(left, BinOperator::Sub, product)
    }
);
