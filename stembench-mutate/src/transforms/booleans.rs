// SPDX-License-Identifier: Apache-2.0

//! Boolean rewrites: De Morgan's laws, condition inversion and neutral
//! conjunction.

use stembench_pyast::ast::{BoolOperator, Constant, NodePayload, UnaryOperator};
use stembench_pyast::ast_utils::{children, remap_payload_with};
use stembench_pyast::unparse::Unparser;
use stembench_pyast::NodeRef;

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::is_call_to;
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// The expression a statement tests or produces.
fn condition_of(payload: &NodePayload) -> Option<NodeRef> {
    match payload {
        NodePayload::If { test, .. } | NodePayload::While { test, .. } => Some(*test),
        NodePayload::Assign { value, .. } | NodePayload::Expr { value } => Some(*value),
        NodePayload::Return { value } => *value,
        _ => None,
    }
}

fn set_condition(payload: &mut NodePayload, new: NodeRef) {
    match payload {
        NodePayload::If { test, .. } | NodePayload::While { test, .. } => *test = new,
        NodePayload::Assign { value, .. } | NodePayload::Expr { value } => *value = new,
        NodePayload::Return { value } => *value = Some(new),
        _ => {}
    }
}

/// Replaces the condition of `node` with `f(condition)`.
fn rewrite_condition<F>(builder: &mut NodeBuilder, node: NodeRef, f: F) -> Vec<NodeRef>
where
    F: FnOnce(&mut NodeBuilder, NodeRef) -> NodeRef,
{
    let old = match condition_of(builder.payload(node)) {
        Some(c) => c,
        None => return Vec::new(),
    };
    let new = f(builder, old);
    set_condition(builder.payload_mut(node), new);
    vec![node]
}

fn not_operand(payload: &NodePayload) -> Option<NodeRef> {
    match payload {
        NodePayload::UnaryOp {
            op: UnaryOperator::Not,
            operand,
        } => Some(*operand),
        _ => None,
    }
}

/// One step of De Morgan's laws at the top of `expr`:
/// `not (a or b)` becomes `not a and not b`, and `not a or not b` becomes
/// `not (a and b)`. Operands are rewritten recursively.
fn demorgan(b: &mut NodeBuilder, expr: NodeRef) -> NodeRef {
    if let Some(operand) = not_operand(b.payload(expr)) {
        if let NodePayload::BoolOp { op, values } = b.payload(operand).clone() {
            let values = values
                .into_iter()
                .map(|v| {
                    let inner = demorgan(b, v);
                    b.not(inner)
                })
                .collect();
            return b.add(NodePayload::BoolOp {
                op: op.flipped(),
                values,
            });
        }
        return expr;
    }
    if let NodePayload::BoolOp { op, values } = b.payload(expr).clone() {
        let operands: Option<Vec<NodeRef>> =
            values.iter().map(|v| not_operand(b.payload(*v))).collect();
        if let Some(operands) = operands {
            let values = operands.into_iter().map(|v| demorgan(b, v)).collect();
            let flipped = b.add(NodePayload::BoolOp {
                op: op.flipped(),
                values,
            });
            return b.not(flipped);
        }
    }
    expr
}

/// Pushes negations towards the leaves: double negations cancel, a single
/// comparison flips its operator and `not` distributes over `and`/`or`.
fn simplify(b: &mut NodeBuilder, expr: NodeRef) -> NodeRef {
    let payload = b.payload(expr).clone();
    if let Some(operand) = not_operand(&payload) {
        let operand = simplify(b, operand);
        return match b.payload(operand).clone() {
            NodePayload::UnaryOp {
                op: UnaryOperator::Not,
                operand: inner,
            } => inner,
            NodePayload::Constant {
                value: Constant::Bool(false),
                ..
            } => b.constant(Constant::Bool(true)),
            // Chained comparisons are not the conjunction of their negations.
            NodePayload::Compare {
                left,
                ops,
                comparators,
            } if ops.len() == 1 => b.add(NodePayload::Compare {
                left,
                ops: vec![ops[0].negated()],
                comparators,
            }),
            NodePayload::BoolOp { op, values } => {
                let values = values
                    .into_iter()
                    .map(|v| {
                        let negated = b.not(v);
                        simplify(b, negated)
                    })
                    .collect();
                b.add(NodePayload::BoolOp {
                    op: op.flipped(),
                    values,
                })
            }
            _ => b.not(operand),
        };
    }
    if children(&payload).is_empty() {
        return expr;
    }
    let remapped = remap_payload_with(&payload, |child| simplify(b, child));
    b.add(remapped)
}

/// The logical negation of `expr`, simplified.
fn invert(b: &mut NodeBuilder, expr: NodeRef) -> NodeRef {
    let is_negated_boolop = match not_operand(b.payload(expr)) {
        Some(operand) => matches!(b.payload(operand), NodePayload::BoolOp { .. }),
        None => false,
    };
    let expr = if is_negated_boolop {
        demorgan(b, expr)
    } else {
        expr
    };
    let negated = b.not(expr);
    simplify(b, negated)
}

fn is_loop_or_branch(payload: &NodePayload) -> bool {
    matches!(payload, NodePayload::If { .. } | NodePayload::While { .. })
}

/// Applies De Morgan's laws to the condition of a statement.
#[derive(Debug, Default)]
pub struct BooleanDemorgans;

impl Transformer for BooleanDemorgans {
    fn kind(&self) -> MutationKind {
        MutationKind::BooleanDemorgans
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Booleans)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        condition_of(ctx.payload(node)).is_some()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_condition(builder, node, demorgan)
    }
}

/// Replaces the condition `c` of an `if` or `while` with the simplified form
/// of `not c`, inverting the branch.
#[derive(Debug, Default)]
pub struct FirstInversion;

impl Transformer for FirstInversion {
    fn kind(&self) -> MutationKind {
        MutationKind::FirstInversion
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Booleans)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_loop_or_branch(ctx.payload(node))
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_condition(builder, node, invert)
    }
}

/// Replaces a condition `c` with `not <simplified not c>`, which keeps its
/// truth value.
#[derive(Debug, Default)]
pub struct SecondInversion;

impl SecondInversion {
    fn is_boolean_valued(ctx: &TransformContext, expr: NodeRef) -> bool {
        let program = ctx.program();
        match ctx.payload(expr) {
            NodePayload::Constant {
                value: Constant::Bool(_),
                ..
            }
            | NodePayload::Compare { .. }
            | NodePayload::BoolOp { .. }
            | NodePayload::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => true,
            NodePayload::Call { .. } => ["isinstance", "callable", "bool"]
                .iter()
                .any(|name| is_call_to(program, expr, name)),
            _ => false,
        }
    }
}

impl Transformer for SecondInversion {
    fn kind(&self) -> MutationKind {
        MutationKind::SecondInversion
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Booleans)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match ctx.payload(node) {
            NodePayload::If { .. } | NodePayload::While { .. } => true,
            NodePayload::Assign { value, .. } => Self::is_boolean_valued(ctx, *value),
            _ => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let old = match condition_of(builder.payload(node)) {
            Some(c) => c,
            None => return Vec::new(),
        };
        let before = Unparser::new(builder.program()).expression(old);
        let inverted = invert(builder, old);
        let new = builder.not(inverted);
        let after = Unparser::new(builder.program()).expression(new);
        if before == after {
            return Vec::new();
        }
        set_condition(builder.payload_mut(node), new);
        vec![node]
    }
}

/// Conjoins a boolean expression with `True`.
#[derive(Debug, Default)]
pub struct ExpandBooleans;

impl Transformer for ExpandBooleans {
    fn kind(&self) -> MutationKind {
        MutationKind::ExpandBooleans
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Booleans)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            ctx.payload(node),
            NodePayload::Compare { .. }
                | NodePayload::UnaryOp {
                    op: UnaryOperator::Not,
                    ..
                }
                | NodePayload::Constant {
                    value: Constant::Bool(_),
                    ..
                }
        )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let neutral = builder.constant(Constant::Bool(true));
        vec![builder.add(NodePayload::BoolOp {
            op: BoolOperator::And,
            values: vec![node, neutral],
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::common::testing::assert_mutations;
    use test_case::test_case;

    #[test_case("x = not True or not False", "x = not (True and False)"; "negated operands")]
    #[test_case("x = not 3 < 2 and not 4 > 5", "x = not (3 < 2 or 4 > 5)"; "negated comparisons")]
    #[test_case("x = not (a is b or a is not b)", "x = not a is b and (not a is not b)"; "negated disjunction")]
    fn demorgans_on_assignment(source: &str, want: &str) {
        assert_mutations(&BooleanDemorgans, source, &[want]);
    }

    #[test]
    fn demorgans_recurses_into_operands() {
        assert_mutations(
            &BooleanDemorgans,
            "
            while not (a and b) or not (not c or not d):
                pass
            ",
            &["
            while not ((a and b) and (not (c and d))):
                pass
            "],
        );
    }

    #[test]
    fn demorgans_without_negation_is_a_no_op() {
        assert_mutations(
            &BooleanDemorgans,
            "
            def f(a, b):
                return a and b
            ",
            &[],
        );
    }

    #[test_case("foo", "not foo"; "bare name")]
    #[test_case("not foo is not 5", "foo is not 5"; "negated comparison")]
    #[test_case("c - 6 == 5", "c - 6 != 5"; "comparison flips")]
    #[test_case("not (a < 5 and b > 6) or not not c == 5", "(a < 5 and b > 6) and c != 5"; "nested negations")]
    #[test_case("(not (a < 5 and not b > 6)) == False", "(a >= 5 or b > 6) != False"; "compare against literal")]
    #[test_case("(a < 5 and (b > 6 or c == 5))", "a >= 5 or (b <= 6 and c != 5)"; "distributes over and")]
    #[test_case("a and b", "not a or not b"; "plain conjunction")]
    fn first_inversion(test: &str, want: &str) {
        assert_mutations(
            &FirstInversion,
            &format!("if {}:\n    pass", test),
            &[&format!("if {}:\n    pass", want)],
        );
    }

    #[test]
    fn first_inversion_keeps_chained_comparison_negated() {
        assert_mutations(
            &FirstInversion,
            "while a < b < c:\n    pass",
            &["while not a < b < c:\n    pass"],
        );
    }

    #[test]
    fn second_inversion_preserves_truth() {
        assert_mutations(
            &SecondInversion,
            "
            if not a and not b:
                x = 1
            ",
            &["
            if not (a or b):
                x = 1
            "],
        );
    }

    #[test]
    fn second_inversion_on_boolean_assignment() {
        assert_mutations(
            &SecondInversion,
            "flag = isinstance(x, int)\ncount = 5",
            &["flag = not not isinstance(x, int)\ncount = 5"],
        );
    }

    #[test]
    fn second_inversion_skips_unchanged_condition() {
        assert_mutations(&SecondInversion, "if not a < b < c:\n    pass", &[]);
    }

    #[test]
    fn expand_booleans() {
        assert_mutations(&ExpandBooleans, "result = not m", &["result = not m and True"]);
        assert_mutations(
            &ExpandBooleans,
            "result = not m and not (a or b)",
            &[
                "result = (not m and True) and (not (a or b))",
                "result = not m and (not (a or b) and True)",
            ],
        );
    }
}
