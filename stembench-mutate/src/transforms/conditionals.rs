// SPDX-License-Identifier: Apache-2.0

//! Rewrites of `if` statements.

use stembench_pyast::ast::NodePayload;
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// Target name and value of a block made of a single `name = value`.
fn single_name_assignment(program: &Program, block: &[NodeRef]) -> Option<(String, NodeRef)> {
    let [stmt] = block else {
        return None;
    };
    match program.payload(*stmt) {
        NodePayload::Assign { targets, value } if targets.len() == 1 => program
            .payload(targets[0])
            .as_name()
            .map(|name| (name.to_string(), *value)),
        _ => None,
    }
}

/// Both branches of `node` assign the same single name.
fn branch_assignments(program: &Program, node: NodeRef) -> Option<(String, NodeRef, NodeRef)> {
    match program.payload(node) {
        NodePayload::If { body, orelse, .. } => {
            let (name, then_value) = single_name_assignment(program, body)?;
            let (other, else_value) = single_name_assignment(program, orelse)?;
            (name == other).then_some((name, then_value, else_value))
        }
        _ => None,
    }
}

/// An `if`/`else` that assigns one name in both branches becomes a single
/// conditional expression.
#[derive(Debug, Default)]
pub struct IfToConditional;

impl Transformer for IfToConditional {
    fn kind(&self) -> MutationKind {
        MutationKind::IfToConditional
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Conditionals)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        branch_assignments(ctx.program(), node).is_some()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let (name, body, orelse) = match branch_assignments(builder.program(), node) {
            Some(found) => found,
            None => return Vec::new(),
        };
        let test = match builder.payload(node) {
            NodePayload::If { test, .. } => *test,
            _ => return Vec::new(),
        };
        let value = builder.add(NodePayload::IfExp { test, body, orelse });
        let target = builder.name(&name);
        vec![builder.assign(target, value)]
    }
}

/// `if c: ...` becomes `while c: pass`.
#[derive(Debug, Default)]
pub struct IfToWhileLoop;

impl Transformer for IfToWhileLoop {
    fn kind(&self) -> MutationKind {
        MutationKind::IfToWhileLoop
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Conditionals)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(ctx.payload(node), NodePayload::If { .. })
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let test = match builder.payload(node) {
            NodePayload::If { test, .. } => *test,
            _ => return Vec::new(),
        };
        let pass = builder.add(NodePayload::Pass);
        vec![builder.add(NodePayload::While {
            test,
            body: vec![pass],
            orelse: Vec::new(),
        })]
    }
}

/// `if c: body` becomes `if not c: pass`, keeping any `else` branch.
#[derive(Debug, Default)]
pub struct InvertIf;

impl Transformer for InvertIf {
    fn kind(&self) -> MutationKind {
        MutationKind::InvertIf
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Conditionals)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(ctx.payload(node), NodePayload::If { .. })
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let old_test = match builder.payload(node) {
            NodePayload::If { test, .. } => *test,
            _ => return Vec::new(),
        };
        let negated = builder.not(old_test);
        let pass = builder.add(NodePayload::Pass);
        if let NodePayload::If { test, body, .. } = builder.payload_mut(node) {
            *test = negated;
            *body = vec![pass];
        }
        vec![node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::common::testing::assert_mutations;

    #[test]
    fn if_to_conditional() {
        assert_mutations(
            &IfToConditional,
            "
            if name == 'Alice':
                a = 3
            else:
                a = 2
            ",
            &["a = 3 if name == 'Alice' else 2"],
        );
    }

    #[test]
    fn if_to_conditional_on_elif() {
        assert_mutations(
            &IfToConditional,
            "
            if x:
                a = 1
            elif y:
                a = 3
            else:
                a = 2
            ",
            &["
            if x:
                a = 1
            else:
                a = 3 if y else 2
            "],
        );
    }

    #[test]
    fn if_to_conditional_needs_matching_targets() {
        assert_mutations(
            &IfToConditional,
            "
            if c:
                a = 1
            else:
                b = 2
            ",
            &[],
        );
        assert_mutations(&IfToConditional, "if c:\n    a = 1", &[]);
    }

    #[test]
    fn if_to_while_loop() {
        assert_mutations(
            &IfToWhileLoop,
            "
            def f(a):
                if a > 1:
                    return a
                else:
                    return 0
            ",
            &["
            def f(a):
                while a > 1:
                    pass
            "],
        );
    }

    #[test]
    fn if_to_while_loop_on_elif() {
        assert_mutations(
            &IfToWhileLoop,
            "
            if a:
                x = 1
            elif b:
                x = 2
            ",
            &[
                "
                while a:
                    pass
                ",
                "
                if a:
                    x = 1
                else:
                    while b:
                        pass
                ",
            ],
        );
    }

    #[test]
    fn invert_if_keeps_else() {
        assert_mutations(
            &InvertIf,
            "
            if a < b:
                x = 1
            else:
                x = 2
            ",
            &["
            if not a < b:
                pass
            else:
                x = 2
            "],
        );
    }
}
