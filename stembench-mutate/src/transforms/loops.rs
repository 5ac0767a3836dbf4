// SPDX-License-Identifier: Apache-2.0

//! Loop rewrites.

use stembench_pyast::ast::{BinOperator, CmpOperator, NodePayload};
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::{call_args, int_constant, is_call_to};
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// Name of the counter introduced by `EnumerateFor`.
const COUNTER_NAME: &str = "cidx";

/// `for x in xs` becomes `for (cidx, x) in enumerate(xs)`.
#[derive(Debug, Default)]
pub struct EnumerateFor;

impl Transformer for EnumerateFor {
    fn kind(&self) -> MutationKind {
        MutationKind::EnumerateFor
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Loops)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match ctx.payload(node) {
            NodePayload::For { iter, .. } => !is_call_to(ctx.program(), *iter, "enumerate"),
            _ => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let (target, iter) = match builder.payload(node) {
            NodePayload::For { target, iter, .. } => (*target, *iter),
            _ => return Vec::new(),
        };
        let counter = builder.name(COUNTER_NAME);
        let mut elts = vec![counter];
        match builder.payload(target) {
            NodePayload::Tuple { elts: inner } => elts.extend(inner.iter().copied()),
            _ => elts.push(target),
        }
        let new_target = builder.add(NodePayload::Tuple { elts });
        let new_iter = builder.call("enumerate", vec![iter]);
        if let NodePayload::For { target, iter, .. } = builder.payload_mut(node) {
            *target = new_target;
            *iter = new_iter;
        }
        vec![node]
    }
}

/// Pieces of `for <name> in range(...)` with a literal step.
struct RangeLoop {
    name: String,
    start: Option<NodeRef>,
    stop: NodeRef,
    step: i128,
}

impl RangeLoop {
    fn from_node(program: &Program, node: NodeRef) -> Option<RangeLoop> {
        let (target, iter) = match program.payload(node) {
            NodePayload::For { target, iter, .. } => (*target, *iter),
            _ => return None,
        };
        let name = program.payload(target).as_name()?.to_string();
        let args = call_args(program, iter, "range")?;
        let (start, stop, step) = match args {
            [stop] => (None, *stop, 1),
            [start, stop] => (Some(*start), *stop, 1),
            [start, stop, step] => (Some(*start), *stop, int_constant(program, *step)?),
            _ => return None,
        };
        if step == 0 {
            return None;
        }
        Some(RangeLoop {
            name,
            start,
            stop,
            step,
        })
    }
}

/// A counting `for` over `range` becomes an explicit counter and `while`.
#[derive(Debug, Default)]
pub struct ForToWhile;

impl Transformer for ForToWhile {
    fn kind(&self) -> MutationKind {
        MutationKind::ForToWhile
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Loops)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        RangeLoop::from_node(ctx.program(), node).is_some()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let range = match RangeLoop::from_node(builder.program(), node) {
            Some(r) => r,
            None => return Vec::new(),
        };
        let (body, orelse) = match builder.payload(node) {
            NodePayload::For { body, orelse, .. } => (body.clone(), orelse.clone()),
            _ => return Vec::new(),
        };
        let start = match range.start {
            Some(s) => s,
            None => builder.int(0),
        };
        let init_target = builder.name(&range.name);
        let init = builder.assign(init_target, start);

        let (cmp, op) = if range.step > 0 {
            (CmpOperator::Lt, BinOperator::Add)
        } else {
            (CmpOperator::Gt, BinOperator::Sub)
        };
        let counter = builder.name(&range.name);
        let test = builder.add(NodePayload::Compare {
            left: counter,
            ops: vec![cmp],
            comparators: vec![range.stop],
        });
        let step_target = builder.name(&range.name);
        let magnitude = builder.int(range.step.abs());
        let advance = builder.add(NodePayload::AugAssign {
            target: step_target,
            op,
            value: magnitude,
        });
        let mut while_body = body;
        while_body.push(advance);
        let while_loop = builder.add(NodePayload::While {
            test,
            body: while_body,
            orelse,
        });
        vec![builder.group(vec![init, while_loop])]
    }

    fn stem_extra_skips(&self) -> usize {
        1
    }
}

/// `while c: ...` becomes `if c: pass`.
#[derive(Debug, Default)]
pub struct WhileToIf;

impl Transformer for WhileToIf {
    fn kind(&self) -> MutationKind {
        MutationKind::WhileToIf
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Loops)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(ctx.payload(node), NodePayload::While { .. })
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let test = match builder.payload(node) {
            NodePayload::While { test, .. } => *test,
            _ => return Vec::new(),
        };
        let pass = builder.add(NodePayload::Pass);
        vec![builder.add(NodePayload::If {
            test,
            body: vec![pass],
            orelse: Vec::new(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::common::testing::assert_mutations;

    #[test]
    fn enumerate_for() {
        assert_mutations(
            &EnumerateFor,
            "
            for i in x:
                print(i)
            for i, j in y:
                pass
            for k, v in enumerate(z):
                pass
            ",
            &[
                "
                for (cidx, i) in enumerate(x):
                    print(i)
                for (i, j) in y:
                    pass
                for (k, v) in enumerate(z):
                    pass
                ",
                "
                for i in x:
                    print(i)
                for (cidx, i, j) in enumerate(y):
                    pass
                for (k, v) in enumerate(z):
                    pass
                ",
            ],
        );
    }

    #[test]
    fn for_to_while_counts_up() {
        assert_mutations(
            &ForToWhile,
            "
            def f(n):
                for i in range(n):
                    print(i)
                return n
            ",
            &["
            def f(n):
                i = 0
                while i < n:
                    print(i)
                    i += 1
                return n
            "],
        );
    }

    #[test]
    fn for_to_while_negative_step() {
        assert_mutations(
            &ForToWhile,
            "
            for po in range(10, -10, -2):
                print(po)
            ",
            &["
            po = 10
            while po > -10:
                print(po)
                po -= 2
            "],
        );
    }

    #[test]
    fn for_to_while_needs_known_step_and_name() {
        assert_mutations(&ForToWhile, "for i in range(0, n, s):\n    pass", &[]);
        assert_mutations(&ForToWhile, "for i, j in range(3):\n    pass", &[]);
        assert_mutations(&ForToWhile, "for i in items:\n    pass", &[]);
    }

    #[test]
    fn while_to_if() {
        assert_mutations(
            &WhileToIf,
            "
            while a < 3:
                a += 1
            ",
            &["
            if a < 3:
                pass
            "],
        );
    }
}
