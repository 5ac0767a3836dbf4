// SPDX-License-Identifier: Apache-2.0

//! Rewrites of list construction, sizing and iteration ranges.

use stembench_pyast::ast::{BinOperator, Constant, NodePayload};
use stembench_pyast::{NodeRef, Program};

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::{
    assign_value, call_args, int_constant, is_empty_list, is_unary_assign, rewrite_assign_value,
};
use crate::transforms::transform_trait::{MutationKind, Transformer};

/// `len(x)` becomes `sum([1 for _ in x])`.
#[derive(Debug, Default)]
pub struct LenToGenerator;

impl Transformer for LenToGenerator {
    fn kind(&self) -> MutationKind {
        MutationKind::LenToGenerator
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Arrays)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(call_args(ctx.program(), node, "len"), Some(args) if args.len() == 1)
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let iter = match call_args(builder.program(), node, "len") {
            Some([arg]) => *arg,
            _ => return Vec::new(),
        };
        let one = builder.int(1);
        let target = builder.name("_");
        let generator = builder.add(NodePayload::Comprehension {
            target,
            iter,
            ifs: Vec::new(),
            is_async: false,
        });
        let comp = builder.add(NodePayload::ListComp {
            elt: one,
            generators: vec![generator],
        });
        vec![builder.call("sum", vec![comp])]
    }
}

/// `a = [...]` becomes `a = list(*[[...]])`.
#[derive(Debug, Default)]
pub struct ListInitializerUnpack;

impl Transformer for ListInitializerUnpack {
    fn kind(&self) -> MutationKind {
        MutationKind::ListInitializerUnpack
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Arrays)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            assign_value(ctx.program(), node).map(|v| ctx.payload(v)),
            Some(NodePayload::List { .. })
        )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, list| {
            let outer = b.add(NodePayload::List { elts: vec![list] });
            let starred = b.add(NodePayload::Starred { value: outer });
            b.call("list", vec![starred])
        })
    }
}

/// `a = [...]` becomes `a = [[...]]`.
#[derive(Debug, Default)]
pub struct NestedArrayInitializer;

impl Transformer for NestedArrayInitializer {
    fn kind(&self) -> MutationKind {
        MutationKind::NestedArrayInitializer
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Arrays)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_unary_assign(ctx.program(), node)
            && matches!(
                assign_value(ctx.program(), node).map(|v| ctx.payload(v)),
                Some(NodePayload::List { .. })
            )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, list| {
            b.add(NodePayload::List { elts: vec![list] })
        })
    }
}

/// Iterates a `range` backwards: `range(a, b, s)` becomes
/// `range(b - 1, a - 1, -s)` for positive `s`. Literal bounds are folded.
#[derive(Debug, Default)]
pub struct ReverseRange;

impl ReverseRange {
    /// Step of the call, when it is known at rewrite time.
    fn step(program: &Program, args: &[NodeRef]) -> Option<i128> {
        match args.len() {
            1 | 2 => Some(1),
            3 => int_constant(program, args[2]).filter(|s| *s != 0),
            _ => None,
        }
    }

    /// The bound `v` moved one step towards the old start.
    fn shifted(builder: &mut NodeBuilder, bound: Bound, step: i128) -> Option<NodeRef> {
        let (delta, op) = if step > 0 {
            (-1, BinOperator::Sub)
        } else {
            (1, BinOperator::Add)
        };
        match bound {
            Bound::Literal(v) => Some(builder.int(v.checked_add(delta)?)),
            Bound::Expr(e) => {
                let one = builder.int(1);
                Some(builder.binop(e, op, one))
            }
        }
    }

    fn bound(builder: &NodeBuilder, node: NodeRef) -> Bound {
        match int_constant(builder.program(), node) {
            Some(v) => Bound::Literal(v),
            None => Bound::Expr(node),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Literal(i128),
    Expr(NodeRef),
}

impl Transformer for ReverseRange {
    fn kind(&self) -> MutationKind {
        MutationKind::ReverseRange
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Arrays)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        match call_args(ctx.program(), node, "range") {
            Some(args) => Self::step(ctx.program(), args).is_some(),
            None => false,
        }
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        let args = match call_args(builder.program(), node, "range") {
            Some(args) => args.to_vec(),
            None => return Vec::new(),
        };
        let step = match Self::step(builder.program(), &args) {
            Some(s) => s,
            None => return Vec::new(),
        };
        let (start, stop) = match args.as_slice() {
            [stop] => (Bound::Literal(0), Self::bound(builder, *stop)),
            [start, stop, ..] => (Self::bound(builder, *start), Self::bound(builder, *stop)),
            [] => return Vec::new(),
        };
        let new_start = Self::shifted(builder, stop, step);
        let new_stop = Self::shifted(builder, start, step);
        let (new_start, new_stop, new_step) = match (new_start, new_stop, step.checked_neg()) {
            (Some(a), Some(b), Some(s)) => (a, b, s),
            _ => {
                log::warn!("ReverseRange: bounds of {:?} overflow", args);
                return Vec::new();
            }
        };
        let new_step = builder.int(new_step);
        vec![builder.call("range", vec![new_start, new_stop, new_step])]
    }
}

/// `a = []` becomes `a = [None]`.
#[derive(Debug, Default)]
pub struct SingleElementInitializer;

impl Transformer for SingleElementInitializer {
    fn kind(&self) -> MutationKind {
        MutationKind::SingleElementInitializer
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Arrays)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        is_unary_assign(ctx.program(), node)
            && assign_value(ctx.program(), node).is_some_and(|v| is_empty_list(ctx.program(), v))
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, _| {
            let none = b.constant(Constant::None);
            b.add(NodePayload::List { elts: vec![none] })
        })
    }
}

/// `s = "ab"` becomes `s = ['a', 'b']`.
#[derive(Debug, Default)]
pub struct StringToCharArray;

impl Transformer for StringToCharArray {
    fn kind(&self) -> MutationKind {
        MutationKind::StringToCharArray
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Arrays)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        assign_value(ctx.program(), node)
            .and_then(|v| ctx.payload(v).as_str_constant())
            .is_some()
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, value| {
            let text = b.payload(value).as_str_constant().unwrap_or_default().to_string();
            let elts = text.chars().map(|c| b.str(&c.to_string())).collect();
            b.add(NodePayload::List { elts })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::common::testing::assert_mutations;

    #[test]
    fn len_to_generator() {
        assert_mutations(
            &LenToGenerator,
            "
            def myFunc(arr):
                return len(arr)
            ",
            &["
            def myFunc(arr):
                return sum([1 for _ in arr])
            "],
        );
    }

    #[test]
    fn len_to_generator_nested_calls_each_rewrite() {
        assert_mutations(
            &LenToGenerator,
            "
            def myFunc(mylist):
                return len(mylist[len(mylist) - 1])
            ",
            &[
                "
                def myFunc(mylist):
                    return sum([1 for _ in mylist[len(mylist) - 1]])
                ",
                "
                def myFunc(mylist):
                    return len(mylist[sum([1 for _ in mylist]) - 1])
                ",
            ],
        );
    }

    #[test]
    fn list_initializer_unpack() {
        assert_mutations(
            &ListInitializerUnpack,
            "
            def myTest():
                myComplex = [1, True, {\"a\": 1, \"b\": 2}]
                myComplex = myComplex[:1]
            ",
            &["
            def myTest():
                myComplex = list(*[[1, True, {'a': 1, 'b': 2}]])
                myComplex = myComplex[:1]
            "],
        );
        assert_mutations(&ListInitializerUnpack, "[]", &[]);
    }

    #[test]
    fn nested_array_initializer_skips_unpacking() {
        assert_mutations(
            &NestedArrayInitializer,
            "
            def testNested(arr, foo):
                a = [1, 2, 3]
                if len(a) > 0:
                    a = [None]
                    return a
            ",
            &[
                "
                def testNested(arr, foo):
                    a = [[1, 2, 3]]
                    if len(a) > 0:
                        a = [None]
                        return a
                ",
                "
                def testNested(arr, foo):
                    a = [1, 2, 3]
                    if len(a) > 0:
                        a = [[None]]
                        return a
                ",
            ],
        );
        assert_mutations(&NestedArrayInitializer, "a, b = [1, 2]", &[]);
        assert_mutations(&NestedArrayInitializer, "a, b = [1, 2], [3, 4]", &[]);
    }

    #[test]
    fn reverse_range_constant_bounds() {
        assert_mutations(
            &ReverseRange,
            "
            def loop():
                for i, j in enumerate(range(10)):
                    print(i, j)
                    for k in range(-1, 10, 2):
                        print(range(-30, -20))
            ",
            &[
                "
                def loop():
                    for (i, j) in enumerate(range(9, -1, -1)):
                        print(i, j)
                        for k in range(-1, 10, 2):
                            print(range(-30, -20))
                ",
                "
                def loop():
                    for (i, j) in enumerate(range(10)):
                        print(i, j)
                        for k in range(9, -2, -2):
                            print(range(-30, -20))
                ",
                "
                def loop():
                    for (i, j) in enumerate(range(10)):
                        print(i, j)
                        for k in range(-1, 10, 2):
                            print(range(-21, -31, -1))
                ",
            ],
        );
    }

    #[test]
    fn reverse_range_negative_step() {
        assert_mutations(
            &ReverseRange,
            "
            a = range(-5, -4)
            b = range(10, 0, -1)
            ",
            &[
                "
                a = range(-5, -6, -1)
                b = range(10, 0, -1)
                ",
                "
                a = range(-5, -4)
                b = range(1, 11, 1)
                ",
            ],
        );
    }

    #[test]
    fn reverse_range_symbolic_bounds() {
        assert_mutations(
            &ReverseRange,
            "
            def loop(n):
                for i in range(n):
                    print(i)
            ",
            &["
            def loop(n):
                for i in range(n - 1, -1, -1):
                    print(i)
            "],
        );
        // An unknown step cannot be reversed.
        assert_mutations(&ReverseRange, "range(0, n, s)", &[]);
    }

    #[test]
    fn single_element_initializer() {
        assert_mutations(
            &SingleElementInitializer,
            "
            a = []
            b = [None]
            [None]
            ",
            &["
            a = [None]
            b = [None]
            [None]
            "],
        );
    }

    #[test]
    fn string_to_char_array_leaves_docstring() {
        assert_mutations(
            &StringToCharArray,
            "
            def doWork():
                '''oh no'''
                my_name = \"Amrit\\nis cool\"
                return my_name
            ",
            &["
            def doWork():
                \"\"\"oh no\"\"\"
                my_name = ['A', 'm', 'r', 'i', 't', '\\n', 'i', 's', ' ', 'c', 'o', 'o', 'l']
                return my_name
            "],
        );
        assert_mutations(&StringToCharArray, "foo = ''", &["foo = []"]);
    }
}
