// SPDX-License-Identifier: Apache-2.0

//! Dictionary initializer rewrites.

use stembench_pyast::ast::NodePayload;
use stembench_pyast::NodeRef;

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;
use crate::transforms::common::{assign_value, is_empty_list, rewrite_assign_value};
use crate::transforms::transform_trait::{MutationKind, Transformer};

fn empty_dict(builder: &mut NodeBuilder) -> NodeRef {
    builder.add(NodePayload::Dict {
        keys: Vec::new(),
        values: Vec::new(),
    })
}

/// `a = []` becomes `a = {}`.
#[derive(Debug, Default)]
pub struct ArrayToDict;

impl Transformer for ArrayToDict {
    fn kind(&self) -> MutationKind {
        MutationKind::ArrayToDict
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Dicts)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        assign_value(ctx.program(), node).is_some_and(|v| is_empty_list(ctx.program(), v))
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, _| empty_dict(b))
    }
}

/// `d = {...}` becomes `d = {**{...}, **{}}`.
#[derive(Debug, Default)]
pub struct DictInitializerUnpack;

impl Transformer for DictInitializerUnpack {
    fn kind(&self) -> MutationKind {
        MutationKind::DictInitializerUnpack
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Dicts)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            assign_value(ctx.program(), node).map(|v| ctx.payload(v)),
            Some(NodePayload::Dict { .. })
        )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, dict| {
            let empty = empty_dict(b);
            b.add(NodePayload::Dict {
                keys: vec![None, None],
                values: vec![dict, empty],
            })
        })
    }
}

/// `d = {}` becomes `d = []`.
#[derive(Debug, Default)]
pub struct DictToArray;

impl Transformer for DictToArray {
    fn kind(&self) -> MutationKind {
        MutationKind::DictToArray
    }

    fn category(&self) -> Option<MutationCategory> {
        Some(MutationCategory::Dicts)
    }

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
        matches!(
            assign_value(ctx.program(), node).map(|v| ctx.payload(v)),
            Some(NodePayload::Dict { keys, .. }) if keys.is_empty()
        )
    }

    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
        rewrite_assign_value(builder, node, |b, _| {
            b.add(NodePayload::List { elts: Vec::new() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::common::testing::assert_mutations;

    #[test]
    fn array_to_dict() {
        assert_mutations(
            &ArrayToDict,
            "
            def f():
                seen = []
                full = [1]
            ",
            &["
            def f():
                seen = {}
                full = [1]
            "],
        );
    }

    #[test]
    fn dict_initializer_unpack() {
        assert_mutations(
            &DictInitializerUnpack,
            "d = {\"a\": 1, 'b': [2]}",
            &["d = {**{'a': 1, 'b': [2]}, **{}}"],
        );
        assert_mutations(&DictInitializerUnpack, "d = {}", &["d = {**{}, **{}}"]);
    }

    #[test]
    fn dict_to_array() {
        assert_mutations(&DictToArray, "a = {}\nb = {1: 2}", &["a = []\nb = {1: 2}"]);
    }
}
