// SPDX-License-Identifier: Apache-2.0

//! Single-node transformation engine.
//!
//! For every node a transformer accepts, the engine asks it for replacement
//! subtrees and renders one complete program per replacement. Each variant is
//! built on its own copy of the arena and differs from the source at exactly
//! one identity-tagged slot.

use std::collections::{HashSet, VecDeque};

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use stembench_pyast::ast::{
    BinOperator, Constant, LiteralStyle, NodeId, NodePayload, NodeRef, Program, UnaryOperator,
};
use stembench_pyast::ParseError;

use crate::transforms::Transformer;

pub const DEFAULT_SEED: u64 = 0x5eed_0f57_e3b0;

/// Read-only view of the source program handed to `is_transformable`.
pub struct TransformContext<'a> {
    program: &'a Program,
    parents: &'a [Option<NodeRef>],
}

impl<'a> TransformContext<'a> {
    pub fn new(program: &'a Program, parents: &'a [Option<NodeRef>]) -> Self {
        Self { program, parents }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn payload(&self, node: NodeRef) -> &'a NodePayload {
        self.program.payload(node)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.parents.get(node.index).copied().flatten()
    }

    pub fn parent_payload(&self, node: NodeRef) -> Option<&'a NodePayload> {
        self.parent(node).map(|p| self.program.payload(p))
    }

    /// Ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    pub fn in_docstring(&self, node: NodeRef) -> bool {
        self.program.is_in_docstring(node, self.parents)
    }

    /// True if `node` is a statement listed directly in one of its parent's
    /// blocks.
    pub fn is_block_statement(&self, node: NodeRef) -> bool {
        match self.parent_payload(node) {
            Some(parent) => parent.blocks().iter().any(|b| b.contains(&node)),
            None => false,
        }
    }

    /// True if `node` is a block statement nested inside a compound
    /// statement, i.e. it renders on an indented line.
    pub fn is_indented_statement(&self, node: NodeRef) -> bool {
        self.is_block_statement(node)
            && !matches!(self.parent_payload(node), Some(NodePayload::Module { .. }))
    }
}

/// Private copy of the arena in which a transformer allocates its
/// replacement nodes.
pub struct NodeBuilder<'r> {
    program: Program,
    rng: &'r mut Xoshiro256PlusPlus,
}

impl<'r> NodeBuilder<'r> {
    pub fn new(program: Program, rng: &'r mut Xoshiro256PlusPlus) -> Self {
        Self { program, rng }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn payload(&self, node: NodeRef) -> &NodePayload {
        self.program.payload(node)
    }

    pub fn payload_mut(&mut self, node: NodeRef) -> &mut NodePayload {
        &mut self.program.get_node_mut(node).payload
    }

    pub fn rng(&mut self) -> &mut Xoshiro256PlusPlus {
        self.rng
    }

    pub fn add(&mut self, payload: NodePayload) -> NodeRef {
        self.program.add_node(payload)
    }

    /// Deep-copies `node` so the result shares nothing with the source.
    pub fn copy(&mut self, node: NodeRef) -> NodeRef {
        self.program.deep_copy_subtree(node)
    }

    pub fn name(&mut self, id: &str) -> NodeRef {
        self.add(NodePayload::Name { id: id.to_string() })
    }

    pub fn constant(&mut self, value: Constant) -> NodeRef {
        self.add(NodePayload::Constant {
            value,
            style: LiteralStyle::default(),
        })
    }

    pub fn int(&mut self, value: i128) -> NodeRef {
        self.constant(Constant::Int(value))
    }

    pub fn str(&mut self, value: &str) -> NodeRef {
        self.constant(Constant::Str(value.to_string()))
    }

    pub fn binop(&mut self, left: NodeRef, op: BinOperator, right: NodeRef) -> NodeRef {
        self.add(NodePayload::BinOp { left, op, right })
    }

    pub fn unary(&mut self, op: UnaryOperator, operand: NodeRef) -> NodeRef {
        self.add(NodePayload::UnaryOp { op, operand })
    }

    pub fn not(&mut self, operand: NodeRef) -> NodeRef {
        self.unary(UnaryOperator::Not, operand)
    }

    /// `func(args...)` where `func` is a plain name.
    pub fn call(&mut self, func: &str, args: Vec<NodeRef>) -> NodeRef {
        let func = self.name(func);
        self.add(NodePayload::Call {
            func,
            args,
            keywords: Vec::new(),
        })
    }

    pub fn expr_stmt(&mut self, value: NodeRef) -> NodeRef {
        self.add(NodePayload::Expr { value })
    }

    pub fn assign(&mut self, target: NodeRef, value: NodeRef) -> NodeRef {
        self.add(NodePayload::Assign {
            targets: vec![target],
            value,
        })
    }

    pub fn group(&mut self, body: Vec<NodeRef>) -> NodeRef {
        self.add(NodePayload::StatementGroup { body })
    }

    pub fn into_program(self) -> Program {
        self.program
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    seed: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self { seed: DEFAULT_SEED }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Lists every program obtainable from `source` by one application of
    /// `transformer`. Sources without eligible nodes yield nothing.
    pub fn transform<'t>(
        &self,
        source: &str,
        transformer: &'t dyn Transformer,
    ) -> Result<Mutations<'t>, ParseError> {
        let program = Program::parse(source)?;
        let parents = program.parents();
        let ctx = TransformContext::new(&program, &parents);
        let eligible: Vec<NodeRef> = program
            .dfs()
            .into_iter()
            .filter(|node| transformer.is_transformable(&ctx, *node))
            .collect();
        log::debug!(
            "{}: {} eligible node(s)",
            transformer.name(),
            eligible.len()
        );
        let baseline = program.unparse();
        let mut seen = HashSet::new();
        seen.insert(baseline);
        Ok(Mutations {
            program,
            transformer,
            eligible: eligible.into_iter(),
            pending: VecDeque::new(),
            seen,
            rng: Xoshiro256PlusPlus::seed_from_u64(self.seed),
        })
    }

    pub fn transform_all(
        &self,
        source: &str,
        transformer: &dyn Transformer,
    ) -> Result<Vec<String>, ParseError> {
        Ok(self.transform(source, transformer)?.collect())
    }
}

/// Lazily produced mutated programs. Finite and not restartable.
pub struct Mutations<'t> {
    program: Program,
    transformer: &'t dyn Transformer,
    eligible: std::vec::IntoIter<NodeRef>,
    pending: VecDeque<String>,
    seen: HashSet<String>,
    rng: Xoshiro256PlusPlus,
}

impl<'t> Mutations<'t> {
    /// Builds one variant program per alternative the transformer offers for
    /// `target`.
    fn build_variants(&mut self, target: NodeRef) -> Vec<Program> {
        let target_id: NodeId = self.program.get_node(target).id;
        let mut builder = NodeBuilder::new(self.program.clone(), &mut self.rng);
        let copy = builder.copy(target);
        let alternatives = self.transformer.transform_node(&mut builder, copy);
        let arena = builder.into_program();
        let mut variants = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let mut variant = arena.clone();
            let slot = match variant.find_by_id(target_id) {
                Some(slot) => slot,
                None => {
                    log::warn!("{}: lost target {}", self.transformer.name(), target_id);
                    continue;
                }
            };
            variant.substitute(slot, alternative);
            variant.flatten_statement_groups();
            variants.push(variant);
        }
        variants
    }
}

impl Iterator for Mutations<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Some(text);
            }
            let target = self.eligible.next()?;
            for variant in self.build_variants(target) {
                let text = variant.unparse();
                if self.seen.insert(text.clone()) {
                    self.pending.push_back(text);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MutationCategory;
    use crate::transforms::MutationKind;
    use pretty_assertions::assert_eq;
    use stembench_pyast::ast_utils;

    /// Replaces the value of every assignment with `42`.
    #[derive(Debug)]
    struct AssignFortyTwo;

    impl Transformer for AssignFortyTwo {
        fn kind(&self) -> MutationKind {
            MutationKind::IdentityAssignment
        }

        fn category(&self) -> Option<MutationCategory> {
            Some(MutationCategory::CodeStyle)
        }

        fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
            matches!(ctx.payload(node), NodePayload::Assign { .. })
        }

        fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
            let value = builder.int(42);
            if let NodePayload::Assign { value: v, .. } = builder.payload_mut(node) {
                *v = value;
            }
            vec![node]
        }
    }

    /// Renames unary assignment targets three different ways.
    #[derive(Debug)]
    struct ThreeNames;

    impl Transformer for ThreeNames {
        fn kind(&self) -> MutationKind {
            MutationKind::IdentifierRename
        }

        fn category(&self) -> Option<MutationCategory> {
            Some(MutationCategory::CodeStyle)
        }

        fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool {
            matches!(ctx.payload(node), NodePayload::Assign { targets, .. } if targets.len() == 1)
        }

        fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef> {
            (0..3)
                .map(|i| {
                    let copy = builder.copy(node);
                    let name = builder.name(&format!("var_{}", i));
                    if let NodePayload::Assign { targets, .. } = builder.payload_mut(copy) {
                        targets[0] = name;
                    }
                    copy
                })
                .collect()
        }
    }

    #[test]
    fn identical_statements_mutate_independently() {
        let got = Engine::new()
            .transform_all("# something\na = 1\na = 1\n", &AssignFortyTwo)
            .unwrap();
        assert_eq!(got, vec!["a = 42\na = 1", "a = 1\na = 42"]);
    }

    #[test]
    fn statements_on_one_line_are_separate_nodes() {
        let got = Engine::new()
            .transform_all("a = True;a=False", &AssignFortyTwo)
            .unwrap();
        assert_eq!(got, vec!["a = 42\na = False", "a = True\na = 42"]);
    }

    #[test]
    fn multiple_alternatives_per_node() {
        let got = Engine::new()
            .transform_all("foo = 2\nprint(foo)", &ThreeNames)
            .unwrap();
        assert_eq!(
            got,
            vec![
                "var_0 = 2\nprint(foo)",
                "var_1 = 2\nprint(foo)",
                "var_2 = 2\nprint(foo)"
            ]
        );
    }

    #[test]
    fn no_eligible_nodes_is_empty_not_error() {
        let got = Engine::new()
            .transform_all("print(1)", &AssignFortyTwo)
            .unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn unchanged_output_is_dropped() {
        let got = Engine::new()
            .transform_all("a = 42", &AssignFortyTwo)
            .unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn parse_errors_surface() {
        assert!(Engine::new().transform("def (:", &AssignFortyTwo).is_err());
    }

    fn subtree_ids(program: &Program, root: NodeRef) -> HashSet<NodeId> {
        let mut out = HashSet::new();
        let mut stack = vec![root];
        while let Some(r) = stack.pop() {
            out.insert(program.get_node(r).id);
            stack.extend(ast_utils::children(program.payload(r)));
        }
        out
    }

    #[test]
    fn each_variant_differs_at_exactly_one_identity() {
        let source = "x = 1\ny = x + 2\nz = y * 3\n";
        let mut mutations = Engine::new().transform(source, &AssignFortyTwo).unwrap();
        let original_ids = subtree_ids(&mutations.program, mutations.program.root);
        let targets: Vec<NodeRef> = mutations.eligible.clone().collect();
        assert_eq!(targets.len(), 3);
        for target in targets {
            let target_subtree = subtree_ids(&mutations.program, target);
            let variants = mutations.build_variants(target);
            assert_eq!(variants.len(), 1);
            let variant = &variants[0];
            let variant_ids = subtree_ids(variant, variant.root);
            let kept: HashSet<NodeId> =
                original_ids.difference(&target_subtree).copied().collect();
            // Everything outside the target is untouched.
            assert!(kept.is_subset(&variant_ids));
            // Nothing of the original target survives in the variant.
            assert!(target_subtree.is_disjoint(&variant_ids));
        }
    }

    #[test]
    fn nondeterministic_draws_are_reproducible_per_seed() {
        let source = "a = 1\n";
        let t = crate::registry::get_transformer("IdentifierObfuscate").unwrap();
        let first = Engine::with_seed(7).transform_all(source, t.as_ref()).unwrap();
        let second = Engine::with_seed(7).transform_all(source, t.as_ref()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
