// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug};

use stembench_pyast::NodeRef;

use crate::engine::{NodeBuilder, TransformContext};
use crate::registry::MutationCategory;

/// Enum representing the different kinds of program rewrites in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationKind {
    // arrays
    LenToGenerator,
    ListInitializerUnpack,
    NestedArrayInitializer,
    ReverseRange,
    SingleElementInitializer,
    StringToCharArray,
    // booleans
    BooleanDemorgans,
    FirstInversion,
    SecondInversion,
    ExpandBooleans,
    // numbers
    IntegerReplacement,
    IntegerBin,
    IntegerOct,
    IntegerHex,
    OverflowInteger,
    // math
    MultiplyBy2ToBitshift,
    DivideBy2ToBitshift,
    NegationToComplement,
    AdditionInversion,
    SubtractionInversion,
    MultiplicationInversion,
    DivisionInversion,
    ModuloInversion,
    // dicts
    ArrayToDict,
    DictInitializerUnpack,
    DictToArray,
    // strings
    EmptyArrayToString,
    ConstantSplitting,
    StringConcatToFString,
    StringConcatToJoin,
    StringToByteString,
    // conditionals
    IfToConditional,
    IfToWhileLoop,
    InvertIf,
    // loops
    EnumerateFor,
    ForToWhile,
    WhileToIf,
    // code style
    AddParens,
    BlockComments,
    InlineComments,
    ExpandAugmentedAssign,
    IdentifierRename,
    IdentifierObfuscate,
    IdentityAssignment,
    MergeStatements,
    PrintInjection,
    StringQuoteSingle,
    StringQuoteDouble,
    UnusedVariable,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Variant names double as the public transformer names.
        write!(f, "{:?}", self)
    }
}

/// A rewrite of one syntax-tree node into one or more alternatives.
///
/// The engine asks `is_transformable` about every node of the source program
/// and hands each accepted node, already deep-copied into a private arena, to
/// `transform_node`. Every returned root becomes a separate mutated program.
pub trait Transformer: Debug + Send + Sync {
    /// Returns the specific `MutationKind` that this trait object represents.
    fn kind(&self) -> MutationKind;

    /// Returns the registry name of this transformer.
    /// Defaults to the `Display` implementation of `MutationKind`.
    fn name(&self) -> String {
        self.kind().to_string()
    }

    /// Category this transformer registers under. `None` is rejected at
    /// registration.
    fn category(&self) -> Option<MutationCategory>;

    fn is_transformable(&self, ctx: &TransformContext, node: NodeRef) -> bool;

    /// Rewrites `node` (a private copy) and returns the replacement roots.
    /// Returning an empty vector means the node produced nothing.
    fn transform_node(&self, builder: &mut NodeBuilder, node: NodeRef) -> Vec<NodeRef>;

    /// False for transformers whose output depends on random draws.
    fn deterministic(&self) -> bool {
        true
    }

    /// Extra non-blank lines the stem extractor keeps on the mutated side,
    /// for rewrites that insert lines after the point of divergence.
    fn stem_extra_skips(&self) -> usize {
        0
    }
}
