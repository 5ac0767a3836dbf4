// SPDX-License-Identifier: Apache-2.0

pub mod arrays;
pub mod booleans;
pub mod code_style;
pub mod common;
pub mod conditionals;
pub mod dicts;
pub mod loops;
pub mod math;
pub mod numbers;
pub mod strings;
pub mod transform_trait;

pub use transform_trait::{MutationKind, Transformer};

/// Every transformer in the catalog, in catalog order.
pub fn get_all_transformers() -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(arrays::LenToGenerator),
        Box::new(arrays::ListInitializerUnpack),
        Box::new(arrays::NestedArrayInitializer),
        Box::new(arrays::ReverseRange),
        Box::new(arrays::SingleElementInitializer),
        Box::new(arrays::StringToCharArray),
        Box::new(booleans::BooleanDemorgans),
        Box::new(booleans::FirstInversion),
        Box::new(booleans::SecondInversion),
        Box::new(booleans::ExpandBooleans),
        Box::new(numbers::IntegerReplacement),
        Box::new(numbers::IntegerBin),
        Box::new(numbers::IntegerOct),
        Box::new(numbers::IntegerHex),
        Box::new(numbers::OverflowInteger),
        Box::new(math::MultiplyBy2ToBitshift),
        Box::new(math::DivideBy2ToBitshift),
        Box::new(math::NegationToComplement),
        Box::new(math::AdditionInversion),
        Box::new(math::SubtractionInversion),
        Box::new(math::MultiplicationInversion),
        Box::new(math::DivisionInversion),
        Box::new(math::ModuloInversion),
        Box::new(dicts::ArrayToDict),
        Box::new(dicts::DictInitializerUnpack),
        Box::new(dicts::DictToArray),
        Box::new(strings::EmptyArrayToString),
        Box::new(strings::ConstantSplitting),
        Box::new(strings::StringConcatToFString),
        Box::new(strings::StringConcatToJoin),
        Box::new(strings::StringToByteString),
        Box::new(conditionals::IfToConditional),
        Box::new(conditionals::IfToWhileLoop),
        Box::new(conditionals::InvertIf),
        Box::new(loops::EnumerateFor),
        Box::new(loops::ForToWhile),
        Box::new(loops::WhileToIf),
        Box::new(code_style::AddParens),
        Box::new(code_style::BlockComments),
        Box::new(code_style::InlineComments),
        Box::new(code_style::ExpandAugmentedAssign),
        Box::new(code_style::IdentifierRename),
        Box::new(code_style::IdentifierObfuscate),
        Box::new(code_style::IdentityAssignment),
        Box::new(code_style::MergeStatements),
        Box::new(code_style::PrintInjection),
        Box::new(code_style::StringQuoteSingle),
        Box::new(code_style::StringQuoteDouble),
        Box::new(code_style::UnusedVariable),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique_and_ordered() {
        let all = get_all_transformers();
        assert_eq!(all.len(), 49);
        let names: HashSet<String> = all.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), all.len());
        let kinds: Vec<MutationKind> = all.iter().map(|t| t.kind()).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn every_transformer_has_a_category() {
        for t in get_all_transformers() {
            assert!(t.category().is_some(), "{}", t.name());
        }
    }
}
