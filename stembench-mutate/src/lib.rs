// SPDX-License-Identifier: Apache-2.0

//! Single-node rewrites of Python programs and extraction of the completion
//! stems at which a rewritten program departs from its source.

pub mod engine;
pub mod registry;
pub mod stem;
pub mod transforms;

pub use engine::{Engine, Mutations};
pub use registry::{
    build_default_registry, get_transformer, parse_category_list, ConfigError, MutationCategory,
    MutationRegistry, SharedTransformer,
};
pub use stem::{parse_stem, stems_for, MutatedStem};
pub use transforms::{MutationKind, Transformer};
