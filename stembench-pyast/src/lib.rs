// SPDX-License-Identifier: Apache-2.0

//! Functionality that is purely related to Python source, i.e. tokenizing,
//! parsing into an arena AST, querying/manipulating that AST, and rendering
//! it back to canonical text.

pub mod ast;
pub mod ast_utils;
pub mod lexer;
pub mod parser;
pub mod py_repr;
pub mod unparse;

pub use ast::{NodeId, NodePayload, NodeRef, Program};
pub use parser::ParseError;
