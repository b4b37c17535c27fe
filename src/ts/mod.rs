//! Tree-sitter integration for structural TypeScript queries.
//!
//! This module provides CST-based span location using tree-sitter, enabling
//! precise byte-span extraction for declarations, imports and identifiers
//! without losing comments or formatting.

pub mod errors;
pub mod locator;
pub mod parser;
pub mod validator;

pub use errors::TreeSitterError;
pub use locator::{Declaration, DeclarationLocator, FileOutline, LocalExport, StructuralTarget, SymbolKind};
pub use parser::{ParsedSource, SourceLanguage, TypeScriptParser};
pub use validator::{count_error_nodes, validate_edit, validate_syntax};
