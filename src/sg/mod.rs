//! ast-grep integration for pattern-based TypeScript code matching.
//!
//! Used where a metavariable pattern reads better than a hand-written tree
//! walk: member accesses such as `$OBJ.name` and namespace-qualified
//! references such as `ns.Name`.

pub mod errors;
pub mod lang;
pub mod matcher;

pub use errors::AstGrepError;
pub use lang::{tsx, typescript, SupportLang};
pub use matcher::{is_identifier, MemberAccess, PatternMatch, PatternMatcher};
