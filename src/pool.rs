//! Thread-local parser pooling.
//!
//! Every file load and every verified mutation re-parses a buffer, so parsers
//! are kept per thread and per grammar flavour instead of being rebuilt.

use crate::ts::{SourceLanguage, TreeSitterError, TypeScriptParser};
use std::cell::RefCell;

thread_local! {
    static TS_PARSER: RefCell<Option<TypeScriptParser>> = const { RefCell::new(None) };
    static TSX_PARSER: RefCell<Option<TypeScriptParser>> = const { RefCell::new(None) };
}

/// Execute function with the pooled parser for `language`.
///
/// On first call per thread, creates a new parser. Subsequent calls reuse
/// the same instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use symbol_refactor::pool::with_parser;
/// use symbol_refactor::ts::SourceLanguage;
///
/// let tree = with_parser(SourceLanguage::TypeScript, |parser| {
///     parser.parse("export const a = 1;")
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(language: SourceLanguage, f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut TypeScriptParser) -> R,
{
    let slot = match language {
        SourceLanguage::TypeScript => &TS_PARSER,
        SourceLanguage::Tsx => &TSX_PARSER,
    };

    slot.with(|cell| {
        let mut opt = cell.borrow_mut();
        if opt.is_none() {
            *opt = Some(TypeScriptParser::with_language(language)?);
        }
        Ok(f(opt.as_mut().expect("parser was just initialized above")))
    })
}
