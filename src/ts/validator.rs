use crate::pool;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::SourceLanguage;

/// Validate that TypeScript source code has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR or MISSING nodes.
pub fn validate_syntax(language: SourceLanguage, source: &str) -> Result<(), TreeSitterError> {
    let errors = pool::with_parser(language, |parser| {
        parser
            .parse_with_source(source)
            .map(|parsed| parsed.error_nodes())
    })??;

    match errors.len() {
        0 => Ok(()),
        1 => Err(TreeSitterError::SyntaxError {
            byte_start: errors[0].byte_start,
            byte_end: errors[0].byte_end,
        }),
        n => Err(TreeSitterError::MultipleSyntaxErrors { count: n }),
    }
}

/// Number of ERROR/MISSING nodes in `source`.
pub fn count_error_nodes(language: SourceLanguage, source: &str) -> Result<usize, TreeSitterError> {
    pool::with_parser(language, |parser| {
        parser
            .parse_with_source(source)
            .map(|parsed| parsed.error_nodes().len())
    })?
}

/// Check that `edited` does not introduce syntax errors absent from `original`.
///
/// Byte positions shift under edits, so errors are compared by count: an edit
/// on already-broken code passes as long as it adds no new ERROR nodes.
pub fn validate_edit(
    language: SourceLanguage,
    original: &str,
    edited: &str,
) -> Result<(), TreeSitterError> {
    let before = count_error_nodes(language, original)?;
    let after = count_error_nodes(language, edited)?;

    match after.saturating_sub(before) {
        0 => Ok(()),
        n => Err(TreeSitterError::MultipleSyntaxErrors { count: n }),
    }
}
