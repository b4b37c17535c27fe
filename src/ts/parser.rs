use crate::ts::errors::TreeSitterError;
use crate::sg::lang;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Grammar flavour used for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceLanguage {
    #[default]
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    /// Pick the grammar from a file path's extension.
    ///
    /// Returns `None` for files outside the TypeScript family.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    /// The ast-grep language backing this grammar.
    pub fn support_lang(self) -> SupportLang {
        match self {
            SourceLanguage::TypeScript => lang::typescript(),
            SourceLanguage::Tsx => lang::tsx(),
        }
    }
}

/// Tree-sitter parser wrapper for TypeScript source code.
pub struct TypeScriptParser {
    parser: Parser,
    language: SourceLanguage,
}

impl TypeScriptParser {
    /// Create a new parser for plain TypeScript.
    pub fn new() -> Result<Self, TreeSitterError> {
        Self::with_language(SourceLanguage::default())
    }

    /// Create a new parser targeting a specific grammar flavour.
    pub fn with_language(language: SourceLanguage) -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        // The tree-sitter Language comes from ast-grep-language
        let ts_lang = language.support_lang().get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser, language })
    }

    /// Get the configured grammar flavour.
    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source buffer with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    /// Get the root node of the tree.
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Get all ERROR nodes in the tree.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    /// Extract text for a node's byte range.
    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
}

pub(crate) fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
        });
    }

    // Subtrees without errors never contain error nodes
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_typescript() {
        let mut parser = TypeScriptParser::new().unwrap();
        let source = "export function greet(name: string): string { return `hi ${name}`; }";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(!parsed.has_errors());
        assert_eq!(parsed.root_node().kind(), "program");
    }

    #[test]
    fn parse_invalid_typescript() {
        let mut parser = TypeScriptParser::new().unwrap();
        let source = "function broken( { return 1 }";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(parsed.has_errors());
        assert!(!parsed.error_nodes().is_empty());
    }

    #[test]
    fn parse_tsx() {
        let mut parser = TypeScriptParser::with_language(SourceLanguage::Tsx).unwrap();
        let source = "export const App = () => <div className=\"app\">hi</div>;";
        let parsed = parser.parse_with_source(source).unwrap();
        assert!(!parsed.has_errors());
    }

    #[test]
    fn language_from_path() {
        assert_eq!(
            SourceLanguage::from_path("src/a.ts"),
            Some(SourceLanguage::TypeScript)
        );
        assert_eq!(
            SourceLanguage::from_path("src/App.TSX"),
            Some(SourceLanguage::Tsx)
        );
        assert_eq!(SourceLanguage::from_path("README.md"), None);
        assert_eq!(SourceLanguage::from_path("Makefile"), None);
    }
}
