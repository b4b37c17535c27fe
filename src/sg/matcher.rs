use crate::cache;
use crate::sg::errors::AstGrepError;
use crate::ts::SourceLanguage;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, NodeMatch};
use ast_grep_language::SupportLang;
use std::collections::HashMap;
use std::ops::Range;

/// A match from an ast-grep pattern with captured metavariables.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Byte range of the entire match
    pub byte_start: usize,
    pub byte_end: usize,
    /// The matched text
    pub text: String,
    /// Captured metavariables: name -> text
    pub captures: HashMap<String, String>,
}

/// One `object.member` access, in value or type position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    /// Source text of the object (`this`, `user`, `ns`, ...)
    pub object: String,
    pub object_span: Range<usize>,
    /// Span of the member name alone
    pub property_span: Range<usize>,
}

/// Pattern matcher using ast-grep's metavariable syntax.
///
/// # Metavariable Syntax
///
/// - `$NAME` - Matches a single node and captures it
/// - `$$$NAME` - Matches zero or more nodes (variadic)
/// - `$_` - Matches any single node (anonymous)
///
/// # Example Patterns
///
/// ```text
/// function $NAME($$$PARAMS) { $$$BODY }   // Match function declaration
/// $OBJ.getValue()                         // Match .getValue() calls
/// api.$MEMBER                             // Match accesses through a namespace
/// ```
pub struct PatternMatcher {
    source: String,
    lang: SupportLang,
    sg: AstGrep<StrDoc<SupportLang>>,
}

impl PatternMatcher {
    /// Create a new pattern matcher for the given source code.
    pub fn new(source: &str, language: SourceLanguage) -> Self {
        let lang = language.support_lang();
        let sg = AstGrep::new(source, lang);
        Self {
            source: source.to_string(),
            lang,
            sg,
        }
    }

    /// Find all matches for a pattern.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<PatternMatch>, AstGrepError> {
        let pat = cache::get_or_compile_pattern(pattern, self.lang);
        let root = self.sg.root();
        let results = root
            .find_all(&pat)
            .map(|m| self.node_match_to_pattern_match(m))
            .collect();

        Ok(results)
    }

    /// Check if a pattern has any matches.
    pub fn has_match(&self, pattern: &str) -> bool {
        let pat = cache::get_or_compile_pattern(pattern, self.lang);
        self.sg.root().find(&pat).is_some()
    }

    /// Every access of `member` on any object.
    ///
    /// Covers `obj.member` expressions (matched with the `$OBJ.member`
    /// pattern, plus optional chains which the pattern does not express) and
    /// `ns.Member` in type position. Results are in document order.
    pub fn member_accesses(&self, member: &str) -> Result<Vec<MemberAccess>, AstGrepError> {
        if !is_identifier(member) {
            return Err(AstGrepError::InvalidPattern {
                message: format!("'{member}' is not an identifier"),
            });
        }

        let pattern = format!("$OBJ.{member}");
        let pat = cache::get_or_compile_pattern(&pattern, self.lang);
        let root = self.sg.root();

        let mut accesses: Vec<MemberAccess> = root
            .find_all(&pat)
            .filter_map(|m| {
                let node = m.get_node();
                let object = node.field("object")?;
                let property = node.field("property")?;
                Some(MemberAccess {
                    object: object.text().to_string(),
                    object_span: object.range(),
                    property_span: property.range(),
                })
            })
            .collect();

        for node in root.dfs() {
            let (object_field, property_field) = match node.kind().as_ref() {
                "member_expression" => ("object", "property"),
                "nested_type_identifier" => ("module", "name"),
                _ => continue,
            };
            let (Some(object), Some(property)) = (node.field(object_field), node.field(property_field))
            else {
                continue;
            };
            if property.text() != member {
                continue;
            }
            accesses.push(MemberAccess {
                object: object.text().to_string(),
                object_span: object.range(),
                property_span: property.range(),
            });
        }

        accesses.sort_by_key(|a| (a.property_span.start, a.property_span.end));
        accesses.dedup_by_key(|a| a.property_span.start);
        Ok(accesses)
    }

    /// Accesses of `member` through the namespace binding `namespace`.
    pub fn namespace_accesses(
        &self,
        namespace: &str,
        member: &str,
    ) -> Result<Vec<MemberAccess>, AstGrepError> {
        Ok(self
            .member_accesses(member)?
            .into_iter()
            .filter(|a| a.object == namespace)
            .collect())
    }

    /// Get the source code.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn node_match_to_pattern_match(&self, m: NodeMatch<StrDoc<SupportLang>>) -> PatternMatch {
        let node = m.get_node();
        let range = node.range();
        let byte_start = range.start;
        let byte_end = range.end;
        let text = self.source[byte_start..byte_end].to_string();

        let env = m.get_env().clone();
        let captures: HashMap<String, String> = env.into();

        PatternMatch {
            byte_start,
            byte_end,
            text,
            captures,
        }
    }
}

/// Whether `name` is a plain identifier usable in a pattern or declaration.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}
