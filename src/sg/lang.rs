//! TypeScript language support via ast-grep-language.
//!
//! The built-in `SupportLang::TypeScript` / `SupportLang::Tsx` handle metavar
//! preprocessing and tree-sitter integration, so no custom Language
//! implementation is needed.

pub use ast_grep_language::SupportLang;

/// The TypeScript language for ast-grep operations.
pub fn typescript() -> SupportLang {
    SupportLang::TypeScript
}

/// The TSX language for ast-grep operations.
pub fn tsx() -> SupportLang {
    SupportLang::Tsx
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast_grep_core::AstGrep;

    #[test]
    fn typescript_lang_parses() {
        let sg = AstGrep::new("function main() {}", typescript());
        assert_eq!(sg.root().kind(), "program");
    }

    #[test]
    fn typescript_single_metavar() {
        let sg = AstGrep::new("function foo() { return 42; }", typescript());
        let root = sg.root();

        assert!(
            root.find("function foo() { return 42; }").is_some(),
            "exact match"
        );
        assert!(
            root.find("function $NAME() { return 42; }").is_some(),
            "single metavar for name"
        );
    }

    #[test]
    fn typescript_member_access() {
        let sg = AstGrep::new(
            "const a = foo.bar(); const b = baz.bar; const c = qux.other;",
            typescript(),
        );
        let root = sg.root();

        let accesses: Vec<_> = root.find_all("$OBJ.bar").collect();
        assert_eq!(accesses.len(), 2, "should find two .bar accesses");
    }

    #[test]
    fn tsx_lang_parses_jsx() {
        let sg = AstGrep::new("const App = () => <div>{label}</div>;", tsx());
        assert_eq!(sg.root().kind(), "program");
    }
}
