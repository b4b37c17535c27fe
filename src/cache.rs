//! Thread-local pattern compilation cache for ast-grep patterns.
//!
//! Rename rewrites compile the same `$OBJ.member` pattern once per importing
//! file, so compiled patterns are memoized per thread. The cache is capped at
//! 256 entries and cleared wholesale when full.

use ast_grep_core::Pattern;
use ast_grep_language::SupportLang;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Key is "<lang>:<pattern>": TSX and TypeScript parse `<T>(x)` differently.
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
pub fn get_or_compile_pattern(pattern_str: &str, lang: SupportLang) -> Pattern {
    let cache_key = format!("{lang:?}:{pattern_str}");

    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(&cache_key) {
            return p.clone();
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Pattern::new(pattern_str, lang);
        cache.insert(cache_key, compiled.clone());
        compiled
    })
}

/// Clear the pattern cache.
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Number of compiled patterns held by this thread.
pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}
