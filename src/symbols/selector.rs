use crate::paths::PathResolver;
use crate::ts::{StructuralTarget, SymbolKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural address of a declaration.
///
/// A selector with a `parent` addresses a member of that container; one
/// without addresses a top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    pub kind: SymbolKind,
    pub name: String,
    #[serde(alias = "file", alias = "file_path")]
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentSelector>,
}

/// The container of a member selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentSelector {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SymbolKind>,
}

impl Selector {
    pub fn new(kind: SymbolKind, name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            file_path: file_path.into(),
            parent: None,
        }
    }

    /// Address a member of `parent` instead of a top-level declaration.
    pub fn with_parent(mut self, name: impl Into<String>, kind: Option<SymbolKind>) -> Self {
        self.parent = Some(ParentSelector {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn is_member(&self) -> bool {
        self.parent.is_some()
    }

    /// Normalized root-relative file path.
    pub fn normalized_path(&self) -> String {
        PathResolver::normalize(&self.file_path)
    }

    /// Structural lookup target inside the owning file.
    pub fn target(&self) -> StructuralTarget {
        match &self.parent {
            None => StructuralTarget::Declaration {
                kind: self.kind,
                name: self.name.clone(),
            },
            Some(parent) => StructuralTarget::Member {
                parent: parent.name.clone(),
                parent_kind: parent.kind,
                kind: self.kind,
                name: self.name.clone(),
            },
        }
    }

    /// `Container.member` for members, the plain name otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}", parent.name, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.qualified_name())
    }
}
