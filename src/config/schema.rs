use crate::paths::PathResolver;
use crate::symbols::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A batch of operations as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub options: BatchOptions,
}

impl BatchRequest {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            options: BatchOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.operations.is_empty() {
            issues.push(ValidationIssue::EmptyOperationList);
        }

        for (index, operation) in self.operations.iter().enumerate() {
            let selector = operation.selector();
            if selector.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    index,
                    field: "selector.name",
                });
            }
            if selector.file_path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    index,
                    field: "selector.filePath",
                });
            }
            if let Some(parent) = &selector.parent {
                if parent.name.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        index,
                        field: "selector.parent.name",
                    });
                }
                if !selector.kind.is_member() {
                    issues.push(ValidationIssue::InvalidCombo {
                        index,
                        message: format!("a {} cannot have a parent", selector.kind),
                    });
                }
            } else if selector.kind.is_member() {
                issues.push(ValidationIssue::InvalidCombo {
                    index,
                    message: format!("a {} selector requires a parent", selector.kind),
                });
            }

            match operation {
                Operation::Rename { new_name, .. } => {
                    if new_name.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            index,
                            field: "newName",
                        });
                    }
                }
                Operation::Move {
                    target_file_path, ..
                } => {
                    if target_file_path.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            index,
                            field: "targetFilePath",
                        });
                    }
                }
                Operation::Remove { .. } => {}
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Batch execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    /// Halt at the first failed operation
    #[serde(default = "default_stop_on_error", alias = "stop_on_error")]
    pub stop_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            stop_on_error: default_stop_on_error(),
        }
    }
}

fn default_stop_on_error() -> bool {
    true
}

/// One refactoring operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    Rename {
        selector: Selector,
        #[serde(alias = "new_name")]
        new_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        selector: Selector,
        #[serde(alias = "target_file_path", alias = "targetFile")]
        target_file_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Remove {
        selector: Selector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Operation {
    pub fn selector(&self) -> &Selector {
        match self {
            Operation::Rename { selector, .. }
            | Operation::Move { selector, .. }
            | Operation::Remove { selector, .. } => selector,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Operation::Rename { reason, .. }
            | Operation::Move { reason, .. }
            | Operation::Remove { reason, .. } => reason.as_deref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Rename { .. } => "rename",
            Operation::Move { .. } => "move",
            Operation::Remove { .. } => "remove",
        }
    }

    /// Every project path the operation reads or writes.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = vec![self.selector().normalized_path()];
        if let Operation::Move {
            target_file_path, ..
        } = self
        {
            paths.push(PathResolver::normalize(target_file_path));
        }
        paths
    }

    /// Human-readable description of what the operation will do.
    pub fn describe(&self) -> String {
        let selector = self.selector();
        let mut description = match self {
            Operation::Rename { new_name, .. } => format!(
                "Rename {} to {new_name} in {}",
                selector.name, selector.file_path
            ),
            Operation::Move {
                target_file_path, ..
            } => format!(
                "Move {} from {} to {target_file_path}",
                selector.name, selector.file_path
            ),
            Operation::Remove { .. } => {
                format!("Remove {} from {}", selector.name, selector.file_path)
            }
        };
        if let Some(reason) = self.reason() {
            description.push_str(&format!(" (Reason: {reason})"));
        }
        description
    }

    /// Past-tense description for a completed operation.
    pub fn describe_done(&self) -> String {
        let selector = self.selector();
        match self {
            Operation::Rename { new_name, .. } => format!(
                "Renamed {} to {new_name} in {}",
                selector.name, selector.file_path
            ),
            Operation::Move {
                target_file_path, ..
            } => format!(
                "Moved {} from {} to {target_file_path}",
                selector.name, selector.file_path
            ),
            Operation::Remove { .. } => {
                format!("Removed {} from {}", selector.name, selector.file_path)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyOperationList,
    MissingField { index: usize, field: &'static str },
    InvalidCombo { index: usize, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyOperationList => write!(f, "request contains no operations"),
            ValidationIssue::MissingField { index, field } => {
                write!(f, "operation {} missing required field '{field}'", index + 1)
            }
            ValidationIssue::InvalidCombo { index, message } => {
                write!(f, "operation {} has invalid configuration: {message}", index + 1)
            }
        }
    }
}
