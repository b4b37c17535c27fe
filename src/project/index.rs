use std::collections::{BTreeMap, BTreeSet};

/// Reverse import index: which project files import a given file.
///
/// Kept in both directions so a single file's entries can be replaced
/// without scanning the whole project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportIndex {
    importers: BTreeMap<String, BTreeSet<String>>,
    targets: BTreeMap<String, BTreeSet<String>>,
}

impl ImportIndex {
    /// Replace the set of files `importer` imports from.
    pub fn update(&mut self, importer: &str, targets: BTreeSet<String>) {
        self.remove(importer);
        for target in &targets {
            self.importers
                .entry(target.clone())
                .or_default()
                .insert(importer.to_string());
        }
        if !targets.is_empty() {
            self.targets.insert(importer.to_string(), targets);
        }
    }

    /// Forget everything `importer` imports.
    pub fn remove(&mut self, importer: &str) {
        let Some(previous) = self.targets.remove(importer) else {
            return;
        };
        for target in previous {
            if let Some(set) = self.importers.get_mut(&target) {
                set.remove(importer);
                if set.is_empty() {
                    self.importers.remove(&target);
                }
            }
        }
    }

    /// Files importing `target`, in path order.
    pub fn importers_of(&self, target: &str) -> impl Iterator<Item = &str> {
        self.importers
            .get(target)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Files `importer` imports from, in path order.
    pub fn targets_of(&self, importer: &str) -> impl Iterator<Item = &str> {
        self.targets
            .get(importer)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn clear(&mut self) {
        self.importers.clear();
        self.targets.clear();
    }
}
