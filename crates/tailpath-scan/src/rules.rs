//! Per-node decisions for the directory walker.

use std::path::Path;
use std::sync::Arc;

use tailpath_core::{Fields, extension_allowed};
use tailpath_layout::CompiledSet;

use crate::walker::WalkNode;

/// What the walker does with a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// Directory whose subtree can never match.
    Prune,
    /// Directory worth reading.
    Descend,
    /// Matching file, with the fields extracted from its path.
    Emit(Fields),
    /// File that does not match.
    Skip,
}

/// How relative paths are judged.
#[derive(Debug, Clone)]
pub enum PathRule {
    /// Match against every compiled layout alternative.
    Layout(Arc<CompiledSet>),
    /// Descend everywhere; every file is a candidate.
    Any,
}

/// Path rule plus extension allow-list.
#[derive(Debug, Clone)]
pub struct MatchRules {
    path: PathRule,
    extensions: Vec<String>,
}

impl MatchRules {
    /// Rules driven by a compiled layout.
    pub fn layout(set: CompiledSet) -> Self {
        Self {
            path: PathRule::Layout(Arc::new(set)),
            extensions: Vec::new(),
        }
    }

    /// Rules that accept every path.
    pub fn any() -> Self {
        Self {
            path: PathRule::Any,
            extensions: Vec::new(),
        }
    }

    /// Also require files to carry one of these extensions.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// The path rule.
    pub fn path_rule(&self) -> &PathRule {
        &self.path
    }

    /// Check if a directory `depth` levels below the root should be read.
    pub fn descend(&self, relative_path: &str, depth: usize) -> bool {
        match &self.path {
            PathRule::Layout(set) => set.match_prefix(relative_path, depth).matched,
            PathRule::Any => true,
        }
    }

    /// Fields for a matching file, or None if the file is not an artifact.
    pub fn emit(&self, relative_path: &str, absolute_path: &Path) -> Option<Fields> {
        if !extension_allowed(&self.extensions, absolute_path) {
            return None;
        }
        match &self.path {
            PathRule::Layout(set) => {
                let result = set.match_full(relative_path);
                result.matched.then_some(result.fields)
            }
            PathRule::Any => Some(Fields::new()),
        }
    }

    /// Decide what to do with a node.
    pub fn visit(&self, node: &WalkNode) -> Visit {
        if node.is_dir {
            if self.descend(&node.relative_path, node.depth) {
                Visit::Descend
            } else {
                Visit::Prune
            }
        } else {
            match self.emit(&node.relative_path, &node.absolute_path) {
                Some(fields) => Visit::Emit(fields),
                None => Visit::Skip,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn node(relative: &str, is_dir: bool) -> WalkNode {
        WalkNode {
            absolute_path: PathBuf::from("/root").join(relative),
            relative_path: relative.to_string(),
            depth: relative.split('/').count(),
            is_dir,
        }
    }

    #[test]
    fn test_layout_rules() {
        let set = CompiledSet::from_layout("AWSLogs/%{WORD:org}/%{DATA}.log", &IndexMap::new()).unwrap();
        let rules = MatchRules::layout(set);

        assert_eq!(rules.visit(&node("AWSLogs", true)), Visit::Descend);
        assert_eq!(rules.visit(&node("Other", true)), Visit::Prune);
        assert_eq!(rules.visit(&node("AWSLogs/org1/a.json", false)), Visit::Skip);
        match rules.visit(&node("AWSLogs/org1/a.log", false)) {
            Visit::Emit(fields) => assert_eq!(fields["org"], "org1"),
            other => panic!("unexpected visit: {other:?}"),
        }
    }

    #[test]
    fn test_extension_rules() {
        let rules = MatchRules::any().with_extensions(vec![".log".to_string()]);
        assert_eq!(rules.visit(&node("anything/deep", true)), Visit::Descend);
        assert_eq!(rules.visit(&node("a/b.log", false)), Visit::Emit(Fields::new()));
        assert_eq!(rules.visit(&node("a/b.txt", false)), Visit::Skip);
    }

    #[test]
    fn test_layout_and_extensions_combined() {
        let set = CompiledSet::from_layout("logs/%{GREEDYDATA:name}", &IndexMap::new()).unwrap();
        let rules = MatchRules::layout(set).with_extensions(vec![".gz".to_string()]);
        assert!(rules.emit("logs/a.gz", Path::new("/r/logs/a.gz")).is_some());
        assert!(rules.emit("logs/a.log", Path::new("/r/logs/a.log")).is_none());
    }
}
