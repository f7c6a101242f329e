//! Segment matching of relative paths against compiled layouts.

use indexmap::IndexMap;
use tailpath_core::Fields;

use crate::error::LayoutError;
use crate::expand::{ExpandedLayout, expand};
use crate::grok::{GrokPattern, GrokRegistry};

/// Suffix letting the last layout segment span any number of directories.
const WILDCARD_TAIL: &str = "/(?s:.*)";

/// Outcome of matching a path against a layout.
///
/// `fields` is only meaningful when `matched` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub fields: Fields,
}

impl MatchResult {
    /// A failed match.
    pub fn no_match() -> Self {
        Self::default()
    }

    /// A successful match carrying the extracted fields.
    pub fn with_fields(fields: Fields) -> Self {
        Self {
            matched: true,
            fields,
        }
    }
}

impl From<Option<Fields>> for MatchResult {
    fn from(fields: Option<Fields>) -> Self {
        fields.map_or_else(Self::no_match, Self::with_fields)
    }
}

/// One expanded layout compiled for full and prefix matching.
#[derive(Debug, Clone)]
pub struct CompiledLayout {
    layout: ExpandedLayout,
    full: GrokPattern,
    /// `prefixes[i]` covers the first `i + 1` segments, for every proper prefix.
    prefixes: Vec<GrokPattern>,
    /// All but the last segment followed by anything. None for single-segment layouts.
    tail: Option<GrokPattern>,
}

impl CompiledLayout {
    /// Compile a layout and all of its segment prefixes.
    pub fn compile(layout: &ExpandedLayout, registry: &GrokRegistry) -> Result<Self, LayoutError> {
        let count = layout.segment_count();
        let full = registry.compile_anchored(layout.pattern())?;
        let prefixes = (1..count)
            .map(|depth| registry.compile_anchored(&layout.prefix(depth)))
            .collect::<Result<Vec<_>, _>>()?;
        let tail = match count {
            0 | 1 => None,
            n => Some(registry.compile_anchored(&format!(
                "{}{WILDCARD_TAIL}",
                layout.prefix(n - 1)
            ))?),
        };

        Ok(Self {
            layout: layout.clone(),
            full,
            prefixes,
            tail,
        })
    }

    /// The layout this was compiled from.
    pub fn layout(&self) -> &ExpandedLayout {
        &self.layout
    }

    /// Match the whole relative path of a file.
    pub fn match_full(&self, relative_path: &str) -> MatchResult {
        self.full.match_fields(relative_path).into()
    }

    /// Check whether a directory `segment_count` levels below the root could
    /// lead to a full match.
    ///
    /// Directories shallower than the layout are matched against the layout
    /// truncated to their depth. Directories at or below the layout's depth
    /// are matched against every segment but the last, which is free to span
    /// further directories.
    pub fn match_prefix(&self, relative_path: &str, segment_count: usize) -> MatchResult {
        if segment_count == 0 {
            return MatchResult::with_fields(Fields::new());
        }
        let pattern = match self.prefixes.get(segment_count - 1) {
            Some(prefix) => prefix,
            None => match &self.tail {
                Some(tail) => tail,
                None => return MatchResult::with_fields(Fields::new()),
            },
        };
        pattern.match_fields(relative_path).into()
    }
}

/// Every alternative of a layout, compiled, in expansion order.
#[derive(Debug, Clone)]
pub struct CompiledSet {
    layouts: Vec<CompiledLayout>,
}

impl CompiledSet {
    /// Compile expanded alternatives against a registry.
    pub fn compile(expanded: &[ExpandedLayout], registry: &GrokRegistry) -> Result<Self, LayoutError> {
        let layouts = expanded
            .iter()
            .map(|layout| CompiledLayout::compile(layout, registry))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(alternatives = layouts.len(), "compiled layout alternatives");
        Ok(Self { layouts })
    }

    /// Expand and compile a layout with extra named sub-patterns.
    pub fn from_layout(
        layout: &str,
        patterns: &IndexMap<String, String>,
    ) -> Result<Self, LayoutError> {
        let expanded = expand(layout)?;
        let mut registry = GrokRegistry::new();
        registry.add_patterns(patterns.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        Self::compile(&expanded, &registry)
    }

    /// Full match against each alternative in order; the first match wins.
    pub fn match_full(&self, relative_path: &str) -> MatchResult {
        self.layouts
            .iter()
            .map(|layout| layout.match_full(relative_path))
            .find(|result| result.matched)
            .unwrap_or_default()
    }

    /// Prefix match against each alternative in order; any match permits descent.
    pub fn match_prefix(&self, relative_path: &str, segment_count: usize) -> MatchResult {
        self.layouts
            .iter()
            .map(|layout| layout.match_prefix(relative_path, segment_count))
            .find(|result| result.matched)
            .unwrap_or_default()
    }

    /// The compiled alternatives.
    pub fn layouts(&self) -> &[CompiledLayout] {
        &self.layouts
    }

    /// Number of alternatives.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Check if there are no alternatives.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
