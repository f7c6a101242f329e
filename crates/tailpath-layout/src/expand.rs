//! Optional-group expansion.
//!
//! A layout such as `AWSLogs/(%{WORD:org}/)?%{WORD:account_id}/%{DATA}`
//! contains groups that may be absent from real paths. [`expand`] resolves
//! every optional group to present or absent and returns the concrete
//! alternatives in a fixed order: all groups present first, with the
//! left-most group varying slowest.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use indexmap::IndexSet;
use itertools::Itertools;

use crate::error::LayoutError;

/// Deepest supported nesting of optional groups.
pub const MAX_OPTIONAL_DEPTH: usize = 3;

/// Most optional groups a single layout may contain.
pub const MAX_OPTIONAL_GROUPS: usize = 8;

/// One concrete layout with every optional group resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedLayout {
    pattern: String,
    segments: Vec<String>,
}

impl ExpandedLayout {
    /// Build a layout from concrete pattern text.
    ///
    /// Empty segments (from doubled or leading slashes) are dropped.
    pub fn new(pattern: &str) -> Self {
        let segments = split_segments(pattern);
        Self {
            pattern: segments.join("/"),
            segments,
        }
    }

    /// The normalized pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The `/`-separated segments of the pattern.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of path segments this layout describes.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The pattern truncated to its first `count` segments.
    pub fn prefix(&self, count: usize) -> String {
        self.segments[..count.min(self.segments.len())].join("/")
    }

    /// Check if the layout has no segments at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ExpandedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Expand a layout into its concrete alternatives.
pub fn expand(layout: &str) -> Result<Vec<ExpandedLayout>, LayoutError> {
    let nodes = Parser::new(layout).parse()?;

    let groups = count_optional(&nodes);
    if groups > MAX_OPTIONAL_GROUPS {
        return Err(LayoutError::invalid(
            layout,
            format!("{groups} optional groups, at most {MAX_OPTIONAL_GROUPS} are supported"),
        ));
    }
    if optional_depth(&nodes) > MAX_OPTIONAL_DEPTH {
        return Err(LayoutError::invalid(
            layout,
            format!("optional groups nested deeper than {MAX_OPTIONAL_DEPTH} levels"),
        ));
    }

    let alternatives: IndexSet<ExpandedLayout> = variants(&nodes)
        .iter()
        .map(|v| ExpandedLayout::new(v))
        .filter(|l| !l.is_empty())
        .collect();

    if alternatives.is_empty() {
        return Err(LayoutError::invalid(layout, "layout has no path segments"));
    }
    // Prefix pruning matches one segment per directory level, so no
    // segment may match across a separator.
    if let Some(segment) = alternatives
        .iter()
        .flat_map(|l| l.segments())
        .find(|s| spans_separator(s))
    {
        return Err(LayoutError::invalid(
            layout,
            format!("segment '{segment}' has a '/' inside a group or escape"),
        ));
    }

    tracing::debug!(
        layout,
        optional_groups = groups,
        alternatives = alternatives.len(),
        "expanded layout"
    );

    Ok(alternatives.into_iter().collect())
}

/// Split pattern text on `/` outside escapes, character classes, grok
/// tokens and groups. Empty segments are dropped.
pub fn split_segments(pattern: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut start = 0;
    for idx in top_level(pattern, '/') {
        segments.push(&pattern[start..idx]);
        start = idx + 1;
    }
    segments.push(&pattern[start..]);

    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check for a `/` that a top-level split left inside a segment, either
/// escaped or within a group. Slashes in character classes are fine.
fn spans_separator(segment: &str) -> bool {
    let mut classes = 0usize;
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next() == Some('/') && classes == 0 {
                    return true;
                }
            }
            '[' => classes += 1,
            ']' if classes > 0 => classes -= 1,
            '/' if classes == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Byte offsets of `target` outside escapes, character classes, grok tokens
/// and parenthesized groups.
fn top_level(pattern: &str, target: char) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut groups = 0usize;
    let mut classes = 0usize;
    let mut in_token = false;
    let mut chars = pattern.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if in_token {
            in_token = c != '}';
            continue;
        }
        match c {
            '[' => classes += 1,
            ']' if classes > 0 => classes -= 1,
            _ if classes > 0 => {}
            '%' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                in_token = true;
            }
            '(' => groups += 1,
            ')' => groups = groups.saturating_sub(1),
            _ if c == target && groups == 0 => hits.push(idx),
            _ => {}
        }
    }

    hits
}

#[derive(Debug)]
enum Node {
    Text(String),
    Group { body: Vec<Node>, optional: bool },
}

struct Parser<'a> {
    layout: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(layout: &'a str) -> Self {
        Self {
            layout,
            chars: layout.chars().peekable(),
        }
    }

    fn parse(mut self) -> Result<Vec<Node>, LayoutError> {
        self.sequence(false)
    }

    fn sequence(&mut self, in_group: bool) -> Result<Vec<Node>, LayoutError> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.chars.next() {
            match c {
                '\\' => {
                    text.push(c);
                    let escaped = self
                        .chars
                        .next()
                        .ok_or_else(|| LayoutError::invalid(self.layout, "trailing escape"))?;
                    text.push(escaped);
                }
                '[' => self.class(&mut text)?,
                '%' if self.chars.peek() == Some(&'{') => self.token(&mut text)?,
                '(' => {
                    flush(&mut text, &mut nodes);
                    let body = self.sequence(true)?;
                    let optional = self.chars.next_if_eq(&'?').is_some();
                    nodes.push(Node::Group { body, optional });
                }
                ')' if in_group => {
                    flush(&mut text, &mut nodes);
                    return Ok(nodes);
                }
                ')' => return Err(LayoutError::invalid(self.layout, "unbalanced ')'")),
                _ => text.push(c),
            }
        }

        if in_group {
            return Err(LayoutError::invalid(self.layout, "unterminated group"));
        }
        flush(&mut text, &mut nodes);
        Ok(nodes)
    }

    /// Copy a character class, including nested classes, verbatim.
    fn class(&mut self, text: &mut String) -> Result<(), LayoutError> {
        text.push('[');
        let mut depth = 1;
        while let Some(c) = self.chars.next() {
            text.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = self.chars.next() {
                        text.push(escaped);
                    }
                }
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(LayoutError::invalid(self.layout, "unterminated character class"))
    }

    /// Copy a `%{...}` token verbatim.
    fn token(&mut self, text: &mut String) -> Result<(), LayoutError> {
        text.push('%');
        for c in self.chars.by_ref() {
            text.push(c);
            if c == '}' {
                return Ok(());
            }
        }
        Err(LayoutError::invalid(self.layout, "unterminated grok token"))
    }
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

fn count_optional(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(_) => 0,
            Node::Group { body, optional } => usize::from(*optional) + count_optional(body),
        })
        .sum()
}

fn optional_depth(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(_) => 0,
            Node::Group { body, optional } => usize::from(*optional) + optional_depth(body),
        })
        .max()
        .unwrap_or(0)
}

fn variants(nodes: &[Node]) -> Vec<String> {
    if nodes.is_empty() {
        return vec![String::new()];
    }
    nodes
        .iter()
        .map(node_variants)
        .multi_cartesian_product()
        .map(|parts| parts.concat())
        .collect()
}

fn node_variants(node: &Node) -> Vec<String> {
    match node {
        Node::Text(text) => vec![text.clone()],
        Node::Group {
            body,
            optional: false,
        } => variants(body).into_iter().map(|v| format!("({v})")).collect(),
        Node::Group {
            body,
            optional: true,
        } => {
            let mut out: Vec<String> = variants(body).into_iter().map(splice).collect();
            out.push(String::new());
            out
        }
    }
}

/// Render a present optional group. Plain content is inlined so its
/// slashes split into segments; group syntax and alternations keep a group.
fn splice(body: String) -> String {
    if body.starts_with('?') {
        format!("({body})")
    } else if !top_level(&body, '|').is_empty() {
        format!("(?:{body})")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(layout: &str) -> Vec<String> {
        expand(layout)
            .unwrap()
            .into_iter()
            .map(|l| l.pattern().to_string())
            .collect()
    }

    #[test]
    fn test_no_optional_groups() {
        assert_eq!(
            patterns("AWSLogs/%{WORD:org}/%{DATA}"),
            vec!["AWSLogs/%{WORD:org}/%{DATA}"]
        );
    }

    #[test]
    fn test_single_optional_group() {
        assert_eq!(
            patterns("AWSLogs/(%{WORD:org}/)?%{WORD:account_id}/CloudTrail"),
            vec![
                "AWSLogs/%{WORD:org}/%{WORD:account_id}/CloudTrail",
                "AWSLogs/%{WORD:account_id}/CloudTrail",
            ]
        );
    }

    #[test]
    fn test_leftmost_group_varies_slowest() {
        assert_eq!(patterns("(a/)?(b/)?c"), vec!["a/b/c", "a/c", "b/c", "c"]);
    }

    #[test]
    fn test_nested_optional_groups() {
        assert_eq!(
            patterns("logs/(%{WORD:org}/(%{WORD:unit}/)?)?%{WORD:account}"),
            vec![
                "logs/%{WORD:org}/%{WORD:unit}/%{WORD:account}",
                "logs/%{WORD:org}/%{WORD:account}",
                "logs/%{WORD:account}",
            ]
        );
    }

    #[test]
    fn test_duplicates_removed() {
        assert_eq!(patterns("a/(/)?b"), vec!["a/b"]);
        assert_eq!(patterns("a/(x/)?(x/)?b"), vec!["a/x/x/b", "a/x/b", "a/b"]);
    }

    #[test]
    fn test_group_syntax_is_preserved() {
        assert_eq!(patterns("a/(?:x|y)?/b"), vec!["a/(?:x|y)/b", "a/b"]);
        assert_eq!(patterns("a/(x|y)?/b"), vec!["a/(?:x|y)/b", "a/b"]);
        assert_eq!(patterns("a/(x)+/b"), vec!["a/(x)+/b"]);
    }

    #[test]
    fn test_escapes_and_classes_are_literal() {
        assert_eq!(patterns(r"a/\(b\)?/c"), vec![r"a/\(b\)?/c"]);
        assert_eq!(patterns("a/[()]+/c"), vec!["a/[()]+/c"]);
    }

    #[test]
    fn test_no_optional_markers_remain() {
        for layout in expand("AWSLogs/(%{WORD:org}/)?(%{WORD:region}/)?%{DATA}").unwrap() {
            assert!(!layout.pattern().contains(")?"));
        }
    }

    #[test]
    fn test_malformed_layouts() {
        for layout in ["a/(b/", "a/b)/c", "a/%{WORD", "a/[bc", "a/\\", "(/)?"] {
            let err = expand(layout).unwrap_err();
            assert!(matches!(err, LayoutError::InvalidPattern { .. }), "{layout}");
        }
    }

    #[test]
    fn test_separator_inside_segment_is_rejected() {
        for layout in [
            "a/(?:x/y)/%{WORD:f}.log",
            r"a\/b/%{WORD:f}.log",
            "a/(x|y/)?b",
            "logs/(%{WORD:a}|x/y)/c",
        ] {
            let err = expand(layout).unwrap_err();
            assert!(matches!(err, LayoutError::InvalidPattern { .. }), "{layout}");
        }
        assert_eq!(patterns("a/[^/]+/b"), vec!["a/[^/]+/b"]);
        assert_eq!(patterns(r"a/[\/x]/b"), vec![r"a/[\/x]/b"]);
    }

    #[test]
    fn test_nesting_limit() {
        assert!(expand("((((a/)?b/)?c/)?d/)?e").is_err());
        assert_eq!(expand("(((a/)?b/)?c/)?e").unwrap().len(), 4);
    }

    #[test]
    fn test_group_count_limit() {
        let layout = "(a/)?".repeat(MAX_OPTIONAL_GROUPS + 1) + "end";
        assert!(expand(&layout).is_err());

        let layout = "(a/)?".repeat(MAX_OPTIONAL_GROUPS) + "end";
        assert!(expand(&layout).is_ok());
    }

    #[test]
    fn test_split_segments() {
        assert_eq!(
            split_segments("/AWSLogs//[a/b]/(x/y)/%{WORD:w}.log"),
            vec!["AWSLogs", "[a/b]", "(x/y)", "%{WORD:w}.log"]
        );
    }

    #[test]
    fn test_layout_prefix() {
        let layout = ExpandedLayout::new("a/%{WORD:b}/c");
        assert_eq!(layout.segment_count(), 3);
        assert_eq!(layout.prefix(2), "a/%{WORD:b}");
        assert_eq!(layout.prefix(9), "a/%{WORD:b}/c");
    }
}
