//! Layout patterns for tailpath.
//!
//! A layout is a slash-separated path pattern built from literal text and
//! grok tokens such as `%{WORD:org}`. Parenthesized groups followed by `?`
//! are optional. This crate provides:
//!
//! - [`expand`]: resolve optional groups into concrete alternatives
//! - [`GrokRegistry`]: named sub-patterns and the grok-to-regex compiler
//! - [`CompiledSet`]: full and prefix matching of relative paths against
//!   every alternative

mod error;
mod expand;
mod grok;
mod matcher;

pub use error::LayoutError;
pub use expand::{ExpandedLayout, MAX_OPTIONAL_DEPTH, MAX_OPTIONAL_GROUPS, expand, split_segments};
pub use grok::{DEFAULT_PATTERNS, GrokPattern, GrokRegistry, is_valid_pattern_name};
pub use matcher::{CompiledLayout, CompiledSet, MatchResult};
