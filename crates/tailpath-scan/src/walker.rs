//! JWalk-based pruning directory walker.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jwalk::{Parallelism, WalkDir};
use tailpath_core::{Fields, TraversalError, strip_os_error_code};
use tokio_util::sync::CancellationToken;

use crate::rules::MatchRules;

/// Prefix jwalk puts in front of I/O error messages.
const JWALK_IO_PREFIX: &str = "IO error for operation on ";

/// A filesystem entry visited during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkNode {
    /// Absolute path of the entry.
    pub absolute_path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub relative_path: String,
    /// Number of segments in `relative_path`.
    pub depth: usize,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Counters for one root walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub dirs_visited: u64,
    pub dirs_pruned: u64,
    pub files_matched: u64,
    pub files_skipped: u64,
    pub cancelled: bool,
}

/// Walks one root at a time, consulting [`MatchRules`] for every node.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    rules: Arc<MatchRules>,
    follow_symlinks: bool,
    include_hidden: bool,
}

impl DirectoryWalker {
    /// Create a walker using the given rules.
    pub fn new(rules: Arc<MatchRules>) -> Self {
        Self {
            rules,
            follow_symlinks: false,
            include_hidden: true,
        }
    }

    /// Follow symbolic links.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Include entries whose name starts with a dot.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// The rules this walker applies.
    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Walk `root`, calling `on_match` for every matching file in traversal
    /// order (parent before children, siblings sorted by name).
    ///
    /// The first traversal error stops the walk and is returned.
    pub fn walk<F>(
        &self,
        root: &Path,
        cancel: &CancellationToken,
        on_match: F,
    ) -> Result<WalkStats, TraversalError>
    where
        F: FnMut(WalkNode, Fields),
    {
        let mut stats = WalkStats::default();
        self.walk_into(root, cancel, &mut stats, on_match)?;
        Ok(stats)
    }

    /// Like [`DirectoryWalker::walk`], but counts into `stats` so the work
    /// done before a traversal error is still recorded.
    pub fn walk_into<F>(
        &self,
        root: &Path,
        cancel: &CancellationToken,
        stats: &mut WalkStats,
        mut on_match: F,
    ) -> Result<(), TraversalError>
    where
        F: FnMut(WalkNode, Fields),
    {
        check_root(root)?;

        let rules = Arc::clone(&self.rules);
        let pruned = Arc::new(AtomicU64::new(0));
        let pruned_counter = Arc::clone(&pruned);
        let hook_cancel = cancel.clone();
        let hook_root = root.to_path_buf();

        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(!self.include_hidden)
            .follow_links(self.follow_symlinks)
            .min_depth(0)
            .process_read_dir(move |depth, _parent, _state, children| {
                // No depth means the listing holds the root itself.
                if depth.is_none() {
                    return;
                }
                if hook_cancel.is_cancelled() {
                    children.clear();
                    return;
                }
                // Dropping a directory entry here means jwalk never reads it.
                children.retain(|child| {
                    let Ok(entry) = child else {
                        return true;
                    };
                    if !entry.file_type.is_dir() {
                        return true;
                    }
                    let relative = relative_path(&hook_root, &entry.path());
                    if rules.descend(&relative, entry.depth) {
                        true
                    } else {
                        tracing::debug!(path = %relative, "pruned directory");
                        pruned_counter.fetch_add(1, Ordering::Relaxed);
                        false
                    }
                });
            });

        let result = self.consume(root, walker, cancel, stats, &mut on_match);
        stats.dirs_pruned += pruned.load(Ordering::Relaxed);
        stats.cancelled |= cancel.is_cancelled();
        result
    }

    fn consume<F>(
        &self,
        root: &Path,
        walker: WalkDir,
        cancel: &CancellationToken,
        stats: &mut WalkStats,
        on_match: &mut F,
    ) -> Result<(), TraversalError>
    where
        F: FnMut(WalkNode, Fields),
    {
        for entry_result in walker {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            let entry = entry_result.map_err(|err| normalize_walk_error(root, &err))?;
            if let Some(err) = &entry.read_children_error {
                return Err(normalize_walk_error(root, err));
            }
            if entry.depth == 0 {
                continue;
            }

            // Directories reaching this point were already approved by the
            // read-dir hook.
            if entry.file_type.is_dir() {
                stats.dirs_visited += 1;
                continue;
            }

            let absolute_path = entry.path();
            let relative = relative_path(root, &absolute_path);
            match self.rules.emit(&relative, &absolute_path) {
                Some(fields) => {
                    stats.files_matched += 1;
                    on_match(
                        WalkNode {
                            relative_path: relative,
                            absolute_path,
                            depth: entry.depth,
                            is_dir: false,
                        },
                        fields,
                    );
                }
                None => stats.files_skipped += 1,
            }
        }
        Ok(())
    }
}

/// Make sure the root exists and can be listed before walking it.
fn check_root(root: &Path) -> Result<(), TraversalError> {
    let metadata = std::fs::metadata(root).map_err(|e| TraversalError::from_io(root, &e))?;
    if !metadata.is_dir() {
        return Err(TraversalError::new(
            root,
            format!("{}: not a directory", root.display()),
        ));
    }
    std::fs::read_dir(root).map_err(|e| TraversalError::from_io(root, &e))?;
    Ok(())
}

/// Convert a jwalk error into a traversal error with the operation prefix
/// and OS error code removed.
pub fn normalize_walk_error(root: &Path, err: &jwalk::Error) -> TraversalError {
    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    match err.io_error() {
        Some(io) => TraversalError::from_io(path, io),
        None => {
            let message = err.to_string();
            let message = message.strip_prefix(JWALK_IO_PREFIX).unwrap_or(&message);
            let message = strip_os_error_code(message).to_lowercase();
            TraversalError::new(path, message)
        }
    }
}

/// `path` relative to `root`, joined with `/` on every platform.
pub fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().to_string(),
    }
}
