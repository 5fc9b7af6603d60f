//! Commit history traversal shared by both backends.
//!
//! The engine walks ancestry through the [`HistorySource`] contract and
//! applies one filtering pipeline: sort order, inclusive time window, path
//! filter (with rename-following for a single path), merge skipping, then
//! offset and limit. An unresolvable ref yields an empty result, not an
//! error.

mod filter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commit::{Commit, Delta};
use crate::error::{Error, Result};
use crate::types::CommitId;
use filter::CommitFilter;

/// Traversal order for history walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Backend-native order. Stable only within a single unmodified
    /// repository snapshot; two walks spanning a mutation may differ.
    #[default]
    Default,
    /// Topological: every emitted commit appears before its emitted parents.
    Topo,
    /// Reverse-chronological with topological tie-break.
    Date,
}

/// Options for `log`, `count_commits` and `find_commits`.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Resolution target. Required, must be non-empty.
    pub ref_name: String,
    /// Ordered set of path filters. Empty means no path filtering.
    pub paths: Vec<String>,
    /// Cap on the number of returned commits. `None` is unbounded.
    pub limit: Option<usize>,
    /// Matching commits to skip from the head of the filtered sequence.
    pub offset: usize,
    /// Inclusive lower timestamp bound.
    pub after: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub before: Option<DateTime<Utc>>,
    /// Track renames. Effective only when exactly one path filter is given.
    pub follow: bool,
    /// Drop commits with more than one parent.
    pub skip_merges: bool,
    pub order: SortOrder,
}

impl LogOptions {
    pub fn new(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            paths: Vec::new(),
            limit: None,
            offset: 0,
            after: None,
            before: None,
            follow: false,
            skip_merges: false,
            order: SortOrder::Default,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn follow(mut self) -> Self {
        self.follow = true;
        self
    }

    pub fn skip_merges(mut self) -> Self {
        self.skip_merges = true;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// check if the pipeline needs anything beyond raw ancestry counting
    pub(crate) fn is_plain_walk(&self) -> bool {
        self.paths.is_empty() && self.after.is_none() && self.before.is_none() && !self.skip_merges
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ref_name.trim().is_empty() {
            return Err(Error::invalid("ref must not be empty"));
        }
        Ok(())
    }
}

/// What the engine needs from a backend: ref resolution, an ordered
/// ancestry walk, and per-commit deltas.
pub trait HistorySource {
    /// Resolve a ref to a commit id. Unknown refs are `None`, not errors.
    fn resolve_ref(&self, refname: &str) -> Result<Option<CommitId>>;

    /// Walk ancestry from `start` in the requested order, newest first.
    fn walk_from<'a>(
        &'a self,
        start: CommitId,
        order: SortOrder,
    ) -> Result<Box<dyn Iterator<Item = Result<Commit>> + 'a>>;

    /// Changed paths of a commit relative to its first parent. Rename
    /// detection is requested only when the caller will use it.
    fn deltas(&self, commit: &Commit, detect_renames: bool) -> Result<Vec<Delta>>;
}

/// Filtered, ordered, paginated history for `options.ref_name`.
pub fn log<S: HistorySource + ?Sized>(source: &S, options: &LogOptions) -> Result<Vec<Commit>> {
    options.validate()?;

    let Some(start) = source.resolve_ref(&options.ref_name)? else {
        return Ok(Vec::new());
    };

    let mut filter = CommitFilter::new(options);
    let mut skipped = 0;
    let mut out = Vec::new();

    for item in source.walk_from(start, options.order)? {
        let commit = item?;
        if !filter.matches(source, &commit)? {
            continue;
        }
        if skipped < options.offset {
            skipped += 1;
            continue;
        }
        out.push(commit);
        if options.limit.is_some_and(|limit| out.len() >= limit) {
            break;
        }
    }

    Ok(out)
}

/// Same pipeline as [`log`], returning only the number of matches.
pub fn count_commits<S: HistorySource + ?Sized>(source: &S, options: &LogOptions) -> Result<usize> {
    options.validate()?;

    let Some(start) = source.resolve_ref(&options.ref_name)? else {
        return Ok(0);
    };

    let mut filter = CommitFilter::new(options);
    let mut skipped = 0;
    let mut count = 0;

    for item in source.walk_from(start, options.order)? {
        let commit = item?;
        if !filter.matches(source, &commit)? {
            continue;
        }
        if skipped < options.offset {
            skipped += 1;
            continue;
        }
        count += 1;
        if options.limit.is_some_and(|limit| count >= limit) {
            break;
        }
    }

    Ok(count)
}
