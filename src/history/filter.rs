//! The per-commit filter state for a history walk.
//!
//! Rename-following keeps a single mutable "current name" for the tracked
//! path. The walk visits commits newest first, so when the rename commit is
//! seen the tracked name switches to the old name for all older commits.

use chrono::{DateTime, Utc};

use crate::commit::{path_matches, Commit, Delta, DeltaStatus};
use crate::error::Result;
use crate::history::{HistorySource, LogOptions};

enum PathFilter {
    /// no path filtering
    None,
    /// match any of a fixed set; renames not tracked
    Fixed(Vec<String>),
    /// single path with rename tracking along the walked lineage
    Follow { current: String },
}

pub(crate) struct CommitFilter {
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    skip_merges: bool,
    paths: PathFilter,
}

impl CommitFilter {
    pub(crate) fn new(options: &LogOptions) -> Self {
        // follow is a no-op unless exactly one path filter is given
        let paths = match options.paths.as_slice() {
            [] => PathFilter::None,
            [path] if options.follow => PathFilter::Follow {
                current: path.clone(),
            },
            paths => PathFilter::Fixed(paths.to_vec()),
        };

        Self {
            after: options.after,
            before: options.before,
            skip_merges: options.skip_merges,
            paths,
        }
    }

    /// Decide whether `commit` passes every filter. Deltas are fetched from
    /// the source only when a path filter is active.
    pub(crate) fn matches<S: HistorySource + ?Sized>(
        &mut self,
        source: &S,
        commit: &Commit,
    ) -> Result<bool> {
        if self.skip_merges && commit.is_merge() {
            return Ok(false);
        }
        if self.after.is_some_and(|after| commit.timestamp < after) {
            return Ok(false);
        }
        if self.before.is_some_and(|before| commit.timestamp > before) {
            return Ok(false);
        }

        match &mut self.paths {
            PathFilter::None => Ok(true),
            PathFilter::Fixed(paths) => {
                let deltas = source.deltas(commit, false)?;
                Ok(deltas.iter().any(|d| paths.iter().any(|p| d.touches(p))))
            }
            PathFilter::Follow { current } => {
                let deltas = source.deltas(commit, true)?;
                Ok(follow_step(current, &deltas))
            }
        }
    }
}

/// One step of rename-following: does any delta touch the tracked path,
/// and if the touch is the rename itself, switch the tracked name.
fn follow_step(current: &mut String, deltas: &[Delta]) -> bool {
    for delta in deltas {
        let new_hit = delta
            .new_path
            .as_deref()
            .is_some_and(|p| path_matches(p, current));
        if new_hit {
            if delta.status == DeltaStatus::Renamed {
                if let Some(old) = &delta.old_path {
                    *current = old.clone();
                }
            }
            return true;
        }
        if delta
            .old_path
            .as_deref()
            .is_some_and(|p| path_matches(p, current))
        {
            return true;
        }
    }
    false
}
