//! Backend-neutral commit and delta values.
//!
//! A [`Commit`] is an immutable snapshot of commit metadata. Changed paths
//! are not stored on the value; they are computed on demand through the
//! owning backend as [`Delta`] records. The serde forms of both types double
//! as the wire schema for the remote service.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommitId, Signature};

/// Information about a single commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    /// committer time
    pub timestamp: DateTime<Utc>,
    /// ordered; empty for root commits
    pub parent_ids: Vec<CommitId>,
}

impl Commit {
    /// create a Commit from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let author = commit.author();
        let committer = commit.committer();
        let time = commit.time();
        let timestamp = Utc
            .timestamp_opt(time.seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            id: CommitId::new(commit.id()),
            author: Signature::new(
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or("unknown@unknown"),
            ),
            committer: Signature::new(
                committer.name().unwrap_or("Unknown"),
                committer.email().unwrap_or("unknown@unknown"),
            ),
            message: commit.message().unwrap_or("").to_string(),
            timestamp,
            parent_ids: commit.parent_ids().map(CommitId::new).collect(),
        }
    }

    /// check if this is a merge commit (has multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    /// check if this is a root commit (no parents)
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// get the first (or only) parent
    pub fn first_parent(&self) -> Option<CommitId> {
        self.parent_ids.first().copied()
    }

    /// get a short summary of the commit (first line of the message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// One changed path in a commit, relative to its first parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub status: DeltaStatus,
}

impl Delta {
    /// check if either side of the delta touches `path`, where `path`
    /// matches an exact file or a directory prefix
    pub fn touches(&self, path: &str) -> bool {
        let hit = |p: &str| path_matches(p, path);
        self.new_path.as_deref().is_some_and(hit) || self.old_path.as_deref().is_some_and(hit)
    }
}

/// The kind of change a delta records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChange,
    Other,
}

impl From<git2::Delta> for DeltaStatus {
    fn from(status: git2::Delta) -> Self {
        match status {
            git2::Delta::Added => DeltaStatus::Added,
            git2::Delta::Deleted => DeltaStatus::Deleted,
            git2::Delta::Modified => DeltaStatus::Modified,
            git2::Delta::Renamed => DeltaStatus::Renamed,
            git2::Delta::Copied => DeltaStatus::Copied,
            git2::Delta::Typechange => DeltaStatus::TypeChange,
            _ => DeltaStatus::Other,
        }
    }
}

/// Path filter predicate: `filter` matches `path` exactly or as a
/// directory prefix. A trailing slash on the filter is ignored.
pub(crate) fn path_matches(path: &str, filter: &str) -> bool {
    let filter = filter.trim_end_matches('/');
    if filter.is_empty() {
        return true;
    }
    path == filter || (path.len() > filter.len() && path.as_bytes()[filter.len()] == b'/' && path.starts_with(filter))
}
