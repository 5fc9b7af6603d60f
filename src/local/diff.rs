//! First-parent deltas for the history engine.

use git2::{DiffFindOptions, Repository};

use crate::commit::Delta;
use crate::error::Result;
use crate::types::CommitId;

/// Changed paths of a commit relative to its first parent (the whole tree
/// for a root commit). Rename detection runs only when requested; it is
/// the expensive part and only rename-following walks need it.
pub(crate) fn commit_deltas(
    repo: &Repository,
    commit_id: CommitId,
    detect_renames: bool,
) -> Result<Vec<Delta>> {
    let commit = repo.find_commit(commit_id.raw())?;
    let tree = commit.tree()?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };

    let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
    if detect_renames {
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;
    }

    let mut deltas = Vec::new();
    for delta in diff.deltas() {
        deltas.push(Delta {
            old_path: delta.old_file().path().map(|p| p.to_string_lossy().into_owned()),
            new_path: delta.new_file().path().map(|p| p.to_string_lossy().into_owned()),
            status: delta.status().into(),
        });
    }
    Ok(deltas)
}
