//! Ref enumeration and default-branch discovery for on-disk repositories.
//!
//! Listings return the valid items found: a ref whose target cannot be
//! resolved (deleted or dangling) is omitted, never raised.

use git2::{BranchType, ObjectType, Repository};

use crate::commit::Commit;
use crate::error::Result;
use crate::types::{Branch, CommitId, Tag};

/// Local branch names in backend-native order.
pub(crate) fn branch_names(repo: &Repository) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for item in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = item?;
        if let Some(name) = branch.name()? {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Tag names in backend-native order.
pub(crate) fn tag_names(repo: &Repository) -> Result<Vec<String>> {
    Ok(repo.tag_names(None)?.iter().flatten().map(String::from).collect())
}

/// Branches with their tips resolved. Dangling branches are filtered.
pub(crate) fn branches(repo: &Repository) -> Result<Vec<Branch>> {
    let mut out = Vec::new();
    for item in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = item?;
        let Some(name) = branch.name()? else { continue };
        let Ok(commit) = branch.get().peel_to_commit() else { continue };
        out.push(Branch {
            name: name.to_string(),
            target: Commit::from_git2(&commit),
        });
    }
    Ok(out)
}

/// Tags with resolved targets, annotated tags peeled. Dangling tags are
/// filtered like dangling branches.
pub(crate) fn tags(repo: &Repository) -> Result<Vec<Tag>> {
    let mut out = Vec::new();
    for name in tag_names(repo)? {
        let Ok(obj) = repo.revparse_single(&format!("refs/tags/{name}")) else { continue };
        let Ok(peeled) = obj.peel(ObjectType::Commit) else { continue };
        let Some(commit) = peeled.as_commit() else { continue };
        out.push(Tag {
            name,
            target: CommitId::new(commit.id()),
        });
    }
    Ok(out)
}

/// Default branch discovery:
/// 1. the only branch, when there is exactly one
/// 2. the branch HEAD points at, when it exists among the branches
/// 3. `master`, when present
/// 4. the first branch otherwise
pub(crate) fn discover_default_branch(repo: &Repository) -> Result<Option<String>> {
    let names = branch_names(repo)?;
    if names.is_empty() {
        return Ok(None);
    }
    if names.len() == 1 {
        return Ok(names.into_iter().next());
    }

    if let Some(head) = head_branch_name(repo) {
        if names.iter().any(|name| *name == head) {
            return Ok(Some(head));
        }
    }

    if names.iter().any(|name| name == "master") {
        return Ok(Some("master".to_string()));
    }
    Ok(names.into_iter().next())
}

/// The branch HEAD points at, if HEAD is symbolic and under refs/heads.
fn head_branch_name(repo: &Repository) -> Option<String> {
    let head = repo.find_reference("HEAD").ok()?;
    let target = head.symbolic_target()?;
    target.strip_prefix("refs/heads/").map(str::to_string)
}
