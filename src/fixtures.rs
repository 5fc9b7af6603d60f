//! Scripted fixture repositories for tests.
//!
//! Commits are written with fixed committer times so ordering and
//! time-window assertions are deterministic.

use std::fs;
use std::path::{Path, PathBuf};

use git2::build::TreeUpdateBuilder;
use git2::{FileMode, Oid, RepositoryInitOptions, Signature, Time};
use tempfile::TempDir;

use crate::types::CommitId;

pub(crate) struct TestRepo {
    dir: TempDir,
    pub repo: git2::Repository,
    rel: String,
}

impl TestRepo {
    /// A fresh repository at `<storage root>/repo.git` with `master` as the
    /// initial head.
    pub fn init() -> Self {
        Self::init_at("repo.git")
    }

    /// A fresh repository at `<storage root>/<rel>`.
    pub fn init_at(rel: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(rel);
        fs::create_dir_all(&path).unwrap();

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = git2::Repository::init_opts(&path, &opts).unwrap();

        Self {
            dir,
            repo,
            rel: rel.to_string(),
        }
    }

    /// The repository's working directory path.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join(&self.rel)
    }

    /// The storage root the repository lives under.
    pub fn storage_root(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self, time_secs: i64) -> Signature<'static> {
        Signature::new("Test Author", "test@example.com", &Time::new(time_secs, 0)).unwrap()
    }

    fn head_commit(&self) -> Option<git2::Commit<'_>> {
        self.repo.head().ok().and_then(|head| head.peel_to_commit().ok())
    }

    /// Commit a tree update on HEAD: blob upserts, path removals and raw
    /// oid upserts (for gitlink entries), at a fixed committer time.
    fn commit_update(
        &self,
        message: &str,
        upserts: &[(&str, &str)],
        removes: &[&str],
        gitlinks: &[(&str, &str)],
        time_secs: i64,
    ) -> CommitId {
        let parent = self.head_commit();
        let base_tree = match &parent {
            Some(commit) => commit.tree().unwrap(),
            None => {
                let empty = self.repo.treebuilder(None).unwrap().write().unwrap();
                self.repo.find_tree(empty).unwrap()
            }
        };

        let mut update = TreeUpdateBuilder::new();
        for &(path, content) in upserts {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            update.upsert(path, blob, FileMode::Blob);
        }
        for &path in removes {
            update.remove(path);
        }
        for &(path, id) in gitlinks {
            update.upsert(path, Oid::from_str(id).unwrap(), FileMode::Commit);
        }

        let tree_id = update.create_updated(&self.repo, &base_tree).unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = self.signature(time_secs);
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
        CommitId::new(oid)
    }

    pub fn commit_file(&self, message: &str, path: &str, content: &str, time_secs: i64) -> CommitId {
        self.commit_update(message, &[(path, content)], &[], &[], time_secs)
    }

    pub fn commit_files(&self, message: &str, files: &[(&str, &str)], time_secs: i64) -> CommitId {
        self.commit_update(message, files, &[], &[], time_secs)
    }

    /// Remove `old`, add `new` with identical content, so similarity-based
    /// rename detection recognizes the pair.
    pub fn commit_rename(
        &self,
        message: &str,
        old: &str,
        new: &str,
        content: &str,
        time_secs: i64,
    ) -> CommitId {
        self.commit_update(message, &[(new, content)], &[old], &[], time_secs)
    }

    pub fn commit_with_submodule(
        &self,
        message: &str,
        gitmodules: &str,
        sub_path: &str,
        sub_id: &str,
        time_secs: i64,
    ) -> CommitId {
        self.commit_update(
            message,
            &[(".gitmodules", gitmodules)],
            &[],
            &[(sub_path, sub_id)],
            time_secs,
        )
    }

    /// A commit with an explicit parent that moves no refs, for building
    /// branchy graphs.
    pub fn commit_with_parent(
        &self,
        message: &str,
        parent: CommitId,
        files: &[(&str, &str)],
        time_secs: i64,
    ) -> CommitId {
        let parent = self.repo.find_commit(parent.raw()).unwrap();
        let base_tree = parent.tree().unwrap();

        let mut update = TreeUpdateBuilder::new();
        for &(path, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            update.upsert(path, blob, FileMode::Blob);
        }
        let tree_id = update.create_updated(&self.repo, &base_tree).unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = self.signature(time_secs);

        let oid = self
            .repo
            .commit(None, &sig, &sig, message, &tree, &[&parent])
            .unwrap();
        CommitId::new(oid)
    }

    /// A merge commit of HEAD and `other`, keeping HEAD's tree.
    pub fn merge_commit(&self, message: &str, other: CommitId, time_secs: i64) -> CommitId {
        let head = self.head_commit().unwrap();
        let other = self.repo.find_commit(other.raw()).unwrap();
        let tree = head.tree().unwrap();
        let sig = self.signature(time_secs);

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&head, &other])
            .unwrap();
        CommitId::new(oid)
    }

    pub fn branch(&self, name: &str, at: CommitId) {
        let commit = self.repo.find_commit(at.raw()).unwrap();
        self.repo.branch(name, &commit, false).unwrap();
    }

    pub fn tag(&self, name: &str, at: CommitId) {
        let object = self.repo.find_object(at.raw(), None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }

    /// A branch ref whose target object does not exist in the odb.
    pub fn dangling_branch(&self, name: &str) {
        let refs_dir = self.repo.path().join("refs/heads");
        fs::create_dir_all(&refs_dir).unwrap();
        fs::write(
            refs_dir.join(name),
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n",
        )
        .unwrap();
    }
}
