//! Remote repository client.
//!
//! Serves every backend operation through RPC calls to an external
//! repository service. Service-level "not found" maps to `NoRepository`;
//! every other failure maps to `Command` with the original message. The
//! client performs no retries; one failed call is one failed operation.

mod client;
pub mod transport;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::archive::{self, ArchiveFormat};
use crate::backend::RepositoryBackend;
use crate::commit::{Commit, Delta};
use crate::error::{Error, Result};
use crate::history::{self, HistorySource, LogOptions, SortOrder};
use crate::types::{Branch, CommitId, Submodule, Tag};

use client::{CommitClient, RefClient, RepoAddr, RepositoryClient};
use transport::RpcTransport;

/// RPC-backed repository access for `(storage, relative_path)`.
pub struct RemoteRepository {
    transport: Arc<dyn RpcTransport>,
    addr: RepoAddr,
}

impl RemoteRepository {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        storage: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            addr: RepoAddr {
                storage: storage.into(),
                relative_path: relative_path.into(),
            },
        }
    }

    fn refs(&self) -> RefClient<'_> {
        RefClient {
            transport: self.transport.as_ref(),
            addr: &self.addr,
        }
    }

    fn commits(&self) -> CommitClient<'_> {
        CommitClient {
            transport: self.transport.as_ref(),
            addr: &self.addr,
        }
    }

    fn repository(&self) -> RepositoryClient<'_> {
        RepositoryClient {
            transport: self.transport.as_ref(),
            addr: &self.addr,
        }
    }
}

impl HistorySource for RemoteRepository {
    fn resolve_ref(&self, refname: &str) -> Result<Option<CommitId>> {
        self.commits().resolve_ref(refname)
    }

    fn walk_from<'a>(
        &'a self,
        start: CommitId,
        order: SortOrder,
    ) -> Result<Box<dyn Iterator<Item = Result<Commit>> + 'a>> {
        let commits = self.commits().list_commits(start, order)?;
        Ok(Box::new(commits.into_iter().map(Ok)))
    }

    fn deltas(&self, commit: &Commit, detect_renames: bool) -> Result<Vec<Delta>> {
        self.commits().commit_deltas(commit.id, detect_renames)
    }
}

impl RepositoryBackend for RemoteRepository {
    fn root_ref(&self) -> Result<Option<String>> {
        self.refs().default_branch_name()
    }

    fn branch_names(&self) -> Result<Vec<String>> {
        self.refs().branch_names()
    }

    fn tag_names(&self) -> Result<Vec<String>> {
        self.refs().tag_names()
    }

    fn ref_names(&self) -> Result<Vec<String>> {
        let mut names = self.refs().branch_names()?;
        names.extend(self.refs().tag_names()?);
        Ok(names)
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        self.refs().branches()
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        self.refs().tags()
    }

    fn log(&self, options: &LogOptions) -> Result<Vec<Commit>> {
        history::log(self, options)
    }

    fn count_commits(&self, options: &LogOptions) -> Result<usize> {
        options.validate()?;
        if !options.is_plain_walk() {
            return history::count_commits(self, options);
        }

        // native count: let the service count ancestry
        let Some(start) = self.resolve_ref(&options.ref_name)? else {
            return Ok(0);
        };
        let total = self.commits().count_ancestry(start)?;
        let total = total.saturating_sub(options.offset);
        Ok(options.limit.map_or(total, |limit| total.min(limit)))
    }

    fn find_commits(&self, options: &LogOptions) -> Result<Vec<Commit>> {
        history::log(self, options)
    }

    fn commit_count(&self, refname: &str) -> Result<usize> {
        let Some(start) = self.resolve_ref(refname)? else {
            return Ok(0);
        };
        self.commits().count_ancestry(start)
    }

    fn size_kb(&self) -> Result<u64> {
        self.repository().size_kb()
    }

    fn has_commits(&self) -> Result<bool> {
        self.repository().has_commits()
    }

    fn is_empty(&self) -> Result<bool> {
        self.repository().is_empty()
    }

    fn is_bare(&self) -> Result<bool> {
        self.repository().is_bare()
    }

    fn submodules(&self, refname: &str) -> Result<BTreeMap<String, Submodule>> {
        let submodules = self.repository().submodules(refname)?;
        Ok(submodules
            .into_iter()
            .map(|sub| (sub.path.clone(), sub))
            .collect())
    }

    fn write_archive(
        &self,
        repo_name: &str,
        refname: &str,
        format: ArchiveFormat,
        out_path: &Path,
    ) -> Result<()> {
        let Some(commit_id) = self.resolve_ref(refname)? else {
            return Err(Error::Archive(format!("ref not found: {refname}")));
        };
        let prefix = archive::archive_prefix(repo_name, refname, &commit_id.short());
        let data = self.repository().archive(refname, format, &prefix)?;
        archive::write_archive_bytes(out_path, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::scripted::ScriptedTransport;
    use crate::remote::transport::RpcError;
    use serde_json::json;

    fn remote(transport: ScriptedTransport) -> (Arc<ScriptedTransport>, RemoteRepository) {
        let transport = Arc::new(transport);
        let repo = RemoteRepository::new(transport.clone(), "default", "group/project.git");
        (transport, repo)
    }

    fn wire_commit(id: &str, secs: i64, parents: &[&str]) -> serde_json::Value {
        json!({
            "id": id,
            "author": { "name": "Alice", "email": "alice@example.com" },
            "committer": { "name": "Alice", "email": "alice@example.com" },
            "message": "commit",
            "timestamp": chrono::DateTime::from_timestamp(secs, 0).unwrap(),
            "parent_ids": parents,
        })
    }

    const ID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_root_ref_from_service() {
        let (_, repo) = remote(
            ScriptedTransport::new().respond("ref", "default_branch_name", json!({ "name": "master" })),
        );
        assert_eq!(repo.root_ref().unwrap(), Some("master".to_string()));
    }

    #[test]
    fn test_not_found_maps_to_no_repository() {
        let (_, repo) = remote(ScriptedTransport::new().fail(
            "ref",
            "default_branch_name",
            RpcError::NotFound("group/project.git".to_string()),
        ));
        assert!(repo.root_ref().unwrap_err().is_not_found());
    }

    #[test]
    fn test_other_failures_map_to_command() {
        let (_, repo) = remote(ScriptedTransport::new().fail(
            "ref",
            "branch_names",
            RpcError::Remote("unknown".to_string()),
        ));
        assert!(matches!(repo.branch_names().unwrap_err(), Error::Command(_)));
    }

    #[test]
    fn test_log_through_service_walk() {
        let (_, repo) = remote(
            ScriptedTransport::new()
                .respond("commit", "resolve_ref", json!({ "commit_id": ID_B }))
                .respond(
                    "commit",
                    "list_commits",
                    json!({ "commits": [wire_commit(ID_B, 2_000, &[ID_A]), wire_commit(ID_A, 1_000, &[])] }),
                ),
        );

        let commits = repo.log(&LogOptions::new("master")).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].id.to_string(), ID_B);
        assert_eq!(commits[1].id.to_string(), ID_A);
    }

    #[test]
    fn test_log_unknown_ref_is_empty() {
        let (transport, repo) = remote(
            ScriptedTransport::new().respond("commit", "resolve_ref", json!({ "commit_id": null })),
        );

        let commits = repo.log(&LogOptions::new("unknown")).unwrap();
        assert!(commits.is_empty());
        // resolution happened, but no walk was requested
        assert_eq!(transport.calls(), vec!["commit/resolve_ref"]);
    }

    #[test]
    fn test_count_commits_uses_native_count() {
        let (transport, repo) = remote(
            ScriptedTransport::new()
                .respond("commit", "resolve_ref", json!({ "commit_id": ID_B }))
                .respond("commit", "count_ancestry", json!({ "count": 25 })),
        );

        let count = repo.count_commits(&LogOptions::new("master")).unwrap();
        assert_eq!(count, 25);
        assert!(transport.calls().contains(&"commit/count_ancestry".to_string()));
    }

    #[test]
    fn test_archive_writes_service_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("project.tar");
        let (_, repo) = remote(
            ScriptedTransport::new()
                .respond("commit", "resolve_ref", json!({ "commit_id": ID_A }))
                .respond("repository", "archive", json!({ "data": hex::encode(b"tar-bytes") })),
        );

        repo.write_archive("project", "master", ArchiveFormat::Tar, &out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"tar-bytes");
    }

    #[test]
    fn test_archive_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("project.tar");
        let (_, repo) = remote(
            ScriptedTransport::new()
                .respond("commit", "resolve_ref", json!({ "commit_id": ID_A }))
                .fail("repository", "archive", RpcError::Remote("storage offline".to_string())),
        );

        let err = repo.write_archive("project", "master", ArchiveFormat::Tar, &out).unwrap_err();
        assert!(matches!(err, Error::Command(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_submodules_keyed_by_path() {
        let (_, repo) = remote(ScriptedTransport::new().respond(
            "repository",
            "submodules",
            json!({ "submodules": [{ "path": "vendor/lib", "url": "https://example.com/lib.git", "id": ID_A }] }),
        ));

        let submodules = repo.submodules("master").unwrap();
        assert_eq!(submodules.len(), 1);
        assert_eq!(submodules["vendor/lib"].url, "https://example.com/lib.git");
    }
}
