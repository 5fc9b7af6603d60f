//! Typed clients for the repository service, one per remote service
//! surface, all bound to the same transport and repository address.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::commit::{Commit, Delta};
use crate::error::{Error, Result};
use crate::history::SortOrder;
use crate::archive::ArchiveFormat;
use crate::types::{Branch, CommitId, Submodule, Tag};

use super::transport::RpcTransport;

/// Repository addressing carried on every request.
#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct RepoAddr {
    pub storage: String,
    pub relative_path: String,
}

fn decode<T: DeserializeOwned>(response: Value, field: &str) -> Result<T> {
    let value = response.get(field).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|err| Error::Command(format!("malformed `{field}` in service response: {err}")))
}

fn call(
    transport: &dyn RpcTransport,
    service: &str,
    method: &str,
    params: Value,
) -> Result<Value> {
    debug!(service, method, "remote repository call");
    Ok(transport.call(service, method, params)?)
}

/// Ref introspection service.
pub(crate) struct RefClient<'a> {
    pub transport: &'a dyn RpcTransport,
    pub addr: &'a RepoAddr,
}

impl RefClient<'_> {
    fn request(&self) -> Value {
        json!({ "repository": self.addr })
    }

    pub fn default_branch_name(&self) -> Result<Option<String>> {
        let response = call(self.transport, "ref", "default_branch_name", self.request())?;
        decode(response, "name")
    }

    pub fn branch_names(&self) -> Result<Vec<String>> {
        let response = call(self.transport, "ref", "branch_names", self.request())?;
        decode(response, "names")
    }

    pub fn tag_names(&self) -> Result<Vec<String>> {
        let response = call(self.transport, "ref", "tag_names", self.request())?;
        decode(response, "names")
    }

    pub fn branches(&self) -> Result<Vec<Branch>> {
        let response = call(self.transport, "ref", "branches", self.request())?;
        decode(response, "branches")
    }

    pub fn tags(&self) -> Result<Vec<Tag>> {
        let response = call(self.transport, "ref", "tags", self.request())?;
        decode(response, "tags")
    }
}

/// Commit traversal service.
pub(crate) struct CommitClient<'a> {
    pub transport: &'a dyn RpcTransport,
    pub addr: &'a RepoAddr,
}

impl CommitClient<'_> {
    pub fn resolve_ref(&self, refname: &str) -> Result<Option<CommitId>> {
        let params = json!({ "repository": self.addr, "ref": refname });
        let response = call(self.transport, "commit", "resolve_ref", params)?;
        decode(response, "commit_id")
    }

    /// Full ancestry of `from` in the requested order, newest first.
    pub fn list_commits(&self, from: CommitId, order: SortOrder) -> Result<Vec<Commit>> {
        let params = json!({ "repository": self.addr, "from": from, "order": order });
        let response = call(self.transport, "commit", "list_commits", params)?;
        decode(response, "commits")
    }

    pub fn commit_deltas(&self, commit_id: CommitId, renames: bool) -> Result<Vec<Delta>> {
        let params = json!({ "repository": self.addr, "commit_id": commit_id, "renames": renames });
        let response = call(self.transport, "commit", "commit_deltas", params)?;
        decode(response, "deltas")
    }

    /// Service-side ancestry count, used when no filtering is needed.
    pub fn count_ancestry(&self, from: CommitId) -> Result<usize> {
        let params = json!({ "repository": self.addr, "from": from });
        let response = call(self.transport, "commit", "count_ancestry", params)?;
        decode(response, "count")
    }
}

/// Whole-repository service.
pub(crate) struct RepositoryClient<'a> {
    pub transport: &'a dyn RpcTransport,
    pub addr: &'a RepoAddr,
}

impl RepositoryClient<'_> {
    fn request(&self) -> Value {
        json!({ "repository": self.addr })
    }

    pub fn size_kb(&self) -> Result<u64> {
        let response = call(self.transport, "repository", "size", self.request())?;
        decode(response, "size_kb")
    }

    pub fn has_commits(&self) -> Result<bool> {
        let response = call(self.transport, "repository", "has_commits", self.request())?;
        decode(response, "value")
    }

    pub fn is_empty(&self) -> Result<bool> {
        let response = call(self.transport, "repository", "is_empty", self.request())?;
        decode(response, "value")
    }

    pub fn is_bare(&self) -> Result<bool> {
        let response = call(self.transport, "repository", "is_bare", self.request())?;
        decode(response, "value")
    }

    pub fn submodules(&self, refname: &str) -> Result<Vec<Submodule>> {
        let params = json!({ "repository": self.addr, "ref": refname });
        let response = call(self.transport, "repository", "submodules", params)?;
        decode(response, "submodules")
    }

    /// Archive bytes for `refname`, hex-encoded by the service.
    pub fn archive(&self, refname: &str, format: ArchiveFormat, prefix: &str) -> Result<Vec<u8>> {
        let params = json!({
            "repository": self.addr,
            "ref": refname,
            "format": format,
            "prefix": prefix,
        });
        let response = call(self.transport, "repository", "archive", params)?;
        let data: String = decode(response, "data")?;
        hex::decode(&data).map_err(|err| Error::Archive(format!("malformed archive payload: {err}")))
    }
}
