//! The contract both backends implement.
//!
//! The facade picks exactly one implementation per call via the backend
//! selector; a call never falls back to the other backend mid-execution.

use std::collections::BTreeMap;
use std::path::Path;

use crate::archive::ArchiveFormat;
use crate::commit::Commit;
use crate::error::Result;
use crate::history::LogOptions;
use crate::types::{Branch, Submodule, Tag};

pub trait RepositoryBackend {
    /// Default branch name, `None` for a repository with no branches.
    fn root_ref(&self) -> Result<Option<String>>;

    /// Branch names in backend-native order (not guaranteed sorted).
    fn branch_names(&self) -> Result<Vec<String>>;

    /// Tag names in backend-native order.
    fn tag_names(&self) -> Result<Vec<String>>;

    /// All ref names: branches followed by tags.
    fn ref_names(&self) -> Result<Vec<String>>;

    /// Branches with resolved tips. Dangling branch refs are omitted.
    fn branches(&self) -> Result<Vec<Branch>>;

    /// Tags with resolved targets. Dangling tag refs are omitted.
    fn tags(&self) -> Result<Vec<Tag>>;

    fn log(&self, options: &LogOptions) -> Result<Vec<Commit>>;

    fn count_commits(&self, options: &LogOptions) -> Result<usize>;

    fn find_commits(&self, options: &LogOptions) -> Result<Vec<Commit>>;

    /// Number of commits reachable from `refname`; 0 for an unknown ref.
    fn commit_count(&self, refname: &str) -> Result<usize>;

    /// On-disk size in kilobytes.
    fn size_kb(&self) -> Result<u64>;

    fn has_commits(&self) -> Result<bool>;

    fn is_empty(&self) -> Result<bool>;

    fn is_bare(&self) -> Result<bool>;

    /// Submodules declared at `refname`, keyed by path. Empty for an
    /// unknown ref or a tree without `.gitmodules`.
    fn submodules(&self, refname: &str) -> Result<BTreeMap<String, Submodule>>;

    /// Materialize an archive of `refname` at `out_path`. On failure no
    /// partial output file remains.
    fn write_archive(
        &self,
        repo_name: &str,
        refname: &str,
        format: ArchiveFormat,
        out_path: &Path,
    ) -> Result<()>;
}
