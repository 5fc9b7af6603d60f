//! The repository facade.
//!
//! The unified public interface consumed by higher layers. Each method
//! validates its inputs, consults the backend selector, and commits to one
//! backend for its entire execution. The facade is the sole error boundary:
//! every method returns a well-formed value or one of the four error kinds.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::archive::{self, ArchiveFormat};
use crate::backend::RepositoryBackend;
use crate::commit::Commit;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::LogOptions;
use crate::local::LocalRepository;
use crate::remote::RemoteRepository;
use crate::types::{Branch, Submodule, Tag};

/// A cheap, per-call-dispatching handle on one logical repository.
///
/// Constructed per logical repository reference; holds no mutable state
/// beyond a cached default-branch lookup. Safe to use from one thread at a
/// time; create one handle per thread for concurrent access.
pub struct Repository {
    config: Config,
    storage: String,
    relative_path: String,
    name: String,
    root_ref: OnceLock<Option<String>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("storage", &self.storage)
            .field("relative_path", &self.relative_path)
            .field("name", &self.name)
            .field("root_ref", &self.root_ref)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Create a handle for `(storage, relative_path)`.
    pub fn new(
        config: Config,
        storage: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Result<Self> {
        let storage = storage.into();
        let relative_path = relative_path.into();
        if storage.trim().is_empty() {
            return Err(Error::invalid("storage name must not be empty"));
        }
        if relative_path.trim().is_empty() {
            return Err(Error::invalid("relative path must not be empty"));
        }

        let name = derive_name(&relative_path);
        Ok(Self {
            config,
            storage,
            relative_path,
            name,
            root_ref: OnceLock::new(),
        })
    }

    /// The repository name used for archive prefixes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &str {
        &self.storage
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Select the backend for one call. The selector is re-read every time.
    fn backend(&self) -> Result<Box<dyn RepositoryBackend>> {
        if self.config.remote_enabled() {
            debug!(storage = %self.storage, path = %self.relative_path, "dispatching to remote backend");
            Ok(Box::new(RemoteRepository::new(
                self.config.transport(),
                self.storage.clone(),
                self.relative_path.clone(),
            )))
        } else {
            debug!(storage = %self.storage, path = %self.relative_path, "dispatching to local backend");
            let root = self
                .config
                .storage_path(&self.storage)
                .ok_or_else(|| Error::NoRepository(format!("unknown storage: {}", self.storage)))?;
            Ok(Box::new(LocalRepository::open(root.join(&self.relative_path))?))
        }
    }

    /// Default branch name; `None` for a repository with no branches.
    /// Memoized per handle.
    pub fn root_ref(&self) -> Result<Option<String>> {
        if let Some(cached) = self.root_ref.get() {
            return Ok(cached.clone());
        }
        let resolved = self.backend()?.root_ref()?;
        let _ = self.root_ref.set(resolved.clone());
        Ok(resolved)
    }

    /// Branch names in backend-native order.
    pub fn branch_names(&self) -> Result<Vec<String>> {
        self.backend()?.branch_names()
    }

    /// Tag names in backend-native order.
    pub fn tag_names(&self) -> Result<Vec<String>> {
        self.backend()?.tag_names()
    }

    /// All ref names: branches followed by tags.
    pub fn ref_names(&self) -> Result<Vec<String>> {
        self.backend()?.ref_names()
    }

    /// Branches with resolved tips; dangling branch refs are omitted.
    pub fn branches(&self) -> Result<Vec<Branch>> {
        self.backend()?.branches()
    }

    /// Tags with resolved targets; dangling tag refs are omitted.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        self.backend()?.tags()
    }

    pub fn branch_count(&self) -> Result<usize> {
        Ok(self.backend()?.branch_names()?.len())
    }

    pub fn tag_count(&self) -> Result<usize> {
        Ok(self.backend()?.tag_names()?.len())
    }

    /// Filtered, ordered, paginated commit history.
    pub fn log(&self, options: &LogOptions) -> Result<Vec<Commit>> {
        options.validate()?;
        self.backend()?.log(options)
    }

    /// The number of commits the same pipeline as [`Repository::log`]
    /// would return.
    pub fn count_commits(&self, options: &LogOptions) -> Result<usize> {
        options.validate()?;
        self.backend()?.count_commits(options)
    }

    /// Ordered commit listing; identical pipeline to [`Repository::log`].
    pub fn find_commits(&self, options: &LogOptions) -> Result<Vec<Commit>> {
        options.validate()?;
        self.backend()?.find_commits(options)
    }

    /// Number of commits reachable from `refname`; 0 for an unknown ref.
    pub fn commit_count(&self, refname: &str) -> Result<usize> {
        validate_ref(refname)?;
        self.backend()?.commit_count(refname)
    }

    /// On-disk size in kilobytes.
    pub fn size(&self) -> Result<u64> {
        self.backend()?.size_kb()
    }

    pub fn has_commits(&self) -> Result<bool> {
        self.backend()?.has_commits()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.backend()?.is_empty()
    }

    pub fn is_bare(&self) -> Result<bool> {
        self.backend()?.is_bare()
    }

    /// Submodules declared at `refname`, keyed by path.
    pub fn submodules(&self, refname: &str) -> Result<BTreeMap<String, Submodule>> {
        validate_ref(refname)?;
        self.backend()?.submodules(refname)
    }

    /// Materialize an archive of `refname` at `out_path`. On failure no
    /// partial output file remains.
    pub fn archive(
        &self,
        refname: &str,
        format: ArchiveFormat,
        out_path: impl AsRef<Path>,
    ) -> Result<()> {
        validate_ref(refname)?;
        self.backend()?
            .write_archive(&self.name, refname, format, out_path.as_ref())
    }

    /// Deterministic archive prefix for `refname` at `sha`. Pure; contacts
    /// no backend.
    pub fn archive_prefix(&self, refname: &str, sha: &str) -> String {
        archive::archive_prefix(&self.name, refname, sha)
    }
}

fn validate_ref(refname: &str) -> Result<()> {
    if refname.trim().is_empty() {
        return Err(Error::invalid("ref must not be empty"));
    }
    Ok(())
}

/// Repository name from its relative path: the last path component with a
/// trailing `.git` stripped.
fn derive_name(relative_path: &str) -> String {
    let base = relative_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(relative_path);
    base.strip_suffix(".git").unwrap_or(base).to_string()
}
