//! gitway - Unified Git Repository Access
//!
//! This crate presents one API for repository introspection (refs, branches,
//! tags, commit history, archives, submodules) and routes every operation
//! either to a local on-disk repository or to a remote repository service,
//! based on a runtime feature flag. Both paths honor the same semantics and
//! the same four-kind error taxonomy.
//!
//! # Example
//!
//! ```no_run
//! use gitway::{Config, LogOptions, Repository};
//!
//! let config = Config::builder().storage("default", "/srv/repositories").build();
//! let repo = Repository::new(config, "default", "group/project.git").unwrap();
//!
//! let default_branch = repo.root_ref().unwrap();
//! let commits = repo.log(&LogOptions::new("master").path("README.md").limit(20)).unwrap();
//! ```

pub mod archive;
pub mod backend;
pub mod commit;
pub mod config;
pub mod error;
pub mod history;
pub mod local;
pub mod remote;
pub mod repository;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use archive::{archive_prefix, ArchiveFormat, ArchiveRequest};
pub use backend::RepositoryBackend;
pub use commit::{Commit, Delta, DeltaStatus};
pub use config::{Config, ConfigBuilder, FeatureFlag, RuntimeFlag};
pub use error::{Error, Result};
pub use history::{HistorySource, LogOptions, SortOrder};
pub use local::LocalRepository;
pub use remote::transport::{NullTransport, RpcError, RpcTransport};
pub use remote::RemoteRepository;
pub use repository::Repository;
pub use types::{Branch, CommitId, Signature, Submodule, Tag};
