//! Runtime configuration: storage roots, backend selector, RPC transport.
//!
//! The backend flag is an injected dependency rather than ambient global
//! state, so tests can drive both dispatch paths deterministically. The
//! flag is re-read on every facade call, allowing runtime toggling during
//! a migration rollout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::remote::transport::{NullTransport, RpcTransport};

/// Source of the process-wide "serve from the remote service" decision.
pub trait FeatureFlag: Send + Sync {
    fn remote_enabled(&self) -> bool;
}

/// A togglable flag cell. The default implementation of [`FeatureFlag`].
pub struct RuntimeFlag {
    enabled: RwLock<bool>,
}

impl RuntimeFlag {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: RwLock::new(enabled),
        }
    }

    /// Flip the flag. Takes effect on the next facade call.
    pub fn set(&self, enabled: bool) {
        *self.enabled.write() = enabled;
    }
}

impl Default for RuntimeFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

impl FeatureFlag for RuntimeFlag {
    fn remote_enabled(&self) -> bool {
        *self.enabled.read()
    }
}

/// Shared configuration handed to every [`crate::Repository`].
///
/// Clone this to share across threads - it uses Arc internally.
#[derive(Clone)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

struct ConfigInner {
    storages: HashMap<String, PathBuf>,
    flag: Arc<dyn FeatureFlag>,
    transport: Arc<dyn RpcTransport>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Consult the backend selector. Re-evaluated on every call, never cached.
    pub fn remote_enabled(&self) -> bool {
        self.inner.flag.remote_enabled()
    }

    /// Resolve a storage name to its on-disk root, if configured.
    pub fn storage_path(&self, storage: &str) -> Option<&Path> {
        self.inner.storages.get(storage).map(PathBuf::as_path)
    }

    pub fn transport(&self) -> Arc<dyn RpcTransport> {
        self.inner.transport.clone()
    }
}

/// Builder for [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    storages: HashMap<String, PathBuf>,
    flag: Option<Arc<dyn FeatureFlag>>,
    transport: Option<Arc<dyn RpcTransport>>,
}

impl ConfigBuilder {
    /// Register a storage root under a name.
    pub fn storage(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.storages.insert(name.into(), root.into());
        self
    }

    /// Install the backend selector. Defaults to a local-only [`RuntimeFlag`].
    pub fn flag(mut self, flag: Arc<dyn FeatureFlag>) -> Self {
        self.flag = Some(flag);
        self
    }

    /// Install the RPC transport for the remote backend. Defaults to a
    /// transport that fails every call, for local-only deployments.
    pub fn transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                storages: self.storages,
                flag: self.flag.unwrap_or_else(|| Arc::new(RuntimeFlag::default())),
                transport: self.transport.unwrap_or_else(|| Arc::new(NullTransport)),
            }),
        }
    }
}
