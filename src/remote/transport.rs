//! The RPC transport seam.
//!
//! The crate never opens sockets itself; an injected [`RpcTransport`]
//! carries each call to the repository service. Failures classify into
//! not-found versus everything else; that split is the whole error
//! contract with the remote backend.

use serde_json::Value;
use thiserror::Error;

use crate::error::Error;

/// A transport-level failure.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The service reported that the repository (or addressed object)
    /// does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service answered with any other failure.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The call never completed (connection, timeout, cancellation).
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::NotFound(msg) => Error::NoRepository(msg),
            RpcError::Remote(msg) | RpcError::Transport(msg) => Error::Command(msg),
        }
    }
}

/// A stub bound to the repository service. One call, one result; retry
/// policy belongs to the caller or the transport itself, never here.
pub trait RpcTransport: Send + Sync {
    fn call(
        &self,
        service: &str,
        method: &str,
        params: Value,
    ) -> std::result::Result<Value, RpcError>;
}

/// Transport for local-only deployments: every call fails.
pub struct NullTransport;

impl RpcTransport for NullTransport {
    fn call(
        &self,
        _service: &str,
        _method: &str,
        _params: Value,
    ) -> std::result::Result<Value, RpcError> {
        Err(RpcError::Transport("no remote transport configured".to_string()))
    }
}
