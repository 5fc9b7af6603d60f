//! Core type-safe wrappers shared by both backends.

use std::fmt;

use git2::Oid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::commit::Commit;
use crate::error::{Error, Result};

/// A commit identifier (40-hex SHA).
///
/// This makes sure we don't accidentally pass a ref name or a tree id where
/// a commit id is expected. Serialized as the hex string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// parse a CommitId from a hex string
    pub fn from_hex(hex: &str) -> Result<Self> {
        Oid::from_str(hex)
            .map(CommitId)
            .map_err(|_| Error::invalid(format!("not a commit id: {hex}")))
    }

    /// abbreviated form of the commit id
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for CommitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for CommitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Oid::from_str(&hex).map(CommitId).map_err(serde::de::Error::custom)
    }
}

/// Author or committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A branch with its resolved tip commit.
///
/// Listings only ever contain branches whose tip resolved; a dangling
/// branch ref is filtered out, not surfaced as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub target: Commit,
}

/// A tag pointing at a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub target: CommitId,
}

/// A submodule entry at a given ref: the `.gitmodules` declaration joined
/// with the commit entry recorded in the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submodule {
    pub path: String,
    pub url: String,
    pub id: CommitId,
}
