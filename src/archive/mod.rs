//! Archive construction: deterministic naming plus tar/zip/bz2 packers.
//!
//! The prefix scheme is pure and shared by both backends. The writer walks
//! the commit's tree and emits entries under the prefix; any failure removes
//! the partial output file before surfacing `Error::Archive`.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::CommitId;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Tar,
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "tar.bz2")]
    TarBz2,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// A fully resolved archive job, built by a backend after ref resolution.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub ref_name: String,
    pub commit_id: CommitId,
    pub format: ArchiveFormat,
    pub prefix: String,
    pub out_path: PathBuf,
}

/// Deterministic archive prefix: `{name}-{sanitized ref}-{sha}`.
///
/// Path separators in the ref are replaced with `-`; other characters,
/// dots included, are preserved verbatim. Pure, no I/O.
pub fn archive_prefix(name: &str, refname: &str, sha: &str) -> String {
    format!("{}-{}-{}", name, refname.replace('/', "-"), sha)
}

/// Removes the output file on drop unless disarmed, so no truncated
/// artifact survives an error or abort exit path.
struct CleanupGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> CleanupGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(self.path);
        }
    }
}

fn archive_err(err: impl std::fmt::Display) -> Error {
    Error::Archive(err.to_string())
}

/// One tree entry scheduled for packing.
enum Entry {
    Dir { path: String },
    File { path: String, mode: u32, content: Vec<u8> },
    Symlink { path: String, target: String },
}

/// Write the tree at `request.commit_id` as an archive on disk.
pub(crate) fn write_local_archive(repo: &git2::Repository, request: &ArchiveRequest) -> Result<()> {
    let guard = CleanupGuard::new(&request.out_path);

    let commit = repo
        .find_commit(request.commit_id.raw())
        .map_err(archive_err)?;
    let mtime = commit.time().seconds().max(0) as u64;
    let entries = collect_entries(repo, &commit.tree().map_err(archive_err)?)?;

    match request.format {
        ArchiveFormat::Tar => {
            let file = File::create(&request.out_path).map_err(archive_err)?;
            write_tar(file, &request.prefix, &entries, mtime)?;
        }
        ArchiveFormat::TarGz => {
            let file = File::create(&request.out_path).map_err(archive_err)?;
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let encoder = write_tar(encoder, &request.prefix, &entries, mtime)?;
            encoder.finish().map_err(archive_err)?;
        }
        ArchiveFormat::TarBz2 => {
            write_tar_bz2(request, &entries, mtime)?;
        }
        ArchiveFormat::Zip => {
            let file = File::create(&request.out_path).map_err(archive_err)?;
            write_zip(file, &request.prefix, &entries, mtime)?;
        }
    }

    guard.disarm();
    Ok(())
}

/// Write raw archive bytes fetched from the remote service, with the same
/// partial-output guarantee as the local packers.
pub(crate) fn write_archive_bytes(out_path: &Path, data: &[u8]) -> Result<()> {
    let guard = CleanupGuard::new(out_path);
    let mut file = File::create(out_path).map_err(archive_err)?;
    file.write_all(data).map_err(archive_err)?;
    guard.disarm();
    Ok(())
}

/// Flatten the tree into packable entries, pre-order. Submodule (commit)
/// entries become bare directories, matching what a checkout would show.
fn collect_entries(repo: &git2::Repository, tree: &git2::Tree<'_>) -> Result<Vec<Entry>> {
    let mut raw = Vec::new();
    tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
        let name = entry.name().unwrap_or_default();
        raw.push((format!("{root}{name}"), entry.id(), entry.filemode(), entry.kind()));
        0
    })
    .map_err(archive_err)?;

    let mut entries = Vec::with_capacity(raw.len());
    for (path, id, mode, kind) in raw {
        match kind {
            Some(git2::ObjectType::Tree) | Some(git2::ObjectType::Commit) => {
                entries.push(Entry::Dir { path });
            }
            Some(git2::ObjectType::Blob) => {
                let blob = repo.find_blob(id).map_err(archive_err)?;
                if mode == 0o120000 {
                    entries.push(Entry::Symlink {
                        path,
                        target: String::from_utf8_lossy(blob.content()).into_owned(),
                    });
                } else {
                    entries.push(Entry::File {
                        path,
                        mode: if mode == 0o100755 { 0o755 } else { 0o644 },
                        content: blob.content().to_vec(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(entries)
}

fn write_tar<W: Write>(writer: W, prefix: &str, entries: &[Entry], mtime: u64) -> Result<W> {
    let mut builder = tar::Builder::new(writer);

    let mut dir_header = tar::Header::new_gnu();
    dir_header.set_entry_type(tar::EntryType::Directory);
    dir_header.set_size(0);
    dir_header.set_mode(0o755);
    dir_header.set_mtime(mtime);
    builder
        .append_data(&mut dir_header, format!("{prefix}/"), io::empty())
        .map_err(archive_err)?;

    for entry in entries {
        match entry {
            Entry::Dir { path } => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_mtime(mtime);
                builder
                    .append_data(&mut header, format!("{prefix}/{path}/"), io::empty())
                    .map_err(archive_err)?;
            }
            Entry::File { path, mode, content } => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(content.len() as u64);
                header.set_mode(*mode);
                header.set_mtime(mtime);
                builder
                    .append_data(&mut header, format!("{prefix}/{path}"), content.as_slice())
                    .map_err(archive_err)?;
            }
            Entry::Symlink { path, target } => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                header.set_mtime(mtime);
                builder
                    .append_link(&mut header, format!("{prefix}/{path}"), target)
                    .map_err(archive_err)?;
            }
        }
    }

    builder.into_inner().map_err(archive_err)
}

fn write_zip(file: File, prefix: &str, entries: &[Entry], _mtime: u64) -> Result<()> {
    let mut writer = zip::ZipWriter::new(file);
    let dir_options = zip::write::FileOptions::default().unix_permissions(0o755);

    writer.add_directory(prefix, dir_options).map_err(archive_err)?;
    for entry in entries {
        match entry {
            Entry::Dir { path } => {
                writer
                    .add_directory(format!("{prefix}/{path}"), dir_options)
                    .map_err(archive_err)?;
            }
            Entry::File { path, mode, content } => {
                let options = zip::write::FileOptions::default().unix_permissions(*mode);
                writer
                    .start_file(format!("{prefix}/{path}"), options)
                    .map_err(archive_err)?;
                writer.write_all(content).map_err(archive_err)?;
            }
            Entry::Symlink { path, target } => {
                // zip has no first-class symlinks; store the target path
                let options = zip::write::FileOptions::default().unix_permissions(0o777);
                writer
                    .start_file(format!("{prefix}/{path}"), options)
                    .map_err(archive_err)?;
                writer.write_all(target.as_bytes()).map_err(archive_err)?;
            }
        }
    }
    writer.finish().map_err(archive_err)?;
    Ok(())
}

/// Stage a plain tar, then compress through the `bzip2` tool. When the tool
/// is unavailable or fails, the plain tar is left at the destination as a
/// fallback policy and a warning is logged.
fn write_tar_bz2(request: &ArchiveRequest, entries: &[Entry], mtime: u64) -> Result<()> {
    let staging = tempfile::NamedTempFile::new().map_err(archive_err)?;
    let staged = write_tar(
        staging.reopen().map_err(archive_err)?,
        &request.prefix,
        entries,
        mtime,
    )?;
    drop(staged);

    let out = File::create(&request.out_path).map_err(archive_err)?;
    let status = Command::new("bzip2")
        .arg("--stdout")
        .arg("--compress")
        .arg(staging.path())
        .stdout(Stdio::from(out))
        .status();

    let compressed = match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!(ref_name = %request.ref_name, %status, "bzip2 failed, falling back to plain tar");
            false
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(ref_name = %request.ref_name, "bzip2 not available, falling back to plain tar");
            false
        }
        Err(err) => return Err(archive_err(err)),
    };

    if !compressed {
        fs::copy(staging.path(), &request.out_path).map_err(archive_err)?;
    }
    Ok(())
}
