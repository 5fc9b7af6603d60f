//! Local repository adapter.
//!
//! Wraps `git2::Repository` for direct on-disk access. Every git2 failure
//! is normalized at this boundary; the only not-found condition that maps
//! to `NoRepository` is the repository itself being absent or unreadable.

mod diff;
mod refs;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use git2::Sort;

use crate::archive::{self, ArchiveFormat, ArchiveRequest};
use crate::backend::RepositoryBackend;
use crate::commit::{Commit, Delta};
use crate::error::{Error, Result};
use crate::history::{self, HistorySource, LogOptions, SortOrder};
use crate::types::{Branch, CommitId, Submodule, Tag};

/// Direct on-disk repository access for a resolved storage path.
pub struct LocalRepository {
    repo: git2::Repository,
    path: PathBuf,
}

impl std::fmt::Debug for LocalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRepository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LocalRepository {
    /// Open an existing repository. An absent or unreadable path is
    /// `NoRepository`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let repo = git2::Repository::open(&path)
            .map_err(|_| Error::NoRepository(path.display().to_string()))?;
        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistorySource for LocalRepository {
    fn resolve_ref(&self, refname: &str) -> Result<Option<CommitId>> {
        let resolved = self
            .repo
            .revparse_single(refname)
            .and_then(|obj| obj.peel(git2::ObjectType::Commit));
        match resolved {
            Ok(obj) => Ok(obj.as_commit().map(|commit| CommitId::new(commit.id()))),
            Err(_) => Ok(None),
        }
    }

    fn walk_from<'a>(
        &'a self,
        start: CommitId,
        order: SortOrder,
    ) -> Result<Box<dyn Iterator<Item = Result<Commit>> + 'a>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(match order {
            SortOrder::Default => Sort::NONE,
            SortOrder::Topo => Sort::TOPOLOGICAL,
            SortOrder::Date => Sort::TIME | Sort::TOPOLOGICAL,
        })?;
        revwalk.push(start.raw())?;

        let repo = &self.repo;
        Ok(Box::new(revwalk.map(move |oid| {
            let commit = repo.find_commit(oid?)?;
            Ok(Commit::from_git2(&commit))
        })))
    }

    fn deltas(&self, commit: &Commit, detect_renames: bool) -> Result<Vec<Delta>> {
        diff::commit_deltas(&self.repo, commit.id, detect_renames)
    }
}

impl RepositoryBackend for LocalRepository {
    fn root_ref(&self) -> Result<Option<String>> {
        refs::discover_default_branch(&self.repo)
    }

    fn branch_names(&self) -> Result<Vec<String>> {
        refs::branch_names(&self.repo)
    }

    fn tag_names(&self) -> Result<Vec<String>> {
        refs::tag_names(&self.repo)
    }

    fn ref_names(&self) -> Result<Vec<String>> {
        let mut names = refs::branch_names(&self.repo)?;
        names.extend(refs::tag_names(&self.repo)?);
        Ok(names)
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        refs::branches(&self.repo)
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        refs::tags(&self.repo)
    }

    fn log(&self, options: &LogOptions) -> Result<Vec<Commit>> {
        history::log(self, options)
    }

    fn count_commits(&self, options: &LogOptions) -> Result<usize> {
        options.validate()?;
        if !options.is_plain_walk() {
            return history::count_commits(self, options);
        }

        // native count: walk ids without materializing commits
        let Some(start) = self.resolve_ref(&options.ref_name)? else {
            return Ok(0);
        };
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(start.raw())?;
        let mut total = 0usize;
        for oid in revwalk {
            oid?;
            total += 1;
        }
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
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(start.raw())?;
        let mut total = 0usize;
        for oid in revwalk {
            oid?;
            total += 1;
        }
        Ok(total)
    }

    fn size_kb(&self) -> Result<u64> {
        dir_size_kb(&self.path)
    }

    fn has_commits(&self) -> Result<bool> {
        Ok(!self.is_empty()?)
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.repo.is_empty()?)
    }

    fn is_bare(&self) -> Result<bool> {
        Ok(self.repo.is_bare())
    }

    fn submodules(&self, refname: &str) -> Result<BTreeMap<String, Submodule>> {
        let Some(commit_id) = self.resolve_ref(refname)? else {
            return Ok(BTreeMap::new());
        };
        let commit = self.repo.find_commit(commit_id.raw())?;
        let tree = commit.tree()?;

        let Some(entry) = tree.get_name(".gitmodules") else {
            return Ok(BTreeMap::new());
        };
        let blob = self.repo.find_blob(entry.id())?;
        let content = String::from_utf8_lossy(blob.content()).into_owned();

        let mut out = BTreeMap::new();
        for (path, url) in parse_gitmodules(&content) {
            let Ok(entry) = tree.get_path(Path::new(&path)) else { continue };
            if entry.filemode() != 0o160000 {
                continue;
            }
            out.insert(
                path.clone(),
                Submodule {
                    path,
                    url,
                    id: CommitId::new(entry.id()),
                },
            );
        }
        Ok(out)
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
        let request = ArchiveRequest {
            ref_name: refname.to_string(),
            prefix: archive::archive_prefix(repo_name, refname, &commit_id.short()),
            commit_id,
            format,
            out_path: out_path.to_path_buf(),
        };
        archive::write_local_archive(&self.repo, &request)
    }
}

/// Recursive on-disk size, rounded up to whole kilobytes.
fn dir_size_kb(root: &Path) -> Result<u64> {
    let io_err = |err: std::io::Error| Error::Command(err.to_string());

    let mut bytes = 0u64;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let meta = entry.metadata().map_err(io_err)?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                bytes += meta.len();
            }
        }
    }
    Ok(bytes.div_ceil(1024))
}

/// Minimal `.gitmodules` reader: sections introduce entries, `path` and
/// `url` keys fill them. Entries missing either key are dropped.
fn parse_gitmodules(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut path: Option<String> = None;
    let mut url: Option<String> = None;
    let mut in_section = false;

    let mut flush = |path: &mut Option<String>, url: &mut Option<String>| {
        if let (Some(p), Some(u)) = (path.take(), url.take()) {
            out.push((p, u));
        }
    };

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("[submodule") {
            flush(&mut path, &mut url);
            in_section = true;
        } else if line.starts_with('[') {
            flush(&mut path, &mut url);
            in_section = false;
        } else if in_section {
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "path" => path = Some(value.trim().to_string()),
                    "url" => url = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }
    }
    flush(&mut path, &mut url);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestRepo;

    #[test]
    fn test_open_missing_path_is_no_repository() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalRepository::open(dir.path().join("missing.git")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_structural_queries() {
        let fixture = TestRepo::init();
        let local = LocalRepository::open(fixture.path()).unwrap();

        assert!(local.is_empty().unwrap());
        assert!(!local.has_commits().unwrap());
        assert!(!local.is_bare().unwrap());

        fixture.commit_file("add readme", "README.md", "hello", 1_000);
        assert!(!local.is_empty().unwrap());
        assert!(local.has_commits().unwrap());
        assert!(local.size_kb().unwrap() > 0);
    }

    #[test]
    fn test_resolve_unknown_ref_is_none() {
        let fixture = TestRepo::init();
        fixture.commit_file("add readme", "README.md", "hello", 1_000);
        let local = LocalRepository::open(fixture.path()).unwrap();

        assert!(local.resolve_ref("unknown").unwrap().is_none());
        assert!(local.resolve_ref("master").unwrap().is_some());
    }

    #[test]
    fn test_commit_count() {
        let fixture = TestRepo::init();
        fixture.commit_file("one", "a.txt", "1", 1_000);
        fixture.commit_file("two", "b.txt", "2", 2_000);
        fixture.commit_file("three", "c.txt", "3", 3_000);
        let local = LocalRepository::open(fixture.path()).unwrap();

        assert_eq!(local.commit_count("master").unwrap(), 3);
        assert_eq!(local.commit_count("unknown").unwrap(), 0);
    }

    #[test]
    fn test_count_commits_native_matches_pipeline() {
        let fixture = TestRepo::init();
        fixture.commit_file("one", "a.txt", "1", 1_000);
        fixture.commit_file("two", "b.txt", "2", 2_000);
        fixture.commit_file("three", "c.txt", "3", 3_000);
        let local = LocalRepository::open(fixture.path()).unwrap();

        let plain = LogOptions::new("master");
        assert_eq!(local.count_commits(&plain).unwrap(), 3);

        let offset = LogOptions::new("master").offset(1);
        assert_eq!(local.count_commits(&offset).unwrap(), 2);

        let capped = LogOptions::new("master").offset(1).limit(1);
        assert_eq!(local.count_commits(&capped).unwrap(), 1);

        let filtered = LogOptions::new("master").path("b.txt");
        assert_eq!(local.count_commits(&filtered).unwrap(), 1);

        let unknown = LogOptions::new("unknown");
        assert_eq!(local.count_commits(&unknown).unwrap(), 0);
    }

    #[test]
    fn test_submodules_at_ref() {
        let fixture = TestRepo::init();
        let gitmodules = "[submodule \"vendored\"]\n\tpath = vendor/lib\n\turl = https://example.com/lib.git\n";
        let sub_id = "b83d6e391c22777fca1ed3012fce84f633d7fed0";
        fixture.commit_with_submodule("add submodule", gitmodules, "vendor/lib", sub_id, 1_000);

        let local = LocalRepository::open(fixture.path()).unwrap();
        let submodules = local.submodules("master").unwrap();

        assert_eq!(submodules.len(), 1);
        let sub = &submodules["vendor/lib"];
        assert_eq!(sub.path, "vendor/lib");
        assert_eq!(sub.url, "https://example.com/lib.git");
        assert_eq!(sub.id.to_string(), sub_id);

        assert!(local.submodules("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_parse_gitmodules() {
        let content = r#"
[submodule "one"]
    path = deps/one
    url = git@example.com:one.git
[submodule "broken"]
    path = deps/broken
[submodule "two"]
    url = git@example.com:two.git
    path = deps/two
"#;
        let parsed = parse_gitmodules(content);
        assert_eq!(
            parsed,
            vec![
                ("deps/one".to_string(), "git@example.com:one.git".to_string()),
                ("deps/two".to_string(), "git@example.com:two.git".to_string()),
            ]
        );
    }
}
