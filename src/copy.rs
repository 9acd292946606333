//! Mirrors the source tree into the output directory. Every directory and
//! regular file is copied with its permission bits, except:
//!
//! * the reserved `posts` and `templates` directories (at any depth), which
//!   are handled separately by [`crate::site`], and
//! * anything with a hidden (`.`-prefixed) component in its path relative to
//!   the source root, such as `.git` or `.gitignore`.
//!
//! Directory permissions are applied once the walk is done, deepest first, so
//! a read-only source directory still gets its contents copied.
//!
//! A failure on one entry doesn't stop the walk. Failures are collected and
//! reported together as a single [`CopyError`] once the walk finishes.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names that are never copied.
pub const RESERVED_DIRS: &[&str] = &["posts", "templates"];

/// Returns `true` if `relative` names a reserved directory.
pub fn is_reserved_dir(relative: &Path, is_dir: bool) -> bool {
    is_dir
        && relative
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| RESERVED_DIRS.contains(&name))
}

/// Returns `true` if any component of `relative` starts with a `.`.
pub fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// The filter applied to every entry of the walk, given its path relative to
/// the source root. Skipped directories are not descended into.
pub fn should_skip(relative: &Path, is_dir: bool) -> bool {
    is_reserved_dir(relative, is_dir) || is_hidden(relative)
}

/// Counts of what [`copy_tree`] wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub directories: usize,
}

/// Copies `source` into `dest`, skipping entries per [`should_skip`].
///
/// `dest` is created if it doesn't exist. If `dest` sits inside `source`,
/// its subtree is left out of the walk.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<CopyStats, CopyError> {
    let mut stats = CopyStats::default();
    let mut failures = Vec::new();
    let mut dir_permissions: Vec<(PathBuf, fs::Permissions)> = Vec::new();

    if let Err(err) = fs::create_dir_all(dest) {
        failures.push(CopyFailure::new(dest, err));
        return Err(CopyError { failures });
    }
    // Only meaningful if `dest` is nested in `source`; both exist by now.
    let dest_canonical = dest.canonicalize().ok();

    let walker = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !skip_entry(source, entry) && !is_same_dir(entry, dest_canonical.as_deref())
        });

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(source).to_owned();
                warn!(path = %path.display(), error = %err, "walking source tree");
                failures.push(CopyFailure {
                    path,
                    err: io::Error::from(err),
                });
                continue;
            }
        };

        // strip_prefix shouldn't fail since the walk is rooted at `source`
        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dest.join(relative);

        let copied = if entry.file_type().is_dir() {
            copy_dir(entry.path(), &target).map(|permissions| {
                stats.directories += 1;
                dir_permissions.push((target.clone(), permissions));
            })
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target).map(|_| stats.files += 1)
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular file");
            Ok(())
        };

        if let Err(err) = copied {
            warn!(path = %entry.path().display(), error = %err, "copying entry");
            failures.push(CopyFailure {
                path: entry.path().to_owned(),
                err,
            });
        }
    }

    // The walk is pre-order, so reversing it puts children before parents.
    for (dir, permissions) in dir_permissions.into_iter().rev() {
        if let Err(err) = fs::set_permissions(&dir, permissions) {
            warn!(path = %dir.display(), error = %err, "setting directory permissions");
            failures.push(CopyFailure { path: dir, err });
        }
    }

    if failures.is_empty() {
        Ok(stats)
    } else {
        Err(CopyError { failures })
    }
}

fn skip_entry(source: &Path, entry: &DirEntry) -> bool {
    match entry.path().strip_prefix(source) {
        Ok(relative) => should_skip(relative, entry.file_type().is_dir()),
        Err(_) => false,
    }
}

fn is_same_dir(entry: &DirEntry, dir: Option<&Path>) -> bool {
    match dir {
        Some(dir) if entry.file_type().is_dir() => {
            entry.path().canonicalize().map_or(false, |p| p == dir)
        }
        _ => false,
    }
}

/// Creates `dest` and returns the permissions of `src` for it. An existing
/// directory is fine; if a previous run left it read-only it's made writable
/// again until the walk is done.
fn copy_dir(src: &Path, dest: &Path) -> io::Result<fs::Permissions> {
    let permissions = fs::metadata(src)?.permissions();
    match fs::create_dir(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dest.is_dir() => {
            let mut existing = fs::metadata(dest)?.permissions();
            if existing.readonly() {
                existing.set_readonly(false);
                fs::set_permissions(dest, existing)?;
            }
        }
        Err(e) => return Err(e),
    }
    Ok(permissions)
}

/// Copies the bytes of `src` into `dest`, truncating any existing file, and
/// gives `dest` the permissions of `src`. A read-only `dest` left by a
/// previous run is made writable first.
fn copy_file(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = fs::File::open(src)?;
    let permissions = reader.metadata()?.permissions();
    if let Ok(metadata) = fs::metadata(dest) {
        let mut existing = metadata.permissions();
        if metadata.is_file() && existing.readonly() {
            existing.set_readonly(false);
            fs::set_permissions(dest, existing)?;
        }
    }
    let mut writer = fs::File::create(dest)?;
    io::copy(&mut reader, &mut writer)?;
    writer.set_permissions(permissions)
}

/// A single entry that couldn't be copied.
#[derive(Debug)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub err: io::Error,
}

impl CopyFailure {
    fn new(path: &Path, err: io::Error) -> CopyFailure {
        CopyFailure {
            path: path.to_owned(),
            err,
        }
    }
}

/// Returned by [`copy_tree`] when at least one entry failed. The walk still
/// visits every entry that wasn't skipped before this is returned.
#[derive(Debug)]
pub struct CopyError {
    pub failures: Vec<CopyFailure>,
}

impl fmt::Display for CopyError {
    /// Displays a [`CopyError`] as a summary line followed by one line per
    /// failed path.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "error(s) copying source tree")?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.path.display(), failure.err)?;
        }
        Ok(())
    }
}

/// Every cause is already part of the [`fmt::Display`] text, so there's no
/// separate source.
impl std::error::Error for CopyError {}
