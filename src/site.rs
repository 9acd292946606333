//! Exports the [`Site`] type which stitches together the high-level steps of
//! generating the output site: copying the source tree into the output
//! directory ([`crate::copy`]), then discovering each post ([`crate::post`])
//! and rendering it through the site template into
//! `{dest}/{year}/{month}/{name}.html`.
//!
//! Generation is not transactional. If a post fails, whatever was written
//! before it stays on disk.

use crate::copy::{copy_tree, CopyError, CopyStats};
use crate::post::{Error as PostError, Post};
use gtmpl::Template;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Used when no source directory is given.
pub const DEFAULT_SOURCE: &str = ".";

/// Used when no output directory is given.
pub const DEFAULT_DEST: &str = "./_site";

/// The directory under the source root holding post files.
pub const POSTS_DIR: &str = "posts";

/// The directory under the source root holding the site template.
pub const TEMPLATES_DIR: &str = "templates";

/// The one template every post is rendered with, relative to
/// [`TEMPLATES_DIR`].
pub const DEFAULT_TEMPLATE: &str = "default.html";

/// A generated static site, written to `dest` from the files under `source`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    source: PathBuf,
    dest: PathBuf,
}

/// What a successful [`Site::generate`] produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerateStats {
    /// Files and directories mirrored from the source tree.
    pub copied: CopyStats,

    /// Posts rendered.
    pub posts: usize,
}

impl Site {
    /// Creates a site. An empty `source` means [`DEFAULT_SOURCE`] and an empty
    /// `dest` means [`DEFAULT_DEST`].
    pub fn new<S: AsRef<Path>, D: AsRef<Path>>(source: S, dest: D) -> Site {
        let or_default = |path: &Path, default: &str| {
            if path.as_os_str().is_empty() {
                PathBuf::from(default)
            } else {
                path.to_owned()
            }
        };
        Site {
            source: or_default(source.as_ref(), DEFAULT_SOURCE),
            dest: or_default(dest.as_ref(), DEFAULT_DEST),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Copies the source tree and then renders every post. Stops at the
    /// first error.
    pub fn generate(&self) -> Result<GenerateStats> {
        info!(
            source = %self.source.display(),
            dest = %self.dest.display(),
            "generating site"
        );

        let copied = copy_tree(&self.source, &self.dest)?;
        debug!(
            files = copied.files,
            directories = copied.directories,
            "copied source tree"
        );

        let posts = self.generate_posts()?;
        info!(
            posts,
            files = copied.files,
            directories = copied.directories,
            "site generated"
        );
        Ok(GenerateStats { copied, posts })
    }

    fn generate_posts(&self) -> Result<usize> {
        let posts_dir = self.source.join(POSTS_DIR);
        let templates_dir = self.source.join(TEMPLATES_DIR);
        for dir in &[&posts_dir, &templates_dir] {
            if !dir.is_dir() {
                return Err(Error::MissingDirectory(dir.to_path_buf()));
            }
        }

        let template = parse_template(&templates_dir.join(DEFAULT_TEMPLATE))?;

        let mut count = 0;
        let entries = fs::read_dir(&posts_dir).map_err(|err| Error::io(&posts_dir, err))?;
        for result in entries {
            let entry = result.map_err(|err| Error::io(&posts_dir, err))?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            self.generate_post(&entry.path(), &template)?;
            count += 1;
        }
        Ok(count)
    }

    fn generate_post(&self, source: &Path, template: &Template) -> Result<()> {
        let post = Post::from_source_file(source)?;
        let path = post.output_path(&self.dest);
        // `output_path` always has `{dest}/{year}/{month}` as its parent
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
        }

        let file = File::create(&path).map_err(|err| Error::io(&path, err))?;
        let mut w = BufWriter::new(file);
        post.generate(&mut w, template)?;
        w.flush().map_err(|err| Error::io(&path, err))?;

        debug!(
            source = %source.display(),
            dest = %path.display(),
            format = %post.format(),
            "rendered post"
        );
        Ok(())
    }
}

/// Loads and parses the template file at `path`.
fn parse_template(path: &Path) -> Result<Template> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut contents))
        .map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?;

    let mut template = Template::default();
    template
        .parse(contents)
        .map_err(|err| Error::TemplateParse {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
    Ok(template)
}

/// The result of a fallible site operation.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for generating a site.
#[derive(Debug)]
pub enum Error {
    /// Returned when one or more entries couldn't be copied from the source
    /// tree.
    Copy(CopyError),

    /// Returned when the `posts` or `templates` directory doesn't exist.
    MissingDirectory(PathBuf),

    /// Returned for I/O problems while opening the template file.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned when the template file isn't a valid template.
    TemplateParse { path: PathBuf, message: String },

    /// Returned when a post can't be read or rendered.
    Post(PostError),

    /// Returned for other I/O errors.
    Io { path: PathBuf, err: std::io::Error },
}

impl Error {
    fn io(path: &Path, err: std::io::Error) -> Error {
        Error::Io {
            path: path.to_owned(),
            err,
        }
    }
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Copy(err) => fmt::Display::fmt(err, f),
            Error::MissingDirectory(path) => {
                write!(f, "missing required directory '{}'", path.display())
            }
            Error::OpenTemplateFile { path, err: _ } => {
                write!(f, "opening template file '{}'", path.display())
            }
            Error::TemplateParse { path, message } => {
                write!(f, "parsing template file '{}': {}", path.display(), message)
            }
            Error::Post(err) => fmt::Display::fmt(err, f),
            Error::Io { path, err: _ } => write!(f, "accessing '{}'", path.display()),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            // `Copy` and `Post` display their inner error as-is, so the
            // chain continues below it.
            Error::Copy(err) => std::error::Error::source(err),
            Error::MissingDirectory(_) => None,
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::TemplateParse { .. } => None,
            Error::Post(err) => std::error::Error::source(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}

impl From<CopyError> for Error {
    /// Converts [`CopyError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: CopyError) -> Error {
        Error::Copy(err)
    }
}

impl From<PostError> for Error {
    /// Converts [`PostError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PostError) -> Error {
        Error::Post(err)
    }
}
