//! Defines the [`Post`] and [`Error`] types. A [`Post`] is discovered from a
//! single source file, remembers its raw content and [`Format`], and renders
//! itself through a [`Template`] (see [`Post::generate`]).
//!
//! The publish date of a post is the last-modification time of its source
//! file. Nothing in the content is inspected to find a date.
//!
//! Templates render strings, so post content has to become text. HTML posts
//! must be valid UTF-8 ([`Error::InvalidUtf8`] otherwise) and reach the
//! template byte for byte. Markdown is decoded lossily: invalid sequences
//! turn into U+FFFD before conversion.

use crate::format::Format;
use chrono::{DateTime, Local};
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The extension given to every rendered post.
pub const OUTPUT_EXTENSION: &str = "html";

/// One post, read from disk and ready to be rendered.
#[derive(Clone, Debug)]
pub struct Post {
    /// The raw bytes of the source file.
    content: Vec<u8>,

    /// The markup of `content`, resolved from the source file's extension.
    format: Format,

    /// The source file's modification time.
    pubdate: DateTime<Local>,

    /// The source file's base name with its final extension replaced by
    /// `.html` (e.g., `foo.bar.md` becomes `foo.bar.html`).
    dest_file_name: String,
}

impl Post {
    /// Reads the post at `path`. Fails if the file can't be stat'ed or read,
    /// if its name has no extension, or if the extension doesn't map onto a
    /// [`Format`].
    pub fn from_source_file(path: &Path) -> Result<Post> {
        let metadata = fs::metadata(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        let content = fs::read(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;
        let (stem, extension) = split_extension(file_name)
            .ok_or_else(|| Error::MissingExtension {
                path: path.to_owned(),
            })?;
        let format = Format::from_extension(extension).ok_or_else(|| Error::UnknownFormat {
            path: path.to_owned(),
            extension: extension.to_owned(),
        })?;
        if format == Format::Html && std::str::from_utf8(&content).is_err() {
            return Err(Error::InvalidUtf8 {
                path: path.to_owned(),
            });
        }

        let modified = metadata.modified().map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;

        Ok(Post {
            content,
            format,
            pubdate: DateTime::<Local>::from(modified),
            dest_file_name: format!("{}.{}", stem, OUTPUT_EXTENSION),
        })
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn pubdate(&self) -> &DateTime<Local> {
        &self.pubdate
    }

    pub fn dest_file_name(&self) -> &str {
        &self.dest_file_name
    }

    /// Returns the four-digit year and the zero-padded two-digit month of the
    /// publish date, in the date's own time zone.
    pub fn date_parts(&self) -> (String, String) {
        (
            self.pubdate.format("%Y").to_string(),
            self.pubdate.format("%m").to_string(),
        )
    }

    /// Returns the path the rendered post is written to:
    /// `{dest}/{year}/{month}/{dest_file_name}`.
    pub fn output_path(&self, dest: &Path) -> PathBuf {
        let (year, month) = self.date_parts();
        dest.join(year).join(month).join(&self.dest_file_name)
    }

    /// Converts the post's content to HTML and executes `template` against
    /// it, writing the result into `w`. The template sees a single field,
    /// `Content`, which it references as `{{.Content}}`.
    pub fn generate<W: Write>(&self, w: &mut W, template: &Template) -> Result<()> {
        let converted = self.format.convert(&self.content);
        let context = Context::from(render_context(&converted));
        template
            .execute(w, &context)
            .map_err(|err| Error::Render(err.to_string()))
    }
}

/// Builds the template value for a post: an object with a `Content` string.
fn render_context(converted: &[u8]) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert(
        "Content".to_owned(),
        Value::String(String::from_utf8_lossy(converted).into_owned()),
    );
    Value::Object(m)
}

/// Splits `file_name` at its last `.` into the stem and the extension.
fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    file_name
        .rfind('.')
        .map(|idx| (&file_name[..idx], &file_name[idx + 1..]))
}

/// The result of a fallible post operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error discovering or rendering a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the source file can't be stat'ed or read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the source file's extension isn't a known [`Format`].
    UnknownFormat { path: PathBuf, extension: String },

    /// Returned when the source file's name has no `.` in it.
    MissingExtension { path: PathBuf },

    /// Returned when an HTML post isn't valid UTF-8.
    InvalidUtf8 { path: PathBuf },

    /// Returned when the source file's name isn't valid UTF-8.
    InvalidFileName(PathBuf),

    /// Returned when executing the template fails.
    Render(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err: _ } => write!(f, "reading post '{}'", path.display()),
            Error::UnknownFormat { path, extension } => write!(
                f,
                "unknown format '{}' for post '{}'",
                extension,
                path.display()
            ),
            Error::MissingExtension { path } => {
                write!(f, "post '{}' has no file extension", path.display())
            }
            Error::InvalidUtf8 { path } => {
                write!(f, "HTML post '{}' is not valid UTF-8", path.display())
            }
            Error::InvalidFileName(path) => write!(f, "invalid file name: {:?}", path),
            Error::Render(err) => write!(f, "rendering post: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn write_post(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn set_mtime(path: &Path, date: DateTime<Local>) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::from(date))
            .unwrap();
    }

    fn parse(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    #[test]
    fn test_resolves_formats() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        for (name, format) in &[
            ("a.txt", Format::Markdown),
            ("b.md", Format::Markdown),
            ("c.html", Format::Html),
        ] {
            let post = Post::from_source_file(&write_post(tmp.path(), name, "x"))?;
            assert_eq!(*format, post.format());
        }
        Ok(())
    }

    #[test]
    fn test_unknown_format() {
        let tmp = TempDir::new().unwrap();
        let path = write_post(tmp.path(), "note.xyz", "hello");
        match Post::from_source_file(&path) {
            Err(Error::UnknownFormat { extension, .. }) => assert_eq!("xyz", extension),
            other => panic!("expected UnknownFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_extension() {
        let tmp = TempDir::new().unwrap();
        let path = write_post(tmp.path(), "README", "hello");
        assert!(matches!(
            Post::from_source_file(&path),
            Err(Error::MissingExtension { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.md");
        match Post::from_source_file(&path) {
            Err(Error::Io { path: p, .. }) => assert_eq!(path, p),
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_html_must_be_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("raw.html");
        fs::write(&path, b"<p>\xff\xfe</p>").unwrap();
        assert!(matches!(
            Post::from_source_file(&path),
            Err(Error::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_markdown_is_decoded_lossily() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.md");
        fs::write(&path, b"caf\xe9").unwrap();
        let post = Post::from_source_file(&path)?;
        let mut out = Vec::new();
        post.generate(&mut out, &parse("{{.Content}}"))?;
        assert_eq!("<p>caf\u{fffd}</p>\n", String::from_utf8(out).unwrap());
        Ok(())
    }

    #[test]
    fn test_io_error_names_cause_once() {
        use std::error::Error as _;

        let tmp = TempDir::new().unwrap();
        // Reading a directory fails after stat succeeds.
        let path = tmp.path().join("dir.md");
        fs::create_dir(&path).unwrap();
        let err = Post::from_source_file(&path).unwrap_err();
        let cause = err.source().expect("io error as source").to_string();
        assert!(!err.to_string().contains(&cause), "{} / {}", err, cause);
        assert!(err.to_string().contains("dir.md"));
    }

    #[test]
    fn test_dest_file_name_replaces_last_extension() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let post = Post::from_source_file(&write_post(tmp.path(), "foo.bar.md", ""))?;
        assert_eq!("foo.bar.html", post.dest_file_name());

        let post = Post::from_source_file(&write_post(tmp.path(), "page.html", ""))?;
        assert_eq!("page.html", post.dest_file_name());
        Ok(())
    }

    #[test]
    fn test_content_is_raw_bytes() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let post = Post::from_source_file(&write_post(tmp.path(), "a.md", "# Hi\n"))?;
        assert_eq!(b"# Hi\n", post.content());
        Ok(())
    }

    #[test]
    fn test_date_parts_and_output_path() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let path = write_post(tmp.path(), "hello.md", "# Hi");
        set_mtime(&path, Local.with_ymd_and_hms(2023, 7, 4, 12, 0, 0).unwrap());

        let post = Post::from_source_file(&path)?;
        assert_eq!(("2023".to_owned(), "07".to_owned()), post.date_parts());
        assert_eq!(
            Path::new("/out/2023/07/hello.html"),
            post.output_path(Path::new("/out"))
        );
        Ok(())
    }

    #[test]
    fn test_generate_markdown() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let post = Post::from_source_file(&write_post(tmp.path(), "hello.md", "# Hi"))?;
        let mut out = Vec::new();
        post.generate(&mut out, &parse("<body>{{.Content}}</body>"))?;
        assert_eq!(
            "<body><h1>Hi</h1>\n</body>",
            String::from_utf8(out).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_generate_html_passthrough() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let post = Post::from_source_file(&write_post(tmp.path(), "raw.html", "<p>*x*</p>"))?;
        let mut out = Vec::new();
        post.generate(&mut out, &parse("[{{.Content}}]"))?;
        assert_eq!("[<p>*x*</p>]", String::from_utf8(out).unwrap());
        Ok(())
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_generate_render_error() {
        let tmp = TempDir::new().unwrap();
        let post = Post::from_source_file(&write_post(tmp.path(), "a.md", "x")).unwrap();
        assert!(matches!(
            post.generate(&mut BrokenSink, &parse("{{.Content}}")),
            Err(Error::Render(_))
        ));
    }
}
