//! Command-line configuration for the `quill` binary.

use clap::{App, Arg};
use std::ffi::OsString;
use std::path::PathBuf;

/// Everything the binary needs to run a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The root of the source tree.
    pub source: PathBuf,

    /// The root of the output tree.
    pub dest: PathBuf,

    /// Whether to log at debug level.
    pub verbose: bool,
}

fn app<'a, 'b>() -> App<'a, 'b> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("SOURCE")
                .help("The source directory (posts/, templates/ and static files)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("DEST")
                .help("The directory to write the generated site into")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every copied tree and rendered post"),
        )
}

impl Config {
    /// Parses the process arguments. Exits with usage on stderr if they're
    /// invalid.
    pub fn from_env() -> Config {
        Config::from_matches(&app().get_matches())
    }

    /// Parses `args` (including the program name).
    pub fn from_args<I, T>(args: I) -> Result<Config, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Config::from_matches(&app().get_matches_from_safe(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Config {
        let path = |name: &str| matches.value_of_os(name).map(PathBuf::from).unwrap_or_default();
        Config {
            source: path("SOURCE"),
            dest: path("DEST"),
            verbose: matches.is_present("verbose"),
        }
    }

    /// The default `tracing` filter for this configuration.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            true => "quill=debug",
            false => "quill=info",
        }
    }
}
