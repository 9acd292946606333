//! The library code for the `quill` static site generator. Generating a site
//! happens in two passes over a source directory:
//!
//! 1. Copying the source tree into the output directory ([`crate::copy`]).
//!    Hidden files and the reserved `posts` and `templates` directories are
//!    left out.
//! 2. Rendering posts ([`crate::post`]). Every file directly under `posts/`
//!    is converted to HTML according to its [`format::Format`], run through
//!    `templates/default.html`, and written to
//!    `{dest}/{year}/{month}/{name}.html`, where the date is the source file's
//!    modification time.
//!
//! [`site::Site`] drives both passes and is the entry point.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod config;
pub mod copy;
pub mod format;
pub mod post;
pub mod site;

pub use crate::site::Site;
