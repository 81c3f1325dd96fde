//! # amalgamate
//!
//! Flattens a C source tree into a single file by recursively inlining every
//! local (`#include "..."`) include, so a library can be shipped as one
//! header or one translation unit.
//!
//! ## Rules
//!
//! - A line starting with the include marker is a directive; its path is the
//!   second whitespace-separated token.
//! - A path token containing a double quote is local: the referenced file,
//!   resolved against the base directory, is expanded recursively and replaces
//!   the directive line, followed by a newline.
//! - Every other directive (`#include <stdio.h>`) is external and is dropped,
//!   unless `keep_external` is set.
//! - All other lines are copied verbatim.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use amalgamate::AmalgamConfig;
//! use std::path::{Path, PathBuf};
//!
//! let config = AmalgamConfig {
//!     base_dir: PathBuf::from("audit"),
//!     ..AmalgamConfig::default()
//! };
//!
//! match amalgamate::expand(Path::new("main.c"), &config) {
//!     Ok(text) => print!("{text}"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Amalgamate audit/main.c into audit.h
//! amalgamate main.c -b audit -o audit.h
//!
//! # List the includes of the entry file
//! amalgamate main.c -b audit --list=detailed
//! ```

pub mod amalgamate;
pub mod directive;
pub mod error;
pub mod fs_utils;

pub use crate::amalgamate::{AmalgamConfig, Amalgamation, amalgamate, expand, expand_source};
pub use crate::directive::{DEFAULT_MARKER, IncludeKind, IncludeReference, find_directives};
pub use crate::error::{AmalgamError, Result};
