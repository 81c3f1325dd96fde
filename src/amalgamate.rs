use crate::directive::{DEFAULT_MARKER, parse_directive};
use crate::error::{AmalgamError, Result};
use crate::fs_utils::{read_source, resolve_include_path};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration for amalgamation
#[derive(Debug, Clone)]
pub struct AmalgamConfig {
    /// Directory every local include (and the entry file) is resolved against
    pub base_dir: PathBuf,
    /// Token that opens an include directive line
    pub marker: String,
    /// Copy external include lines to the output instead of dropping them
    pub keep_external: bool,
    /// Fail on include cycles instead of recursing until the stack runs out
    pub detect_cycles: bool,
}

impl Default for AmalgamConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            marker: DEFAULT_MARKER.to_string(),
            keep_external: false,
            detect_cycles: true,
        }
    }
}

/// Result of a full expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Amalgamation {
    /// The flattened source
    pub text: String,
    /// Every inlined file in inclusion order, repeated if included more than once
    pub inlined: Vec<PathBuf>,
    /// External directive lines met along the way
    pub dropped: Vec<String>,
}

/// Expands `entry` (relative to `config.base_dir`) and reports what was
/// inlined and dropped
///
/// # Errors
///
/// - `AmalgamError::Read` if the entry file cannot be read.
/// - `AmalgamError::UnreadableReference` if an inlined file exists but cannot be read.
/// - `AmalgamError::MalformedDirective` for a directive without a path.
/// - `AmalgamError::ReferenceNotFound` for a local include with no target.
/// - `AmalgamError::IncludeCycle` when cycle detection is on and a file includes itself.
/// - `AmalgamError::PathTraversal` for a local include outside the base directory.
pub fn amalgamate(entry: &Path, config: &AmalgamConfig) -> Result<Amalgamation> {
    let mut expander = Expander::new(config);
    let text = expander.expand_file(&config.base_dir.join(entry))?;

    Ok(Amalgamation {
        text,
        inlined: expander.inlined,
        dropped: expander.dropped,
    })
}

/// Expands `entry` and returns only the flattened text
///
/// # Errors
///
/// Same as [`amalgamate`].
pub fn expand(entry: &Path, config: &AmalgamConfig) -> Result<String> {
    amalgamate(entry, config).map(|amalgamation| amalgamation.text)
}

/// Expands in-memory source text. `origin` only names the text in errors.
///
/// # Errors
///
/// Same as [`amalgamate`], except that `origin` itself is never read.
pub fn expand_source(text: &str, origin: &Path, config: &AmalgamConfig) -> Result<String> {
    Expander::new(config).expand_text(text, origin)
}

/// State of one expansion, owned by a single call
struct Expander<'a> {
    config: &'a AmalgamConfig,
    base_canonical: PathBuf,
    /// Canonical paths of the files currently being expanded
    stack: Vec<PathBuf>,
    inlined: Vec<PathBuf>,
    dropped: Vec<String>,
}

impl<'a> Expander<'a> {
    fn new(config: &'a AmalgamConfig) -> Self {
        Self {
            config,
            base_canonical: config
                .base_dir
                .canonicalize()
                .unwrap_or_else(|_| config.base_dir.clone()),
            stack: Vec::new(),
            inlined: Vec::new(),
            dropped: Vec::new(),
        }
    }

    fn expand_file(&mut self, path: &Path) -> Result<String> {
        let text = read_source(path)?;

        if self.config.detect_cycles {
            let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            if self.stack.contains(&key) {
                let chain = self
                    .stack
                    .iter()
                    .chain(std::iter::once(&key))
                    .map(|p| self.relative(p))
                    .collect();
                return Err(AmalgamError::IncludeCycle { chain });
            }
            self.stack.push(key);
            let result = self.expand_text(&text, path);
            self.stack.pop();
            result
        } else {
            self.expand_text(&text, path)
        }
    }

    fn expand_text(&mut self, text: &str, file: &Path) -> Result<String> {
        let file = self.relative(file);
        let mut output = String::with_capacity(text.len());

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let line_number = index + 1;
            let Some(directive) = parse_directive(line, line_number, &self.config.marker, &file)?
            else {
                output.push_str(line);
                continue;
            };

            let Some(include) = directive.local_path() else {
                trace!(file = %file.display(), line = line_number, "dropping {}", directive.raw);
                if self.config.keep_external {
                    output.push_str(line);
                }
                self.dropped.push(directive.raw);
                continue;
            };

            let target = self.resolve(&include, &file, line_number)?;
            debug!(file = %file.display(), line = line_number, "inlining {include}");
            let shown = self.relative(&target);
            self.inlined.push(shown.clone());

            let expanded = match self.expand_file(&target) {
                Err(AmalgamError::Read { source, .. }) => {
                    return Err(AmalgamError::UnreadableReference {
                        path: shown,
                        file,
                        line: line_number,
                        source,
                    });
                }
                result => result?,
            };
            output.push_str(&expanded);
            output.push('\n');
        }

        Ok(output)
    }

    fn resolve(&self, include: &str, file: &Path, line: usize) -> Result<PathBuf> {
        match resolve_include_path(include, &self.config.base_dir) {
            Ok(path) if path.is_file() => Ok(path),
            Ok(_) | Err(AmalgamError::Io(_)) => Err(AmalgamError::ReferenceNotFound {
                path: PathBuf::from(include),
                file: file.to_path_buf(),
                line,
            }),
            Err(e) => Err(e),
        }
    }

    /// Path for reports, relative to the base directory when possible
    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.base_canonical)
            .or_else(|_| path.strip_prefix(&self.config.base_dir))
            .unwrap_or(path)
            .to_path_buf()
    }
}
