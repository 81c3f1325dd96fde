use crate::error::{AmalgamError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a whole source file as text
///
/// The handle is closed before returning, on success and on failure.
///
/// # Errors
///
/// `AmalgamError::Read` if the path is missing, is not a regular file, or
/// does not hold valid UTF-8.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(AmalgamError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a regular file"),
        });
    }

    fs::read_to_string(path).map_err(|source| AmalgamError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the path of a local include against the base directory
/// Ensures the path doesn't escape the base directory
///
/// The target does not have to exist, only its parent directory does.
///
/// # Errors
///
/// - `AmalgamError::PathTraversal` if the resolved path escapes the base directory.
/// - `AmalgamError::Io` if the parent directory cannot be canonicalized.
pub fn resolve_include_path(include: &str, base_dir: &Path) -> Result<PathBuf> {
    // Leading separators still mean "from the base directory"
    let cleaned = include.trim_start_matches(['/', '\\']);
    let full_path = base_dir.join(cleaned);

    let canonical = full_path.canonicalize().or_else(|_| {
        full_path.parent().map_or_else(
            || {
                Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Invalid path",
                ))
            },
            |parent| {
                parent
                    .canonicalize()
                    .map(|p| p.join(full_path.file_name().unwrap_or_default()))
            },
        )
    })?;

    let base_canonical = base_dir.canonicalize()?;
    if !canonical.starts_with(&base_canonical) {
        return Err(AmalgamError::PathTraversal { path: canonical });
    }

    Ok(canonical)
}
