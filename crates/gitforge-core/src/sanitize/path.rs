//! Path-traversal sanitizer.

use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Resolve `base` to an absolute path without requiring it to exist, using a
/// filesystem `canonicalize` when possible and falling back to lexical
/// normalization relative to the current directory otherwise.
fn resolve_non_strict(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    std::fs::canonicalize(&absolute).unwrap_or_else(|_| normalize_lexical(&absolute))
}

fn normalize_lexical(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Validate `path` against `base`, rejecting traversal attempts and
/// symlink-based escapes. Returns the resolved, contained path.
///
/// Suspicious lexical patterns are rejected before any filesystem access,
/// then every existing parent directory is checked for being a symlink,
/// then the target is resolved (following symlinks) and must remain within
/// `base`.
pub fn sanitize_path(path: &Path, base: &Path) -> Result<PathBuf, AppError> {
    let base_resolved = resolve_non_strict(base);

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_resolved.join(path)
    };

    let path_str = absolute_path.to_string_lossy();

    if path_str.contains("../") {
        return Err(AppError::InvalidArgument(
            "Path traversal attempt detected".to_string(),
        ));
    }
    if path_str.contains("/./") {
        return Err(AppError::InvalidArgument(
            "Suspicious path pattern detected".to_string(),
        ));
    }
    if path_str.contains("//") && !path_str.starts_with("//") {
        return Err(AppError::InvalidArgument(
            "Suspicious path pattern detected".to_string(),
        ));
    }

    // Symlink check: walk every existing parent directory in the chain.
    let mut current = absolute_path.parent();
    while let Some(parent) = current {
        if parent == Path::new("/") || parent.as_os_str().is_empty() {
            break;
        }
        if let Ok(metadata) = std::fs::symlink_metadata(parent) {
            if metadata.file_type().is_symlink() {
                return Err(AppError::InvalidArgument(format!(
                    "Symlink detected in path: {}",
                    parent.display()
                )));
            }
        }
        current = parent.parent();
    }

    let target = match std::fs::canonicalize(&absolute_path) {
        Ok(resolved) => resolved,
        Err(_) => {
            let parent_resolved = absolute_path
                .parent()
                .map(resolve_non_strict)
                .unwrap_or_else(|| base_resolved.clone());
            match absolute_path.file_name() {
                Some(name) => parent_resolved.join(name),
                None => parent_resolved,
            }
        }
    };

    if !target.starts_with(&base_resolved) {
        return Err(AppError::InvalidArgument(format!(
            "Path traversal attempt detected: {} is outside {}",
            absolute_path.display(),
            base_resolved.display()
        )));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accepts_path_within_base() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let resolved = sanitize_path(&file, dir.path()).unwrap();
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn seed_scenario_4_path_traversal() {
        let err = sanitize_path(Path::new("/tmp/safe/../etc/passwd"), Path::new("/tmp/safe"))
            .unwrap_err();
        assert!(err.to_string().contains("Path traversal attempt detected"));
    }

    #[test]
    fn rejects_double_slash_pattern() {
        let err = sanitize_path(Path::new("/tmp/safe//etc"), Path::new("/tmp/safe")).unwrap_err();
        assert!(err.to_string().contains("Suspicious path pattern detected"));
    }

    #[test]
    fn rejects_current_dir_reference() {
        let err =
            sanitize_path(Path::new("/tmp/safe/./etc/passwd"), Path::new("/tmp/safe")).unwrap_err();
        assert!(err.to_string().contains("Suspicious path pattern detected"));
    }

    #[test]
    fn rejects_symlink_in_parent_chain() {
        let dir = tempdir().unwrap();
        let real_dir = dir.path().join("real");
        std::fs::create_dir(&real_dir).unwrap();
        let link = dir.path().join("link");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&real_dir, &link).unwrap();
        #[cfg(unix)]
        {
            let target = link.join("file.txt");
            let err = sanitize_path(&target, dir.path()).unwrap_err();
            assert!(err.to_string().contains("Symlink detected"));
        }
    }
}
