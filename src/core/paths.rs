//! Path resolution for the input and output documents
//!
//! Positional paths are interpreted relative to ROOT unless absolute.
//! Displayed paths use '/' as separator and are relative to root when possible.

use std::path::{Path, PathBuf};

use crate::core::error::JumpError;

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Path as shown in reports: relative to root when under it, otherwise as given
pub fn display_path(path: &Path, root: &Path) -> String {
    make_relative(path, root).unwrap_or_else(|| normalize_path(path))
}

/// Resolve a user-supplied path against root
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Default output path: `<stem><suffix>.<ext>` next to the input
///
/// `docs/API.md` with suffix `_new` becomes `docs/API_new.md`.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    input.with_file_name(file_name)
}

/// Refuse to write the rewritten document over its own input
pub fn ensure_distinct(input: &Path, output: &Path) -> Result<(), JumpError> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        // Output does not exist yet: compare as given
        _ => input == output,
    };

    if same {
        Err(JumpError::OutputIsInput(output.to_path_buf()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("docs/API.md");
        assert_eq!(normalize_path(path), "docs/API.md");
    }

    #[test]
    fn test_make_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/docs/API.md");
        assert_eq!(make_relative(path, root), Some("docs/API.md".to_string()));
    }

    #[test]
    fn test_make_relative_not_under_root() {
        let root = Path::new("/project");
        let path = Path::new("/other/file.md");
        assert_eq!(make_relative(path, root), None);
        assert_eq!(display_path(path, root), "/other/file.md");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let root = Path::new("/project");
        assert_eq!(
            resolve(root, Path::new("docs/a.md")),
            PathBuf::from("/project/docs/a.md")
        );
        assert_eq!(
            resolve(root, Path::new("/tmp/a.md")),
            PathBuf::from("/tmp/a.md")
        );
    }

    #[test]
    fn test_default_output_path() {
        let out = default_output_path(Path::new("docs/API文档.md"), "_新");
        assert_eq!(out, PathBuf::from("docs/API文档_新.md"));

        let out = default_output_path(Path::new("README"), "_new");
        assert_eq!(out, PathBuf::from("README_new"));
    }

    #[test]
    fn test_ensure_distinct_same_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("doc.md");
        std::fs::write(&file, "# doc").unwrap();

        let err = ensure_distinct(&file, &temp.path().join("./doc.md")).unwrap_err();
        assert_eq!(err.code(), "OUTPUT_IS_INPUT");
    }

    #[test]
    fn test_ensure_distinct_new_output() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("doc.md");
        std::fs::write(&file, "# doc").unwrap();

        assert!(ensure_distinct(&file, &temp.path().join("doc_new.md")).is_ok());
    }
}
