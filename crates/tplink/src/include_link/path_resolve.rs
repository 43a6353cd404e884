//
// include_link/path_resolve.rs
//
// Resolution of include paths against the including document
//
// Include paths are resolved relative to the directory of the document that
// contains the directive. A leading '/' makes the path workspace-root-relative.
// Nothing is cached: the filesystem is consulted on every call, so a target
// created or deleted between scans is picked up by the next scan.
//

use std::path::{Component, Path, PathBuf};
use url::Url;

/// Context for resolving include paths of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathContext {
    /// Backing file of the document, `None` for unsaved/non-file documents
    pub document_path: Option<PathBuf>,
    /// Workspace root, used for '/'-prefixed include paths
    pub workspace_root: Option<PathBuf>,
}

impl PathContext {
    /// Create a context from a document URI. Non-file URIs yield a context
    /// without a backing location, against which nothing resolves.
    pub fn new(document_uri: &Url, workspace_root: Option<&Path>) -> Self {
        Self {
            document_path: document_uri.to_file_path().ok(),
            workspace_root: workspace_root.map(Path::to_path_buf),
        }
    }

    /// Directory the document lives in
    pub fn base_directory(&self) -> Option<&Path> {
        self.document_path.as_deref()?.parent()
    }
}

/// Handle to a resolved include target.
///
/// The handle only records where the target was found; `is_valid` re-checks
/// the filesystem because the file may be deleted or moved at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the target still exists as a regular file
    pub fn is_valid(&self) -> bool {
        self.path.is_file()
    }

    pub fn to_uri(&self) -> Option<Url> {
        Url::from_file_path(&self.path).ok()
    }

    /// Path shown to the user, `None` once the target is gone
    pub fn display_path(&self) -> Option<String> {
        self.is_valid().then(|| self.path.display().to_string())
    }
}

/// Resolve an include path to an existing file.
///
/// Returns `None` (not an error) when the document has no backing location,
/// the path is empty, an intermediate directory is missing, or the target
/// does not exist.
pub fn resolve_include(relative_path: &str, context: &PathContext) -> Option<FileHandle> {
    if relative_path.is_empty() {
        return None;
    }

    let joined = if let Some(stripped) = relative_path.strip_prefix('/') {
        let Some(root) = context.workspace_root.as_ref() else {
            log::trace!(
                "Cannot resolve workspace-relative include '{}': no workspace root",
                relative_path
            );
            return None;
        };
        root.join(stripped)
    } else {
        let Some(base) = context.base_directory() else {
            log::trace!(
                "Cannot resolve include '{}': document has no backing location",
                relative_path
            );
            return None;
        };
        base.join(relative_path)
    };

    // Checked as written: a missing directory before '..' fails here
    if !joined.is_file() {
        log::trace!(
            "Include '{}' does not resolve (tried '{}')",
            relative_path,
            joined.display()
        );
        return None;
    }

    let path = normalize_path(&joined)?;
    log::trace!("Resolved include '{}' to '{}'", relative_path, path.display());
    Some(FileHandle { path })
}

/// Normalize a path by resolving . and .. components lexically
fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop Normal segments; RootDir and Prefix stay
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }

    Some(components.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context_for(dir: &Path, document: &str) -> PathContext {
        PathContext {
            document_path: Some(dir.join(document)),
            workspace_root: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn test_resolve_sibling() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("foo.html"), "").unwrap();
        let ctx = context_for(temp.path(), "page.html");

        let handle = resolve_include("foo.html", &ctx).unwrap();
        assert_eq!(handle.path(), temp.path().join("foo.html"));
        assert!(handle.is_valid());
    }

    #[test]
    fn test_resolve_parent_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::write(temp.path().join("x.tpl"), "").unwrap();
        let ctx = context_for(temp.path(), "a/b/page.html");

        let handle = resolve_include("../../x.tpl", &ctx).unwrap();
        assert_eq!(handle.path(), temp.path().join("x.tpl"));
    }

    #[test]
    fn test_deleted_target_no_longer_resolves() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("x.tpl");
        fs::write(&target, "").unwrap();
        let ctx = context_for(temp.path(), "page.html");

        let handle = resolve_include("x.tpl", &ctx).unwrap();
        fs::remove_file(&target).unwrap();
        assert!(!handle.is_valid());
        assert!(handle.display_path().is_none());
        assert!(resolve_include("x.tpl", &ctx).is_none());
    }

    #[test]
    fn test_missing_intermediate_directory() {
        let temp = TempDir::new().unwrap();
        let ctx = context_for(temp.path(), "page.html");
        assert!(resolve_include("nope/foo.html", &ctx).is_none());
    }

    #[test]
    fn test_missing_directory_before_parent_step() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("foo.html"), "").unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        let ctx = context_for(temp.path(), "page.html");

        assert!(resolve_include("nope/../foo.html", &ctx).is_none());

        // An existing directory may be stepped out of; the stored path is normalized
        let handle = resolve_include("real/../foo.html", &ctx).unwrap();
        assert_eq!(handle.path(), temp.path().join("foo.html"));
    }

    #[test]
    fn test_directory_is_not_a_target() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("dir.html")).unwrap();
        let ctx = context_for(temp.path(), "page.html");
        assert!(resolve_include("dir.html", &ctx).is_none());
    }

    #[test]
    fn test_no_backing_location() {
        let ctx = PathContext::default();
        assert!(resolve_include("foo.html", &ctx).is_none());

        let untitled = Url::parse("untitled:Untitled-1").unwrap();
        let ctx = PathContext::new(&untitled, None);
        assert!(ctx.document_path.is_none());
        assert!(resolve_include("foo.html", &ctx).is_none());
    }

    #[test]
    fn test_empty_path() {
        let temp = TempDir::new().unwrap();
        let ctx = context_for(temp.path(), "page.html");
        assert!(resolve_include("", &ctx).is_none());
    }

    #[test]
    fn test_workspace_root_relative() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("shared")).unwrap();
        fs::create_dir_all(temp.path().join("pages/deep")).unwrap();
        fs::write(temp.path().join("shared/header.html"), "").unwrap();
        let ctx = context_for(temp.path(), "pages/deep/page.html");

        let handle = resolve_include("/shared/header.html", &ctx).unwrap();
        assert_eq!(handle.path(), temp.path().join("shared/header.html"));

        let no_root = PathContext {
            workspace_root: None,
            ..ctx
        };
        assert!(resolve_include("/shared/header.html", &no_root).is_none());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/project/src/../data/./input.html")),
            Some(PathBuf::from("/project/data/input.html"))
        );
        assert_eq!(
            normalize_path(Path::new("/../x.tpl")),
            Some(PathBuf::from("/x.tpl"))
        );
    }
}
