//! Source-file discovery under the workspace root.
//!
//! Honors `.gitignore` rules plus the configured ignore patterns, keeps
//! only configured source extensions, and returns a deterministically
//! sorted list so batch ordering is reproducible across runs.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;

pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk `root` and return every matching source file, sorted.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false);

        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &self.settings.indexing.ignore_patterns {
            // Leading ! marks the glob as an exclusion
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!("invalid ignore pattern '{pattern}': {e}");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let mut files: Vec<PathBuf> = builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| !is_hidden(path) && self.is_source_file(path))
            .collect();

        files.sort();
        files
    }

    /// Whether a path has one of the configured source extensions.
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.settings
                    .indexing
                    .extensions
                    .iter()
                    .any(|known| known == ext)
            })
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn walker() -> FileWalker {
        FileWalker::new(Arc::new(Settings::default()))
    }

    #[test]
    fn test_discovers_only_source_files_sorted() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("zeta.py"), "def z(): pass").unwrap();
        fs::write(root.join("alpha.py"), "def a(): pass").unwrap();
        fs::write(root.join("notes.md"), "# notes").unwrap();
        fs::write(root.join("script.sh"), "echo hi").unwrap();

        let files = walker().discover(root);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("alpha.py"));
        assert!(files[1].ends_with("zeta.py"));
    }

    #[test]
    fn test_skips_ignored_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("__pycache__/cached.py"), "").unwrap();
        fs::write(root.join("app.py"), "def run(): pass").unwrap();

        let files = walker().discover(root);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }

    #[test]
    fn test_respects_gitignore() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join(".gitignore"), "generated.py\n").unwrap();
        fs::write(root.join("generated.py"), "def g(): pass").unwrap();
        fs::write(root.join("source.py"), "def s(): pass").unwrap();

        let files = walker().discover(root);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("source.py"));
    }

    #[test]
    fn test_skips_hidden_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join(".secret.py"), "def h(): pass").unwrap();
        fs::write(root.join("visible.py"), "def v(): pass").unwrap();

        let files = walker().discover(root);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.py"));
    }
}
