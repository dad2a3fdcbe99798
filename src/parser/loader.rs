//! Directory scanning.

use crate::config::Config;
use crate::error::{Result, TfAgentError};
use crate::parser::{SKIP_FILES, TERRAFORM_EXTENSIONS};
use crate::types::{FileKind, ParsedFile};

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Collects configuration files from a directory.
///
/// By default only the top level of the directory is read, matching how
/// Terraform itself treats a root module. Set `scan.recursive` to walk
/// subdirectories as well.
pub struct ConfigurationLoader {
    recursive: bool,
    max_depth: usize,
    exclude_patterns: Vec<glob::Pattern>,
}

impl ConfigurationLoader {
    /// Create a loader from the scan section of the configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let exclude_patterns = config
            .scan
            .exclude_patterns
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            recursive: config.scan.recursive,
            max_depth: config.scan.max_depth,
            exclude_patterns,
        }
    }

    /// Read every recognized file under `path`, sorted by path.
    ///
    /// # Errors
    ///
    /// - `DirectoryNotFound` if `path` is missing or not a directory
    /// - `FileRead` if any file or directory entry cannot be read
    pub async fn load_directory(&self, path: &Path) -> Result<Vec<ParsedFile>> {
        if !path.is_dir() {
            return Err(crate::err!(DirectoryNotFound {
                path: path.to_path_buf(),
            }));
        }

        let paths = self.collect_paths(path)?;
        let mut files = Vec::with_capacity(paths.len());

        for file_path in paths {
            let Some(kind) = FileKind::from_path(&file_path) else {
                continue;
            };
            let raw_text = tokio::fs::read_to_string(&file_path)
                .await
                .map_err(|e| TfAgentError::file_read(&file_path, e, file!(), line!()))?;

            tracing::debug!(file = %file_path.display(), bytes = raw_text.len(), "Loaded file");
            files.push(ParsedFile {
                path: file_path,
                raw_text,
                kind,
            });
        }

        tracing::info!(
            directory = %path.display(),
            files = files.len(),
            recursive = self.recursive,
            "Scan complete"
        );

        Ok(files)
    }

    /// Walk the directory and return the sorted list of candidate files.
    fn collect_paths(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let depth = if self.recursive { self.max_depth.max(1) } else { 1 };
        let mut paths = Vec::new();

        for entry in WalkDir::new(root)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_skip(e))
        {
            let entry = entry.map_err(|e| walk_error(root, e))?;
            if entry.file_type().is_file() && is_terraform_file(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Check if a directory entry should be skipped.
    fn should_skip(&self, entry: &DirEntry) -> bool {
        let Some(file_name) = entry.file_name().to_str() else {
            return false;
        };

        if file_name.starts_with('.') {
            tracing::debug!(path = %entry.path().display(), reason = "hidden file/directory", "Skipping path");
            return true;
        }

        if SKIP_FILES.iter().any(|s| file_name == *s) {
            tracing::debug!(path = %entry.path().display(), reason = "known skip file", "Skipping path");
            return true;
        }

        if self.exclude_patterns.iter().any(|p| p.matches(file_name)) {
            tracing::debug!(path = %entry.path().display(), reason = "matches exclude pattern", "Skipping path");
            return true;
        }

        false
    }
}

/// Check if a file has one of the recognized extensions.
fn is_terraform_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    TERRAFORM_EXTENSIONS.iter().any(|ext| path_str.ends_with(ext))
}

fn walk_error(root: &Path, error: walkdir::Error) -> TfAgentError {
    let path = error.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    let message = error.to_string();
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, message));
    TfAgentError::file_read(path, source, file!(), line!())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn loader(recursive: bool) -> ConfigurationLoader {
        let mut config = Config::default();
        config.scan.recursive = recursive;
        ConfigurationLoader::new(&config)
    }

    fn names(files: &[ParsedFile], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[tokio::test]
    async fn test_only_recognized_extensions_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "variables.tf", "");
        write(dir.path(), "main.tf", "");
        write(dir.path(), "prod.tfvars", "");
        write(dir.path(), "terragrunt.hcl", "");
        write(dir.path(), "README.md", "# docs");
        write(dir.path(), "plan.json", "{}");

        let files = loader(false).load_directory(dir.path()).await.unwrap();
        assert_eq!(
            names(&files, dir.path()),
            vec!["main.tf", "prod.tfvars", "terragrunt.hcl", "variables.tf"]
        );
        assert_eq!(files[1].kind, FileKind::Tfvars);
    }

    #[tokio::test]
    async fn test_non_recursive_by_default() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "");
        write(dir.path(), "modules/net/main.tf", "");

        let files = loader(false).load_directory(dir.path()).await.unwrap();
        assert_eq!(names(&files, dir.path()), vec!["main.tf"]);
    }

    #[tokio::test]
    async fn test_recursive_skips_hidden_and_cache_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "");
        write(dir.path(), "modules/net/main.tf", "");
        write(dir.path(), ".terraform/modules/x/main.tf", "");
        write(dir.path(), ".terragrunt-cache/abc/main.tf", "");

        let files = loader(true).load_directory(dir.path()).await.unwrap();
        assert_eq!(names(&files, dir.path()), vec!["main.tf", "modules/net/main.tf"]);
    }

    #[tokio::test]
    async fn test_exclude_patterns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "");
        write(dir.path(), "override.tf", "");

        let mut config = Config::default();
        config.scan.exclude_patterns = vec!["override*.tf".to_string()];
        let files = ConfigurationLoader::new(&config)
            .load_directory(dir.path())
            .await
            .unwrap();
        assert_eq!(names(&files, dir.path()), vec!["main.tf"]);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = loader(false).load_directory(&dir.path().join("missing")).await;
        assert!(matches!(result, Err(TfAgentError::DirectoryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_file_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "");
        let result = loader(false).load_directory(&dir.path().join("main.tf")).await;
        assert!(matches!(result, Err(TfAgentError::DirectoryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_utf8_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.tf"), [0xff, 0xfe, 0x00]).unwrap();

        let result = loader(false).load_directory(dir.path()).await;
        match result {
            Err(TfAgentError::FileRead { path, .. }) => assert!(path.ends_with("main.tf")),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_a_permission_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "");
        write(dir.path(), "secret.tf", "variable \"x\" {}\n");
        let secret = dir.path().join("secret.tf");
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores file modes
        if fs::read_to_string(&secret).is_ok() {
            return;
        }

        let result = loader(false).load_directory(dir.path()).await;
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

        match result {
            Err(err @ TfAgentError::FileRead { .. }) => {
                assert!(err.file().is_some_and(|p| p.ends_with("secret.tf")));
                assert_eq!(err.exit_code(), 13);
            }
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let files = loader(true).load_directory(dir.path()).await.unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_is_terraform_file() {
        assert!(is_terraform_file(Path::new("main.tf")));
        assert!(is_terraform_file(Path::new("prod.tfvars")));
        assert!(is_terraform_file(Path::new("terragrunt.hcl")));
        assert!(!is_terraform_file(Path::new("readme.md")));
        assert!(!is_terraform_file(Path::new("main.tf.json")));
    }
}
