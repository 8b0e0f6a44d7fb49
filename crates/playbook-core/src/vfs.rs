use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Abstract interface for file system operations.
pub trait FileSystem: Send + Sync {
    /// Read the entire contents of a file into a string.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// List all files with the given extension under the root directory.
    /// This is a recursive search; symlinked files are skipped.
    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf>;

    /// List the immediate subdirectories of `dir`.
    fn list_dirs(&self, dir: &Path) -> Vec<PathBuf>;

    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    fn write_all(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
}

/// Standard implementation of FileSystem using std::fs and walkdir.
pub struct PhysicalFileSystem;

impl FileSystem for PhysicalFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path_is_symlink() || !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if let Some(ext) = path.extension() {
                if ext == extension {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        files
    }

    fn list_dirs(&self, dir: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();
        dirs.sort();
        dirs
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_all(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_filters_extension() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem;
        fs.write_all(&temp.path().join("a/b/copy.py"), b"").unwrap();
        fs.write_all(&temp.path().join("a/readme.md"), b"").unwrap();

        let files = fs.list_files(temp.path(), "py");
        assert_eq!(files, vec![temp.path().join("a/b/copy.py")]);
        assert_eq!(fs.list_dirs(temp.path()), vec![temp.path().join("a")]);
    }
}
