use avrovec_core::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// The narrow filesystem contract the converter depends on
pub trait Storage: Send + Sync {
    /// Expand a glob into the matching regular files, sorted. Directories are skipped.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Regular files directly inside `dir`, sorted
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Create `dir` and its parents if missing. Returns the resolved path.
    fn create_dir_all(&self, dir: &Path) -> Result<PathBuf>;

    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>>;

    /// Create or truncate a file for writing
    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>>;

    /// Remove a file or directory tree. Returns whether anything existed.
    fn remove_all(&self, path: &Path) -> Result<bool>;

    /// Fully-qualified string form of a path, stable for a given storage layout
    fn qualify(&self, path: &Path) -> String;
}

/// [`Storage`] over the local filesystem, optionally rooted at a working directory.
///
/// Relative paths resolve against the root when one is set, otherwise against the
/// process working directory.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    root: Option<PathBuf>,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn rooted<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    #[inline]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve a path against the storage root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        let resolved = self.resolve(path);
        if let Ok(canonical) = fs::canonicalize(&resolved) {
            return canonical;
        }
        if resolved.is_absolute() {
            resolved
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&resolved))
                .unwrap_or(resolved)
        }
    }
}

impl Storage for LocalStorage {
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let resolved = self.resolve(Path::new(pattern));
        let resolved = resolved
            .to_str()
            .ok_or_else(|| Error::Config(format!("input pattern is not valid UTF-8: {:?}", resolved)))?;

        let entries = glob::glob(resolved)
            .map_err(|e| Error::Config(format!("invalid input pattern '{}': {}", pattern, e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let resolved = self.resolve(dir);
        let mut files = Vec::new();
        for entry in fs::read_dir(&resolved).map_err(|e| with_path(&resolved, e))? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn create_dir_all(&self, dir: &Path) -> Result<PathBuf> {
        let resolved = self.resolve(dir);
        fs::create_dir_all(&resolved).map_err(|e| with_path(&resolved, e))?;
        Ok(resolved)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let resolved = self.resolve(path);
        let file = File::open(&resolved).map_err(|e| with_path(&resolved, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>> {
        let resolved = self.resolve(path);
        let file = File::create(&resolved).map_err(|e| with_path(&resolved, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn remove_all(&self, path: &Path) -> Result<bool> {
        let resolved = self.resolve(path);
        if resolved.is_dir() {
            fs::remove_dir_all(&resolved).map_err(|e| with_path(&resolved, e))?;
            Ok(true)
        } else if resolved.exists() {
            fs::remove_file(&resolved).map_err(|e| with_path(&resolved, e))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn qualify(&self, path: &Path) -> String {
        format!("file://{}", self.absolute(path).display())
    }
}

/// Attach the offending path to an I/O error
pub(crate) fn with_path(path: &Path, err: io::Error) -> Error {
    Error::Io(io::Error::new(
        err.kind(),
        format!("{}: {}", path.display(), err),
    ))
}
