//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::SitecastError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), SitecastError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents. Missing directories are not an error.
    pub async fn delete(&self) -> Result<(), SitecastError> {
        match fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List files in the directory, sorted by name. A missing directory is empty.
    pub async fn list_files(&self) -> Result<Vec<File>, SitecastError> {
        let mut files = self.list_entries(false).await?;
        files.sort();
        Ok(files.into_iter().map(File::new).collect())
    }

    /// List subdirectory names, sorted. A missing directory is empty.
    pub async fn list_dirs(&self) -> Result<Vec<String>, SitecastError> {
        let mut names: Vec<String> = self
            .list_entries(true)
            .await?
            .into_iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_entries(&self, dirs: bool) -> Result<Vec<PathBuf>, SitecastError> {
        let mut out = Vec::new();
        let mut entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() == dirs && (dirs || file_type.is_file()) {
                out.push(entry.path());
            }
        }

        Ok(out)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }
}
