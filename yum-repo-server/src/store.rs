//! Filesystem-backed package store.
//!
//! The store knows nothing about locking or metadata: it checks for, writes and
//! removes single files directly inside the repository directory. Callers are
//! expected to have validated the filename with [`crate::validate_filename`].

use bytes::Bytes;
use futures_util::{pin_mut, Stream, StreamExt};
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Directory of package artifacts.
#[derive(Debug, Clone)]
pub struct RepoStore {
    root: PathBuf,
}

impl RepoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an artifact.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Whether a package file with this name is present.
    ///
    /// Only regular files count; the generated `repodata/` directory is not an
    /// artifact.
    pub async fn exists(&self, filename: &str) -> bool {
        match fs::metadata(self.path_for(filename)).await {
            Ok(metadata) => metadata.is_file(),
            Err(_) => false,
        }
    }

    /// Create or truncate the artifact and copy the stream into it.
    ///
    /// When the stream fails halfway the partially written file stays on disk;
    /// a retried upload truncates it again. Returns the number of bytes written.
    pub async fn write<S, E>(&self, filename: &str, content: S) -> AppResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
        AppError: From<E>,
    {
        let path = self.path_for(filename);
        let mut file = fs::File::create(&path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Could not create package file");
            AppError::Io(e)
        })?;

        pin_mut!(content);
        let mut written = 0u64;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(
                    path = %path.display(),
                    written,
                    error = %e,
                    "Upload stream interrupted, partial file left in place"
                );
                AppError::from(e).into_write_failure()
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        info!(path = %path.display(), size = written, "Package file written");
        Ok(written)
    }

    /// Remove an artifact.
    pub async fn remove(&self, filename: &str) -> AppResult<()> {
        if !self.exists(filename).await {
            debug!(filename = %filename, "Package not present");
            return Err(AppError::NotFound(format!("{filename} - File not found")));
        }

        let path = self.path_for(filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Package file deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("{filename} - File not found")))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not delete package file");
                Err(AppError::Io(e))
            }
        }
    }

    /// Names of all artifacts carrying the given extension, sorted.
    pub async fn list(&self, extension: &str) -> AppResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(extension) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::TempDir;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_write_then_exists() {
        let dir = TempDir::new().unwrap();
        let store = RepoStore::new(dir.path());

        assert!(!store.exists("foo-1.0.rpm").await);
        let written = store
            .write("foo-1.0.rpm", chunks(&[b"abc", b"def"]))
            .await
            .unwrap();

        assert_eq!(written, 6);
        assert!(store.exists("foo-1.0.rpm").await);
        assert_eq!(std::fs::read(dir.path().join("foo-1.0.rpm")).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_write_truncates_existing_content() {
        let dir = TempDir::new().unwrap();
        let store = RepoStore::new(dir.path());
        std::fs::write(dir.path().join("foo-1.0.rpm"), b"a much longer old payload").unwrap();

        store.write("foo-1.0.rpm", chunks(&[b"new"])).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("foo-1.0.rpm")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_partial_file() {
        let dir = TempDir::new().unwrap();
        let store = RepoStore::new(dir.path());

        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"head")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away")),
        ]);
        let err = store.write("foo-1.0.rpm", broken).await.unwrap_err();

        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(std::fs::read(dir.path().join("foo-1.0.rpm")).unwrap(), b"head");
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let store = RepoStore::new(dir.path().join("gone"));
        let err = store.write("foo-1.0.rpm", chunks(&[b"x"])).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = RepoStore::new(dir.path());
        let err = store.remove("foo-1.0.rpm").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directories_are_not_artifacts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("repodata")).unwrap();
        let store = RepoStore::new(dir.path());

        assert!(!store.exists("repodata").await);
        assert!(matches!(
            store.remove("repodata").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(dir.path().join("repodata").is_dir());
    }

    #[tokio::test]
    async fn test_list_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b-1.0.rpm"), b"").unwrap();
        std::fs::write(dir.path().join("a-2.0.rpm"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("repodata")).unwrap();

        let store = RepoStore::new(dir.path());
        assert_eq!(
            store.list(".rpm").await.unwrap(),
            vec!["a-2.0.rpm".to_string(), "b-1.0.rpm".to_string()]
        );
    }
}
