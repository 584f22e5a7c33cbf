//! Save backend writing one file per category under a persistent directory.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::dao::{
    models::Category,
    save_store::SaveStore,
    storage::{StorageError, StorageResult},
};

/// Stores every category as `{dir}/{category}.{extension}`.
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    dir: Arc<Path>,
    extension: Arc<str>,
}

impl FileSaveStore {
    /// Create a store rooted at `dir`; the directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            dir: Arc::from(dir.into()),
            extension: Arc::from(extension.trim_start_matches('.')),
        }
    }

    /// Directory holding the save files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the file path for `category`.
    pub fn path_for(&self, category: Category) -> PathBuf {
        self.dir
            .join(format!("{}.{}", category.as_str(), self.extension))
    }
}

impl SaveStore for FileSaveStore {
    fn read(&self, category: Category) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let path = self.path_for(category);
        Box::pin(async move {
            match fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(StorageError::read(path.display().to_string(), err)),
            }
        })
    }

    fn write(&self, category: Category, bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path_for(category);
        Box::pin(async move {
            write_replacing(&path, &bytes)
                .await
                .map_err(|err| StorageError::write(path.display().to_string(), err))?;
            debug!(path = %path.display(), bytes = bytes.len(), "save file written");
            Ok(())
        })
    }

    fn remove(&self, category: Category) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path_for(category);
        Box::pin(async move {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StorageError::write(path.display().to_string(), err)),
            }
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let dir = self.dir.clone();
        let extension = self.extension.clone();
        Box::pin(async move {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
                Err(err) => return Err(StorageError::read(dir.display().to_string(), err)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| StorageError::read(dir.display().to_string(), err))?
            {
                let path = entry.path();
                let owned = path
                    .file_name()
                    .is_some_and(|name| is_save_file(&name.to_string_lossy(), &extension));
                if !owned {
                    continue;
                }
                fs::remove_file(&path)
                    .await
                    .map_err(|err| StorageError::write(path.display().to_string(), err))?;
                debug!(path = %path.display(), "save file removed");
            }
            Ok(())
        })
    }

    fn describe(&self, category: Category) -> String {
        self.path_for(category).display().to_string()
    }
}

/// Save files and the temp files an interrupted write leaves behind.
fn is_save_file(name: &str, extension: &str) -> bool {
    let name = name.strip_suffix(".tmp").unwrap_or(name);
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == extension)
}

/// Write `bytes` next to `path`, flush them, then rename over the target.
///
/// A crash mid-write leaves the previous file untouched.
async fn write_replacing(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, path).await
}
