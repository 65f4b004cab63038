//! File service that orchestrates uploads, listing, downloads and deletion
//! on top of the storage layer

use std::fmt;
use std::fs::Metadata;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::storage::{derive_stored_name, PathResolver, StorageError};
use crate::streaming::{self, ByteStream, DeliveryPlan, READ_BUFFER_SIZE};

/// Result of a successful upload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredFileDescriptor {
    pub stored_name: String,
    pub original_name: String,
}

/// Whole-file download
pub struct FileContent {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub body: ByteStream,
}

/// Range-aware download
pub struct StreamedContent {
    pub plan: DeliveryPlan,
    pub body: ByteStream,
}

/// File service over a single base directory
pub struct FileService {
    resolver: PathResolver,
}

impl FileService {
    /// Create a service over an existing base directory
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// Create the base directory if needed and build a service over it
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(StorageError::StorageUnavailable)?;
        info!("Using storage directory: {}", base_dir.display());
        Ok(Self::new(PathResolver::new(base_dir)))
    }

    pub fn base_dir(&self) -> &Path {
        self.resolver.base_dir()
    }

    /// Store an uploaded file under a name derived from the current time
    pub async fn upload<S, E>(
        &self,
        original_name: &str,
        payload: S,
    ) -> Result<StoredFileDescriptor, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        self.upload_at(original_name, Utc::now(), payload).await
    }

    /// Store an uploaded file under the name derived for `now`.
    ///
    /// An existing file with the same stored name is overwritten. If the
    /// payload fails part way, the partial file is removed.
    pub async fn upload_at<S, E>(
        &self,
        original_name: &str,
        now: DateTime<Utc>,
        mut payload: S,
    ) -> Result<StoredFileDescriptor, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        let stored_name = derive_stored_name(original_name, now);
        let path = self.resolver.resolve(&stored_name)?;
        self.resolver.confine_new(&stored_name, &path).await?;

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| StorageError::io(&stored_name, e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = payload.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Upload of {} interrupted after {} bytes: {}", stored_name, written, e);
                    drop(file);
                    discard_partial(&path).await;
                    return Err(StorageError::UploadInterrupted(e.to_string()));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                error!("Failed to write {}: {}", stored_name, e);
                drop(file);
                discard_partial(&path).await;
                return Err(StorageError::StorageUnavailable(e));
            }
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(StorageError::StorageUnavailable)?;

        info!("Stored {:?} as {} ({} bytes)", original_name, stored_name, written);
        Ok(StoredFileDescriptor {
            stored_name,
            original_name: original_name.to_string(),
        })
    }

    /// Names of everything in the base directory, in directory order
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(self.base_dir()).await.map_err(|e| {
            error!("Failed to read {}: {}", self.base_dir().display(), e);
            StorageError::StorageUnavailable(e)
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StorageError::StorageUnavailable)?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        debug!("Listed {} stored files", names.len());
        Ok(names)
    }

    /// Whole content of a stored file
    pub async fn retrieve(&self, name: &str) -> Result<FileContent, StorageError> {
        let (file, metadata) = self.open_stored(name).await?;
        info!("Serving {} ({} bytes)", name, metadata.len());
        Ok(FileContent {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            body: Box::pin(ReaderStream::with_capacity(file, READ_BUFFER_SIZE)),
        })
    }

    /// Content of a stored file bounded by the plan for `range_header`
    pub async fn stream(
        &self,
        name: &str,
        range_header: Option<&str>,
    ) -> Result<StreamedContent, StorageError> {
        let (mut file, metadata) = self.open_stored(name).await?;
        let plan = streaming::plan(range_header, metadata.len())?;

        if plan.offset() > 0 {
            file.seek(SeekFrom::Start(plan.offset()))
                .await
                .map_err(|e| StorageError::io(name, e))?;
        }
        debug!(
            "Streaming {} bytes {}..+{} of {}",
            name,
            plan.offset(),
            plan.length(),
            plan.total_size()
        );

        let bounded = file.take(plan.length());
        Ok(StreamedContent {
            plan,
            body: Box::pin(ReaderStream::with_capacity(bounded, READ_BUFFER_SIZE)),
        })
    }

    /// Remove a stored file
    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.resolver.resolve(name)?;
        self.resolver.confine(name, &path).await?;
        fs::remove_file(&path).await.map_err(|e| {
            let err = StorageError::io(name, e);
            if let StorageError::StorageUnavailable(ref io) = err {
                error!("Failed to delete {}: {}", name, io);
            }
            err
        })?;
        info!("Deleted {}", name);
        Ok(())
    }

    async fn open_stored(&self, name: &str) -> Result<(fs::File, Metadata), StorageError> {
        let path = self.resolver.resolve(name)?;
        self.resolver.confine(name, &path).await?;

        let file = fs::File::open(&path)
            .await
            .map_err(|e| StorageError::io(name, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| StorageError::io(name, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok((file, metadata))
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Failed to remove partial upload {}: {}", path.display(), e);
    }
}
