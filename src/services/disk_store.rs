//! src/services/disk_store.rs
//!
//! DiskObjectStore: local-disk stand-in for the upload bucket. Payloads live
//! beneath `base_path/{bucket}/{key}`; uploads stream to a temp file and are
//! renamed into place once fully written.

use crate::services::object_source::{ByteStream, ObjectSource, SourceError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

#[derive(Clone, Debug)]
pub struct DiskObjectStore {
    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl DiskObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Rejects keys that are empty, too long or absolute, that have a `.` or
    /// `..` path segment, or that contain a backslash or control bytes.
    fn ensure_key_safe(key: &str) -> Result<(), SourceError> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(SourceError::InvalidKey);
        }
        if key.starts_with('/') || key.split('/').any(|seg| seg == ".." || seg == ".") {
            return Err(SourceError::InvalidKey);
        }
        if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
            return Err(SourceError::InvalidKey);
        }
        Ok(())
    }

    /// 3–63 characters of lowercase letters, digits, dots and hyphens.
    fn ensure_bucket_name_safe(name: &str) -> Result<(), SourceError> {
        let len_ok = (BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&name.len());
        let chars_ok = name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-');
        if !len_ok || !chars_ok || name.contains("..") {
            return Err(SourceError::InvalidKey);
        }
        Ok(())
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, SourceError> {
        Self::ensure_bucket_name_safe(bucket)?;
        Self::ensure_key_safe(key)?;
        let mut path = self.base_path.clone();
        path.push(bucket);
        path.push(key);
        Ok(path)
    }

    /// Stream an object body to disk, replacing any existing object.
    ///
    /// Writes go to a temp file that is fsynced and then renamed into place,
    /// so readers never observe a partial body. Returns the byte count.
    pub async fn put_stream<S>(&self, bucket: &str, key: &str, stream: S) -> Result<u64, SourceError>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let file_path = self.object_path(bucket, key)?;
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            SourceError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(SourceError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(SourceError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SourceError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SourceError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SourceError::Io(err));
        }

        tracing::debug!(bucket, key, size_bytes, "stored object");
        Ok(size_bytes)
    }
}

#[async_trait]
impl ObjectSource for DiskObjectStore {
    #[tracing::instrument(skip(self))]
    async fn open(&self, bucket: &str, key: &str) -> Result<ByteStream, SourceError> {
        let file_path = self.object_path(bucket, key)?;
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                SourceError::NotFound
            } else {
                SourceError::Io(err)
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }
}
