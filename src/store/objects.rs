use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

pub const USER_AVATAR_BUCKET: &str = "user-avatar";
pub const USER_CV_BUCKET: &str = "user-cv";
pub const PROVIDER_LOGO_BUCKET: &str = "opportunity-provider-logo";
pub const OPPORTUNITY_DESCRIPTION_BUCKET: &str = "opportunity-description";

pub const ALL_BUCKETS: &[&str] = &[
    USER_AVATAR_BUCKET,
    USER_CV_BUCKET,
    PROVIDER_LOGO_BUCKET,
    OPPORTUNITY_DESCRIPTION_BUCKET,
];

/// Binary assets addressed by bucket and `"{id}.{ext}"` key.
pub trait ObjectStore {
    /// Fails with [`StoreError::ObjectNotFound`] when the key is absent.
    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// Stores the whole stream under `key`, returning the number of bytes written.
    fn put(&self, bucket: &str, key: &str, data: &mut dyn Read) -> StoreResult<u64>;

    fn remove(&self, bucket: &str, key: &str) -> StoreResult<()>;

    fn get_or_default(&self, bucket: &str, key: &str, default_key: &str) -> StoreResult<Vec<u8>> {
        match self.get(bucket, key) {
            Err(StoreError::ObjectNotFound { .. }) => {
                debug!(bucket, key, default_key, "object missing, serving default");
                self.get(bucket, default_key)
            }
            other => other,
        }
    }
}

pub fn object_key(id: i64, extension: &str) -> String {
    format!("{id}.{extension}")
}

/// Object store backed by one directory per bucket.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_buckets(&self) -> StoreResult<()> {
        for bucket in ALL_BUCKETS {
            fs::create_dir_all(self.root.join(bucket))?;
        }
        Ok(())
    }

    fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        let valid = |part: &str| {
            !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
        };
        if !valid(bucket) || !valid(key) {
            return Err(StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(self.root.join(bucket).join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, bucket: &str, key: &str, data: &mut dyn Read) -> StoreResult<u64> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // written aside and renamed so readers never see a partial object
        let staging = path.with_extension(format!("{}.part", Uuid::new_v4()));
        let written = {
            let mut file = fs::File::create(&staging)?;
            io::copy(data, &mut file)?
        };
        if let Err(err) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        debug!(bucket, key, bytes = written, "object stored");
        Ok(written)
    }

    fn remove(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
