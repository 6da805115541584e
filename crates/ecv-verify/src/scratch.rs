use std::fs;
use std::path::{Path, PathBuf};

use ecv_types::ObjectKey;
use serde::{Deserialize, Serialize};

use crate::error::{VerifyError, VerifyResult};

/// Where verification stages encoder input and output.
///
/// Each object gets its own directory under `root`, named after its key,
/// holding the data blob and the shard files the encoder writes next to
/// it. Nothing here is ever deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchLayout {
    pub root: PathBuf,
    pub blob_name: String,
}

impl Default for ScratchLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/erasure-code"),
            blob_name: "ec-obj".into(),
        }
    }
}

impl ScratchLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn object_dir(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(key.dir_name())
    }

    /// Path of the data blob for `key`.
    pub fn input_path(&self, key: &ObjectKey) -> PathBuf {
        self.object_dir(key).join(&self.blob_name)
    }

    /// Create the object's directory and write `data` as its blob.
    pub fn write_input(&self, key: &ObjectKey, data: &[u8]) -> VerifyResult<PathBuf> {
        let dir = self.object_dir(key);
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        let path = dir.join(&self.blob_name);
        fs::write(&path, data).map_err(|source| io_error(&path, source))?;
        Ok(path)
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> VerifyError {
    VerifyError::Io {
        path: path.to_path_buf(),
        source,
    }
}
