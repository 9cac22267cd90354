// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./file_storage_test.rs"]
mod file_storage_test;

use crate::Storage;
use std::path::{Path, PathBuf};

//
// FileStorage
//

/// A [`Storage`] implementation that keeps one file per key inside a directory. Values are small
/// (base64 strings produced by the store), so a plain write-then-rename is sufficient to avoid
/// torn reads.
pub struct FileStorage {
  directory: PathBuf,
}

impl FileStorage {
  pub fn new(directory: impl Into<PathBuf>) -> anyhow::Result<Self> {
    let directory = directory.into();
    std::fs::create_dir_all(&directory)?;

    Ok(Self { directory })
  }

  fn path_for(&self, key: &str) -> PathBuf {
    // Keys are internal constants but may contain separators. Escape anything that is not
    // filename safe.
    let file_name: String = key
      .chars()
      .map(|c| {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
          c
        } else {
          '_'
        }
      })
      .collect();

    self.directory.join(file_name)
  }

  fn write_atomic(path: &Path, value: &str) -> anyhow::Result<()> {
    // Append rather than replace the extension so distinct keys never share a scratch file.
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, value)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
  }
}

impl Storage for FileStorage {
  fn set_string(&self, key: &str, value: &str) -> anyhow::Result<()> {
    Self::write_atomic(&self.path_for(key), value)
  }

  fn get_string(&self, key: &str) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(self.path_for(key)) {
      Ok(value) => Ok(Some(value)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn delete(&self, key: &str) -> anyhow::Result<()> {
    match std::fs::remove_file(self.path_for(key)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}
