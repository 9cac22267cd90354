// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![deny(
  clippy::expect_used,
  clippy::panic,
  clippy::todo,
  clippy::unimplemented,
  clippy::unreachable,
  clippy::unwrap_used
)]

pub mod file_storage;


use base64::Engine;
use bd_log::warn_every;
use time::ext::NumericalDuration;

// bd-test-helpers consumes this crate's Storage trait, so its shared mocks (and its init hook)
// cannot be used from this crate's own unit tests without pulling a second copy of the crate
// into the test build. The logger is initialized directly instead.
#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  bd_log::SwapLogger::initialize();
}

//
// Storage
//

/// The platform persistence seam. On Android this would be backed by shared preferences, on other
/// platforms by whatever durable string storage is available. [`file_storage::FileStorage`] is
/// the native default.
pub trait Storage: Send + Sync {
  fn set_string(&self, key: &str, value: &str) -> anyhow::Result<()>;
  fn get_string(&self, key: &str) -> anyhow::Result<Option<String>>;
  fn delete(&self, key: &str) -> anyhow::Result<()>;
}

//
// Storable
//

/// Marker for values that can be persisted through a [`Store`]. Values are encoded with bincode
/// and wrapped in base64 so the underlying storage only ever sees printable strings.
pub trait Storable: serde::Serialize + serde::de::DeserializeOwned {}

impl Storable for String {}

//
// Store
//

pub struct Store {
  storage: Box<dyn Storage + Send + Sync>,
}

impl Store {
  #[must_use]
  pub fn new(storage: Box<dyn Storage + Send + Sync>) -> Self {
    Self { storage }
  }

  pub fn set<T: Storable>(&self, key: &Key<T>, value: &T) {
    if let Err(e) = self.set_internal(key, value) {
      warn_every!(
        15.seconds(),
        "failed to set value for {:?} key: {:?}",
        key.key,
        e
      );
    }
  }

  #[must_use]
  pub fn get<T: Storable>(&self, key: &Key<T>) -> Option<T> {
    self
      .get_internal(key)
      .map_err(|e| {
        warn_every!(
          15.seconds(),
          "failed to get value for {:?} key: {:?}",
          key.key,
          e
        );

        // The stored value is unreadable, clear it out so the next read doesn't hit the same
        // error again.
        if let Err(e) = self.storage.delete(key.key()) {
          warn_every!(
            15.seconds(),
            "failed to delete value for {:?} key: {:?}",
            key.key,
            e
          );
        }
      })
      .ok()
      .flatten()
  }

  pub fn delete<T: Storable>(&self, key: &Key<T>) {
    if let Err(e) = self.storage.delete(key.key()) {
      warn_every!(
        15.seconds(),
        "failed to delete value for {:?} key: {:?}",
        key.key,
        e
      );
    }
  }

  fn set_internal<T: Storable>(&self, key: &Key<T>, value: &T) -> anyhow::Result<()> {
    let bytes = match bincode::serde::encode_to_vec(value, bincode::config::legacy()) {
      Ok(b) => b,
      Err(e) => anyhow::bail!("failed to serialize value: {e:?}"),
    };

    let base64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
    if let Err(e) = self.storage.set_string(key.key, &base64) {
      anyhow::bail!("failed to set string: {e:?}");
    }

    Ok(())
  }

  fn get_internal<T: Storable>(&self, key: &Key<T>) -> anyhow::Result<Option<T>> {
    let Some(base64) = self
      .storage
      .get_string(key.key)
      .map_err(|e| anyhow::anyhow!("failed to get string: {e:?}"))?
    else {
      return Ok(None);
    };

    let bytes = base64::engine::general_purpose::STANDARD
      .decode(base64)
      .map_err(|e| anyhow::anyhow!("failed to decode base64 value: {e:?}"))?;

    match bincode::serde::decode_from_slice(&bytes, bincode::config::legacy()) {
      Ok((value, _)) => Ok(Some(value)),
      Err(e) => anyhow::bail!("failed to deserialize value: {e:?}"),
    }
  }
}

//
// Key
//

pub struct Key<T> {
  key: &'static str,
  _phantom: std::marker::PhantomData<T>,
}

impl<T> Key<T> {
  #[must_use]
  pub const fn new(key: &'static str) -> Self {
    Self {
      key,
      _phantom: std::marker::PhantomData,
    }
  }

  #[must_use]
  pub const fn key(&self) -> &str {
    self.key
  }
}
