// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use bd_dispatcher::Api;
use bd_key_value::Storage;
use std::collections::HashMap;

/// Called from a `#[ctor::ctor]` hook in a consuming crate's test module so the test binary gets
/// the logger exactly once, as early as possible.
pub fn test_global_init() {
  bd_log::SwapLogger::initialize();
}

//
// MemStorage
//

/// An in-memory [`Storage`] used anywhere tests need a store without touching the filesystem.
#[derive(Default)]
pub struct MemStorage {
  state: parking_lot::Mutex<HashMap<String, String>>,
}

impl Storage for MemStorage {
  fn set_string(&self, key: &str, value: &str) -> anyhow::Result<()> {
    self
      .state
      .lock()
      .insert(key.to_string(), value.to_string());

    Ok(())
  }

  fn get_string(&self, key: &str) -> anyhow::Result<Option<String>> {
    Ok(self.state.lock().get(key).cloned())
  }

  fn delete(&self, key: &str) -> anyhow::Result<()> {
    self.state.lock().remove(key);
    Ok(())
  }
}

//
// RecordingApi
//

/// An [`Api`] that records every call and can be scripted to fail the next N calls, for
/// exercising the dispatcher's retry and error paths.
pub struct RecordingApi {
  pub register_calls: parking_lot::Mutex<Vec<String>>,
  pub unregister_calls: parking_lot::Mutex<Vec<String>>,
  pub beacon_calls: parking_lot::Mutex<Vec<(String, serde_json::Value)>>,
  pub event_calls: parking_lot::Mutex<Vec<(String, serde_json::Value)>>,

  subscriber_id: String,
  failures_remaining: parking_lot::Mutex<u32>,
}

impl Default for RecordingApi {
  fn default() -> Self {
    Self::new("subscriber-1")
  }
}

impl RecordingApi {
  #[must_use]
  pub fn new(subscriber_id: &str) -> Self {
    Self {
      register_calls: parking_lot::Mutex::default(),
      unregister_calls: parking_lot::Mutex::default(),
      beacon_calls: parking_lot::Mutex::default(),
      event_calls: parking_lot::Mutex::default(),
      subscriber_id: subscriber_id.to_string(),
      failures_remaining: parking_lot::Mutex::new(0),
    }
  }

  /// Makes the next `count` calls (of any kind) fail with a synthetic error.
  pub fn fail_next(&self, count: u32) {
    *self.failures_remaining.lock() = count;
  }

  fn check_failure(&self) -> anyhow::Result<()> {
    let mut remaining = self.failures_remaining.lock();
    if *remaining > 0 {
      *remaining -= 1;
      anyhow::bail!("synthetic failure");
    }

    Ok(())
  }
}

#[async_trait::async_trait]
impl Api for RecordingApi {
  async fn register_subscriber(&self, token: &str) -> anyhow::Result<String> {
    self.register_calls.lock().push(token.to_string());
    self.check_failure()?;

    Ok(self.subscriber_id.clone())
  }

  async fn unregister_subscriber(&self, subscriber_id: &str) -> anyhow::Result<()> {
    self.unregister_calls.lock().push(subscriber_id.to_string());
    self.check_failure()
  }

  async fn send_beacon(
    &self,
    subscriber_id: &str,
    payload: &serde_json::Value,
  ) -> anyhow::Result<()> {
    self
      .beacon_calls
      .lock()
      .push((subscriber_id.to_string(), payload.clone()));
    self.check_failure()
  }

  async fn send_event(
    &self,
    subscriber_id: &str,
    payload: &serde_json::Value,
  ) -> anyhow::Result<()> {
    self
      .event_calls
      .lock()
      .push((subscriber_id.to_string(), payload.clone()));
    self.check_failure()
  }
}
