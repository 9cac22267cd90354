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

mod builder;
mod credentials;

#[cfg(test)]
#[path = "./client_test.rs"]
mod client_test;

pub use bd_beacon::{Beacon, BeaconBuilder, BeaconSink, SelectorValue};
use bd_dispatcher::{DispatcherHandle, ShutdownTrigger, Subscriber};
pub use bd_dispatcher::{Event, EventType};
use bd_key_value::Storage;
pub use builder::ClientBuilder;
use std::sync::Arc;

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  bd_test_helpers::test_global_init();
}

//
// Error
//

#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The API key is not a lowercase hex UUID.
  #[error("Invalid API key! Current API key: `{0}`")]
  InvalidApiKey(String),

  /// The project ID is not a 24 character lowercase alphanumeric string.
  #[error("Invalid project ID! Current project ID: `{0}`")]
  InvalidProjectId(String),

  /// [`instance`] was called before [`initialize`].
  #[error("the client has not been initialized yet")]
  Uninitialized,
}

//
// InitParams
//

/// The parameters required to initialize the client.
pub struct InitParams {
  pub api_key: String,
  pub project_id: String,

  /// Scheme and authority of the backend, e.g. `https://api.example.com`.
  pub api_address: String,

  /// Durable storage for subscriber state.
  pub storage: Box<dyn Storage + Send + Sync>,
}

//
// Client
//

/// The SDK handle. Owns the dispatch queue and the subscriber state; all operations are
/// non-blocking and safe to call from any thread.
pub struct Client {
  api_key: String,
  project_id: String,
  subscriber: Arc<Subscriber>,
  handle: DispatcherHandle,
  shutdown_trigger: parking_lot::Mutex<Option<ShutdownTrigger>>,
}

// The API key is deliberately left out so a debug-formatted client never leaks a credential
// into logs.
impl std::fmt::Debug for Client {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Client")
      .field("project_id", &self.project_id)
      .field("subscriber_id", &self.subscriber.id())
      .finish_non_exhaustive()
  }
}

impl Client {
  pub(crate) fn new(
    api_key: String,
    project_id: String,
    subscriber: Arc<Subscriber>,
    handle: DispatcherHandle,
    shutdown_trigger: ShutdownTrigger,
  ) -> Self {
    Self {
      api_key,
      project_id,
      subscriber,
      handle,
      shutdown_trigger: parking_lot::Mutex::new(Some(shutdown_trigger)),
    }
  }

  /// Starts a new beacon. Each call returns a fresh builder wired to the dispatch queue.
  #[must_use]
  pub fn create_beacon(&self) -> BeaconBuilder {
    BeaconBuilder::new(Arc::new(self.handle.clone()))
  }

  /// Registers a subscriber for the provided push token. Fire-and-forget; once registration
  /// completes [`Self::is_subscribed`] flips to true.
  pub fn register_subscriber(&self, token: &str) {
    self.handle.register_subscriber(token);
  }

  /// Unregisters the current subscriber, if any. Fire-and-forget.
  pub fn unregister_subscriber(&self) {
    self.handle.unregister_subscriber();
  }

  /// Reports a notification lifecycle event. Fire-and-forget.
  pub fn send_event(&self, event: Event) {
    self.handle.send_event(event);
  }

  #[must_use]
  pub fn is_subscribed(&self) -> bool {
    self.subscriber.is_subscribed()
  }

  #[must_use]
  pub fn subscriber_id(&self) -> Option<String> {
    self.subscriber.id()
  }

  /// The last push token used to register, if any.
  #[must_use]
  pub fn last_token(&self) -> Option<String> {
    self.subscriber.last_token()
  }

  #[must_use]
  pub fn api_key(&self) -> &str {
    &self.api_key
  }

  #[must_use]
  pub fn project_id(&self) -> &str {
    &self.project_id
  }

  /// Drains queued uploads and stops the dispatch loop. Subsequent calls are no-ops.
  pub async fn shutdown(&self) {
    let trigger = self.shutdown_trigger.lock().take();
    if let Some(trigger) = trigger {
      trigger.shutdown().await;
    }
  }

  /// Same as [`Self::shutdown`], for use outside of an async context.
  pub fn shutdown_blocking(&self) {
    let trigger = self.shutdown_trigger.lock().take();
    if let Some(trigger) = trigger {
      trigger.shutdown_blocking();
    }
  }
}

//
// Process-wide instance
//

static INSTANCE: parking_lot::RwLock<Option<Arc<Client>>> = parking_lot::RwLock::new(None);

/// Builds a client on a dedicated runtime thread and installs it as the process-wide instance,
/// replacing any previous one. The explicit [`ClientBuilder`] API remains the primary way to
/// construct a client; this is a convenience layer for embedders that want a single global
/// handle.
pub fn initialize(params: InitParams) -> anyhow::Result<Arc<Client>> {
  let client = Arc::new(ClientBuilder::new(params).build_dedicated_thread()?);
  *INSTANCE.write() = Some(client.clone());

  Ok(client)
}

/// The process-wide instance installed by [`initialize`].
pub fn instance() -> Result<Arc<Client>, Error> {
  INSTANCE.read().clone().ok_or(Error::Uninitialized)
}

#[must_use]
pub fn is_initialized() -> bool {
  INSTANCE.read().is_some()
}
