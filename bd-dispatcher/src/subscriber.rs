// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./subscriber_test.rs"]
mod subscriber_test;

use bd_key_value::{Key, Store};
use std::sync::Arc;

/// The key used to store the backend-assigned subscriber ID.
pub(crate) static SUBSCRIBER_ID_KEY: Key<String> = Key::new("subscriber.id");

/// The key used to store the last push token used to register.
pub(crate) static LAST_TOKEN_KEY: Key<String> = Key::new("subscriber.last_token");

//
// Subscriber
//

/// Store-backed subscriber state. The subscriber ID is assigned by the backend on registration
/// and is required to address beacon and event uploads; without it uploads are dropped.
pub struct Subscriber {
  store: Arc<Store>,
}

impl Subscriber {
  #[must_use]
  pub const fn new(store: Arc<Store>) -> Self {
    Self { store }
  }

  #[must_use]
  pub fn id(&self) -> Option<String> {
    self.store.get(&SUBSCRIBER_ID_KEY).filter(|id| !id.is_empty())
  }

  #[must_use]
  pub fn last_token(&self) -> Option<String> {
    self.store.get(&LAST_TOKEN_KEY).filter(|token| !token.is_empty())
  }

  #[must_use]
  pub fn is_subscribed(&self) -> bool {
    self.id().is_some()
  }

  pub fn record_registration(&self, id: &str, token: &str) {
    self.store.set(&SUBSCRIBER_ID_KEY, &id.to_string());
    self.store.set(&LAST_TOKEN_KEY, &token.to_string());

    log::info!("registered subscriber: {id:?}");
  }

  pub fn clear(&self) {
    self.store.delete(&SUBSCRIBER_ID_KEY);
    self.store.delete(&LAST_TOKEN_KEY);
  }
}
