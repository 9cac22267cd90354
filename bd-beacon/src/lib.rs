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

pub mod builder;

pub use builder::BeaconBuilder;
use std::collections::BTreeMap;

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  bd_log::SwapLogger::initialize();
}

/// The tag strategy sent for every appended tag. The backend supports other strategies but the
/// client API only ever appends.
const TAG_STRATEGY: &str = "append";

//
// Error
//

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
  /// A mutator or `send()` was called on a builder whose beacon has already been handed to the
  /// dispatcher.
  #[error("beacon was already finalized and sent")]
  AlreadyFinalized,
}

//
// SelectorValue
//

/// A selector value. The backend accepts booleans, strings, and numbers; making this a closed
/// enum means unsupported types cannot be constructed, rather than failing at send time.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorValue {
  Bool(bool),
  Number(serde_json::Number),
  String(String),
}

impl SelectorValue {
  fn to_json(&self) -> serde_json::Value {
    match self {
      Self::Bool(value) => serde_json::Value::Bool(*value),
      Self::Number(value) => serde_json::Value::Number(value.clone()),
      Self::String(value) => serde_json::Value::String(value.clone()),
    }
  }
}

impl From<bool> for SelectorValue {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<i32> for SelectorValue {
  fn from(value: i32) -> Self {
    Self::Number(value.into())
  }
}

impl From<i64> for SelectorValue {
  fn from(value: i64) -> Self {
    Self::Number(value.into())
  }
}

impl From<u64> for SelectorValue {
  fn from(value: u64) -> Self {
    Self::Number(value.into())
  }
}

impl From<f64> for SelectorValue {
  fn from(value: f64) -> Self {
    // NaN and infinities have no JSON representation; they collapse to 0.
    Self::Number(serde_json::Number::from_f64(value).unwrap_or_else(|| 0.into()))
  }
}

impl From<&str> for SelectorValue {
  fn from(value: &str) -> Self {
    Self::String(value.to_string())
  }
}

impl From<String> for SelectorValue {
  fn from(value: String) -> Self {
    Self::String(value)
  }
}

impl From<char> for SelectorValue {
  fn from(value: char) -> Self {
    Self::String(value.to_string())
  }
}

//
// Tag
//

/// A named tag with its label. `append_tag` without a label uses `"default"`, matching what the
/// backend expects for unlabeled tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
  pub name: String,
  pub label: String,
}

impl Tag {
  fn to_json(&self) -> serde_json::Value {
    serde_json::json!({
      "tag": self.name,
      "label": self.label,
      "strategy": TAG_STRATEGY,
      "ttl": 0,
    })
  }
}

//
// Beacon
//

/// A finalized beacon record. Immutable; produced by [`BeaconBuilder::send`] and handed to the
/// dispatcher, after which the builder refuses further mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Beacon {
  selectors: BTreeMap<String, SelectorValue>,
  tags: Vec<Tag>,
  tags_to_delete: Vec<String>,
  custom_id: Option<String>,
}

impl Beacon {
  pub(crate) const fn new(
    selectors: BTreeMap<String, SelectorValue>,
    tags: Vec<Tag>,
    tags_to_delete: Vec<String>,
    custom_id: Option<String>,
  ) -> Self {
    Self {
      selectors,
      tags,
      tags_to_delete,
      custom_id,
    }
  }

  #[must_use]
  pub fn tags(&self) -> &[Tag] {
    &self.tags
  }

  #[must_use]
  pub fn tags_to_delete(&self) -> &[String] {
    &self.tags_to_delete
  }

  #[must_use]
  pub fn custom_id(&self) -> Option<&str> {
    self.custom_id.as_deref()
  }

  #[must_use]
  pub fn selector(&self, key: &str) -> Option<&SelectorValue> {
    self.selectors.get(key)
  }

  /// Builds the wire payload: selectors flattened at the top level, tags as
  /// `{tag, label, strategy, ttl}` objects, tag deletions as plain names, and the custom ID as a
  /// string (empty when unset).
  #[must_use]
  pub fn to_payload(&self) -> serde_json::Value {
    let mut object = serde_json::Map::new();

    for (key, value) in &self.selectors {
      object.insert(key.clone(), value.to_json());
    }

    object.insert(
      "tags".to_string(),
      serde_json::Value::Array(self.tags.iter().map(Tag::to_json).collect()),
    );
    object.insert(
      "tagsToDelete".to_string(),
      serde_json::Value::Array(
        self
          .tags_to_delete
          .iter()
          .map(|name| serde_json::Value::String(name.clone()))
          .collect(),
      ),
    );
    object.insert(
      "customId".to_string(),
      serde_json::Value::String(self.custom_id.clone().unwrap_or_default()),
    );

    serde_json::Value::Object(object)
  }
}

//
// BeaconSink
//

/// The dispatch seam. Implementations take ownership of a finalized beacon and are expected to
/// return immediately; actual transmission happens off the caller's execution path.
pub trait BeaconSink: Send + Sync {
  fn send_beacon(&self, beacon: Beacon);
}
