// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./builder_test.rs"]
mod builder_test;

use crate::{Beacon, BeaconSink, Error, SelectorValue, Tag};
use bd_log::warn_every;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use time::ext::NumericalDuration;

/// The label used for tags appended without an explicit label.
const DEFAULT_TAG_LABEL: &str = "default";

//
// BeaconBuilder
//

/// Accumulates selectors, tags, and a custom ID for a single outgoing beacon, then finalizes the
/// state into an immutable [`Beacon`] and hands it to the sink.
///
/// Mutators return `Result<&mut Self, Error>` so a fluent chain can be written with `?`. Every
/// mutator fails with [`Error::AlreadyFinalized`] once `send()` has run; the builder state is a
/// tagged `Building | Sent` enum rather than a flag checked in each method.
///
/// Tag removal follows the net-effect policy: a name is present in the finalized tag set iff it
/// was appended at least once and not removed after its last append. Appending a name also
/// cancels any pending server-side deletion of that name.
pub struct BeaconBuilder {
  sink: Arc<dyn BeaconSink>,
  state: State,
}

impl std::fmt::Debug for BeaconBuilder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match self.state {
      State::Building(_) => "building",
      State::Sent => "sent",
    };

    f.debug_struct("BeaconBuilder")
      .field("state", &state)
      .finish_non_exhaustive()
  }
}

enum State {
  Building(Draft),
  Sent,
}

#[derive(Default)]
struct Draft {
  selectors: BTreeMap<String, SelectorValue>,
  tags: BTreeMap<String, String>,
  tags_to_delete: BTreeSet<String>,
  custom_id: Option<String>,
}

impl Draft {
  fn finalize(self) -> Beacon {
    let tags = self
      .tags
      .into_iter()
      .map(|(name, label)| Tag { name, label })
      .collect();

    Beacon::new(
      self.selectors,
      tags,
      self.tags_to_delete.into_iter().collect(),
      self.custom_id,
    )
  }
}

impl BeaconBuilder {
  #[must_use]
  pub fn new(sink: Arc<dyn BeaconSink>) -> Self {
    Self {
      sink,
      state: State::Building(Draft::default()),
    }
  }

  /// Sets a selector. A later call with the same key overwrites the earlier value.
  pub fn set(
    &mut self,
    key: &str,
    value: impl Into<SelectorValue>,
  ) -> Result<&mut Self, Error> {
    let draft = self.draft()?;
    if key.is_empty() {
      warn_every!(15.seconds(), "{}", "ignoring beacon selector with empty key");
      return Ok(self);
    }

    draft.selectors.insert(key.to_string(), value.into());
    Ok(self)
  }

  /// Appends a tag with the default label. Idempotent; duplicates collapse.
  pub fn append_tag(&mut self, name: &str) -> Result<&mut Self, Error> {
    self.append_tag_with_label(name, DEFAULT_TAG_LABEL)
  }

  /// Appends a tag with an explicit label. For a given name the last label wins.
  pub fn append_tag_with_label(&mut self, name: &str, label: &str) -> Result<&mut Self, Error> {
    let draft = self.draft()?;
    if name.is_empty() {
      warn_every!(15.seconds(), "{}", "ignoring beacon tag with empty name");
      return Ok(self);
    }

    draft.tags.insert(name.to_string(), label.to_string());
    draft.tags_to_delete.remove(name);
    Ok(self)
  }

  /// Removes a tag from the beacon and schedules it for server-side deletion. Absent names are
  /// silently accepted.
  pub fn remove_tag(&mut self, name: &str) -> Result<&mut Self, Error> {
    let draft = self.draft()?;
    if name.is_empty() {
      return Ok(self);
    }

    draft.tags.remove(name);
    draft.tags_to_delete.insert(name.to_string());
    Ok(self)
  }

  /// Removes zero or more tags. See [`Self::remove_tag`].
  pub fn remove_tags<I, S>(&mut self, names: I) -> Result<&mut Self, Error>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    for name in names {
      self.remove_tag(name.as_ref())?;
    }

    Ok(self)
  }

  /// Sets the custom beacon ID. A later call overwrites the earlier value.
  pub fn set_custom_id(&mut self, id: &str) -> Result<&mut Self, Error> {
    let draft = self.draft()?;
    if id.is_empty() {
      warn_every!(15.seconds(), "{}", "ignoring empty beacon custom ID");
      return Ok(self);
    }

    draft.custom_id = Some(id.to_string());
    Ok(self)
  }

  /// Finalizes the accumulated state into an immutable [`Beacon`] and hands it to the sink.
  /// Fire-and-forget: returns as soon as the beacon has been enqueued, without waiting for any
  /// network activity. All further calls on this builder fail with
  /// [`Error::AlreadyFinalized`].
  pub fn send(&mut self) -> Result<(), Error> {
    let draft = match std::mem::replace(&mut self.state, State::Sent) {
      State::Building(draft) => draft,
      State::Sent => return Err(Error::AlreadyFinalized),
    };

    self.sink.send_beacon(draft.finalize());
    Ok(())
  }

  fn draft(&mut self) -> Result<&mut Draft, Error> {
    match &mut self.state {
      State::Building(draft) => Ok(draft),
      State::Sent => Err(Error::AlreadyFinalized),
    }
  }
}
