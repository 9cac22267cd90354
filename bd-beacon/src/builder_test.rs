// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::{Beacon, BeaconBuilder, BeaconSink, Error, SelectorValue};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;

//
// RecordingSink
//

#[derive(Default)]
struct RecordingSink {
  beacons: parking_lot::Mutex<Vec<Beacon>>,
}

impl BeaconSink for RecordingSink {
  fn send_beacon(&self, beacon: Beacon) {
    self.beacons.lock().push(beacon);
  }
}

fn builder() -> (BeaconBuilder, Arc<RecordingSink>) {
  let sink = Arc::new(RecordingSink::default());
  (BeaconBuilder::new(sink.clone()), sink)
}

fn sent_beacon(sink: &RecordingSink) -> Beacon {
  let beacons = sink.beacons.lock();
  assert_eq!(1, beacons.len());
  beacons[0].clone()
}

#[test]
fn set_selectors_of_each_type() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder
    .set("string", "Value")?
    .set("bool", true)?
    .set("char", 'A')?
    .set("number", 421)?
    .set("float", 4.5)?;
  builder.send()?;

  let payload = sent_beacon(&sink).to_payload();
  assert_eq!(serde_json::json!("Value"), payload["string"]);
  assert_eq!(serde_json::json!(true), payload["bool"]);
  assert_eq!(serde_json::json!("A"), payload["char"]);
  assert_eq!(serde_json::json!(421), payload["number"]);
  assert_eq!(serde_json::json!(4.5), payload["float"]);

  Ok(())
}

#[test]
fn selector_last_write_wins() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.set("key", "first")?.set("key", "second")?;
  builder.send()?;

  assert_eq!(
    Some(&SelectorValue::String("second".to_string())),
    sent_beacon(&sink).selector("key")
  );

  Ok(())
}

#[test]
fn append_tag_uses_default_label() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.append_tag("tag1")?;
  builder.send()?;

  let beacon = sent_beacon(&sink);
  assert_eq!(1, beacon.tags().len());
  assert_eq!("tag1", beacon.tags()[0].name);
  assert_eq!("default", beacon.tags()[0].label);

  Ok(())
}

#[test]
fn tag_payload_shape() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder
    .append_tag_with_label("tag1", "label1")?
    .append_tag_with_label("tag2", "label2")?
    .append_tag_with_label("tag3", "label3")?;
  builder.send()?;

  let payload = sent_beacon(&sink).to_payload();
  assert_eq!(
    serde_json::json!([
      {"tag": "tag1", "label": "label1", "strategy": "append", "ttl": 0},
      {"tag": "tag2", "label": "label2", "strategy": "append", "ttl": 0},
      {"tag": "tag3", "label": "label3", "strategy": "append", "ttl": 0},
    ]),
    payload["tags"]
  );

  Ok(())
}

#[test]
fn duplicate_tags_collapse_and_last_label_wins() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder
    .append_tag_with_label("tag1", "label1")?
    .append_tag_with_label("tag1", "label2")?
    .append_tag("tag1")?;
  builder.send()?;

  let beacon = sent_beacon(&sink);
  assert_eq!(1, beacon.tags().len());
  assert_eq!("default", beacon.tags()[0].label);

  Ok(())
}

#[test]
fn remove_tags_are_scheduled_for_deletion() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.remove_tags(["tag1", "tag2"])?;
  builder.send()?;

  let beacon = sent_beacon(&sink);
  assert!(beacon.tags().is_empty());
  assert_eq!(
    vec!["tag1".to_string(), "tag2".to_string()],
    beacon.tags_to_delete().to_vec()
  );
  assert_eq!(
    serde_json::json!(["tag1", "tag2"]),
    beacon.to_payload()["tagsToDelete"]
  );

  Ok(())
}

// append("a"), append("b" with label "c"), set("x", true), remove("a") finalizes with only the
// labeled tag, the selector, and "a" scheduled for deletion.
#[test]
fn remove_after_append_drops_the_tag() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder
    .append_tag("a")?
    .append_tag_with_label("b", "c")?
    .set("x", true)?
    .remove_tag("a")?;
  builder.send()?;

  let beacon = sent_beacon(&sink);
  assert_eq!(1, beacon.tags().len());
  assert_eq!("b", beacon.tags()[0].name);
  assert_eq!("c", beacon.tags()[0].label);
  assert_eq!(vec!["a".to_string()], beacon.tags_to_delete().to_vec());
  assert_eq!(Some(&SelectorValue::Bool(true)), beacon.selector("x"));
  assert_eq!(None, beacon.custom_id());

  Ok(())
}

// Net-effect policy: add, remove, add again leaves the tag present and cancels the pending
// deletion.
#[test]
fn tag_readded_after_removal_stays_present() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.append_tag("t")?.remove_tag("t")?.append_tag("t")?;
  builder.send()?;

  let beacon = sent_beacon(&sink);
  assert_eq!(1, beacon.tags().len());
  assert_eq!("t", beacon.tags()[0].name);
  assert!(beacon.tags_to_delete().is_empty());

  Ok(())
}

#[test]
fn custom_id_last_write_wins() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.set_custom_id("id1")?.set_custom_id("id2")?;
  builder.send()?;

  let beacon = sent_beacon(&sink);
  assert_eq!(Some("id2"), beacon.custom_id());
  assert_eq!(serde_json::json!("id2"), beacon.to_payload()["customId"]);

  Ok(())
}

#[test]
fn empty_beacon_payload() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.send()?;

  assert_eq!(
    serde_json::json!({
      "tags": [],
      "tagsToDelete": [],
      "customId": "",
    }),
    sent_beacon(&sink).to_payload()
  );

  Ok(())
}

#[test]
fn every_mutator_fails_after_send() -> Result<(), Error> {
  let (mut builder, _sink) = builder();
  builder.send()?;

  assert_matches!(builder.set("key", "value"), Err(Error::AlreadyFinalized));
  assert_matches!(builder.append_tag("tag"), Err(Error::AlreadyFinalized));
  assert_matches!(
    builder.append_tag_with_label("tag", "label"),
    Err(Error::AlreadyFinalized)
  );
  assert_matches!(builder.remove_tag("tag"), Err(Error::AlreadyFinalized));
  assert_matches!(builder.remove_tags(["tag"]), Err(Error::AlreadyFinalized));
  assert_matches!(builder.set_custom_id("id"), Err(Error::AlreadyFinalized));
  assert_matches!(builder.send(), Err(Error::AlreadyFinalized));

  Ok(())
}

#[test]
fn send_happens_exactly_once() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder.append_tag("tag")?;
  builder.send()?;
  assert_matches!(builder.send(), Err(Error::AlreadyFinalized));

  assert_eq!(1, sink.beacons.lock().len());

  Ok(())
}

#[test]
fn builder_debug_reports_state() -> Result<(), Error> {
  let (mut builder, _sink) = builder();

  assert!(format!("{builder:?}").contains("building"));
  builder.send()?;
  assert!(format!("{builder:?}").contains("sent"));

  Ok(())
}

#[test]
fn empty_inputs_are_ignored() -> Result<(), Error> {
  let (mut builder, sink) = builder();

  builder
    .set("", "value")?
    .append_tag("")?
    .remove_tag("")?
    .set_custom_id("")?;
  builder.send()?;

  assert_eq!(
    serde_json::json!({
      "tags": [],
      "tagsToDelete": [],
      "customId": "",
    }),
    sent_beacon(&sink).to_payload()
  );

  Ok(())
}
