// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::{ClientBuilder, Error, Event, EventType, InitParams};
use assert_matches::assert_matches;
use bd_test_helpers::{MemStorage, RecordingApi};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const API_KEY: &str = "57118b49-eb83-4de4-aea9-872144b443fc";
const PROJECT_ID: &str = "5d411352784425000bd02a15";

fn make_params() -> InitParams {
  InitParams {
    api_key: API_KEY.to_string(),
    project_id: PROJECT_ID.to_string(),
    api_address: "https://api.example.com".to_string(),
    storage: Box::new(MemStorage::default()),
  }
}

#[test]
fn build_rejects_an_invalid_api_key() {
  let mut params = make_params();
  params.api_key = "not-a-key".to_string();

  let error = ClientBuilder::new(params).build().map(|_| ()).unwrap_err();
  assert_eq!(
    "Invalid API key! Current API key: `not-a-key`",
    error.to_string()
  );
}

#[test]
fn build_rejects_an_invalid_project_id() {
  let mut params = make_params();
  params.project_id = "nope".to_string();

  let error = ClientBuilder::new(params).build().map(|_| ()).unwrap_err();
  assert_eq!(
    "Invalid project ID! Current project ID: `nope`",
    error.to_string()
  );
}

#[test]
fn exposes_credentials() {
  let (client, _future) = ClientBuilder::new(make_params())
    .with_api(Arc::new(RecordingApi::default()))
    .build()
    .unwrap();

  assert_eq!(API_KEY, client.api_key());
  assert_eq!(PROJECT_ID, client.project_id());
  assert!(!client.is_subscribed());
}

#[tokio::test]
async fn uploads_flow_through_the_client() {
  let api = Arc::new(RecordingApi::default());
  let (client, future) = ClientBuilder::new(make_params())
    .with_api(api.clone())
    .build()
    .unwrap();
  let dispatcher_task = tokio::spawn(future);

  client.register_subscriber("token-1");

  let mut beacon = client.create_beacon();
  beacon.set("premium", true).unwrap();
  beacon.send().unwrap();

  client.send_event(Event {
    event_type: EventType::Delivered,
    campaign: "campaign-1".to_string(),
    button_id: None,
  });

  client.shutdown().await;
  dispatcher_task.await.unwrap();

  assert_eq!(vec!["token-1".to_string()], *api.register_calls.lock());
  assert_eq!(1, api.beacon_calls.lock().len());
  assert_eq!(1, api.event_calls.lock().len());
  assert!(client.is_subscribed());
  assert_eq!(Some("subscriber-1".to_string()), client.subscriber_id());
  assert_eq!(Some("token-1".to_string()), client.last_token());
}

#[tokio::test]
async fn unregistration_clears_the_subscription() {
  let api = Arc::new(RecordingApi::default());
  let (client, future) = ClientBuilder::new(make_params())
    .with_api(api.clone())
    .build()
    .unwrap();
  let dispatcher_task = tokio::spawn(future);

  client.register_subscriber("token-1");
  client.unregister_subscriber();

  client.shutdown().await;
  dispatcher_task.await.unwrap();

  assert!(!client.is_subscribed());
  assert_eq!(None, client.subscriber_id());
}

#[test]
fn debug_output_omits_the_api_key() {
  let (client, _future) = ClientBuilder::new(make_params())
    .with_api(Arc::new(RecordingApi::default()))
    .build()
    .unwrap();

  let debug = format!("{client:?}");
  assert!(debug.contains(PROJECT_ID));
  assert!(!debug.contains(API_KEY));
}

#[test]
fn global_instance_lifecycle() {
  assert!(!crate::is_initialized());
  assert_matches!(crate::instance(), Err(Error::Uninitialized));

  let client = crate::initialize(make_params()).unwrap();

  assert!(crate::is_initialized());
  assert!(Arc::ptr_eq(&client, &crate::instance().unwrap()));
  client.shutdown_blocking();
}
