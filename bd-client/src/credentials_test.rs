// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::{validate_api_key, validate_project_id};
use pretty_assertions::assert_eq;

#[test]
fn valid_api_key_is_accepted() {
  assert!(validate_api_key("57118b49-eb83-4de4-aea9-872144b443fc").is_ok());
}

#[test]
fn invalid_api_key_is_rejected() {
  let error = validate_api_key("empty1").unwrap_err();
  assert_eq!(
    "Invalid API key! Current API key: `empty1`",
    error.to_string()
  );
}

#[test]
fn uppercase_api_key_is_rejected() {
  assert!(validate_api_key("57118B49-EB83-4DE4-AEA9-872144B443FC").is_err());
}

#[test]
fn valid_project_id_is_accepted() {
  assert!(validate_project_id("5d411352784425000bd02a15").is_ok());
}

#[test]
fn invalid_project_id_is_rejected() {
  let error = validate_project_id("empty2").unwrap_err();
  assert_eq!(
    "Invalid project ID! Current project ID: `empty2`",
    error.to_string()
  );
}

#[test]
fn project_id_must_be_exactly_24_characters() {
  assert!(validate_project_id("5d411352784425000bd02a1").is_err());
  assert!(validate_project_id("5d411352784425000bd02a155").is_err());
}
