// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./credentials_test.rs"]
mod credentials_test;

use crate::Error;
use regex::Regex;
use std::sync::LazyLock;

// Both patterns are literals, construction cannot fail.
#[allow(clippy::unwrap_used)]
static API_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new("^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

#[allow(clippy::unwrap_used)]
static PROJECT_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[a-z0-9]{24}$").unwrap());

/// Validates that the API key is a lowercase hex UUID.
pub(crate) fn validate_api_key(api_key: &str) -> Result<(), Error> {
  if API_KEY_REGEX.is_match(api_key) {
    Ok(())
  } else {
    Err(Error::InvalidApiKey(api_key.to_string()))
  }
}

/// Validates that the project ID is a 24 character lowercase alphanumeric string.
pub(crate) fn validate_project_id(project_id: &str) -> Result<(), Error> {
  if PROJECT_ID_REGEX.is_match(project_id) {
    Ok(())
  } else {
    Err(Error::InvalidProjectId(project_id.to_string()))
  }
}
