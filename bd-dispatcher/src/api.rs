// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./api_test.rs"]
mod api_test;

use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

//
// Api
//

/// The backend surface consumed by the dispatcher. Split out as a trait so tests (and embedders
/// without network access) can substitute their own transport.
#[async_trait::async_trait]
pub trait Api: Send + Sync {
  /// Registers a subscriber for the provided push token, returning the backend-assigned
  /// subscriber ID.
  async fn register_subscriber(&self, token: &str) -> anyhow::Result<String>;

  async fn unregister_subscriber(&self, subscriber_id: &str) -> anyhow::Result<()>;

  async fn send_beacon(
    &self,
    subscriber_id: &str,
    payload: &serde_json::Value,
  ) -> anyhow::Result<()>;

  async fn send_event(
    &self,
    subscriber_id: &str,
    payload: &serde_json::Value,
  ) -> anyhow::Result<()>;
}

//
// ObjectResponse
//

/// The backend's generic response envelope.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ObjectResponse {
  #[serde(rename = "_id", default)]
  pub id: Option<String>,

  #[serde(default)]
  pub message: Option<String>,
}

//
// HttpApi
//

/// An implementation of [`Api`] over plain JSON REST using hyper, for use in native contexts.
pub struct HttpApi {
  address: String,
  api_key: String,
  project_id: String,
  client: Client<HttpsConnector<HttpConnector>, String>,
}

impl HttpApi {
  #[must_use]
  pub fn new(address: String, api_key: String, project_id: String) -> Self {
    let client = Client::builder(TokioExecutor::new()).build(make_tls_connector());

    Self {
      address,
      api_key,
      project_id,
      client,
    }
  }

  async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<&serde_json::Value>,
  ) -> anyhow::Result<ObjectResponse> {
    let uri = format!("{}{path}", self.address);
    let request = Request::builder()
      .method(method)
      .uri(uri)
      .header("content-type", "application/json")
      .header("x-token", &self.api_key)
      .body(body.map_or_else(String::new, serde_json::Value::to_string))?;

    let response = self.client.request(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();

    if !status.is_success() {
      return Err(response_error(path, status, &bytes));
    }

    if bytes.is_empty() {
      return Ok(ObjectResponse::default());
    }

    Ok(serde_json::from_slice(&bytes)?)
  }
}

#[async_trait::async_trait]
impl Api for HttpApi {
  async fn register_subscriber(&self, token: &str) -> anyhow::Result<String> {
    let path = format!("/v1/{}/subscriber", self.project_id);
    let response = self
      .request(
        Method::POST,
        &path,
        Some(&serde_json::json!({ "token": token })),
      )
      .await?;

    response
      .id
      .filter(|id| !id.is_empty())
      .ok_or_else(|| anyhow::anyhow!("register response is missing a subscriber ID"))
  }

  async fn unregister_subscriber(&self, subscriber_id: &str) -> anyhow::Result<()> {
    let path = format!("/v1/{}/subscriber/{subscriber_id}", self.project_id);
    self.request(Method::DELETE, &path, None).await?;

    Ok(())
  }

  async fn send_beacon(
    &self,
    subscriber_id: &str,
    payload: &serde_json::Value,
  ) -> anyhow::Result<()> {
    let path = format!(
      "/v1/{}/subscriber/{subscriber_id}/beacon",
      self.project_id
    );
    self.request(Method::POST, &path, Some(payload)).await?;

    Ok(())
  }

  async fn send_event(
    &self,
    subscriber_id: &str,
    payload: &serde_json::Value,
  ) -> anyhow::Result<()> {
    let path = format!(
      "/v1/{}/subscriber/{subscriber_id}/event",
      self.project_id
    );
    self.request(Method::POST, &path, Some(payload)).await?;

    Ok(())
  }
}

/// Builds the error for a non-success response, folding in the backend's `message` when the body
/// carries one.
fn response_error(path: &str, status: StatusCode, body: &[u8]) -> anyhow::Error {
  match serde_json::from_slice::<ObjectResponse>(body)
    .ok()
    .and_then(|response| response.message)
  {
    Some(message) => {
      anyhow::anyhow!("request to {path} failed with status {status}: {message}")
    },
    None => anyhow::anyhow!("request to {path} failed with status {status}"),
  }
}

fn make_tls_connector() -> HttpsConnector<HttpConnector> {
  let mut connector = HttpConnector::new();
  connector.enforce_http(false);

  HttpsConnectorBuilder::new()
    .with_webpki_roots()
    .https_or_http()
    .enable_http1()
    .wrap_connector(connector)
}
