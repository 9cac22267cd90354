// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::{Client, InitParams, credentials};
use bd_dispatcher::{Api, Dispatcher, HttpApi, ShutdownTrigger, Subscriber};
use bd_key_value::Store;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

//
// ClientBuilder
//

/// A builder for the client.
pub struct ClientBuilder {
  // The parameters required to initialize the client.
  params: InitParams,

  api: Option<Arc<dyn Api>>,
}

impl ClientBuilder {
  /// Creates a new client builder with the provided parameters.
  #[must_use]
  pub const fn new(params: InitParams) -> Self {
    Self { params, api: None }
  }

  /// Substitutes the backend transport. By default the client talks to the configured API
  /// address over HTTPS; tests and embedders without network access can inject their own.
  #[must_use]
  pub fn with_api(mut self, api: Arc<dyn Api>) -> Self {
    self.api = Some(api);
    self
  }

  /// Builds the client.
  ///
  /// The returned future must be awaited on in order for dispatch to run. This future resolves
  /// when the client has shut down.
  pub fn build(self) -> anyhow::Result<(Client, Pin<Box<impl Future<Output = ()> + Send>>)> {
    let InitParams {
      api_key,
      project_id,
      api_address,
      storage,
    } = self.params;

    credentials::validate_api_key(&api_key)?;
    credentials::validate_project_id(&project_id)?;

    log::info!(
      "beacon client {} initialized (project id: {project_id})",
      env!("CARGO_PKG_VERSION")
    );

    let store = Arc::new(Store::new(storage));
    let subscriber = Arc::new(Subscriber::new(store));
    let shutdown_trigger = ShutdownTrigger::default();

    let api = self.api.unwrap_or_else(|| {
      Arc::new(HttpApi::new(
        api_address,
        api_key.clone(),
        project_id.clone(),
      ))
    });

    let (dispatcher, handle) = Dispatcher::new(
      api,
      subscriber.clone(),
      shutdown_trigger.make_shutdown(),
    );

    let client = Client::new(api_key, project_id, subscriber, handle, shutdown_trigger);

    Ok((client, Box::pin(dispatcher.run())))
  }

  /// Builds the client and runs the dispatch future on a dedicated thread. This is useful for
  /// running the client outside of a tokio runtime.
  pub fn build_dedicated_thread(self) -> anyhow::Result<Client> {
    let (client, future) = self.build()?;

    Self::run_client_runtime(future)?;

    Ok(client)
  }

  /// Creates a new tokio runtime on a dedicated thread suitable for running the dispatch loop,
  /// and awaits the provided future on it.
  ///
  /// This is exposed in order to make it possible to run more than just the dispatch future on
  /// the newly spawned runtime.
  pub fn run_client_runtime(
    f: impl Future<Output = ()> + Send + 'static,
  ) -> anyhow::Result<()> {
    std::thread::Builder::new()
      .name("bd-client.dispatcher".to_string())
      .spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
          .enable_all()
          .build()
        {
          Ok(runtime) => runtime.block_on(f),
          Err(e) => log::error!("failed to build the dispatch runtime: {e:?}"),
        }
      })?;

    Ok(())
  }
}
