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

pub mod api;
pub mod shutdown;
pub mod subscriber;


pub use api::{Api, HttpApi};
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use bd_beacon::{Beacon, BeaconSink};
use bd_log::warn_every;
pub use shutdown::{Shutdown, ShutdownTrigger};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
pub use subscriber::Subscriber;
use time::ext::NumericalDuration;
use tokio::sync::mpsc;

// bd-test-helpers consumes this crate's Api trait, so its shared mocks (and its init hook)
// cannot be used from this crate's own unit tests without pulling a second copy of the crate
// into the test build. The logger is initialized directly instead.
#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  bd_log::SwapLogger::initialize();
}

/// Uploads queued past this point are dropped. The queue only backs up when the network is
/// down for an extended period, at which point newer beacons are worth more than older ones
/// anyway.
const UPLOAD_QUEUE_CAPACITY: usize = 256;

const RETRY_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
const RETRY_BUDGET: Duration = Duration::from_secs(60);

//
// EventType
//

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventType {
  Clicked,
  Delivered,
}

impl EventType {
  const fn as_str(self) -> &'static str {
    match self {
      Self::Clicked => "clicked",
      Self::Delivered => "delivered",
    }
  }
}

//
// Event
//

/// A notification lifecycle event (clicked/delivered) tied to a campaign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
  pub event_type: EventType,
  pub campaign: String,
  pub button_id: Option<u32>,
}

impl Event {
  #[must_use]
  pub fn to_payload(&self) -> serde_json::Value {
    serde_json::json!({
      "type": self.event_type.as_str(),
      "payload": {
        "campaign": self.campaign,
        "button": self.button_id.unwrap_or(0),
      },
    })
  }
}

//
// Upload
//

/// A unit of work for the dispatch loop. Everything the SDK sends upstream funnels through this
/// single queue so ordering between registration and subsequent beacons is preserved.
#[derive(Debug)]
pub enum Upload {
  Beacon(Beacon),
  Register { token: String },
  Unregister,
  Event(Event),
}

//
// DispatcherHandle
//

/// The cheaply cloneable enqueue side of the dispatcher. All operations are non-blocking: a full
/// queue drops the upload with a rate-limited warning rather than stalling the caller.
#[derive(Clone)]
pub struct DispatcherHandle {
  tx: mpsc::Sender<Upload>,
}

impl DispatcherHandle {
  pub fn enqueue(&self, upload: Upload) {
    if let Err(e) = self.tx.try_send(upload) {
      warn_every!(15.seconds(), "dropping upload, queue unavailable: {:?}", e);
    }
  }

  pub fn register_subscriber(&self, token: &str) {
    self.enqueue(Upload::Register {
      token: token.to_string(),
    });
  }

  pub fn unregister_subscriber(&self) {
    self.enqueue(Upload::Unregister);
  }

  pub fn send_event(&self, event: Event) {
    self.enqueue(Upload::Event(event));
  }
}

impl BeaconSink for DispatcherHandle {
  fn send_beacon(&self, beacon: Beacon) {
    self.enqueue(Upload::Beacon(beacon));
  }
}

//
// Dispatcher
//

/// The upload worker. Owns the receive side of the queue and runs until shutdown is signaled or
/// every handle has dropped, transmitting each upload with retries.
pub struct Dispatcher {
  rx: mpsc::Receiver<Upload>,
  api: Arc<dyn Api>,
  subscriber: Arc<Subscriber>,
  shutdown: Shutdown,
  retry_policy: ExponentialBackoff,
}

impl Dispatcher {
  #[must_use]
  pub fn new(
    api: Arc<dyn Api>,
    subscriber: Arc<Subscriber>,
    shutdown: Shutdown,
  ) -> (Self, DispatcherHandle) {
    let (tx, rx) = mpsc::channel(UPLOAD_QUEUE_CAPACITY);

    (
      Self {
        rx,
        api,
        subscriber,
        shutdown,
        retry_policy: default_retry_policy(),
      },
      DispatcherHandle { tx },
    )
  }

  /// Replaces the backoff policy applied to each upload.
  #[must_use]
  pub fn with_retry_policy(mut self, retry_policy: ExponentialBackoff) -> Self {
    self.retry_policy = retry_policy;
    self
  }

  pub async fn run(mut self) {
    loop {
      tokio::select! {
        upload = self.rx.recv() => {
          match upload {
            Some(upload) => self.handle_upload(upload).await,
            // Every handle has dropped, nothing further can be enqueued.
            None => return,
          }
        },
        () = self.shutdown.cancelled() => {
          log::debug!("dispatcher shutting down");
          self.drain().await;
          return;
        },
      }
    }
  }

  /// Processes whatever is already queued so in-flight beacons are not lost on shutdown. New
  /// uploads enqueued after this point are dropped.
  async fn drain(&mut self) {
    while let Ok(upload) = self.rx.try_recv() {
      self.handle_upload(upload).await;
    }
  }

  async fn handle_upload(&self, upload: Upload) {
    match upload {
      Upload::Register { token } => {
        match with_retry(self.retry_policy.clone(), "subscriber registration", || {
          self.api.register_subscriber(&token)
        })
        .await
        {
          Ok(id) => self.subscriber.record_registration(&id, &token),
          Err(e) => log::error!("failed to register subscriber: {e:?}"),
        }
      },
      Upload::Unregister => {
        let Some(id) = self.subscriber.id() else {
          log::debug!("ignoring unregister, no subscriber is registered");
          return;
        };

        match with_retry(self.retry_policy.clone(), "subscriber unregistration", || {
          self.api.unregister_subscriber(&id)
        })
        .await
        {
          Ok(()) => self.subscriber.clear(),
          Err(e) => log::error!("failed to unregister subscriber: {e:?}"),
        }
      },
      Upload::Beacon(beacon) => {
        let Some(id) = self.subscriber.id() else {
          warn_every!(
            15.seconds(),
            "{}",
            "dropping beacon, no subscriber is registered"
          );
          return;
        };

        let payload = beacon.to_payload();
        if let Err(e) = with_retry(self.retry_policy.clone(), "beacon upload", || {
          self.api.send_beacon(&id, &payload)
        })
        .await
        {
          log::error!("failed to send beacon: {e:?}");
        }
      },
      Upload::Event(event) => {
        let Some(id) = self.subscriber.id() else {
          warn_every!(
            15.seconds(),
            "{}",
            "dropping event, no subscriber is registered"
          );
          return;
        };

        let payload = event.to_payload();
        if let Err(e) = with_retry(self.retry_policy.clone(), "event upload", || {
          self.api.send_event(&id, &payload)
        })
        .await
        {
          log::error!("failed to send event: {e:?}");
        }
      },
    }
  }
}

fn default_retry_policy() -> ExponentialBackoff {
  ExponentialBackoff {
    initial_interval: RETRY_INITIAL_INTERVAL,
    max_elapsed_time: Some(RETRY_BUDGET),
    ..ExponentialBackoff::default()
  }
}

/// Runs the operation with exponential backoff until it succeeds or the policy's retry budget is
/// exhausted, returning the last error in that case.
async fn with_retry<T, F, Fut>(
  mut backoff: ExponentialBackoff,
  description: &str,
  mut operation: F,
) -> anyhow::Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = anyhow::Result<T>>,
{
  // The policy's elapsed-time budget counts from its creation; restart it so the budget applies
  // to this operation rather than to the dispatcher's lifetime.
  backoff.reset();

  loop {
    match operation().await {
      Ok(value) => return Ok(value),
      Err(e) => {
        let Some(delay) = backoff.next_backoff() else {
          return Err(e);
        };

        log::debug!("{description} failed, retrying in {delay:?}: {e:?}");
        tokio::time::sleep(delay).await;
      },
    }
  }
}
