// beacon-sdk - bitdrift's push subscription and beacon client libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./shutdown_test.rs"]
mod shutdown_test;

use std::sync::mpsc;
use tokio::sync::watch;

//
// ShutdownTrigger
//

/// Initiates shutdown for the dispatch loop. The trigger knows every component has wound down
/// once all [`Shutdown`] receivers have dropped: the watch channel reports this to the async
/// path, the completion channel to the blocking path.
#[derive(Debug)]
pub struct ShutdownTrigger {
  tx: watch::Sender<bool>,
  completion_tx: mpsc::Sender<()>,
  completion_rx: mpsc::Receiver<()>,
}

impl Default for ShutdownTrigger {
  fn default() -> Self {
    let (tx, _) = watch::channel(false);
    let (completion_tx, completion_rx) = mpsc::channel();
    Self {
      tx,
      completion_tx,
      completion_rx,
    }
  }
}

impl ShutdownTrigger {
  #[must_use]
  pub fn make_shutdown(&self) -> Shutdown {
    Shutdown {
      rx: self.tx.subscribe(),
      _completion_tx: self.completion_tx.clone(),
    }
  }

  /// Signal shutdown and wait for all shutdown receivers to drop. Used in async context.
  pub async fn shutdown(self) {
    self.tx.send_replace(true);
    self.tx.closed().await;
  }

  /// Signal shutdown and wait for all shutdown receivers to drop. Used in sync context.
  pub fn shutdown_blocking(self) {
    let Self {
      tx,
      completion_tx,
      completion_rx,
    } = self;

    tx.send_replace(true);
    drop(completion_tx);
    // The channel never carries a value; recv() returns (with an error) once every sender clone
    // held by an outstanding Shutdown has dropped.
    let _ignored = completion_rx.recv();
  }
}

//
// Shutdown
//

/// The receiving half held by a running component. The component polls [`Self::cancelled`] in its
/// select loop and drops this when it has finished winding down.
#[derive(Clone, Debug)]
pub struct Shutdown {
  rx: watch::Receiver<bool>,
  _completion_tx: mpsc::Sender<()>,
}

impl Shutdown {
  /// Returns when shutdown has been signaled.
  pub async fn cancelled(&mut self) {
    if *self.rx.borrow_and_update() {
      return;
    }
    let _ignored = self.rx.changed().await;
  }
}
