// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret watcher - streams Secret changes from the store into the sync manager.

use crate::store::SecretStore;
use crate::sync::SyncManagerHandle;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SecretWatcher<S> {
    store: Arc<S>,
    sync_handle: SyncManagerHandle,
}

impl<S: SecretStore> SecretWatcher<S> {
    pub fn new(store: Arc<S>, sync_handle: SyncManagerHandle) -> Self {
        Self { store, sync_handle }
    }

    /// Forward every notification until the watch stream ends
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Watching secrets...");
        let mut notifications = self.store.watch();

        while let Some(item) = notifications.next().await {
            match item {
                Ok(notification) => {
                    debug!(
                        "Secret {} {:?}",
                        notification.reference(),
                        notification.kind
                    );
                    self.sync_handle.notify(notification).await;
                }
                Err(e) => warn!("Secret watch error: {}", e),
            }
        }

        info!("Secret watch stream ended");
        Ok(())
    }
}
