// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use secret_sync::config::Config;
use secret_sync::kubernetes::KubeSecretStore;
use secret_sync::reconcilers::SecretWatcher;
use secret_sync::sync::SyncManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting secret-sync operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, resync_interval={:?}, max_attempts={}",
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.resync_interval,
        config.retry.max_attempts
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let store = Arc::new(KubeSecretStore::new(client, config.watch_namespace.clone()));

    // Create the sync manager and get a handle for the watcher
    let (sync_manager, sync_handle) = SyncManager::new(store.clone(), config);
    let secret_watcher = SecretWatcher::new(store, sync_handle);

    info!("Starting sync manager and secret watcher...");
    tokio::try_join!(sync_manager.run(), secret_watcher.run())?;

    // The watch stream retries forever, so this is not expected
    warn!("Secret watcher stopped unexpectedly");
    Ok(())
}
