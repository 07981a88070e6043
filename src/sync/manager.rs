// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator that owns the relationship index and drives mirroring.

use crate::config::Config;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::store::{Notification, NotificationKind, SecretStore};
use crate::sync::classifier::{classify, Classification, WriteLedger};
use crate::sync::index::RelationshipIndex;
use crate::sync::mirror::MirrorEngine;
use crate::sync::resync::ResyncPass;
use crate::sync::retry::RetryPolicy;
use crate::sync::status::StatusBoard;
use crate::types::{ConditionReport, SyncCondition};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Events sent to the SyncManager
#[derive(Debug)]
pub enum SyncEvent {
    /// A secret was added, modified, deleted or listed
    Notification(Notification),
    /// Run a full resync pass now
    Resync,
    /// Report the latest sync conditions
    Conditions(oneshot::Sender<Vec<ConditionReport>>),
}

/// Owns the relationship index and processes one event at a time.
/// Mirror writes of one event run concurrently across destinations, one write each.
pub struct SyncManager<S> {
    store: Arc<S>,
    config: Config,
    engine: MirrorEngine<S>,
    index: RelationshipIndex,
    ledger: WriteLedger,
    status: StatusBoard,
    event_rx: mpsc::Receiver<SyncEvent>,
}

/// Handle to send events to the SyncManager
#[derive(Clone)]
pub struct SyncManagerHandle {
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncManagerHandle {
    pub async fn send(&self, event: SyncEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to SyncManager: {}", e);
        }
    }

    pub async fn notify(&self, notification: Notification) {
        self.send(SyncEvent::Notification(notification)).await;
    }

    pub async fn resync(&self) {
        self.send(SyncEvent::Resync).await;
    }

    /// Latest condition of every tracked pair; empty once the manager has stopped
    pub async fn conditions(&self) -> Vec<ConditionReport> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SyncEvent::Conditions(reply_tx)).await;
        reply_rx.await.unwrap_or_default()
    }
}

impl<S: SecretStore> SyncManager<S> {
    pub fn new(store: Arc<S>, config: Config) -> (Self, SyncManagerHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let engine = MirrorEngine::new(store.clone(), RetryPolicy::new(config.retry));

        let manager = Self {
            store,
            config,
            engine,
            index: RelationshipIndex::new(),
            ledger: WriteLedger::default(),
            status: StatusBoard::new(),
            event_rx,
        };

        let handle = SyncManagerHandle { event_tx };
        (manager, handle)
    }

    /// Resync, then process events until every handle is dropped
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("SyncManager started, performing initial resync...");
        self.resync().await;
        info!("Initial resync complete, listening for events...");

        let period = self.config.resync_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                _ = ticker.tick() => self.resync().await,
            }
        }

        info!("All handles dropped, SyncManager stopping");
        Ok(())
    }

    async fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Notification(notification) => {
                self.handle_notification(notification).await;
            }
            SyncEvent::Resync => {
                self.resync().await;
            }
            SyncEvent::Conditions(reply) => {
                if reply.send(self.status.conditions()).is_err() {
                    debug!("Condition requester went away");
                }
            }
        }
    }

    #[instrument(skip(self, notification), fields(secret = %notification.reference(), kind = ?notification.kind))]
    async fn handle_notification(&mut self, notification: Notification) {
        let classification = classify(&mut self.index, &self.ledger, &notification);
        let reference = notification.reference();

        if notification.kind == NotificationKind::Deleted {
            self.ledger.forget(reference);
            self.status.forget_source(reference);
        } else {
            let declaration = self.index.declaration(reference).cloned();
            self.status.prune(reference, declaration.as_deref());
            if declaration.is_none() && classification.conditions.is_empty() {
                self.status.forget_source(reference);
            }
        }

        self.apply(classification).await;
    }

    /// List every secret, rebuild the index from the listing and mirror what it implies
    #[instrument(skip(self))]
    async fn resync(&mut self) {
        let snapshots = match self.store.list().await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error!("Resync failed to list secrets: {}", e);
                return;
            }
        };

        let mut pass = ResyncPass::new();
        for snapshot in snapshots {
            pass.observe(&mut self.index, &self.ledger, snapshot);
        }
        self.ledger.retain(|reference| pass.was_observed(reference));

        let summary = pass.finish(&mut self.index);
        for source in &summary.removed {
            warn!("Source secret {} no longer exists, dropping it", source);
        }
        self.status.retain_declared(&self.index);

        info!(
            "Resync observed {} secrets, tracking {} sources",
            summary.observed,
            self.index.len()
        );
        self.apply(summary.classification).await;

        let unhealthy = self
            .status
            .conditions()
            .iter()
            .filter(|report| !report.condition.is_healthy())
            .count();
        if unhealthy > 0 {
            warn!("{} sync conditions are not healthy after resync", unhealthy);
        }
    }

    async fn apply(&mut self, classification: Classification) {
        for report in classification.conditions {
            self.status.record(report);
        }

        let mut plan = classification.plan;
        if let Some(namespace) = self.config.watch_namespace.as_deref() {
            // Destinations we cannot watch would never be checked for drift
            for (destination, sources) in plan.split_off_outside(namespace) {
                warn!(
                    "Destination {} is outside the watched namespace {}, not syncing it",
                    destination, namespace
                );
                for source in sources {
                    let report = ConditionReport::new(
                        source.source.clone(),
                        destination.clone(),
                        SyncCondition::MalformedDeclaration,
                    )
                    .with_message(format!("{} is outside namespace {}", destination, namespace));
                    self.status.record(report);
                }
            }
        }

        if plan.is_empty() {
            return;
        }
        debug!("Mirroring {} source/destination pairs", plan.len());

        let engine = &self.engine;
        let results = join_all(plan.into_iter().map(|(destination, sources)| async move {
            // One combined write per destination
            let outcome = engine.mirror(&sources, &destination).await;
            (destination, sources, outcome)
        }))
        .await;

        for (destination, sources, outcome) in results {
            if let Some(version) = outcome.written_version {
                self.ledger.record(destination.clone(), version);
            }
            for source in sources {
                let mut report =
                    ConditionReport::new(source.source.clone(), destination.clone(), outcome.condition);
                if let Some(message) = &outcome.message {
                    report = report.with_message(message.clone());
                }
                self.status.record(report);
            }
        }
    }
}
