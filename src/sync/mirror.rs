// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Field-level mirroring of a source declaration into one destination.

use crate::constants::annotations;
use crate::store::{PatchOutcome, SecretPatch, SecretStore};
use crate::sync::declaration::SourceDeclaration;
use crate::sync::retry::{Attempt, RetryPolicy};
use crate::types::{ObjectRef, SecretSnapshot, SyncCondition};
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Result of mirroring one source into one destination
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorOutcome {
    pub condition: SyncCondition,
    /// Resource version produced by our write, if we wrote
    pub written_version: Option<String>,
    pub message: Option<String>,
}

impl MirrorOutcome {
    fn new(condition: SyncCondition) -> Self {
        Self {
            condition,
            written_version: None,
            message: None,
        }
    }
}

enum Step {
    Unchanged,
    Written(Option<String>),
    Missing,
}

pub struct MirrorEngine<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: SecretStore> MirrorEngine<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Copy the fields of every source into an existing destination with a single
    /// write. Sources are applied in order, so a later source wins on a shared key.
    /// The destination is re-read before every write attempt; it is never created.
    #[instrument(skip(self, sources), fields(sources = sources.len(), destination = %destination))]
    pub async fn mirror(
        &self,
        sources: &[Arc<SourceDeclaration>],
        destination: &ObjectRef,
    ) -> MirrorOutcome {
        let fields = &combine_sources(sources);
        let result = self
            .retry
            .run(move |_| self.attempt(fields, destination))
            .await;

        match result {
            Ok(Step::Unchanged) => {
                debug!("Secret {} already in sync", destination);
                MirrorOutcome::new(SyncCondition::Synced)
            }
            Ok(Step::Written(version)) => {
                info!("Synced secret {} from {} source(s)", destination, sources.len());
                MirrorOutcome {
                    written_version: version,
                    ..MirrorOutcome::new(SyncCondition::Synced)
                }
            }
            Ok(Step::Missing) => {
                warn!("Secret not found: {}", destination);
                MirrorOutcome {
                    message: Some(format!("destination {} does not exist", destination)),
                    ..MirrorOutcome::new(SyncCondition::DestinationMissing)
                }
            }
            Err(exhausted) => {
                error!("Failed to sync secret {}: {}", destination, exhausted);
                MirrorOutcome {
                    message: Some(exhausted.to_string()),
                    ..MirrorOutcome::new(SyncCondition::SyncFailed)
                }
            }
        }
    }

    async fn attempt(
        &self,
        fields: &BTreeMap<String, ByteString>,
        destination: &ObjectRef,
    ) -> Attempt<Step> {
        let current = match self.store.get(destination).await {
            Ok(Some(current)) => current,
            Ok(None) => return Attempt::Done(Step::Missing),
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let Some(patch) = plan_patch(&current, fields) else {
            return Attempt::Done(Step::Unchanged);
        };

        match self
            .store
            .conditional_patch(destination, &patch, current.resource_version.as_deref())
            .await
        {
            Ok(PatchOutcome::Applied { resource_version }) => {
                Attempt::Done(Step::Written(resource_version))
            }
            Ok(PatchOutcome::Conflict) => {
                Attempt::Retry(format!("{} was modified concurrently", destination))
            }
            Ok(PatchOutcome::NotFound) => Attempt::Done(Step::Missing),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }
}

/// Fields of all `sources` folded in order; later sources overwrite earlier ones
pub fn combine_sources(sources: &[Arc<SourceDeclaration>]) -> BTreeMap<String, ByteString> {
    sources.iter().fold(BTreeMap::new(), |combined, source| {
        merge_fields(&combined, &source.data)
    })
}

/// Overlay the source's fields on the destination's. Keys only present in the
/// destination are kept.
pub fn merge_fields(
    current: &BTreeMap<String, ByteString>,
    source: &BTreeMap<String, ByteString>,
) -> BTreeMap<String, ByteString> {
    let mut merged = current.clone();
    merged.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// The patch that brings `current` in line with `source`, or `None` when the
/// merged result and the watch marker are already in place.
pub fn plan_patch(
    current: &SecretSnapshot,
    source: &BTreeMap<String, ByteString>,
) -> Option<SecretPatch> {
    let merged = merge_fields(&current.data, source);
    if merged == current.data && current.has_watch_marker() {
        return None;
    }

    let data = merged
        .into_iter()
        .filter(|(k, v)| current.data.get(k) != Some(v))
        .collect();

    Some(SecretPatch {
        data,
        annotations: BTreeMap::from([(
            annotations::WATCH.to_string(),
            annotations::WATCH_VALUE.to_string(),
        )]),
    })
}
