// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns change notifications into index updates and mirror work.

use crate::store::{Notification, NotificationKind};
use crate::sync::declaration::SourceDeclaration;
use crate::sync::index::RelationshipIndex;
use crate::types::{ConditionReport, ObjectRef, SecretSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resource versions produced by our own writes, per destination. A destination
/// event carrying one of these is our own echo, not drift.
#[derive(Debug, Default)]
pub struct WriteLedger {
    versions: HashMap<ObjectRef, String>,
}

impl WriteLedger {
    pub fn record(&mut self, destination: ObjectRef, version: String) {
        self.versions.insert(destination, version);
    }

    pub fn forget(&mut self, destination: &ObjectRef) {
        self.versions.remove(destination);
    }

    pub fn is_own_write(&self, snapshot: &SecretSnapshot) -> bool {
        snapshot.resource_version.as_ref().is_some_and(|version| {
            self.versions.get(&snapshot.reference) == Some(version)
        })
    }

    pub fn retain(&mut self, keep: impl Fn(&ObjectRef) -> bool) {
        self.versions.retain(|reference, _| keep(reference));
    }
}

/// Mirror work grouped per destination. Sources of one destination are kept in
/// index order so a later source wins on key collisions.
#[derive(Debug, Default)]
pub struct MirrorPlan {
    destinations: BTreeMap<ObjectRef, Vec<Arc<SourceDeclaration>>>,
}

impl MirrorPlan {
    /// Add a (source, destination) pair, replacing an older declaration of the same source
    pub fn add(&mut self, destination: ObjectRef, source: Arc<SourceDeclaration>) {
        let sources = self.destinations.entry(destination).or_default();
        match sources.binary_search_by(|existing| existing.source.cmp(&source.source)) {
            Ok(position) => sources[position] = source,
            Err(position) => sources.insert(position, source),
        }
    }

    pub fn merge(&mut self, other: MirrorPlan) {
        for (destination, sources) in other.destinations {
            for source in sources {
                self.add(destination.clone(), source);
            }
        }
    }

    /// Drop work for sources the index no longer knows
    pub fn retain_known(&mut self, index: &RelationshipIndex) {
        for sources in self.destinations.values_mut() {
            sources.retain(|declaration| index.is_source(&declaration.source));
        }
        self.destinations.retain(|_, sources| !sources.is_empty());
    }

    /// Remove and return the work for destinations outside `namespace`
    pub fn split_off_outside(&mut self, namespace: &str) -> MirrorPlan {
        let (outside, inside) = std::mem::take(&mut self.destinations)
            .into_iter()
            .partition(|(destination, _)| destination.namespace != namespace);
        self.destinations = inside;
        MirrorPlan {
            destinations: outside,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.destinations.values().map(Vec::len).sum()
    }

    /// (source, destination) pairs in execution order
    pub fn pairs(&self) -> Vec<(ObjectRef, ObjectRef)> {
        self.destinations
            .iter()
            .flat_map(|(destination, sources)| {
                sources
                    .iter()
                    .map(move |source| (source.source.clone(), destination.clone()))
            })
            .collect()
    }
}

impl IntoIterator for MirrorPlan {
    type Item = (ObjectRef, Vec<Arc<SourceDeclaration>>);
    type IntoIter = std::collections::btree_map::IntoIter<ObjectRef, Vec<Arc<SourceDeclaration>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.destinations.into_iter()
    }
}

/// What one notification implies
#[derive(Debug, Default)]
pub struct Classification {
    pub plan: MirrorPlan,
    pub conditions: Vec<ConditionReport>,
}

impl Classification {
    pub fn merge(&mut self, other: Classification) {
        self.plan.merge(other.plan);
        self.conditions.extend(other.conditions);
    }
}

/// Apply a notification to the index and work out which mirrors it requires
pub fn classify(
    index: &mut RelationshipIndex,
    ledger: &WriteLedger,
    notification: &Notification,
) -> Classification {
    let reference = notification.reference();
    let mut classification = Classification::default();

    if notification.kind == NotificationKind::Deleted {
        if index.is_source(reference) {
            warn!("Source secret deleted: {}", reference);
            index.remove_source(reference);
        }
        if index.is_destination(reference) {
            warn!("Watched secret deleted: {}", reference);
        }
        return classification;
    }

    match SourceDeclaration::from_snapshot(&notification.snapshot) {
        Ok(Some(declaration)) => {
            let declaration = Arc::new(declaration);
            let affected = index.upsert_source(declaration.clone());

            for destination in affected {
                if declaration.destinations.contains(&destination) {
                    // Sources ordered before this one are already overridden by it
                    mirror_sources(index, &mut classification.plan, &destination, |s| {
                        *s >= declaration.source
                    });
                } else {
                    debug!("Secret {} no longer syncs to {}", reference, destination);
                    mirror_sources(index, &mut classification.plan, &destination, |_| true);
                }
            }
        }
        Ok(None) => {
            if index.is_source(reference) {
                info!("Secret {} no longer declares destinations", reference);
                index.remove_source(reference);
            }
        }
        Err(e) => {
            warn!("Ignoring sync declaration of {}: {}", reference, e);
            classification
                .conditions
                .push(ConditionReport::malformed(reference.clone(), e.to_string()));
            index.remove_source(reference);
        }
    }

    if index.is_destination(reference) {
        if ledger.is_own_write(&notification.snapshot) {
            debug!("Ignoring our own write to {}", reference);
        } else {
            mirror_sources(index, &mut classification.plan, reference, |_| true);
        }
    }

    classification
}

fn mirror_sources(
    index: &RelationshipIndex,
    plan: &mut MirrorPlan,
    destination: &ObjectRef,
    include: impl Fn(&ObjectRef) -> bool,
) {
    for source in index.sources_of(destination) {
        if include(&source.source) {
            plan.add(destination.clone(), source);
        }
    }
}
