// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bidirectional source/destination index.
//!
//! `forward` maps each known source to its latest declaration, `reverse` maps each
//! destination to the sources that declare it. Every mutation updates both maps in
//! the same call; `reverse[d]` contains `s` iff `forward[s].destinations` contains `d`.
//! The index is owned by the sync manager's run loop and is never shared.

use crate::sync::declaration::SourceDeclaration;
use crate::types::ObjectRef;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RelationshipIndex {
    forward: BTreeMap<ObjectRef, Arc<SourceDeclaration>>,
    reverse: BTreeMap<ObjectRef, BTreeSet<ObjectRef>>,
}

impl RelationshipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the declaration of a source. Returns every destination the source
    /// declared before or declares now.
    pub fn upsert_source(&mut self, declaration: Arc<SourceDeclaration>) -> BTreeSet<ObjectRef> {
        let source = declaration.source.clone();
        let new: BTreeSet<ObjectRef> = declaration.destinations.iter().cloned().collect();
        let old: BTreeSet<ObjectRef> = self
            .forward
            .insert(source.clone(), declaration)
            .map(|previous| previous.destinations.iter().cloned().collect())
            .unwrap_or_default();

        for dropped in old.difference(&new) {
            self.unlink(&source, dropped);
        }
        for added in new.difference(&old) {
            self.reverse
                .entry(added.clone())
                .or_default()
                .insert(source.clone());
        }

        self.assert_linked(&source, &old);
        old.union(&new).cloned().collect()
    }

    /// Forget a source. Returns the destinations that lost it.
    pub fn remove_source(&mut self, source: &ObjectRef) -> BTreeSet<ObjectRef> {
        let Some(previous) = self.forward.remove(source) else {
            return BTreeSet::new();
        };

        let lost: BTreeSet<ObjectRef> = previous.destinations.iter().cloned().collect();
        for destination in &lost {
            self.unlink(source, destination);
        }

        self.assert_linked(source, &lost);
        lost
    }

    /// Remove every source not in `observed`. Returns the removed sources.
    pub fn retain_observed(&mut self, observed: &BTreeSet<ObjectRef>) -> Vec<ObjectRef> {
        let stale: Vec<ObjectRef> = self
            .forward
            .keys()
            .filter(|source| !observed.contains(*source))
            .cloned()
            .collect();

        for source in &stale {
            self.remove_source(source);
        }
        stale
    }

    /// Sources declaring `destination`, in [`Self::all_sources`] order
    pub fn sources_of(&self, destination: &ObjectRef) -> Vec<Arc<SourceDeclaration>> {
        self.reverse
            .get(destination)
            .into_iter()
            .flatten()
            .filter_map(|source| self.forward.get(source).cloned())
            .collect()
    }

    /// All known sources, ordered by namespace then name
    pub fn all_sources(&self) -> impl Iterator<Item = &Arc<SourceDeclaration>> {
        self.forward.values()
    }

    pub fn declaration(&self, source: &ObjectRef) -> Option<&Arc<SourceDeclaration>> {
        self.forward.get(source)
    }

    pub fn is_source(&self, reference: &ObjectRef) -> bool {
        self.forward.contains_key(reference)
    }

    pub fn is_destination(&self, reference: &ObjectRef) -> bool {
        self.reverse.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Check the whole index against the forward/reverse invariant
    pub fn is_consistent(&self) -> bool {
        let mut derived: BTreeMap<ObjectRef, BTreeSet<ObjectRef>> = BTreeMap::new();
        for (source, declaration) in &self.forward {
            for destination in &declaration.destinations {
                derived
                    .entry(destination.clone())
                    .or_default()
                    .insert(source.clone());
            }
        }
        derived == self.reverse
    }

    fn unlink(&mut self, source: &ObjectRef, destination: &ObjectRef) {
        if let Some(sources) = self.reverse.get_mut(destination) {
            sources.remove(source);
            if sources.is_empty() {
                self.reverse.remove(destination);
            }
        }
    }

    /// Verify the entries touched by a mutation of `source`. A mismatch means the
    /// index can no longer be trusted, so we crash and rebuild from scratch on restart.
    fn assert_linked(&self, source: &ObjectRef, previous: &BTreeSet<ObjectRef>) {
        let current: BTreeSet<&ObjectRef> = self
            .forward
            .get(source)
            .map(|declaration| declaration.destinations.iter().collect())
            .unwrap_or_default();

        for destination in current.iter().copied().chain(previous.iter()) {
            let linked = self
                .reverse
                .get(destination)
                .is_some_and(|sources| sources.contains(source));
            if linked != current.contains(destination) {
                panic!(
                    "relationship index corrupted: reverse entry of {} disagrees with declaration of {}",
                    destination, source
                );
            }
        }

        debug_assert!(self.is_consistent(), "relationship index corrupted");
    }
}
