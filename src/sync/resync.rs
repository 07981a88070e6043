// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Full-population resync passes.
//!
//! A pass classifies every listed secret as present and afterwards drops sources
//! that were not listed, which covers deletes missed while the watch was down.

use crate::store::{Notification, NotificationKind};
use crate::sync::classifier::{classify, Classification, WriteLedger};
use crate::sync::index::RelationshipIndex;
use crate::types::{ObjectRef, SecretSnapshot};
use std::collections::BTreeSet;

/// Result of a finished pass
#[derive(Debug, Default)]
pub struct ResyncSummary {
    pub observed: usize,
    /// Sources dropped because they were not listed
    pub removed: Vec<ObjectRef>,
    pub classification: Classification,
}

#[derive(Debug, Default)]
pub struct ResyncPass {
    observed: BTreeSet<ObjectRef>,
    classification: Classification,
}

impl ResyncPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one listed secret through the classifier
    pub fn observe(
        &mut self,
        index: &mut RelationshipIndex,
        ledger: &WriteLedger,
        snapshot: SecretSnapshot,
    ) {
        self.observed.insert(snapshot.reference.clone());
        let notification = Notification::new(NotificationKind::Present, snapshot);
        self.classification.merge(classify(index, ledger, &notification));
    }

    pub fn was_observed(&self, reference: &ObjectRef) -> bool {
        self.observed.contains(reference)
    }

    /// Remove unobserved sources and return the accumulated work
    pub fn finish(mut self, index: &mut RelationshipIndex) -> ResyncSummary {
        let removed = index.retain_observed(&self.observed);
        self.classification.plan.retain_known(index);

        ResyncSummary {
            observed: self.observed.len(),
            removed,
            classification: self.classification,
        }
    }
}
