// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Latest sync condition per (source, destination) pair.

use crate::sync::declaration::SourceDeclaration;
use crate::sync::index::RelationshipIndex;
use crate::types::{ConditionReport, ObjectRef};
use std::collections::BTreeMap;
use tracing::info;

type Key = (ObjectRef, Option<ObjectRef>);

#[derive(Debug, Default)]
pub struct StatusBoard {
    conditions: BTreeMap<Key, ConditionReport>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report, logging when the pair changes condition
    pub fn record(&mut self, report: ConditionReport) {
        let key = (report.source.clone(), report.destination.clone());
        let previous = self.conditions.get(&key).map(|r| r.condition);

        if let Some(previous) = previous.filter(|p| *p != report.condition) {
            info!(
                "Sync condition of {} changed from {} to {}",
                describe(&key),
                previous,
                report.condition
            );
        }

        self.conditions.insert(key, report);
    }

    /// Drop entries of `source` that its current declaration no longer covers.
    /// With no declaration, every entry of the source goes except a declaration error.
    pub fn prune(&mut self, source: &ObjectRef, declaration: Option<&SourceDeclaration>) {
        self.conditions.retain(|(s, destination), _| {
            if s != source {
                return true;
            }
            match (destination, declaration) {
                (Some(destination), Some(declaration)) => {
                    declaration.destinations.contains(destination)
                }
                (None, Some(_)) => false,
                (Some(_), None) => false,
                (None, None) => true,
            }
        });
    }

    /// Keep only pairs the index still declares. Declaration errors are dropped too;
    /// a resync pass reports the current ones again.
    pub fn retain_declared(&mut self, index: &RelationshipIndex) {
        self.conditions.retain(|(source, destination), _| match destination {
            Some(destination) => index
                .declaration(source)
                .is_some_and(|declaration| declaration.destinations.contains(destination)),
            None => false,
        });
    }

    /// Forget everything about a source
    pub fn forget_source(&mut self, source: &ObjectRef) {
        self.conditions.retain(|(s, _), _| s != source);
    }

    pub fn get(
        &self,
        source: &ObjectRef,
        destination: Option<&ObjectRef>,
    ) -> Option<&ConditionReport> {
        self.conditions.get(&(source.clone(), destination.cloned()))
    }

    pub fn conditions(&self) -> Vec<ConditionReport> {
        self.conditions.values().cloned().collect()
    }
}

fn describe(key: &Key) -> String {
    match &key.1 {
        Some(destination) => format!("{} -> {}", key.0, destination),
        None => key.0.to_string(),
    }
}
