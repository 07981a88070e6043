// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::ObjectRef;
use std::fmt;

/// Outcome of the most recent sync attempt for a (source, destination) pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncCondition {
    Synced,
    DestinationMissing,
    MalformedDeclaration,
    SyncFailed,
}

impl SyncCondition {
    pub fn is_healthy(self) -> bool {
        matches!(self, SyncCondition::Synced)
    }
}

impl fmt::Display for SyncCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncCondition::Synced => "Synced",
            SyncCondition::DestinationMissing => "DestinationMissing",
            SyncCondition::MalformedDeclaration => "MalformedDeclaration",
            SyncCondition::SyncFailed => "SyncFailed",
        };
        f.write_str(s)
    }
}

/// A condition observed for a source, optionally scoped to one of its destinations.
/// Declaration problems have no destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionReport {
    pub source: ObjectRef,
    pub destination: Option<ObjectRef>,
    pub condition: SyncCondition,
    pub message: Option<String>,
}

impl ConditionReport {
    pub fn new(source: ObjectRef, destination: ObjectRef, condition: SyncCondition) -> Self {
        Self {
            source,
            destination: Some(destination),
            condition,
            message: None,
        }
    }

    pub fn malformed(source: ObjectRef, message: impl Into<String>) -> Self {
        Self {
            source,
            destination: None,
            condition: SyncCondition::MalformedDeclaration,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
