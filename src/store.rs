// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The object store capability consumed by the sync engine.

use crate::error::Result;
use crate::types::{ObjectRef, SecretSnapshot};
use futures::stream::BoxStream;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::future::Future;

/// Kind of change carried by a [`Notification`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Added,
    Modified,
    Deleted,
    /// The object was seen during a full listing (initial watch or resync pass)
    Present,
}

/// A single change notification. Delivery is at-least-once and unordered.
#[derive(Clone, Debug)]
pub struct Notification {
    pub kind: NotificationKind,
    pub snapshot: SecretSnapshot,
}

impl Notification {
    pub fn new(kind: NotificationKind, snapshot: SecretSnapshot) -> Self {
        Self { kind, snapshot }
    }

    pub fn reference(&self) -> &ObjectRef {
        &self.snapshot.reference
    }
}

/// Fields written to a destination by one conditional patch.
/// Keys absent from the patch are left untouched in the destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretPatch {
    pub data: BTreeMap<String, ByteString>,
    pub annotations: BTreeMap<String, String>,
}

/// Result of a conditional patch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The patch was applied; carries the destination's new resource version
    Applied { resource_version: Option<String> },
    /// The expected resource version did not match
    Conflict,
    NotFound,
}

/// get/list/watch/conditional-patch over secrets in the configured scope
pub trait SecretStore: Send + Sync + 'static {
    /// List every secret in scope
    fn list(&self) -> impl Future<Output = Result<Vec<SecretSnapshot>>> + Send;

    /// Stream of change notifications for every secret in scope
    fn watch(&self) -> BoxStream<'static, Result<Notification>>;

    /// Read a secret, `None` if it does not exist
    fn get(&self, reference: &ObjectRef)
        -> impl Future<Output = Result<Option<SecretSnapshot>>> + Send;

    /// Merge `patch` into an existing secret if its resource version still equals
    /// `expected_version`. Never creates the secret.
    fn conditional_patch(
        &self,
        reference: &ObjectRef,
        patch: &SecretPatch,
        expected_version: Option<&str>,
    ) -> impl Future<Output = Result<PatchOutcome>> + Send;
}
