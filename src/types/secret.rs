// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::annotations;
use crate::error::{Result, SecretSyncError};
use crate::types::ObjectRef;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

/// The parts of an observed secret the sync engine cares about
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretSnapshot {
    pub reference: ObjectRef,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, ByteString>,
    pub resource_version: Option<String>,
}

impl SecretSnapshot {
    /// Check if the secret carries the watch marker set by a previous mirror
    pub fn has_watch_marker(&self) -> bool {
        self.annotations
            .get(annotations::WATCH)
            .is_some_and(|v| v == annotations::WATCH_VALUE)
    }
}

impl TryFrom<Secret> for SecretSnapshot {
    type Error = SecretSyncError;

    fn try_from(secret: Secret) -> Result<Self> {
        let reference = ObjectRef::from_secret(&secret)?;

        Ok(SecretSnapshot {
            reference,
            annotations: secret.metadata.annotations.unwrap_or_default(),
            data: secret.data.unwrap_or_default(),
            resource_version: secret.metadata.resource_version,
        })
    }
}
