// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{Result, SecretSyncError};
use k8s_openapi::api::core::v1::Secret;
use std::fmt;

/// Namespaced reference to a secret. Ordered by namespace, then name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build a reference from a secret's metadata
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let name = secret
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| SecretSyncError::InvalidObject("secret has no name".to_string()))?;
        let namespace = secret.metadata.namespace.as_ref().ok_or_else(|| {
            SecretSyncError::InvalidObject(format!("secret {} has no namespace", name))
        })?;

        Ok(Self::new(namespace.as_str(), name.as_str()))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
