// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret listing, watching and conditional patching against the Kubernetes API

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::store::{Notification, NotificationKind, PatchOutcome, SecretPatch, SecretStore};
use crate::types::{ObjectRef, SecretSnapshot};
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ListParams, Patch, PatchParams},
    runtime::{watcher, WatchStreamExt},
    Api, Client,
};
use serde_json::json;
use tracing::{debug, instrument, warn};

/// [`SecretStore`] backed by a Kubernetes API server
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
    namespace: Option<String>,
}

impl KubeSecretStore {
    /// Create a store scoped to `namespace`, or to the whole cluster when `None`
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn scoped(&self) -> Api<Secret> {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    fn in_namespace(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl SecretStore for KubeSecretStore {
    #[instrument(skip(self), fields(namespace = ?self.namespace))]
    async fn list(&self) -> Result<Vec<SecretSnapshot>> {
        let secret_list = self.scoped().list(&ListParams::default()).await?;

        Ok(secret_list
            .items
            .into_iter()
            .filter_map(|secret| match SecretSnapshot::try_from(secret) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Skipping listed secret: {}", e);
                    None
                }
            })
            .collect())
    }

    fn watch(&self) -> BoxStream<'static, Result<Notification>> {
        watcher(self.scoped(), watcher::Config::default())
            .default_backoff()
            .filter_map(|event| future::ready(into_notification(event)))
            .boxed()
    }

    #[instrument(skip(self), fields(secret = %reference))]
    async fn get(&self, reference: &ObjectRef) -> Result<Option<SecretSnapshot>> {
        match self.in_namespace(&reference.namespace).get_opt(&reference.name).await? {
            Some(secret) => Ok(Some(SecretSnapshot::try_from(secret)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, patch), fields(secret = %reference))]
    async fn conditional_patch(
        &self,
        reference: &ObjectRef,
        patch: &SecretPatch,
        expected_version: Option<&str>,
    ) -> Result<PatchOutcome> {
        let secrets = self.in_namespace(&reference.namespace);
        let body = merge_patch_body(patch, expected_version);
        let pp = PatchParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..PatchParams::default()
        };

        match secrets.patch(&reference.name, &pp, &Patch::Merge(&body)).await {
            Ok(secret) => Ok(PatchOutcome::Applied {
                resource_version: secret.metadata.resource_version,
            }),
            Err(kube::Error::Api(err)) if err.code == 409 => {
                debug!("Resource version conflict: {}", err.message);
                Ok(PatchOutcome::Conflict)
            }
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(PatchOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Build a JSON merge patch. Embedding the resource version makes the API server
/// reject the patch with 409 when the secret changed since it was read.
fn merge_patch_body(patch: &SecretPatch, expected_version: Option<&str>) -> serde_json::Value {
    let mut metadata = json!({ "annotations": patch.annotations });
    if let Some(version) = expected_version {
        metadata["resourceVersion"] = json!(version);
    }

    json!({
        "metadata": metadata,
        "data": patch.data,
    })
}

fn into_notification(
    event: std::result::Result<watcher::Event<Secret>, watcher::Error>,
) -> Option<Result<Notification>> {
    let (kind, secret) = match event {
        Ok(watcher::Event::Apply(secret)) => (NotificationKind::Modified, secret),
        Ok(watcher::Event::InitApply(secret)) => (NotificationKind::Present, secret),
        Ok(watcher::Event::Delete(secret)) => (NotificationKind::Deleted, secret),
        Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => return None,
        Err(e) => return Some(Err(e.into())),
    };

    Some(SecretSnapshot::try_from(secret).map(|snapshot| Notification::new(kind, snapshot)))
}
