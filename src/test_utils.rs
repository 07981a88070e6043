// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes HTTP service and an in-memory secret store.

use crate::constants::annotations;
use crate::error::{Result, SecretSyncError};
use crate::store::{Notification, PatchOutcome, SecretPatch, SecretStore};
use crate::types::{ObjectRef, SecretSnapshot};
use futures::stream::{self, BoxStream, StreamExt};
use http::{Request, Response};
use k8s_openapi::ByteString;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("secrets", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock Secret JSON response. `data` values are already base64 encoded.
pub fn secret_json(
    namespace: &str,
    name: &str,
    resource_version: &str,
    annotations: &[(&str, &str)],
    data: &[(&str, &str)],
) -> String {
    let annotations: BTreeMap<&str, &str> = annotations.iter().copied().collect();
    let data: BTreeMap<&str, &str> = data.iter().copied().collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": resource_version,
            "annotations": annotations,
        },
        "type": "Opaque",
        "data": data,
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create a 409 conflict response
pub fn conflict_json(resource: &str, name: &str) -> String {
    status_json(
        409,
        "Conflict",
        &format!(
            "Operation cannot be fulfilled on {} \"{}\": the object has been modified",
            resource, name
        ),
    )
}

fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

pub fn bytes(value: &str) -> ByteString {
    ByteString(value.as_bytes().to_vec())
}

pub fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, ByteString> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), bytes(v)))
        .collect()
}

/// Snapshot of a source secret declaring `sync_to`
pub fn source(namespace: &str, name: &str, sync_to: &str, data: &[(&str, &str)]) -> SecretSnapshot {
    SecretSnapshot {
        reference: ObjectRef::new(namespace, name),
        annotations: BTreeMap::from([(annotations::SYNC_TO.to_string(), sync_to.to_string())]),
        data: fields(data),
        resource_version: None,
    }
}

/// Snapshot of a plain secret without any secret-sync annotation
pub fn plain(namespace: &str, name: &str, data: &[(&str, &str)]) -> SecretSnapshot {
    SecretSnapshot {
        reference: ObjectRef::new(namespace, name),
        data: fields(data),
        ..Default::default()
    }
}

#[derive(Default)]
struct FakeState {
    secrets: BTreeMap<ObjectRef, SecretSnapshot>,
    version: u64,
    pending_conflicts: HashMap<ObjectRef, u32>,
    pending_errors: u32,
    fail_list: bool,
    patches: Vec<(ObjectRef, SecretPatch)>,
    watch_events: Vec<std::result::Result<Notification, String>>,
}

impl FakeState {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// In-memory [`SecretStore`] with resource-version checks and fault injection
#[derive(Default)]
pub struct FakeSecretStore {
    state: Mutex<FakeState>,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret, assigning a fresh resource version. Returns the stored snapshot.
    pub fn insert(&self, mut snapshot: SecretSnapshot) -> SecretSnapshot {
        let mut state = self.state.lock().unwrap();
        snapshot.resource_version = Some(state.next_version());
        state
            .secrets
            .insert(snapshot.reference.clone(), snapshot.clone());
        snapshot
    }

    pub fn remove(&self, reference: &ObjectRef) {
        self.state.lock().unwrap().secrets.remove(reference);
    }

    pub fn secret(&self, reference: &ObjectRef) -> Option<SecretSnapshot> {
        self.state.lock().unwrap().secrets.get(reference).cloned()
    }

    /// Make the next `count` patches of `reference` race with another writer
    pub fn inject_conflicts(&self, reference: &ObjectRef, count: u32) {
        self.state
            .lock()
            .unwrap()
            .pending_conflicts
            .insert(reference.clone(), count);
    }

    /// Make the next `count` reads or writes fail with a store error
    pub fn inject_errors(&self, count: u32) {
        self.state.lock().unwrap().pending_errors = count;
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    /// Queue a notification for the next `watch()` stream
    pub fn queue_watch(&self, notification: Notification) {
        self.state.lock().unwrap().watch_events.push(Ok(notification));
    }

    pub fn queue_watch_error(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .watch_events
            .push(Err(message.to_string()));
    }

    pub fn patch_count(&self) -> usize {
        self.state.lock().unwrap().patches.len()
    }

    pub fn patches(&self) -> Vec<(ObjectRef, SecretPatch)> {
        self.state.lock().unwrap().patches.clone()
    }

    fn take_error(state: &mut FakeState) -> Result<()> {
        if state.pending_errors > 0 {
            state.pending_errors -= 1;
            return Err(SecretSyncError::StoreError("injected failure".to_string()));
        }
        Ok(())
    }
}

impl SecretStore for FakeSecretStore {
    async fn list(&self) -> Result<Vec<SecretSnapshot>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(SecretSyncError::StoreError("list unavailable".to_string()));
        }
        Ok(state.secrets.values().cloned().collect())
    }

    fn watch(&self) -> BoxStream<'static, Result<Notification>> {
        let events = std::mem::take(&mut self.state.lock().unwrap().watch_events);
        stream::iter(
            events
                .into_iter()
                .map(|event| event.map_err(SecretSyncError::StoreError)),
        )
        .boxed()
    }

    async fn get(&self, reference: &ObjectRef) -> Result<Option<SecretSnapshot>> {
        let mut state = self.state.lock().unwrap();
        Self::take_error(&mut state)?;
        Ok(state.secrets.get(reference).cloned())
    }

    async fn conditional_patch(
        &self,
        reference: &ObjectRef,
        patch: &SecretPatch,
        expected_version: Option<&str>,
    ) -> Result<PatchOutcome> {
        let mut state = self.state.lock().unwrap();
        Self::take_error(&mut state)?;

        if !state.secrets.contains_key(reference) {
            return Ok(PatchOutcome::NotFound);
        }

        if let Some(pending) = state.pending_conflicts.get_mut(reference) {
            if *pending > 0 {
                *pending -= 1;
                // Another writer got there first
                let version = state.next_version();
                if let Some(secret) = state.secrets.get_mut(reference) {
                    secret.resource_version = Some(version);
                }
            }
        }

        let version = state.next_version();
        let Some(secret) = state.secrets.get_mut(reference) else {
            return Ok(PatchOutcome::NotFound);
        };
        if expected_version.is_some() && secret.resource_version.as_deref() != expected_version {
            return Ok(PatchOutcome::Conflict);
        }

        secret
            .data
            .extend(patch.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        secret.annotations.extend(
            patch
                .annotations
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        secret.resource_version = Some(version.clone());
        state.patches.push((reference.clone(), patch.clone()));

        Ok(PatchOutcome::Applied {
            resource_version: Some(version),
        })
    }
}
