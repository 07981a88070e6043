// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretSyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Watch stream error: {0}")]
    WatchError(#[from] kube::runtime::watcher::Error),

    #[error("Malformed declaration: {0}")]
    MalformedDeclaration(String),

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

pub type Result<T> = std::result::Result<T, SecretSyncError>;
