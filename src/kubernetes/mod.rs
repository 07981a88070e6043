// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes implementation of the secret store.

pub mod secrets;

pub use secrets::KubeSecretStore;
