// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch loops that feed change notifications into the sync manager.

pub mod secret;

pub use secret::SecretWatcher;
