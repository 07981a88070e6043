// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Value types shared by the store, the index and the mirror engine.

pub mod condition;
pub mod reference;
pub mod secret;

pub use condition::{ConditionReport, SyncCondition};
pub use reference::ObjectRef;
pub use secret::SecretSnapshot;
