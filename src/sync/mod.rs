// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret synchronization: declarations, the relationship index and the mirroring loop.

pub mod classifier;
pub mod declaration;
pub mod index;
pub mod manager;
pub mod mirror;
pub mod resync;
pub mod retry;
pub mod status;

pub use classifier::{classify, Classification, MirrorPlan, WriteLedger};
pub use declaration::SourceDeclaration;
pub use index::RelationshipIndex;
pub use manager::{SyncEvent, SyncManager, SyncManagerHandle};
pub use mirror::{MirrorEngine, MirrorOutcome};
pub use retry::RetryPolicy;
