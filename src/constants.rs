// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by secret-sync
pub mod annotations {
    /// Comma-separated list of destinations (`name` or `namespace/name`) on a source secret
    pub const SYNC_TO: &str = "secret-sync.praekelt.org/sync-to";
    /// Set on every destination we have mirrored into
    pub const WATCH: &str = "secret-sync.praekelt.org/watch";
    /// Value of the watch marker
    pub const WATCH_VALUE: &str = "true";
}

/// The field manager name used for patches
pub const OPERATOR_NAME: &str = "secret-sync";

/// Capacity of the sync manager's inbox
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Defaults for configuration values that are not set in the environment
pub mod defaults {
    /// Interval between full resync passes
    pub const RESYNC_INTERVAL_SECS: u64 = 300;
    /// Maximum number of write attempts per (source, destination) pair
    pub const MAX_ATTEMPTS: u32 = 5;
    /// Initial retry delay, doubled on each attempt
    pub const RETRY_BASE_DELAY_MS: u64 = 100;
    /// Cap on the retry delay
    pub const RETRY_MAX_DELAY_MS: u64 = 5_000;
}
