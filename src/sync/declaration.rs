// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Parsing of the `sync-to` annotation into a source declaration.

use crate::constants::annotations;
use crate::error::{Result, SecretSyncError};
use crate::types::{ObjectRef, SecretSnapshot};
use k8s_openapi::ByteString;
use std::collections::{BTreeMap, BTreeSet};

const MAX_NAMESPACE_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

/// What a source secret asks to be mirrored, taken from one observed snapshot.
/// Replaced wholesale whenever a newer snapshot of the source is seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDeclaration {
    pub source: ObjectRef,
    pub destinations: Vec<ObjectRef>,
    pub data: BTreeMap<String, ByteString>,
    pub resource_version: Option<String>,
}

impl SourceDeclaration {
    /// Derive a declaration from a snapshot. `Ok(None)` means the secret is not a source.
    pub fn from_snapshot(snapshot: &SecretSnapshot) -> Result<Option<Self>> {
        let Some(destinations) = parse_destinations(&snapshot.reference, &snapshot.annotations)?
        else {
            return Ok(None);
        };

        Ok(Some(SourceDeclaration {
            source: snapshot.reference.clone(),
            destinations,
            data: snapshot.data.clone(),
            resource_version: snapshot.resource_version.clone(),
        }))
    }
}

/// Parse the destinations declared in a secret's annotations.
///
/// Each comma-separated token is either `name` (same namespace as the source) or
/// `namespace/name`. Duplicates collapse to their first occurrence. Empty tokens,
/// invalid names and references back to the source itself are rejected.
pub fn parse_destinations(
    source: &ObjectRef,
    annotations: &BTreeMap<String, String>,
) -> Result<Option<Vec<ObjectRef>>> {
    let Some(value) = annotations.get(annotations::SYNC_TO) else {
        return Ok(None);
    };

    let mut seen = BTreeSet::new();
    let mut destinations = Vec::new();

    for token in value.split(',') {
        let destination = parse_token(source, token.trim())?;

        if destination == *source {
            return Err(malformed(format!("{} lists itself as a destination", source)));
        }
        if seen.insert(destination.clone()) {
            destinations.push(destination);
        }
    }

    Ok(Some(destinations))
}

fn parse_token(source: &ObjectRef, token: &str) -> Result<ObjectRef> {
    if token.is_empty() {
        return Err(malformed("empty destination".to_string()));
    }

    let (namespace, name) = match token.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => (source.namespace.as_str(), token),
    };

    if !is_dns_label(namespace) {
        return Err(malformed(format!("invalid namespace {:?} in {:?}", namespace, token)));
    }
    if !is_dns_subdomain(name) {
        return Err(malformed(format!("invalid secret name {:?} in {:?}", name, token)));
    }

    Ok(ObjectRef::new(namespace, name))
}

fn malformed(message: String) -> SecretSyncError {
    SecretSyncError::MalformedDeclaration(message)
}

/// RFC 1123 label, as required for namespaces
fn is_dns_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_NAMESPACE_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && starts_and_ends_alphanumeric(value)
}

/// RFC 1123 subdomain, as required for secret names
fn is_dns_subdomain(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_NAME_LEN
        && value.split('.').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
                && starts_and_ends_alphanumeric(part)
        })
}

fn starts_and_ends_alphanumeric(value: &str) -> bool {
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    value.as_bytes().first().is_some_and(alnum) && value.as_bytes().last().is_some_and(alnum)
}
