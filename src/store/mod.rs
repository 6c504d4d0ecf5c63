// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Snapshot and restore of coordinator state.
//!
//! A snapshot records each stack as addresses (mutable) or an active index
//! (fixed); it never serializes route instances. Restoring runs the
//! application's [`AddressParser`] over the recorded addresses and appends
//! the results directly, bypassing guards and redirects: the snapshot was
//! already admitted once. Addresses the parser no longer recognizes,
//! stacks the application no longer declares, and stacks whose kind
//! changed since capture are skipped with a warning, so a stale snapshot
//! degrades instead of failing.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinator::Coordinator;
use crate::model::{KeyError, Route, StackKey};
use crate::stack::StackKind;

/// Maps an address back to a fresh route instance. `None` means the
/// address is no longer served.
#[async_trait(?Send)]
pub trait AddressParser {
    async fn parse(&self, address: &str) -> Option<Box<dyn Route>>;
}

#[derive(Debug)]
pub enum StoreError {
    Json {
        source: serde_json::Error,
    },
    InvalidKey {
        field: &'static str,
        value: String,
        source: Box<KeyError>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json { source } => write!(f, "json error: {source}"),
            Self::InvalidKey {
                field,
                value,
                source,
            } => write!(f, "invalid {field} '{value}': {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json { source } => Some(source),
            Self::InvalidKey { source, .. } => Some(source),
        }
    }
}

/// Point-in-time record of every declared stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSnapshot {
    pub stacks: Vec<StackSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSnapshot {
    pub key: StackKey,
    pub state: StackState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackState {
    Mutable { addresses: Vec<String> },
    Fixed { active_index: usize },
}

/// Records the current state of every stack the coordinator holds.
pub fn capture(nav: &Coordinator) -> NavSnapshot {
    let stacks = nav
        .stack_keys()
        .into_iter()
        .map(|key| {
            let state = match nav.stack_kind(&key) {
                StackKind::Mutable => StackState::Mutable {
                    addresses: nav
                        .routes_of(&key)
                        .iter()
                        .map(|route| route.route().address().to_string())
                        .collect(),
                },
                StackKind::Fixed => StackState::Fixed {
                    active_index: nav.active_index_of(&key),
                },
            };
            StackSnapshot { key, state }
        })
        .collect();
    NavSnapshot { stacks }
}

/// Replays a snapshot into the coordinator.
///
/// Stacks are restored in passes: a layout route appended in one pass
/// declares its owned stack, making that stack's snapshot restorable in
/// the next. Passes repeat until no pending stack makes progress; what
/// remains is skipped.
pub async fn restore(nav: &Coordinator, snapshot: &NavSnapshot, parser: &dyn AddressParser) {
    let mut pending: Vec<&StackSnapshot> = snapshot.stacks.iter().collect();
    loop {
        let mut remaining = Vec::new();
        let mut progressed = false;
        for stack in pending {
            if !nav.contains_stack(&stack.key) {
                remaining.push(stack);
                continue;
            }
            restore_stack(nav, stack, parser).await;
            progressed = true;
        }
        if remaining.is_empty() || !progressed {
            for stack in &remaining {
                warn!(stack = %stack.key, "undeclared stack skipped during restore");
            }
            return;
        }
        pending = remaining;
    }
}

async fn restore_stack(nav: &Coordinator, stack: &StackSnapshot, parser: &dyn AddressParser) {
    match &stack.state {
        StackState::Mutable { addresses } => {
            if nav.stack_kind(&stack.key) != StackKind::Mutable {
                warn!(stack = %stack.key, "stack is no longer mutable; snapshot entry skipped");
                return;
            }
            let mut routes = Vec::new();
            for address in addresses {
                match parser.parse(address).await {
                    Some(route) => routes.push(route),
                    None => {
                        warn!(stack = %stack.key, address, "unparsable address skipped during restore");
                    }
                }
            }
            if !routes.is_empty() {
                nav.restore_batch(&stack.key, routes);
            }
        }
        StackState::Fixed { active_index } => {
            if nav.stack_kind(&stack.key) != StackKind::Fixed {
                warn!(stack = %stack.key, "stack is no longer fixed; snapshot entry skipped");
                return;
            }
            let len = nav.routes_of(&stack.key).len();
            if *active_index < len {
                nav.restore_active_index(&stack.key, *active_index);
            } else {
                warn!(
                    stack = %stack.key,
                    index = active_index,
                    "stale active index skipped during restore"
                );
            }
        }
    }
}

pub fn to_json(snapshot: &NavSnapshot) -> Result<String, StoreError> {
    let json = snapshot_to_json(snapshot);
    serde_json::to_string_pretty(&json).map_err(|source| StoreError::Json { source })
}

pub fn from_json(input: &str) -> Result<NavSnapshot, StoreError> {
    let json: NavSnapshotJson =
        serde_json::from_str(input).map_err(|source| StoreError::Json { source })?;
    snapshot_from_json(json)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NavSnapshotJson {
    #[serde(default)]
    stacks: Vec<StackSnapshotJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StackSnapshotJson {
    key: String,
    kind: StackKindJson,
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default)]
    active_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StackKindJson {
    Mutable,
    Fixed,
}

fn snapshot_to_json(snapshot: &NavSnapshot) -> NavSnapshotJson {
    let stacks = snapshot
        .stacks
        .iter()
        .map(|stack| match &stack.state {
            StackState::Mutable { addresses } => StackSnapshotJson {
                key: stack.key.to_string(),
                kind: StackKindJson::Mutable,
                addresses: addresses.clone(),
                active_index: 0,
            },
            StackState::Fixed { active_index } => StackSnapshotJson {
                key: stack.key.to_string(),
                kind: StackKindJson::Fixed,
                addresses: Vec::new(),
                active_index: *active_index,
            },
        })
        .collect();
    NavSnapshotJson { stacks }
}

fn snapshot_from_json(json: NavSnapshotJson) -> Result<NavSnapshot, StoreError> {
    let stacks = json
        .stacks
        .into_iter()
        .map(|stack_json| {
            let key =
                StackKey::new(&stack_json.key).map_err(|source| StoreError::InvalidKey {
                    field: "stacks[].key",
                    value: stack_json.key.clone(),
                    source: Box::new(source),
                })?;
            let state = match stack_json.kind {
                StackKindJson::Mutable => StackState::Mutable {
                    addresses: stack_json.addresses,
                },
                StackKindJson::Fixed => StackState::Fixed {
                    active_index: stack_json.active_index,
                },
            };
            Ok(StackSnapshot { key, state })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(NavSnapshot { stacks })
}
