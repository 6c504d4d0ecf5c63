// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Ordered route containers.
//!
//! A stack is either *mutable* (push / guard-checked pop / removal at any
//! position) or *fixed* (constructed once with its siblings, only the
//! active index ever changes). Binding bookkeeping lives here: appending
//! binds a route to the stack's key, removal unbinds it. Invoking an
//! operation the variant does not support is a programmer error and
//! panics.

use crate::model::{RouteHandle, StackKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Mutable,
    Fixed,
}

#[derive(Debug)]
pub enum Stack {
    Mutable(MutableStack),
    Fixed(FixedStack),
}

impl Stack {
    pub fn key(&self) -> &StackKey {
        match self {
            Self::Mutable(stack) => &stack.key,
            Self::Fixed(stack) => &stack.key,
        }
    }

    pub fn kind(&self) -> StackKind {
        match self {
            Self::Mutable(_) => StackKind::Mutable,
            Self::Fixed(_) => StackKind::Fixed,
        }
    }

    pub fn routes(&self) -> &[RouteHandle] {
        match self {
            Self::Mutable(stack) => &stack.routes,
            Self::Fixed(stack) => &stack.routes,
        }
    }

    pub fn len(&self) -> usize {
        self.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes().is_empty()
    }

    /// The route currently visible: the top of a mutable stack, the
    /// selected sibling of a fixed one.
    pub fn active(&self) -> Option<&RouteHandle> {
        match self {
            Self::Mutable(stack) => stack.routes.last(),
            Self::Fixed(stack) => stack.routes.get(stack.active),
        }
    }

    pub fn as_mutable(&self) -> &MutableStack {
        match self {
            Self::Mutable(stack) => stack,
            Self::Fixed(stack) => panic!(
                "operation requires a mutable stack; '{}' is fixed",
                stack.key
            ),
        }
    }

    pub(crate) fn as_mutable_mut(&mut self) -> &mut MutableStack {
        match self {
            Self::Mutable(stack) => stack,
            Self::Fixed(stack) => panic!(
                "operation requires a mutable stack; '{}' is fixed",
                stack.key
            ),
        }
    }

    pub fn as_fixed(&self) -> &FixedStack {
        match self {
            Self::Fixed(stack) => stack,
            Self::Mutable(stack) => panic!(
                "operation requires a fixed stack; '{}' is mutable",
                stack.key
            ),
        }
    }

    pub(crate) fn as_fixed_mut(&mut self) -> &mut FixedStack {
        match self {
            Self::Fixed(stack) => stack,
            Self::Mutable(stack) => panic!(
                "operation requires a fixed stack; '{}' is mutable",
                stack.key
            ),
        }
    }
}

/// Push/pop container backing ordinary navigation flows.
#[derive(Debug)]
pub struct MutableStack {
    key: StackKey,
    routes: Vec<RouteHandle>,
}

impl MutableStack {
    pub fn new(key: StackKey) -> Self {
        Self {
            key,
            routes: Vec::new(),
        }
    }

    pub fn key(&self) -> &StackKey {
        &self.key
    }

    pub fn routes(&self) -> &[RouteHandle] {
        &self.routes
    }

    /// Binds the route to this stack and appends it on top.
    pub(crate) fn append(&mut self, route: RouteHandle) {
        route.bind(&self.key);
        self.routes.push(route);
    }

    /// Re-appends a route that is already bound to this stack (a
    /// move-to-top, not a fresh binding).
    pub(crate) fn restack(&mut self, route: RouteHandle) {
        debug_assert_eq!(route.binding().as_ref(), Some(&self.key));
        self.routes.push(route);
    }

    /// Removes and unbinds the top route, if any.
    pub(crate) fn remove_top(&mut self) -> Option<RouteHandle> {
        let route = self.routes.pop()?;
        route.unbind();
        Some(route)
    }

    /// Unconditional removal at any position; unbinds the route.
    pub(crate) fn remove_at(&mut self, index: usize) -> RouteHandle {
        let route = self.routes.remove(index);
        route.unbind();
        route
    }

    /// Removes the route without unbinding, for an in-stack move.
    pub(crate) fn take_at(&mut self, index: usize) -> RouteHandle {
        self.routes.remove(index)
    }
}

/// Sibling container: N routes fixed at construction, only the active
/// index changes.
#[derive(Debug)]
pub struct FixedStack {
    key: StackKey,
    routes: Vec<RouteHandle>,
    active: usize,
}

impl FixedStack {
    /// Binds the given siblings. An empty sibling list is a programmer
    /// error.
    pub fn new(key: StackKey, routes: Vec<RouteHandle>) -> Self {
        if routes.is_empty() {
            panic!("fixed stack '{key}' must be constructed with at least one route");
        }
        for route in &routes {
            route.bind(&key);
        }
        Self {
            key,
            routes,
            active: 0,
        }
    }

    pub fn key(&self) -> &StackKey {
        &self.key
    }

    pub fn routes(&self) -> &[RouteHandle] {
        &self.routes
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub(crate) fn set_active_index(&mut self, index: usize) {
        if index >= self.routes.len() {
            panic!(
                "index {index} out of bounds for fixed stack '{}' of length {}",
                self.key,
                self.routes.len()
            );
        }
        self.active = index;
    }
}
