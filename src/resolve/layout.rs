// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Layout-constructor registry and the memo of active layout instances.
//!
//! The registry is an object owned by the root coordinator and shared by
//! reference, never a process-wide singleton. The memo caches one active
//! instance per layout key so a chain never materializes the same layout
//! twice; entries are cleared when the stack holding the instance is torn
//! down.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::model::{LayoutKey, Route, RouteHandle, StackKey};

/// Zero-argument layout constructor.
pub type LayoutCtor = Rc<dyn Fn() -> Box<dyn Route>>;

#[derive(Default)]
pub struct LayoutRegistry {
    ctors: RefCell<BTreeMap<LayoutKey, LayoutCtor>>,
    active: RefCell<BTreeMap<LayoutKey, RouteHandle>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor serving `key`. Re-registration replaces
    /// the previous constructor; active instances are unaffected.
    pub fn register(&self, key: LayoutKey, ctor: impl Fn() -> Box<dyn Route> + 'static) {
        self.ctors.borrow_mut().insert(key, Rc::new(ctor));
    }

    pub fn is_registered(&self, key: &LayoutKey) -> bool {
        self.ctors.borrow().contains_key(key)
    }

    /// Constructs a fresh instance for `key`. A missing registry entry is
    /// a programmer error.
    pub(crate) fn construct(&self, key: &LayoutKey) -> Box<dyn Route> {
        let ctor = self.ctors.borrow().get(key).cloned();
        let Some(ctor) = ctor else {
            panic!("unresolved layout key '{key}'; register a constructor before pushing routes scoped to it");
        };
        ctor()
    }

    /// The already-active instance for `key`, if the chain containing it
    /// is live.
    pub fn active(&self, key: &LayoutKey) -> Option<RouteHandle> {
        self.active.borrow().get(key).cloned()
    }

    pub(crate) fn activate(&self, key: LayoutKey, instance: RouteHandle) {
        self.active.borrow_mut().insert(key, instance);
    }

    pub(crate) fn deactivate(&self, key: &LayoutKey) {
        self.active.borrow_mut().remove(key);
    }

    /// Drops every memo entry whose instance lives on `stack`.
    pub(crate) fn deactivate_bound_to(&self, stack: &StackKey) {
        self.active
            .borrow_mut()
            .retain(|_, instance| instance.binding().as_ref() != Some(stack));
    }
}

impl fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("registered", &self.ctors.borrow().keys().collect::<Vec<_>>())
            .field("active", &self.active.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
