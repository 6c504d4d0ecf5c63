// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::time::Duration;

use async_trait::async_trait;
use smallvec::smallvec;
use smol_str::SmolStr;

use super::ids::{LayoutKey, StackKey};
use super::props::{PropValue, Props};
use super::route::{ExitGuard, Layout, Redirect, Redirector, Route};
use crate::coordinator::Coordinator;

fn layout_key(value: &str) -> LayoutKey {
    LayoutKey::new(value).expect("layout key")
}

fn stack_key(value: &str) -> StackKey {
    StackKey::new(value).expect("stack key")
}

/// Plain screen with an optional identity argument and mergeable query data.
#[derive(Debug)]
pub(crate) struct Screen {
    name: &'static str,
    arg: Option<SmolStr>,
    query: RefCell<Option<SmolStr>>,
    parent: Option<LayoutKey>,
}

impl Screen {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            arg: None,
            query: RefCell::new(None),
            parent: None,
        }
    }

    pub(crate) fn with_arg(name: &'static str, arg: &str) -> Self {
        let mut screen = Self::new(name);
        screen.arg = Some(SmolStr::new(arg));
        screen
    }

    pub(crate) fn with_query(self, query: &str) -> Self {
        *self.query.borrow_mut() = Some(SmolStr::new(query));
        self
    }

    pub(crate) fn under(mut self, parent: &str) -> Self {
        self.parent = Some(layout_key(parent));
        self
    }

    pub(crate) fn query(&self) -> Option<SmolStr> {
        self.query.borrow().clone()
    }
}

impl Route for Screen {
    fn tag(&self) -> &'static str {
        self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn props(&self) -> Props {
        match &self.arg {
            Some(arg) => smallvec![PropValue::Str(arg.clone())],
            None => Props::new(),
        }
    }

    fn parent_layout(&self) -> Option<LayoutKey> {
        self.parent.clone()
    }

    fn merge_transient(&self, incoming: &dyn Route) {
        let Some(incoming) = incoming.as_any().downcast_ref::<Screen>() else {
            return;
        };
        if let Some(query) = incoming.query() {
            *self.query.borrow_mut() = Some(query);
        }
    }
}

/// Screen carrying an exit guard with a scriptable verdict.
#[derive(Debug)]
pub(crate) struct GuardedScreen {
    name: &'static str,
    allow: Cell<bool>,
    asked: Cell<u32>,
    delay: Option<Duration>,
}

impl GuardedScreen {
    pub(crate) fn new(name: &'static str, allow: bool) -> Self {
        Self {
            name,
            allow: Cell::new(allow),
            asked: Cell::new(0),
            delay: None,
        }
    }

    /// Suspends the decision, exercising the engine's suspension points.
    pub(crate) fn slow(name: &'static str, allow: bool) -> Self {
        let mut screen = Self::new(name, allow);
        screen.delay = Some(Duration::from_millis(5));
        screen
    }

    pub(crate) fn set_allow(&self, allow: bool) {
        self.allow.set(allow);
    }

    pub(crate) fn times_asked(&self) -> u32 {
        self.asked.get()
    }
}

impl Route for GuardedScreen {
    fn tag(&self) -> &'static str {
        self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn props(&self) -> Props {
        Props::new()
    }

    fn as_guard(&self) -> Option<&dyn ExitGuard> {
        Some(self)
    }
}

#[async_trait(?Send)]
impl ExitGuard for GuardedScreen {
    async fn can_exit(&self, _nav: &Coordinator) -> bool {
        self.asked.set(self.asked.get() + 1);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.allow.get()
    }
}

/// Screen whose redirector plays back a scripted decision once, then keeps.
#[derive(Debug)]
pub(crate) struct RedirectingScreen {
    name: &'static str,
    decision: RefCell<Option<Redirect>>,
}

impl RedirectingScreen {
    pub(crate) fn keeping(name: &'static str) -> Self {
        Self {
            name,
            decision: RefCell::new(Some(Redirect::Keep)),
        }
    }

    pub(crate) fn cancelling(name: &'static str) -> Self {
        Self {
            name,
            decision: RefCell::new(Some(Redirect::Cancel)),
        }
    }

    pub(crate) fn to(name: &'static str, destination: Box<dyn Route>) -> Self {
        Self {
            name,
            decision: RefCell::new(Some(Redirect::To(destination))),
        }
    }
}

impl Route for RedirectingScreen {
    fn tag(&self) -> &'static str {
        self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn props(&self) -> Props {
        Props::new()
    }

    fn as_redirector(&self) -> Option<&dyn Redirector> {
        Some(self)
    }
}

#[async_trait(?Send)]
impl Redirector for RedirectingScreen {
    async fn redirect(&self, _nav: &Coordinator) -> Redirect {
        self.decision.borrow_mut().take().unwrap_or(Redirect::Keep)
    }
}

/// Layout route owning one child stack, optionally nested under another
/// layout.
#[derive(Debug)]
pub(crate) struct Shell {
    key: LayoutKey,
    stack: StackKey,
    parent: Option<LayoutKey>,
}

impl Shell {
    pub(crate) fn new(key: &str, stack: &str) -> Self {
        Self {
            key: layout_key(key),
            stack: stack_key(stack),
            parent: None,
        }
    }

    pub(crate) fn under(mut self, parent: &str) -> Self {
        self.parent = Some(layout_key(parent));
        self
    }
}

impl Route for Shell {
    fn tag(&self) -> &'static str {
        "shell"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn props(&self) -> Props {
        smallvec![PropValue::Str(SmolStr::new(self.key.as_str()))]
    }

    fn parent_layout(&self) -> Option<LayoutKey> {
        self.parent.clone()
    }

    fn as_layout(&self) -> Option<&dyn Layout> {
        Some(self)
    }
}

impl Layout for Shell {
    fn key(&self) -> LayoutKey {
        self.key.clone()
    }

    fn owned_stack(&self) -> StackKey {
        self.stack.clone()
    }
}
