// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Route identity, capabilities, and the engine-owned handle lifecycle.
//!
//! Applications implement [`Route`] on their own screen types and opt into
//! capabilities by overriding the `as_*` queries. The engine wraps every
//! route into a [`RouteHandle`], which carries the per-instance engine
//! state: the exclusive stack binding, the single-fire completion, and the
//! container-removal flag. A handle is terminal once discarded and is
//! never rebound.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use smol_str::SmolStr;
use tokio::sync::oneshot;

use super::ids::{LayoutKey, StackKey};
use super::props::Props;
use crate::coordinator::Coordinator;

/// A unit of navigable identity.
///
/// Identity is the concrete variant [`tag`](Route::tag) plus the ordered
/// [`props`](Route::props); equality over that pair decides whether an
/// incoming route merely updates an existing one. Capabilities default to
/// absent and are checked once per operation.
pub trait Route: fmt::Debug + 'static {
    /// Concrete variant tag. Stable across instances of the same screen.
    fn tag(&self) -> &'static str;

    /// Concrete-type access, used by [`merge_transient`](Route::merge_transient)
    /// implementations to read the incoming instance. Implement as `self`.
    fn as_any(&self) -> &dyn Any;

    /// Ordered list of significant fields.
    fn props(&self) -> Props;

    /// External address representation of this route.
    ///
    /// The default joins the tag and props into path segments
    /// (`/profile/1`); routes with richer addresses override this. The
    /// address must round-trip through the application's address parser
    /// for snapshots to restore.
    fn address(&self) -> SmolStr {
        let mut out = String::new();
        out.push('/');
        out.push_str(self.tag());
        for prop in self.props() {
            out.push('/');
            let _ = write!(out, "{prop}");
        }
        SmolStr::new(out)
    }

    /// Key of the layout container this route belongs to, if any.
    fn parent_layout(&self) -> Option<LayoutKey> {
        None
    }

    /// Exit-guard capability. Absent means exit is always allowed.
    fn as_guard(&self) -> Option<&dyn ExitGuard> {
        None
    }

    /// Redirect capability, consulted before the route is shown.
    fn as_redirector(&self) -> Option<&dyn Redirector> {
        None
    }

    /// Layout capability: this route owns a child stack.
    fn as_layout(&self) -> Option<&dyn Layout> {
        None
    }

    /// Merge transient state (e.g. carried query data) from an incoming
    /// equal route into this instance. Called when an operation reuses an
    /// existing instance instead of replacing it.
    fn merge_transient(&self, _incoming: &dyn Route) {}
}

/// Veto point consulted before the topmost route of a mutable stack (or the
/// active route of a fixed stack) may be removed or deactivated.
///
/// The decision may suspend; the stack is not mutated while it is pending.
/// The implementation must not issue coordinator operations against the
/// stack it is being consulted for: operations on a stack are serialized,
/// so doing so deadlocks.
#[async_trait(?Send)]
pub trait ExitGuard {
    async fn can_exit(&self, nav: &Coordinator) -> bool;
}

/// Substitutes a different final destination before a route is shown.
///
/// Resolution loops until a candidate keeps itself or cancels; the engine
/// enforces no bound, so an infinite redirect cycle is a caller bug. The
/// same serialization caveat as for [`ExitGuard`] applies.
#[async_trait(?Send)]
pub trait Redirector {
    async fn redirect(&self, nav: &Coordinator) -> Redirect;
}

/// Outcome of one redirect decision.
#[derive(Debug)]
pub enum Redirect {
    /// The candidate is final; stop resolving.
    Keep,
    /// Discard the candidate and cancel the enclosing operation.
    Cancel,
    /// Discard the candidate and continue resolving with this route.
    To(Box<dyn Route>),
}

/// Capability of a route that owns exactly one child stack.
pub trait Layout {
    /// The lookup key this layout serves.
    fn key(&self) -> LayoutKey;

    /// Label of the stack this layout owns.
    fn owned_stack(&self) -> StackKey;
}

struct RouteCore {
    route: Box<dyn Route>,
    binding: RefCell<Option<StackKey>>,
    popped_by_stack: Cell<bool>,
    discarded: Cell<bool>,
    completion_tx: RefCell<Option<oneshot::Sender<Option<Value>>>>,
    completion_rx: RefCell<Option<oneshot::Receiver<Option<Value>>>>,
}

/// Shared, engine-owned wrapper around a route instance.
///
/// Cloning a handle shares the same instance;
/// [`same_instance`](RouteHandle::same_instance) distinguishes shared
/// identity from the tag/props equality implemented by `PartialEq`.
#[derive(Clone)]
pub struct RouteHandle {
    core: Rc<RouteCore>,
}

impl RouteHandle {
    /// Wraps a free-standing route, allocating its one-shot completion.
    pub fn new(route: Box<dyn Route>) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            core: Rc::new(RouteCore {
                route,
                binding: RefCell::new(None),
                popped_by_stack: Cell::new(false),
                discarded: Cell::new(false),
                completion_tx: RefCell::new(Some(tx)),
                completion_rx: RefCell::new(Some(rx)),
            }),
        }
    }

    pub fn route(&self) -> &dyn Route {
        self.core.route.as_ref()
    }

    /// Downcast to the concrete route type.
    pub fn downcast<T: Route>(&self) -> Option<&T> {
        self.route().as_any().downcast_ref::<T>()
    }

    /// True iff both handles share one route instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    /// The stack currently holding this route, if bound.
    pub fn binding(&self) -> Option<StackKey> {
        self.core.binding.borrow().clone()
    }

    /// True once the owning stack removed this route itself (a pop), as
    /// opposed to an externally-initiated removal or discard.
    pub fn removed_by_stack(&self) -> bool {
        self.core.popped_by_stack.get()
    }

    /// True once the route reached its terminal state.
    pub fn is_discarded(&self) -> bool {
        self.core.discarded.get()
    }

    pub(crate) fn bind(&self, stack: &StackKey) {
        if self.core.discarded.get() {
            panic!("route {:?} is discarded and can never be rebound", self.route());
        }
        let mut binding = self.core.binding.borrow_mut();
        if let Some(bound) = binding.as_ref() {
            panic!(
                "route {:?} is already bound to stack '{bound}'; a route belongs to at most one stack",
                self.route()
            );
        }
        *binding = Some(stack.clone());
    }

    pub(crate) fn unbind(&self) {
        *self.core.binding.borrow_mut() = None;
    }

    pub(crate) fn mark_removed_by_stack(&self) {
        self.core.popped_by_stack.set(true);
    }

    /// Takes the awaitable side of the completion. Yields `Some` exactly
    /// once per handle.
    pub(crate) fn take_completion(&self) -> Option<Completion> {
        self.core
            .completion_rx
            .borrow_mut()
            .take()
            .map(|rx| Completion { rx })
    }

    /// Fulfills the completion. Later calls are no-ops; the value is
    /// delivered at most once.
    pub(crate) fn fulfill(&self, result: Option<Value>) {
        if let Some(tx) = self.core.completion_tx.borrow_mut().take() {
            // The receiver may have been dropped by an uninterested caller.
            let _ = tx.send(result);
        }
    }

    /// Terminal transition: unbind, fulfill with no result, never rebind.
    pub(crate) fn discard(&self) {
        self.unbind();
        self.fulfill(None);
        self.core.discarded.set(true);
    }
}

impl fmt::Debug for RouteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandle")
            .field("route", &self.core.route)
            .field("binding", &self.core.binding.borrow())
            .field("discarded", &self.core.discarded.get())
            .finish()
    }
}

impl PartialEq for RouteHandle {
    fn eq(&self, other: &Self) -> bool {
        self.route().tag() == other.route().tag() && self.route().props() == other.route().props()
    }
}

/// Single-fire completion value of a route, resolved when the route leaves
/// its stack: with the pop result on a guard-approved pop, with no result
/// on forced removal or discard.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Option<Value>>,
}

impl Completion {
    /// Awaits the result the route was completed with.
    pub async fn wait(self) -> Option<Value> {
        self.rx.await.unwrap_or(None)
    }
}
