// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The coordinator owns the stacks and the layout registry and is the sole
//! authority running guard/redirect resolution.
//!
//! Every operation targets one stack and holds that stack's operation lock
//! for its full duration, including guard/redirect suspension, so
//! overlapping calls on one stack serialize in FIFO order instead of
//! racing. Calls on distinct stacks never contend. A guard or redirector
//! must therefore not issue operations against the stack it is being
//! consulted for.
//!
//! A stack can legally vanish while an operation on it is suspended: a
//! layout popped from another stack takes its owned stack with it, and the
//! teardown does not queue behind the owned stack's lock. Every operation
//! therefore re-checks its stack after each suspension point and resolves
//! absence to the matching empty/cancelled outcome.
//!
//! Guard denials, redirect cancellations, and missing targets are values;
//! only programmer errors (unknown stack or layout key, variant misuse,
//! out-of-bounds activation) panic.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::diff::{diff, Edit};
use crate::model::{Completion, LayoutKey, Redirect, Route, RouteHandle, StackKey};
use crate::resolve::{guard_allows, resolve_redirects, LayoutRegistry};
use crate::stack::{FixedStack, MutableStack, Stack, StackKind};

/// Why a change notification fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// The stack's state changed.
    Mutated,
    /// Nothing changed structurally, but external address state should
    /// resynchronize to actual state (guard-blocked pop, missing target).
    Resync,
}

/// Change notification delivered to observers after an operation.
///
/// `script` is the minimal edit script between the route sequence the
/// stack held before the operation and `routes`, its sequence afterwards.
#[derive(Debug, Clone)]
pub struct NavEvent {
    pub stack: StackKey,
    pub reason: ChangeReason,
    pub script: Vec<Edit>,
    pub routes: Vec<RouteHandle>,
}

/// Outcome of `push`, `push_or_move_to_top`, and `replace`.
#[derive(Debug)]
pub enum PushOutcome {
    /// The route entered a stack; the completion resolves when it leaves.
    Pushed(Completion),
    /// An equal route was already present; its instance was kept and the
    /// incoming one discarded after a transient-state merge.
    Merged,
    /// The operation was abandoned: a redirector cancelled it, or the
    /// target stack was torn down while a decision was pending.
    Cancelled,
}

impl PushOutcome {
    pub fn completion(self) -> Option<Completion> {
        match self {
            Self::Pushed(completion) => Some(completion),
            Self::Merged | Self::Cancelled => None,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Outcome of `pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    Popped,
    /// The exit guard vetoed; the stack is unchanged.
    Denied,
    /// There was nothing to pop, or the stack was torn down while the
    /// guard was pending.
    EmptyStack,
}

/// Outcome of `navigate`.
#[derive(Debug)]
pub enum NavigateOutcome {
    /// The target was present and is now active; transient state merged.
    Reached,
    /// The target was absent from a mutable stack and was pushed.
    Pushed(Completion),
    /// A guard denied one of the pops; partial progress is kept.
    Blocked,
    /// The target was absent from a fixed stack; nothing changed.
    NotFound,
    /// A redirector cancelled the operation, or the stack was torn down
    /// while a decision was pending.
    Cancelled,
}

/// Outcome of `go_to_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivateOutcome {
    Activated,
    Denied,
    Cancelled,
}

/// Subscription token returned by [`Coordinator::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = Rc<dyn Fn(&NavEvent)>;

/// Captures each touched stack's route sequence once, before its first
/// mutation, and turns the before/after pairs into notifications.
struct MutationLog {
    touched: Vec<(StackKey, Vec<RouteHandle>)>,
}

impl MutationLog {
    fn new() -> Self {
        Self {
            touched: Vec::new(),
        }
    }

    fn touch(&mut self, nav: &Coordinator, key: &StackKey) {
        if self.touched.iter().any(|(touched, _)| touched == key) {
            return;
        }
        let routes = nav
            .stacks
            .borrow()
            .get(key)
            .map(|stack| stack.routes().to_vec())
            .unwrap_or_default();
        self.touched.push((key.clone(), routes));
    }

    fn finish(self, nav: &Coordinator, reason: ChangeReason) {
        for (key, old) in self.touched {
            let routes = nav
                .stacks
                .borrow()
                .get(&key)
                .map(|stack| stack.routes().to_vec())
                .unwrap_or_default();
            let script = diff(&old, &routes);
            nav.emit(NavEvent {
                stack: key,
                reason,
                script,
                routes,
            });
        }
    }
}

pub struct Coordinator {
    stacks: RefCell<BTreeMap<StackKey, Stack>>,
    locks: RefCell<BTreeMap<StackKey, Arc<AsyncMutex<()>>>>,
    registry: LayoutRegistry,
    observers: RefCell<Vec<(ObserverId, ObserverFn)>>,
    next_observer: Cell<u64>,
    root: StackKey,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// A coordinator with one empty mutable root stack.
    pub fn new() -> Self {
        let root = StackKey::new("root").expect("root key");
        let nav = Self {
            stacks: RefCell::new(BTreeMap::new()),
            locks: RefCell::new(BTreeMap::new()),
            registry: LayoutRegistry::new(),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
            root: root.clone(),
        };
        nav.declare_mutable(root);
        nav
    }

    pub fn root(&self) -> &StackKey {
        &self.root
    }

    /// Declares an additional empty mutable stack.
    pub fn add_mutable_stack(&self, key: StackKey) {
        if self.stacks.borrow().contains_key(&key) {
            panic!("stack '{key}' is already declared");
        }
        self.declare_mutable(key);
    }

    /// Declares a fixed stack with its predetermined siblings. The first
    /// sibling starts active. An empty sibling list is a programmer error.
    pub fn add_fixed_stack(&self, key: StackKey, routes: Vec<Box<dyn Route>>) {
        if self.stacks.borrow().contains_key(&key) {
            panic!("stack '{key}' is already declared");
        }
        let handles = routes.into_iter().map(RouteHandle::new).collect();
        let stack = FixedStack::new(key.clone(), handles);
        self.locks
            .borrow_mut()
            .insert(key.clone(), Arc::new(AsyncMutex::new(())));
        self.stacks.borrow_mut().insert(key, Stack::Fixed(stack));
    }

    /// Tears down a declared stack: its routes are discarded (completions
    /// fulfilled empty), layouts on it take their owned stacks with them,
    /// and their memo entries are cleared. Returns false if the stack was
    /// not declared.
    pub async fn dispose_stack(&self, key: &StackKey) -> bool {
        if key == &self.root {
            panic!("the root stack cannot be disposed");
        }
        if !self.stacks.borrow().contains_key(key) {
            return false;
        }
        let _guard = self.lock_stack(key).await;
        // A layout teardown may have taken the stack while we queued.
        if !self.stacks.borrow().contains_key(key) {
            return false;
        }
        let mut log = MutationLog::new();
        self.teardown_stack(key, &mut log);
        log.finish(self, ChangeReason::Mutated);
        true
    }

    /// Registers the layout constructor serving `key`.
    pub fn register_layout(&self, key: LayoutKey, ctor: impl Fn() -> Box<dyn Route> + 'static) {
        self.registry.register(key, ctor);
    }

    pub fn layout_registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    pub fn subscribe(&self, observer: impl Fn(&NavEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer.get());
        self.next_observer.set(id.0 + 1);
        self.observers.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|(oid, _)| *oid != id);
    }

    pub fn contains_stack(&self, key: &StackKey) -> bool {
        self.stacks.borrow().contains_key(key)
    }

    pub fn stack_keys(&self) -> Vec<StackKey> {
        self.stacks.borrow().keys().cloned().collect()
    }

    pub fn stack_kind(&self, key: &StackKey) -> StackKind {
        self.stacks
            .borrow()
            .get(key)
            .unwrap_or_else(|| panic!("unknown stack '{key}'"))
            .kind()
    }

    /// The stack's route sequence, bottom to top.
    pub fn routes_of(&self, key: &StackKey) -> Vec<RouteHandle> {
        self.stacks
            .borrow()
            .get(key)
            .unwrap_or_else(|| panic!("unknown stack '{key}'"))
            .routes()
            .to_vec()
    }

    /// The route currently visible on the stack.
    pub fn active(&self, key: &StackKey) -> Option<RouteHandle> {
        self.stacks
            .borrow()
            .get(key)
            .unwrap_or_else(|| panic!("unknown stack '{key}'"))
            .active()
            .cloned()
    }

    /// Active index of a fixed stack.
    pub fn active_index_of(&self, key: &StackKey) -> usize {
        self.stacks
            .borrow()
            .get(key)
            .unwrap_or_else(|| panic!("unknown stack '{key}'"))
            .as_fixed()
            .active_index()
    }

    /// The active route of the stack plus its layout ancestry, outermost
    /// layout first, derived by walking parent keys upward.
    pub fn active_chain(&self, key: &StackKey) -> Vec<RouteHandle> {
        let mut chain = Vec::new();
        let mut current = self.active(key);
        while let Some(route) = current {
            let parent = route.route().parent_layout();
            chain.push(route);
            current = parent.and_then(|key| self.registry.active(&key));
        }
        chain.reverse();
        chain
    }

    /// Resolves redirects and appends the final route, materializing its
    /// layout chain if it declares one. Cancellation yields no result.
    pub async fn push(&self, stack: &StackKey, route: Box<dyn Route>) -> PushOutcome {
        let _guard = self.lock_stack(stack).await;
        let Some(route) = resolve_redirects(self, RouteHandle::new(route)).await else {
            debug!(stack = %stack, "push cancelled by redirect");
            return PushOutcome::Cancelled;
        };
        if !self.contains_stack(stack) {
            debug!(stack = %stack, "push target torn down during redirect resolution");
            route.discard();
            return PushOutcome::Cancelled;
        }
        let completion = route
            .take_completion()
            .expect("a fresh handle carries its completion");
        let mut log = MutationLog::new();
        let dest = self.materialize_and_append(stack, route, &mut log);
        debug!(stack = %dest, "route pushed");
        log.finish(self, ChangeReason::Mutated);
        PushOutcome::Pushed(completion)
    }

    /// Guard-checked removal of the top route of a mutable stack. The
    /// removed route's completion is fulfilled with `result`.
    pub async fn pop(&self, stack: &StackKey, result: Option<Value>) -> PopOutcome {
        let _guard = self.lock_stack(stack).await;
        let top = {
            let stacks = self.stacks.borrow();
            let Some(held) = stacks.get(stack) else {
                return PopOutcome::EmptyStack;
            };
            held.as_mutable().routes().last().cloned()
        };
        let Some(top) = top else {
            return PopOutcome::EmptyStack;
        };
        let allowed = guard_allows(self, &top).await;
        if !self.contains_stack(stack) {
            return PopOutcome::EmptyStack;
        }
        if !allowed {
            debug!(stack = %stack, route = top.route().tag(), "pop denied by exit guard");
            self.emit_resync(stack);
            return PopOutcome::Denied;
        }
        let mut log = MutationLog::new();
        log.touch(self, stack);
        let removed = {
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .expect("stack checked above")
                .as_mutable_mut()
                .remove_top()
                .expect("top route checked above")
        };
        removed.mark_removed_by_stack();
        self.release_removed(&removed, &mut log);
        removed.fulfill(result);
        debug!(stack = %stack, route = removed.route().tag(), "route popped");
        log.finish(self, ChangeReason::Mutated);
        PopOutcome::Popped
    }

    /// Replaces the top route of a mutable stack with a redirect-resolved
    /// route, as one notified mutation. The replaced route is discarded
    /// without a guard check.
    pub async fn replace(&self, stack: &StackKey, route: Box<dyn Route>) -> PushOutcome {
        let _guard = self.lock_stack(stack).await;
        let Some(route) = resolve_redirects(self, RouteHandle::new(route)).await else {
            return PushOutcome::Cancelled;
        };
        if !self.contains_stack(stack) {
            route.discard();
            return PushOutcome::Cancelled;
        }
        let completion = route
            .take_completion()
            .expect("a fresh handle carries its completion");
        let mut log = MutationLog::new();
        log.touch(self, stack);
        let removed = {
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .expect("stack checked above")
                .as_mutable_mut()
                .remove_top()
        };
        if let Some(removed) = removed {
            removed.mark_removed_by_stack();
            self.release_removed(&removed, &mut log);
            removed.discard();
        }
        {
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .expect("stack checked above")
                .as_mutable_mut()
                .append(route);
        }
        debug!(stack = %stack, "top route replaced");
        log.finish(self, ChangeReason::Mutated);
        PushOutcome::Pushed(completion)
    }

    /// Push unless an equal route is already present: at the top, the
    /// existing instance absorbs the incoming transient state; elsewhere,
    /// the occurrence moves to the top.
    pub async fn push_or_move_to_top(&self, stack: &StackKey, route: Box<dyn Route>) -> PushOutcome {
        let _guard = self.lock_stack(stack).await;
        let Some(incoming) = resolve_redirects(self, RouteHandle::new(route)).await else {
            return PushOutcome::Cancelled;
        };
        if !self.contains_stack(stack) {
            incoming.discard();
            return PushOutcome::Cancelled;
        }
        let (position, len) = {
            let stacks = self.stacks.borrow();
            let routes = stacks
                .get(stack)
                .expect("stack checked above")
                .as_mutable()
                .routes();
            (routes.iter().rposition(|route| *route == incoming), routes.len())
        };
        match position {
            Some(index) if index + 1 == len => {
                let top = self.routes_of(stack)[index].clone();
                top.route().merge_transient(incoming.route());
                incoming.discard();
                debug!(stack = %stack, "merged into existing top route");
                self.emit_resync(stack);
                PushOutcome::Merged
            }
            Some(index) => {
                let mut log = MutationLog::new();
                log.touch(self, stack);
                let existing = {
                    let mut stacks = self.stacks.borrow_mut();
                    stacks
                        .get_mut(stack)
                        .expect("stack checked above")
                        .as_mutable_mut()
                        .take_at(index)
                };
                existing.route().merge_transient(incoming.route());
                incoming.discard();
                {
                    let mut stacks = self.stacks.borrow_mut();
                    stacks
                        .get_mut(stack)
                        .expect("stack checked above")
                        .as_mutable_mut()
                        .restack(existing);
                }
                debug!(stack = %stack, "moved existing route to top");
                log.finish(self, ChangeReason::Mutated);
                PushOutcome::Merged
            }
            None => {
                let completion = incoming
                    .take_completion()
                    .expect("a fresh handle carries its completion");
                let mut log = MutationLog::new();
                self.materialize_and_append(stack, incoming, &mut log);
                log.finish(self, ChangeReason::Mutated);
                PushOutcome::Pushed(completion)
            }
        }
    }

    /// Browser-history navigation: pop back to the target if present
    /// (consulting guards each step), otherwise push it. On a fixed stack,
    /// activate the matching sibling instead.
    pub async fn navigate(&self, stack: &StackKey, route: Box<dyn Route>) -> NavigateOutcome {
        let _guard = self.lock_stack(stack).await;
        let Some(incoming) = resolve_redirects(self, RouteHandle::new(route)).await else {
            return NavigateOutcome::Cancelled;
        };
        if !self.contains_stack(stack) {
            incoming.discard();
            return NavigateOutcome::Cancelled;
        }
        match self.stack_kind(stack) {
            StackKind::Mutable => self.navigate_mutable(stack, incoming).await,
            StackKind::Fixed => self.navigate_fixed(stack, incoming).await,
        }
    }

    /// Activates the given sibling of a fixed stack: guard-checks the
    /// current active route, then follows the destination's redirects,
    /// which may only target siblings already present.
    pub async fn go_to_index(&self, stack: &StackKey, index: usize) -> ActivateOutcome {
        let _guard = self.lock_stack(stack).await;
        let len = {
            let stacks = self.stacks.borrow();
            stacks
                .get(stack)
                .unwrap_or_else(|| panic!("unknown stack '{stack}'"))
                .as_fixed()
                .routes()
                .len()
        };
        if index >= len {
            panic!("index {index} out of bounds for fixed stack '{stack}' of length {len}");
        }
        self.activate_index(stack, index).await
    }

    /// Unconditional removal at any position of a mutable stack. No guard
    /// is consulted; the route is discarded. Returns false if the instance
    /// is not on the stack.
    pub async fn remove(&self, stack: &StackKey, route: &RouteHandle) -> bool {
        let _guard = self.lock_stack(stack).await;
        let position = {
            let stacks = self.stacks.borrow();
            stacks
                .get(stack)
                .unwrap_or_else(|| panic!("unknown stack '{stack}'"))
                .as_mutable()
                .routes()
                .iter()
                .position(|candidate| candidate.same_instance(route))
        };
        let Some(index) = position else {
            return false;
        };
        let mut log = MutationLog::new();
        log.touch(self, stack);
        let removed = {
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .expect("stack checked above")
                .as_mutable_mut()
                .remove_at(index)
        };
        self.release_removed(&removed, &mut log);
        removed.discard();
        debug!(stack = %stack, route = removed.route().tag(), "route removed");
        log.finish(self, ChangeReason::Mutated);
        true
    }

    async fn navigate_mutable(&self, stack: &StackKey, incoming: RouteHandle) -> NavigateOutcome {
        let target = {
            let stacks = self.stacks.borrow();
            stacks
                .get(stack)
                .expect("stack checked by caller")
                .as_mutable()
                .routes()
                .iter()
                .rposition(|route| *route == incoming)
        };
        let Some(index) = target else {
            let completion = incoming
                .take_completion()
                .expect("a fresh handle carries its completion");
            let mut log = MutationLog::new();
            let dest = self.materialize_and_append(stack, incoming, &mut log);
            debug!(stack = %dest, "navigate target absent, pushed");
            log.finish(self, ChangeReason::Mutated);
            return NavigateOutcome::Pushed(completion);
        };

        let mut log = MutationLog::new();
        log.touch(self, stack);
        let mut popped = false;
        loop {
            let len = {
                let stacks = self.stacks.borrow();
                stacks.get(stack).expect("stack checked above").routes().len()
            };
            if len <= index + 1 {
                break;
            }
            let top = {
                let stacks = self.stacks.borrow();
                stacks
                    .get(stack)
                    .expect("stack checked above")
                    .routes()
                    .last()
                    .cloned()
                    .expect("len checked above")
            };
            let allowed = guard_allows(self, &top).await;
            if !self.contains_stack(stack) {
                incoming.discard();
                return NavigateOutcome::Cancelled;
            }
            if !allowed {
                debug!(stack = %stack, route = top.route().tag(), "navigate blocked by exit guard");
                incoming.discard();
                if popped {
                    log.finish(self, ChangeReason::Mutated);
                } else {
                    self.emit_resync(stack);
                }
                return NavigateOutcome::Blocked;
            }
            let removed = {
                let mut stacks = self.stacks.borrow_mut();
                stacks
                    .get_mut(stack)
                    .expect("stack checked above")
                    .as_mutable_mut()
                    .remove_top()
                    .expect("len checked above")
            };
            removed.mark_removed_by_stack();
            self.release_removed(&removed, &mut log);
            removed.fulfill(None);
            popped = true;
        }

        let target = self.routes_of(stack)[index].clone();
        target.route().merge_transient(incoming.route());
        incoming.discard();
        debug!(stack = %stack, route = target.route().tag(), "navigate reached target");
        log.finish(self, ChangeReason::Mutated);
        NavigateOutcome::Reached
    }

    async fn navigate_fixed(&self, stack: &StackKey, incoming: RouteHandle) -> NavigateOutcome {
        let target = {
            let stacks = self.stacks.borrow();
            stacks
                .get(stack)
                .expect("stack checked by caller")
                .as_fixed()
                .routes()
                .iter()
                .rposition(|route| *route == incoming)
        };
        let Some(index) = target else {
            debug!(stack = %stack, "navigate target absent from fixed stack");
            incoming.discard();
            self.emit_resync(stack);
            return NavigateOutcome::NotFound;
        };
        match self.activate_index(stack, index).await {
            ActivateOutcome::Activated => {
                let sibling = self.routes_of(stack)[index].clone();
                sibling.route().merge_transient(incoming.route());
                incoming.discard();
                NavigateOutcome::Reached
            }
            ActivateOutcome::Denied => {
                incoming.discard();
                NavigateOutcome::Blocked
            }
            ActivateOutcome::Cancelled => {
                incoming.discard();
                NavigateOutcome::Cancelled
            }
        }
    }

    async fn activate_index(&self, stack: &StackKey, index: usize) -> ActivateOutcome {
        let current = self
            .active(stack)
            .expect("a fixed stack always has an active route");
        let allowed = guard_allows(self, &current).await;
        if !self.contains_stack(stack) {
            return ActivateOutcome::Cancelled;
        }
        if !allowed {
            debug!(stack = %stack, "activation denied by exit guard");
            self.emit_resync(stack);
            return ActivateOutcome::Denied;
        }
        let Some(index) = self.resolve_fixed_destination(stack, index).await else {
            return ActivateOutcome::Cancelled;
        };
        let mut log = MutationLog::new();
        log.touch(self, stack);
        {
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .expect("stack checked by caller")
                .as_fixed_mut()
                .set_active_index(index);
        }
        debug!(stack = %stack, index, "fixed stack activated");
        log.finish(self, ChangeReason::Mutated);
        ActivateOutcome::Activated
    }

    /// Follows redirects on a fixed-stack destination. A redirector here
    /// may only target a sibling already present in the stack; anything
    /// else is a programmer error.
    async fn resolve_fixed_destination(&self, stack: &StackKey, start: usize) -> Option<usize> {
        let mut index = start;
        loop {
            let candidate = self.routes_of(stack)[index].clone();
            let decision = {
                let Some(redirector) = candidate.route().as_redirector() else {
                    return Some(index);
                };
                redirector.redirect(self).await
            };
            if !self.contains_stack(stack) {
                return None;
            }
            match decision {
                Redirect::Keep => return Some(index),
                Redirect::Cancel => return None,
                Redirect::To(next) => {
                    let probe = RouteHandle::new(next);
                    let sibling = self
                        .routes_of(stack)
                        .iter()
                        .rposition(|route| *route == probe);
                    let Some(sibling) = sibling else {
                        panic!(
                            "redirector on fixed stack '{stack}' may only target a sibling already present"
                        );
                    };
                    probe.discard();
                    index = sibling;
                }
            }
        }
    }

    /// Appends the route, materializing its layout chain if it declares
    /// one. Returns the stack that received it.
    fn materialize_and_append(
        &self,
        target: &StackKey,
        route: RouteHandle,
        log: &mut MutationLog,
    ) -> StackKey {
        let dest = match route.route().parent_layout() {
            None => target.clone(),
            Some(key) => self.ensure_layout_active(&key, target, log),
        };
        log.touch(self, &dest);
        let mut stacks = self.stacks.borrow_mut();
        stacks
            .get_mut(&dest)
            .unwrap_or_else(|| panic!("unknown stack '{dest}'"))
            .as_mutable_mut()
            .append(route);
        dest
    }

    /// Reuses the active instance for `key` or constructs one, pushing the
    /// new instance up its own layout chain. Returns the stack the layout
    /// owns.
    fn ensure_layout_active(
        &self,
        key: &LayoutKey,
        target: &StackKey,
        log: &mut MutationLog,
    ) -> StackKey {
        if let Some(instance) = self.registry.active(key) {
            let owned = instance
                .route()
                .as_layout()
                .unwrap_or_else(|| {
                    panic!("active instance for layout key '{key}' lost its layout capability")
                })
                .owned_stack();
            return owned;
        }
        let instance = RouteHandle::new(self.registry.construct(key));
        let owned = {
            let Some(layout) = instance.route().as_layout() else {
                panic!("layout constructor for '{key}' returned a route without the layout capability");
            };
            layout.owned_stack()
        };
        if !self.stacks.borrow().contains_key(&owned) {
            self.declare_mutable(owned.clone());
        }
        self.registry.activate(key.clone(), instance.clone());
        debug!(layout = %key, stack = %owned, "layout chain materialized");
        self.materialize_and_append(target, instance, log);
        owned
    }

    /// Tears down state owned by a removed route: an exiting layout takes
    /// its memo entry and its owned stack (and everything on it) with it.
    fn release_removed(&self, route: &RouteHandle, log: &mut MutationLog) {
        let owned = route
            .route()
            .as_layout()
            .map(|layout| (layout.key(), layout.owned_stack()));
        if let Some((key, stack)) = owned {
            self.registry.deactivate(&key);
            self.teardown_stack(&stack, log);
        }
    }

    fn teardown_stack(&self, key: &StackKey, log: &mut MutationLog) {
        log.touch(self, key);
        let stack = {
            let mut stacks = self.stacks.borrow_mut();
            stacks.remove(key)
        };
        let Some(stack) = stack else {
            return;
        };
        self.locks.borrow_mut().remove(key);
        self.registry.deactivate_bound_to(key);
        for route in stack.routes() {
            self.release_removed(route, log);
            route.discard();
        }
        debug!(stack = %key, "stack torn down");
    }

    pub(crate) fn restore_batch(&self, stack: &StackKey, routes: Vec<Box<dyn Route>>) {
        let mut log = MutationLog::new();
        log.touch(self, stack);
        for route in routes {
            let handle = RouteHandle::new(route);
            let layout = handle
                .route()
                .as_layout()
                .map(|layout| (layout.key(), layout.owned_stack()));
            if let Some((key, owned)) = layout {
                if !self.stacks.borrow().contains_key(&owned) {
                    self.declare_mutable(owned);
                }
                self.registry.activate(key, handle.clone());
            }
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .unwrap_or_else(|| panic!("unknown stack '{stack}'"))
                .as_mutable_mut()
                .append(handle);
        }
        log.finish(self, ChangeReason::Mutated);
    }

    pub(crate) fn restore_active_index(&self, stack: &StackKey, index: usize) {
        let mut log = MutationLog::new();
        log.touch(self, stack);
        {
            let mut stacks = self.stacks.borrow_mut();
            stacks
                .get_mut(stack)
                .unwrap_or_else(|| panic!("unknown stack '{stack}'"))
                .as_fixed_mut()
                .set_active_index(index);
        }
        log.finish(self, ChangeReason::Mutated);
    }

    fn declare_mutable(&self, key: StackKey) {
        self.locks
            .borrow_mut()
            .insert(key.clone(), Arc::new(AsyncMutex::new(())));
        self.stacks
            .borrow_mut()
            .insert(key.clone(), Stack::Mutable(MutableStack::new(key)));
    }

    async fn lock_stack(&self, key: &StackKey) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_else(|| panic!("unknown stack '{key}'"));
        lock.lock_owned().await
    }

    fn emit_resync(&self, stack: &StackKey) {
        let routes = self.routes_of(stack);
        let script = diff(&routes, &routes);
        self.emit(NavEvent {
            stack: stack.clone(),
            reason: ChangeReason::Resync,
            script,
            routes,
        });
    }

    fn emit(&self, event: NavEvent) {
        let observers: Vec<ObserverFn> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(&event);
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("stacks", &self.stacks.borrow())
            .field("registry", &self.registry)
            .field("root", &self.root)
            .finish()
    }
}
