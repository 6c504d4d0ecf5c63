// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Redirect-chain and exit-guard resolution.
//!
//! Both are value-returning async steps: a redirect chain ends in a final
//! candidate or a cancellation, a guard consultation ends in a verdict.
//! Neither mutates any stack; the coordinator applies the outcome.

pub mod layout;

pub use layout::LayoutRegistry;

use tracing::trace;

use crate::coordinator::Coordinator;
use crate::model::{Redirect, RouteHandle};

/// Follows the candidate's redirect chain to a final destination.
///
/// While the current candidate exposes a redirector, its decision is
/// awaited: `Keep` stops with the candidate, `Cancel` discards it and
/// yields `None` (the enclosing operation aborts), `To` discards it and
/// continues with the replacement. Every discarded candidate has its
/// completion fulfilled with no result. The engine enforces no chain
/// bound; an infinite redirect cycle is a caller bug.
pub async fn resolve_redirects(nav: &Coordinator, route: RouteHandle) -> Option<RouteHandle> {
    let mut candidate = route;
    loop {
        let decision = {
            let Some(redirector) = candidate.route().as_redirector() else {
                return Some(candidate);
            };
            redirector.redirect(nav).await
        };
        match decision {
            Redirect::Keep => return Some(candidate),
            Redirect::Cancel => {
                trace!(from = candidate.route().tag(), "redirect cancelled");
                candidate.discard();
                return None;
            }
            Redirect::To(next) => {
                trace!(from = candidate.route().tag(), to = next.tag(), "redirected");
                candidate.discard();
                candidate = RouteHandle::new(next);
            }
        }
    }
}

/// Consults the route's exit guard. Absence of the capability means exit
/// is always allowed.
pub async fn guard_allows(nav: &Coordinator, route: &RouteHandle) -> bool {
    let Some(guard) = route.route().as_guard() else {
        return true;
    };
    let verdict = guard.can_exit(nav).await;
    trace!(route = route.route().tag(), verdict, "exit guard consulted");
    verdict
}
