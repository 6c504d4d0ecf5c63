// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Route identity, capabilities, and handle lifecycle.
//!
//! Routes compare by (tag, props); handles add the engine-owned state: the
//! exclusive stack binding, the single-fire completion, and the terminal
//! discard transition.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod ids;
pub mod props;
pub mod route;

pub use ids::{Key, KeyError, LayoutKey, StackKey};
pub use props::{PropValue, Props};
pub use route::{Completion, ExitGuard, Layout, Redirect, Redirector, Route, RouteHandle};
