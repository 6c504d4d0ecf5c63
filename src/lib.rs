// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Sextant: stack-based navigation engine (routes + guards + redirects + layouts).
//!
//! The crate is a single-crate layout: `model` holds route identity and
//! lifecycle, `stack` the mutable/fixed containers, `resolve` the redirect
//! and guard steps plus the layout registry, `diff` the Myers edit-script
//! engine, `coordinator` the orchestrating owner, and `store` the snapshot
//! contract.

pub mod coordinator;
pub mod diff;
pub mod model;
pub mod resolve;
pub mod stack;
pub mod store;
