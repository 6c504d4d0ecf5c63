// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use smallvec::SmallVec;
use smol_str::SmolStr;

/// One significant field of a route's identity.
///
/// Two routes with the same tag are equal iff their prop lists compare
/// equal pairwise; changing any prop breaks equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropValue {
    None,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
}

impl PropValue {
    pub fn str(value: impl AsRef<str>) -> Self {
        Self::Str(SmolStr::new(value))
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("_"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<SmolStr> for PropValue {
    fn from(value: SmolStr) -> Self {
        Self::Str(value)
    }
}

/// Ordered list of significant fields; most routes carry only a few.
pub type Props = SmallVec<[PropValue; 4]>;
