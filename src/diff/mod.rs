// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Minimal edit scripts between ordered route sequences.
//!
//! Classic Myers O(ND) greedy algorithm: unchanged elements become `Keep`
//! so they retain visual/identity continuity, and only genuine insertions
//! and deletions trigger enter/exit effects. The module is pure: it
//! compares by `PartialEq` and knows nothing about stacks, guards, or
//! layouts.

/// One step of an edit script.
///
/// Indices refer to the input sequences: `old` into the previous sequence,
/// `new` into the target sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Keep { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

impl Edit {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep { .. })
    }
}

/// Computes the minimal edit script transforming `old` into `new`.
pub fn diff<T: PartialEq>(old: &[T], new: &[T]) -> Vec<Edit> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    let idx = |k: isize| (k + max) as usize;

    // Forward pass: furthest-reaching x per diagonal k, one snapshot of the
    // frontier per edit distance d for the backtrack.
    let mut v = vec![0isize; (2 * max + 1) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    'forward: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                break 'forward;
            }
            k += 2;
        }
    }

    // Backtrack from (n, m) through the recorded frontiers.
    let mut script = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            script.push(Edit::Keep {
                old: (x - 1) as usize,
                new: (y - 1) as usize,
            });
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                script.push(Edit::Insert {
                    new: (y - 1) as usize,
                });
            } else {
                script.push(Edit::Delete {
                    old: (x - 1) as usize,
                });
            }
            x = prev_x;
            y = prev_y;
        }
    }
    script.reverse();
    script
}

/// Replays a script against its inputs, yielding the target sequence.
pub fn apply<T: Clone>(old: &[T], new: &[T], script: &[Edit]) -> Vec<T> {
    let mut out = Vec::with_capacity(new.len());
    for edit in script {
        match edit {
            Edit::Keep { old: i, .. } => out.push(old[*i].clone()),
            Edit::Insert { new: j } => out.push(new[*j].clone()),
            Edit::Delete { .. } => {}
        }
    }
    out
}
