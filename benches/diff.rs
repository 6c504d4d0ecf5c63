// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Sextant-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Sextant and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use sextant::diff::{diff, Edit};

// Benchmark identity (keep stable):
// - Group name in this file: `diff.myers`
// - Case IDs (the string after the `/`) must remain stable across refactors so
//   results stay comparable over time (e.g. `identical_64`, `tail_churn_64`).
// - If implementations move/deduplicate, update the wiring but do not rename
//   group or case IDs.
fn checksum_script(script: &[Edit]) -> u64 {
    let mut acc = 0u64;
    for edit in script {
        let code = match edit {
            Edit::Keep { old, new } => 1u64
                .wrapping_mul(131)
                .wrapping_add(*old as u64)
                .wrapping_mul(131)
                .wrapping_add(*new as u64),
            Edit::Delete { old } => 2u64.wrapping_mul(131).wrapping_add(*old as u64),
            Edit::Insert { new } => 3u64.wrapping_mul(131).wrapping_add(*new as u64),
        };
        acc = acc.wrapping_mul(131).wrapping_add(code);
    }
    acc
}

fn addresses(count: usize, salt: usize) -> Vec<String> {
    (0..count)
        .map(|idx| format!("/screen_{:03}/{}", (idx.wrapping_mul(salt)) % 19, idx))
        .collect()
}

fn benches_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff.myers");

    // Identical sequences: the all-keep fast path a resync notification hits.
    let identical = addresses(64, 1);
    group.throughput(Throughput::Elements(identical.len() as u64));
    group.bench_function("identical_64", {
        let old = identical.clone();
        let new = identical.clone();
        move |b| b.iter(|| black_box(checksum_script(&diff(black_box(&old), black_box(&new)))))
    });

    // Tail churn: a navigate popping a handful of routes then pushing one,
    // the dominant shape of stack mutations.
    let tail_old = addresses(64, 1);
    let mut tail_new = tail_old[..56].to_vec();
    tail_new.push("/screen_pushed/0".to_owned());
    group.throughput(Throughput::Elements(tail_old.len() as u64));
    group.bench_function("tail_churn_64", {
        let old = tail_old.clone();
        let new = tail_new.clone();
        move |b| b.iter(|| black_box(checksum_script(&diff(black_box(&old), black_box(&new)))))
    });

    // Disjoint sequences: worst case, every element edited.
    let disjoint_old = addresses(32, 1);
    let disjoint_new = (0..32)
        .map(|idx| format!("/other_{idx:03}"))
        .collect::<Vec<_>>();
    group.throughput(Throughput::Elements(disjoint_old.len() as u64));
    group.bench_function("disjoint_32", {
        let old = disjoint_old.clone();
        let new = disjoint_new.clone();
        move |b| b.iter(|| black_box(checksum_script(&diff(black_box(&old), black_box(&new)))))
    });

    // Interleaved overlap: shifted windows sharing a long common subsequence.
    let interleaved_old = addresses(128, 3);
    let interleaved_new = addresses(128, 5);
    group.throughput(Throughput::Elements(interleaved_old.len() as u64));
    group.bench_function("interleaved_128", {
        let old = interleaved_old.clone();
        let new = interleaved_new.clone();
        move |b| b.iter(|| black_box(checksum_script(&diff(black_box(&old), black_box(&new)))))
    });

    group.finish();
}

criterion_group!(benches, benches_diff);
criterion_main!(benches);
