// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the result cache and script generation.

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use sourcegate_bridge::{ResultCache, ScriptInjector, ScriptVariant};
use sourcegate_core::types::{CorrelationId, Notification};
use sourcegate_security::BridgeNames;

/// put + take of one result with `n` other results already waiting.
fn bench_cache_put_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_cache_put_take");
    for backlog in [0usize, 100, 1_000] {
        let cache = ResultCache::new(Duration::from_secs(120));
        for i in 0..backlog {
            cache.put(&format!("req_run_{i}"), "payload");
        }
        group.bench_with_input(BenchmarkId::from_parameter(backlog), &cache, |b, cache| {
            b.iter(|| {
                cache.put("req_getAwait_hot", black_box("body"));
                black_box(cache.take("req_getAwait_hot"));
            });
        });
    }
    group.finish();
}

/// Full injection script; rendered once per page load.
fn bench_render_scripts(c: &mut Criterion) {
    let injector = ScriptInjector::new(BridgeNames::generate());
    c.bench_function("inject_full_script", |b| {
        b.iter(|| black_box(injector.script(ScriptVariant::Full)));
    });
    c.bench_function("dispatch_call", |b| {
        let notification = Notification::succeeded(CorrelationId::new("req_getAwait_1_abc"));
        b.iter(|| black_box(injector.dispatch_call(black_box(&notification))));
    });
}

criterion_group!(benches, bench_cache_put_take, bench_render_scripts);
criterion_main!(benches);
