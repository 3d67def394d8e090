//! Benchmarks for field-usage matching and cache lookups
//!
//! Matching runs once per field against the whole working set, so an
//! "every field" audit of a large object is dominated by this loop.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use orgscope_core::cache::{GlobalCache, categories};
use orgscope_core::usage::{MetadataWorkingSet, UsageCategory};
use std::hint::black_box;

/// Working set with `components` entries spread over every category
fn working_set(components: usize) -> MetadataWorkingSet {
    let mut set = MetadataWorkingSet::new();
    for i in 0..components {
        let category = UsageCategory::ALL[i % UsageCategory::ALL.len()];
        let name = format!("Component_{i}");
        if category == UsageCategory::PageLayouts {
            let fields = (0..40).map(|f| format!("Field_{f}__c")).collect();
            set.insert_layout(&name, fields);
        } else {
            let text = format!(
                "public void run() {{ record.Field_{}__c = value; update record; }}\n",
                i % 200
            )
            .repeat(20);
            set.insert_text(category, &name, &text);
        }
    }
    set
}

fn bench_field_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_matching");

    for components in [100, 1_000, 5_000] {
        let set = working_set(components);
        group.throughput(Throughput::Elements(components as u64));
        group.bench_with_input(BenchmarkId::new("single_field", components), &set, |b, set| {
            b.iter(|| black_box(set.matches(black_box("Field_17__c"))))
        });
    }

    let set = working_set(1_000);
    let fields: Vec<String> = (0..200).map(|f| format!("Field_{f}__c")).collect();
    group.bench_function("all_fields_1000_components", |b| {
        b.iter(|| {
            for field in &fields {
                black_box(set.matches(field));
            }
        })
    });

    group.finish();
}

fn bench_cache_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let cache = GlobalCache::new();
    for i in 0..500 {
        cache.set(categories::OBJECT_METADATA, &format!("Object_{i}__c"), i, None);
    }

    group.bench_function("hit", |b| {
        b.iter(|| black_box(cache.get::<i32>(categories::OBJECT_METADATA, black_box("Object_250__c"))))
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(cache.get::<i32>(categories::OBJECT_METADATA, black_box("Missing__c"))))
    });
    group.bench_function("invalidate_pattern", |b| {
        b.iter(|| {
            cache.set(categories::QUERY_RESULTS, "describe:Account", 1, None);
            black_box(cache.invalidate_pattern(categories::QUERY_RESULTS, "describe:*").unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_field_matching, bench_cache_lookups);
criterion_main!(benches);
