// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_property_store`.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::{Arc, Once};
use std::{string::String, vec::Vec};

use understory_property_store::{
    AnimationClock, ElementTree, ErasedValue, NodeId, Priority, PriorityLadder, Property,
    PropertyFlags, PropertyMetadataBuilder, PropertyRegistry, ValueStore,
};

fn registry() -> (PropertyRegistry, Property<f64>, Property<f64>, Property<String>) {
    let mut registry = PropertyRegistry::new();
    let width = registry.register(
        "Control",
        "Width",
        PropertyMetadataBuilder::new(0.0_f64)
            .flags(PropertyFlags::AFFECTS_MEASURE)
            .build(),
    );
    let font_size = registry.register(
        "Control",
        "FontSize",
        PropertyMetadataBuilder::new(12.0_f64)
            .inherits(true)
            .build(),
    );
    let text = registry.register(
        "TextBlock",
        "Text",
        PropertyMetadataBuilder::new(String::new()).build(),
    );
    (registry, width, font_size, text)
}

/// Parent lookup for stores with no ancestors.
fn detached<'a>(_: u32) -> Option<(&'a ValueStore<u32>, Option<u32>)> {
    None
}

/// A chain `0 <- 1 <- ... <- len-1` of stores keyed by index.
fn chain(len: u32) -> Vec<ValueStore<u32>> {
    (0..len).map(ValueStore::new).collect()
}

fn bench_resolve(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: ValueStore<u32>={} PriorityLadder={} ErasedValue={}",
            size_of::<ValueStore<u32>>(),
            size_of::<PriorityLadder>(),
            size_of::<ErasedValue>(),
        );
    });

    let (registry, width, font_size, text) = registry();
    let mut group = c.benchmark_group("property/resolve");

    group.bench_function("local", |b| {
        let mut store = ValueStore::new(0_u32);
        store.set_local_value(&registry, width, 100.0).unwrap();
        b.iter(|| black_box(store.get_effective_value(&registry, width, None, &detached)));
    });

    group.bench_function("animation", |b| {
        let mut store = ValueStore::new(0_u32);
        store.set_local_value(&registry, width, 100.0).unwrap();
        store
            .animate(&registry, width, 200.0, AnimationClock(1))
            .unwrap();
        b.iter(|| black_box(store.get_effective_value(&registry, width, None, &detached)));
    });

    group.bench_function("style_base", |b| {
        let mut store = ValueStore::new(0_u32);
        store
            .set_value(&registry, width, Priority::StyleBase, 50.0)
            .unwrap();
        b.iter(|| black_box(store.get_effective_value(&registry, width, None, &detached)));
    });

    group.bench_function("default", |b| {
        let store = ValueStore::new(0_u32);
        b.iter(|| black_box(store.get_effective_value(&registry, width, None, &detached)));
    });

    for len in [4_u32, 16, 64] {
        let mut nodes = chain(len);
        nodes[0].set_local_value(&registry, font_size, 16.0).unwrap();
        let lookup = |key: u32| {
            nodes
                .get(key as usize)
                .map(|store| (store, key.checked_sub(1)))
        };
        let leaf = &nodes[(len - 1) as usize];
        group.bench_function(BenchmarkId::new("inherited_walk", len), |b| {
            b.iter(|| {
                black_box(leaf.get_effective_value(&registry, font_size, Some(len - 2), &lookup))
            });
        });
    }

    group.bench_function("string_clone", |b| {
        let mut store = ValueStore::new(0_u32);
        store
            .set_local_value(&registry, text, "hello world hello world".to_string())
            .unwrap();
        b.iter(|| black_box(store.get_effective_value(&registry, text, None, &detached)));
    });

    group.bench_function("string_ref", |b| {
        let mut store = ValueStore::new(0_u32);
        store
            .set_local_value(&registry, text, "hello world hello world".to_string())
            .unwrap();
        b.iter(|| {
            black_box(
                store
                    .effective(&registry, text.id(), None, &detached)
                    .map(|resolved| resolved.value.downcast_ref::<String>().map(String::len)),
            )
        });
    });

    group.finish();
}

fn bench_ladder(c: &mut Criterion) {
    let mut group = c.benchmark_group("property/ladder");

    group.bench_function("set_all_tiers", |b| {
        b.iter_batched(
            PriorityLadder::new,
            |mut ladder| {
                for tier in Priority::ALL {
                    black_box(ladder.set(tier, ErasedValue::new(1.0_f64)));
                }
                ladder
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("set_typed_in_place", |b| {
        let mut ladder = PriorityLadder::new();
        ladder.set(Priority::LocalValue, ErasedValue::new(1.0_f64));
        let mut next = 0.0_f64;
        b.iter(|| {
            next += 1.0;
            black_box(ladder.set_typed(Priority::LocalValue, next, None))
        });
    });

    group.bench_function("clear_top", |b| {
        b.iter_batched(
            || {
                let mut ladder = PriorityLadder::new();
                ladder.set(Priority::StyleBase, ErasedValue::new(1.0_f64));
                ladder.set(Priority::LocalValue, ErasedValue::new(2.0_f64));
                ladder
            },
            |mut ladder| {
                black_box(ladder.clear(Priority::LocalValue));
                ladder
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_tree(c: &mut Criterion) {
    let (registry, width, font_size, _) = registry();
    let registry = Arc::new(registry);

    let mut group = c.benchmark_group("property/tree");

    group.bench_function("set_local/no_subscribers", |b| {
        let mut tree = ElementTree::new(Arc::clone(&registry));
        let node = tree.insert("Control", None).unwrap();
        let mut next = 0.0_f64;
        b.iter(|| {
            next += 1.0;
            black_box(tree.set_local_value(node, width, next))
        });
    });

    group.bench_function("set_local/with_subscriber", |b| {
        let mut tree = ElementTree::new(Arc::clone(&registry));
        let node = tree.insert("Control", None).unwrap();
        tree.subscribe(node, width.id(), |_, change| {
            black_box(change.new_value::<f64>());
        })
        .unwrap();
        let mut next = 0.0_f64;
        b.iter(|| {
            next += 1.0;
            black_box(tree.set_local_value(node, width, next))
        });
    });

    for (depth, fanout) in [(4_u32, 4_usize), (8, 2)] {
        let mut tree = ElementTree::new(Arc::clone(&registry));
        let root = tree.insert("Control", None).unwrap();
        let mut level: Vec<NodeId> = vec![root];
        for _ in 0..depth {
            let mut next = Vec::new();
            for &parent in &level {
                for _ in 0..fanout {
                    next.push(tree.insert("Control", Some(parent)).unwrap());
                }
            }
            level = next;
        }
        let nodes = tree.len();
        group.bench_function(BenchmarkId::new("inherited_propagation", nodes), |b| {
            let mut size = 10.0_f64;
            b.iter(|| {
                size += 1.0;
                black_box(tree.set_local_value(root, font_size, size))
            });
        });
    }

    group.bench_function("animation_tick", |b| {
        let mut tree = ElementTree::new(Arc::clone(&registry));
        let nodes: Vec<NodeId> = (0..64)
            .map(|_| tree.insert("Control", None).unwrap())
            .collect();
        let clock = AnimationClock(7);
        let mut frame = 0.0_f64;
        b.iter(|| {
            frame += 1.0;
            for &node in &nodes {
                tree.animate(node, width, frame, clock).unwrap();
            }
        });
    });

    group.bench_function("stop_clock", |b| {
        b.iter_batched(
            || {
                let mut tree = ElementTree::new(Arc::clone(&registry));
                for _ in 0..64 {
                    let node = tree.insert("Control", None).unwrap();
                    tree.animate(node, width, 1.0, AnimationClock(7)).unwrap();
                }
                tree
            },
            |mut tree| {
                black_box(tree.stop_clock(AnimationClock(7)).unwrap());
                tree
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_ladder, bench_tree);
criterion_main!(benches);
