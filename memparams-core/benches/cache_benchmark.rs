use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use memparams_core::{
    CacheConfig, EvictionPolicy, FunctionCache, HasParameters, InstanceCache, Memoized,
    MethodCache, ParameterSlot, SlotStorage,
};
use std::hint::black_box;
use std::sync::Arc;

struct Model {
    cache: InstanceCache,
    params: SlotStorage,
}

impl Memoized for Model {
    fn instance_cache(&self) -> &InstanceCache {
        &self.cache
    }
}

impl HasParameters for Model {
    fn parameter_storage(&self) -> &SlotStorage {
        &self.params
    }
}

const SCALE: ParameterSlot<u64> = ParameterSlot::new("scale");

static SCALED: MethodCache<Model, (u64,), u64> =
    MethodCache::new("scaled", |m, &(x,)| SCALE.get(m).unwrap_or(1) * x);

fn new_model() -> Model {
    let model = Model {
        cache: InstanceCache::with_graph(Arc::new(Default::default())),
        params: SlotStorage::new(),
    };
    SCALE.write(&model, 3);
    model
}

fn bench_function_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_hits");

    for size in [10u64, 100, 1000].iter() {
        let square = FunctionCache::new("square", |&(x,): &(u64,)| x * x);
        for i in 0..*size {
            square.call(&(i,));
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    black_box(square.call(&(i,)));
                }
            });
        });
    }

    group.finish();
}

fn bench_function_misses(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_misses");

    for size in [10u64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("unbounded", size), size, |b, &size| {
            b.iter(|| {
                let square = FunctionCache::new("square", |&(x,): &(u64,)| x * x);
                for i in 0..size {
                    black_box(square.call(&(i,)));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("LRU_limit_50", size), size, |b, &size| {
            b.iter(|| {
                let square = FunctionCache::new("square", |&(x,): &(u64,)| x * x)
                    .with_config(CacheConfig::new().limit(50).policy(EvictionPolicy::LRU));
                for i in 0..size {
                    black_box(square.call(&(i,)));
                }
            });
        });
    }

    group.finish();
}

fn bench_unhashable_fallback(c: &mut Criterion) {
    let total = FunctionCache::new("total", |(v,): &(Vec<u64>,)| v.iter().sum::<u64>());
    let data = (0..64).collect::<Vec<u64>>();

    c.bench_function("unhashable_fallback", |b| {
        b.iter(|| black_box(total.call(&(data.clone(),))));
    });
}

fn bench_method_hits(c: &mut Criterion) {
    let model = new_model();
    for i in 0..100 {
        SCALED.bind(&model).call(&(i,));
    }

    c.bench_function("method_hits", |b| {
        b.iter(|| {
            for i in 0..100 {
                black_box(SCALED.bind(&model).call(&(i,)));
            }
        });
    });
}

fn bench_invalidate_and_recompute(c: &mut Criterion) {
    let model = new_model();

    c.bench_function("slot_write_then_recompute", |b| {
        b.iter(|| {
            SCALE.write(&model, black_box(4));
            for i in 0..10 {
                black_box(SCALED.bind(&model).call(&(i,)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_function_hits,
    bench_function_misses,
    bench_unhashable_fallback,
    bench_method_hits,
    bench_invalidate_and_recompute
);
criterion_main!(benches);
