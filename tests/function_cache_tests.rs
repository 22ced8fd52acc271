use memparams::{CacheConfig, EvictionPolicy, FunctionCache, Kwargs, Lazy, WithKwargs};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_pure_function_computed_once() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static LOOKUP: Lazy<FunctionCache<(u32, &'static str), Arc<String>>> = Lazy::new(|| {
        FunctionCache::new("lookup", |&(id, region): &(u32, &'static str)| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Arc::new(format!("{}-{}", region, id))
        })
    });

    let first = LOOKUP.call(&(7, "eu"));
    let second = LOOKUP.call(&(7, "eu"));

    assert_eq!(*first, "eu-7");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unhashable_arguments_always_recompute() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mean = FunctionCache::new("mean", move |(values,): &(Vec<f64>,)| {
        counter.fetch_add(1, Ordering::SeqCst);
        values.iter().sum::<f64>() / values.len() as f64
    });

    for _ in 0..3 {
        assert_eq!(mean.call(&(vec![1.0, 2.0, 3.0],)), 2.0);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(mean.is_empty());
}

#[test]
fn test_clear_then_call_recomputes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cube = FunctionCache::new("cube", move |&(x,): &(i64,)| {
        counter.fetch_add(1, Ordering::SeqCst);
        x * x * x
    });

    assert_eq!(cube.call(&(3,)), 27);
    cube.clear();
    assert_eq!(cube.call(&(3,)), 27);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_recursive_function() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static PATHS: Lazy<FunctionCache<(u64, u64), u64>> = Lazy::new(|| {
        FunctionCache::new("paths", |&(rows, cols): &(u64, u64)| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            if rows == 0 || cols == 0 {
                1
            } else {
                PATHS.call(&(rows - 1, cols)) + PATHS.call(&(rows, cols - 1))
            }
        })
    });

    assert_eq!(PATHS.call(&(16, 16)), 601_080_390);
    // One computation per distinct (rows, cols) pair
    assert_eq!(CALLS.load(Ordering::SeqCst), 17 * 17 - 1);
}

#[test]
fn test_keyword_order_is_irrelevant() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let area = FunctionCache::new("area", move |a: &WithKwargs<(), u32>| {
        counter.fetch_add(1, Ordering::SeqCst);
        a.kwargs.iter().map(|(_, v)| *v).product::<u32>()
    });

    let wh = WithKwargs::new((), Kwargs::new().with("width", 3).with("height", 4));
    let hw = WithKwargs::new((), Kwargs::new().with("height", 4).with("width", 3));
    assert_eq!(area.call(&wh), 12);
    assert_eq!(area.call(&hw), 12);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_positional_order_matters() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sub = FunctionCache::new("sub", move |&(a, b): &(i32, i32)| {
        counter.fetch_add(1, Ordering::SeqCst);
        a - b
    });

    assert_eq!(sub.call(&(5, 2)), 3);
    assert_eq!(sub.call(&(2, 5)), -3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_errors_are_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let parse = FunctionCache::fallible("parse", move |&(text,): &(&'static str,)| {
        counter.fetch_add(1, Ordering::SeqCst);
        text.parse::<i32>().map_err(|e| e.to_string())
    });

    assert!(parse.call(&("x",)).is_err());
    assert!(parse.call(&("x",)).is_err());
    assert_eq!(parse.call(&("12",)), Ok(12));
    assert_eq!(parse.call(&("12",)), Ok(12));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_cache_if_predicate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let find = FunctionCache::new("find", move |&(id,): &(u32,)| {
        counter.fetch_add(1, Ordering::SeqCst);
        (id < 10).then(|| id * 100)
    })
    .cache_if(Option::is_some);

    find.call(&(50,));
    find.call(&(50,));
    find.call(&(5,));
    find.call(&(5,));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_bounded_cache_evicts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = FunctionCache::new("id", move |&(x,): &(u8,)| {
        counter.fetch_add(1, Ordering::SeqCst);
        x
    })
    .with_config(CacheConfig::new().limit(3).policy(EvictionPolicy::FIFO));

    for x in 0..5 {
        id.call(&(x,));
    }
    assert_eq!(id.len(), 3);
    id.call(&(0,));
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_concurrent_callers_agree() {
    let square = Arc::new(FunctionCache::new("square", |&(x,): &(u64,)| x * x));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let square = Arc::clone(&square);
            std::thread::spawn(move || (0..100).map(|x| square.call(&(x,))).sum::<u64>())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 328_350);
    }
    assert_eq!(square.len(), 100);
}

#[cfg(feature = "stats")]
#[test]
fn test_statistics() {
    let id = FunctionCache::new("id", |&(x,): &(u8,)| x);
    id.call(&(1,));
    id.call(&(1,));
    id.call(&(2,));

    let stats = id.stats();
    assert_eq!(stats.hits(), 1);
    assert_eq!(stats.misses(), 2);
    assert!((stats.hit_rate() - 1.0 / 3.0).abs() < 1e-9);
}
