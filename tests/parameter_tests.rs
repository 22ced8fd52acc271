use memparams::{
    FriendGraph, HasParameters, InstanceCache, Lazy, Memoized, MethodCache, MutationProxy,
    ParameterSlot, SlotStorage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Default)]
struct Calculator {
    cache: InstanceCache,
    params: SlotStorage,
    evaluations: AtomicUsize,
}

impl Calculator {
    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl Memoized for Calculator {
    fn instance_cache(&self) -> &InstanceCache {
        &self.cache
    }
}

impl HasParameters for Calculator {
    fn parameter_storage(&self) -> &SlotStorage {
        &self.params
    }
}

const BASE: ParameterSlot<i64> = ParameterSlot::new("base");
const HISTORY: ParameterSlot<Vec<i64>> = ParameterSlot::new("history");
const RATES: ParameterSlot<HashMap<String, f64>> = ParameterSlot::new("rates");
const LABEL: ParameterSlot<String> = ParameterSlot::new("label");

static ADD: MethodCache<Calculator, (i64,), i64> = MethodCache::new("add", |c, &(x,)| {
    c.evaluations.fetch_add(1, Ordering::SeqCst);
    BASE.get(c).unwrap_or(0) + x
});

static TOTAL: MethodCache<Calculator, (), i64> = MethodCache::new("total", |c, _| {
    c.evaluations.fetch_add(1, Ordering::SeqCst);
    HISTORY.get(c).map(|h| h.iter().sum()).unwrap_or(0)
});

static CONVERT: MethodCache<Calculator, (&'static str, f64), Option<f64>> =
    MethodCache::new("convert", |c, &(currency, amount)| {
        c.evaluations.fetch_add(1, Ordering::SeqCst);
        RATES.read(c).ok()?.lookup(&currency.to_string()).map(|r| r * amount)
    });

static TITLE: MethodCache<Calculator, (), String> = MethodCache::new("title", |c, _| {
    c.evaluations.fetch_add(1, Ordering::SeqCst);
    LABEL.get(c).unwrap_or_default().to_uppercase()
});

#[test]
fn test_add_follows_base() {
    let calc = Calculator::default();

    BASE.write(&calc, 3);
    assert_eq!(ADD.bind(&calc).call(&(4,)), 7);
    assert_eq!(ADD.bind(&calc).call(&(4,)), 7);
    assert_eq!(calc.evaluations(), 1);

    BASE.write(&calc, 10);
    assert_eq!(ADD.bind(&calc).call(&(4,)), 14);
    assert_eq!(calc.evaluations(), 2);
}

#[test]
fn test_write_clears_every_method() {
    let calc = Calculator::default();
    BASE.write(&calc, 1);
    HISTORY.write(&calc, vec![1, 2]);
    ADD.bind(&calc).call(&(1,));
    TOTAL.bind(&calc).call(&());

    LABEL.write(&calc, "unrelated".to_string());
    assert!(calc.cache.is_empty());
}

#[test]
fn test_arithmetic_in_place() {
    let calc = Calculator::default();
    BASE.write(&calc, 1);
    assert_eq!(ADD.bind(&calc).call(&(1,)), 2);

    BASE.read(&calc).unwrap().add_assign(5_i64);
    assert_eq!(ADD.bind(&calc).call(&(1,)), 7);

    BASE.read(&calc).unwrap().mul_assign(2_i64);
    assert_eq!(ADD.bind(&calc).call(&(1,)), 13);
}

#[test]
fn test_list_mutation_invalidates_and_reads_do_not() {
    let calc = Calculator::default();
    HISTORY.write(&calc, vec![1, 2, 3]);
    assert_eq!(TOTAL.bind(&calc).call(&()), 6);

    let history = HISTORY.read(&calc).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history.item(0), Some(1));
    assert_eq!(TOTAL.bind(&calc).call(&()), 6);
    assert_eq!(calc.evaluations(), 1);

    history.extend([4, 5]);
    assert_eq!(TOTAL.bind(&calc).call(&()), 15);

    history.set(0, 10);
    assert_eq!(TOTAL.bind(&calc).call(&()), 24);

    history.drain(3..);
    assert_eq!(TOTAL.bind(&calc).call(&()), 15);
    assert_eq!(calc.evaluations(), 4);
}

#[test]
fn test_map_mutation_invalidates() {
    let calc = Calculator::default();
    RATES.write(&calc, HashMap::from([("eur".to_string(), 0.5)]));
    assert_eq!(CONVERT.bind(&calc).call(&("eur", 10.0)), Some(5.0));
    assert_eq!(CONVERT.bind(&calc).call(&("gbp", 10.0)), None);

    RATES.read(&calc).unwrap().insert("gbp".to_string(), 0.25);
    assert_eq!(CONVERT.bind(&calc).call(&("gbp", 10.0)), Some(2.5));

    RATES.read(&calc).unwrap().remove(&"eur".to_string());
    assert_eq!(CONVERT.bind(&calc).call(&("eur", 10.0)), None);
}

#[test]
fn test_string_mutation_invalidates() {
    let calc = Calculator::default();
    LABEL.write(&calc, "net".to_string());
    assert_eq!(TITLE.bind(&calc).call(&()), "NET");

    LABEL.read(&calc).unwrap().push_str(" total");
    assert_eq!(TITLE.bind(&calc).call(&()), "NET TOTAL");
}

#[test]
fn test_delete_invalidates_and_reports_unset() {
    let calc = Calculator::default();
    BASE.write(&calc, 2);
    assert_eq!(ADD.bind(&calc).call(&(1,)), 3);

    BASE.delete(&calc).unwrap();
    assert_eq!(ADD.bind(&calc).call(&(1,)), 1);
    assert!(BASE.delete(&calc).is_err());
    assert!(BASE.read(&calc).is_err());
}

#[test]
fn test_assigning_one_instances_value_to_another() {
    let a = Calculator::default();
    let b = Calculator::default();
    HISTORY.write(&a, vec![1]);

    HISTORY.write_copy(&b, &HISTORY.read(&a).unwrap());
    TOTAL.bind(&a).call(&());
    HISTORY.read(&b).unwrap().push(2);

    assert!(TOTAL.is_cached(&a, &()));
    assert_eq!(HISTORY.get(&a).unwrap(), vec![1]);
    assert_eq!(HISTORY.get(&b).unwrap(), vec![1, 2]);
}

#[test]
fn test_proxy_does_not_keep_instance_alive() {
    let calc = Calculator::default();
    HISTORY.write(&calc, vec![1]);
    let history: Arc<MutationProxy<Vec<i64>>> = HISTORY.read(&calc).unwrap();
    let owner = history.owner().clone();
    drop(calc);

    assert!(!owner.is_attached());
    history.push(2);
    assert_eq!(history.get(), vec![1, 2]);
}

#[test]
fn test_parameter_change_cascades_to_friends() {
    let graph = Arc::new(FriendGraph::new());
    let make = || Calculator {
        cache: InstanceCache::with_graph(Arc::clone(&graph)),
        ..Calculator::default()
    };
    let upstream = make();
    let downstream = make();
    upstream.add_friend(&downstream);

    BASE.write(&downstream, 1);
    ADD.bind(&downstream).call(&(1,));

    BASE.write(&upstream, 5);
    assert!(!ADD.is_cached(&downstream, &(1,)));
}

static READ_BASE: Lazy<Barrier> = Lazy::new(|| Barrier::new(2));
static BASE_WRITTEN: Lazy<Barrier> = Lazy::new(|| Barrier::new(2));

static SLOW_ADD: MethodCache<Calculator, (i64,), i64> = MethodCache::new("slow_add", |c, &(x,)| {
    let base = BASE.get(c).unwrap_or(0);
    READ_BASE.wait();
    BASE_WRITTEN.wait();
    base + x
});

#[test]
fn test_write_during_computation_is_not_masked() {
    let calc = Calculator::default();
    BASE.write(&calc, 3);

    thread::scope(|s| {
        let worker = s.spawn(|| SLOW_ADD.bind(&calc).call(&(4,)));
        READ_BASE.wait();
        BASE.write(&calc, 10);
        BASE_WRITTEN.wait();
        assert_eq!(worker.join().unwrap(), 7);
    });

    assert!(!SLOW_ADD.is_cached(&calc, &(4,)));
    assert!(calc.cache.is_empty());
}
