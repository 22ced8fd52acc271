use memparams::{HasParameters, InstanceCache, Memoized, MethodCache, ParameterSlot, SlotStorage};

#[derive(Default)]
struct Portfolio {
    cache: InstanceCache,
    params: SlotStorage,
}

impl Memoized for Portfolio {
    fn instance_cache(&self) -> &InstanceCache {
        &self.cache
    }
}

impl HasParameters for Portfolio {
    fn parameter_storage(&self) -> &SlotStorage {
        &self.params
    }
}

const HOLDINGS: ParameterSlot<Vec<f64>> = ParameterSlot::new("holdings");
const FX_RATE: ParameterSlot<f64> = ParameterSlot::new("fx_rate");

static VALUE: MethodCache<Portfolio, (), f64> = MethodCache::new("value", |p, _| {
    println!("  (computing value)");
    let holdings = HOLDINGS.get(p).unwrap_or_default();
    let rate = FX_RATE.get(p).unwrap_or(1.0);
    holdings.iter().sum::<f64>() * rate
});

static SCALED: MethodCache<Portfolio, (f64,), f64> = MethodCache::new("scaled", |p, &(factor,)| {
    println!("  (computing scaled value x{})", factor);
    VALUE.bind(p).call(&()) * factor
});

fn main() {
    let portfolio = Portfolio::default();
    HOLDINGS.write(&portfolio, vec![100.0, 250.0]);
    FX_RATE.write(&portfolio, 1.1);

    println!("value: {}", VALUE.bind(&portfolio).call(&()));
    println!("value (cached): {}", VALUE.bind(&portfolio).call(&()));
    println!("scaled: {}", SCALED.bind(&portfolio).call(&(2.0,)));

    println!("appending a holding");
    HOLDINGS.read(&portfolio).unwrap().push(50.0);
    println!("value: {}", VALUE.bind(&portfolio).call(&()));

    println!("changing the exchange rate");
    FX_RATE.read(&portfolio).unwrap().mul_assign(2.0_f64);
    println!("scaled: {}", SCALED.bind(&portfolio).call(&(2.0,)));

    println!("unbound call, never cached");
    println!("value: {}", VALUE.call_unbound(&portfolio, &()));

    FX_RATE.delete(&portfolio).unwrap_or_else(|err| eprintln!("{}", err));
    if let Err(err) = FX_RATE.read(&portfolio) {
        println!("after delete: {}", err);
    }
    println!("value with default rate: {}", VALUE.bind(&portfolio).call(&()));
}
