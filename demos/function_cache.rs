use memparams::{CacheConfig, CacheableKey, EvictionPolicy, FunctionCache, Lazy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
struct Product {
    id: u32,
    name: String,
}

// Debug-based key
impl CacheableKey for Product {}

static PRICE: Lazy<FunctionCache<(Product, f64), f64>> = Lazy::new(|| {
    FunctionCache::new("compute_price", |(p, tax): &(Product, f64)| {
        println!("Calculating price for {}", p.name);
        (p.id as f64) * 10.0 * (1.0 + tax)
    })
});

static RISKY: Lazy<FunctionCache<(u32,), Result<u32, String>>> = Lazy::new(|| {
    FunctionCache::fallible("risky_operation", |&(x,): &(u32,)| {
        println!("Running risky operation for {}", x);
        if x % 2 == 0 {
            Ok(x * 2)
        } else {
            Err(format!("Odd number: {}", x))
        }
    })
});

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("memparams_core=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let book = Product {
        id: 1,
        name: "Book".to_string(),
    };

    println!("First call: {}", PRICE.call(&(book.clone(), 0.2)));
    println!("Second call (cached): {}", PRICE.call(&(book, 0.2)));

    println!("Result 1: {:?}", RISKY.call(&(2,)));
    println!("Result 2 (cached): {:?}", RISKY.call(&(2,)));
    println!("Result 3 (error, not cached): {:?}", RISKY.call(&(3,)));
    println!("Result 4 (error, recomputed): {:?}", RISKY.call(&(3,)));

    // Unhashable arguments run every time
    let total = FunctionCache::new("total", |(v,): &(Vec<u32>,)| v.iter().sum::<u32>());
    println!("Total: {}", total.call(&(vec![1, 2, 3],)));
    println!("Total again (uncached): {}", total.call(&(vec![1, 2, 3],)));

    let bounded = FunctionCache::new("square", |&(x,): &(u64,)| x * x)
        .with_config(CacheConfig::new().limit(2).policy(EvictionPolicy::FIFO));
    for x in [1, 2, 3, 1] {
        bounded.call(&(x,));
    }
    println!("Bounded cache holds {} entries", bounded.len());

    #[cfg(feature = "stats")]
    {
        let stats = PRICE.stats();
        println!(
            "compute_price: {} hits, {} misses ({:.0}% hit rate)",
            stats.hits(),
            stats.misses(),
            stats.hit_rate() * 100.0
        );
    }
}
