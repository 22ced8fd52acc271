use memparams::{
    clear_cascading, register_friend, unregister_friend, HasParameters, InstanceCache, Memoized,
    MethodCache, ParameterSlot, SlotStorage,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Stage {
    name: &'static str,
    cache: InstanceCache,
    params: SlotStorage,
}

impl Stage {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            cache: InstanceCache::new(),
            params: SlotStorage::new(),
        }
    }
}

impl Memoized for Stage {
    fn instance_cache(&self) -> &InstanceCache {
        &self.cache
    }
}

impl HasParameters for Stage {
    fn parameter_storage(&self) -> &SlotStorage {
        &self.params
    }
}

const THRESHOLD: ParameterSlot<u32> = ParameterSlot::new("threshold");

static REPORT: MethodCache<Stage, (), String> = MethodCache::new("report", |s, _| {
    println!("  (rendering {})", s.name);
    format!("{} @ {}", s.name, THRESHOLD.get(s).unwrap_or(0))
});

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let source = Stage::new("source");
    let filter = Stage::new("filter");
    let sink = Stage::new("sink");

    // source -> filter -> sink -> source
    register_friend(&source, &filter);
    register_friend(&filter, &sink);
    register_friend(&sink, &source);

    for stage in [&source, &filter, &sink] {
        println!("{}", REPORT.bind(stage).call(&()));
    }

    println!("updating the source threshold");
    THRESHOLD.write(&source, 10);
    for stage in [&source, &filter, &sink] {
        println!("{}", REPORT.bind(stage).call(&()));
    }

    println!("detaching the sink");
    unregister_friend(&filter, &sink).unwrap_or_else(|err| eprintln!("{}", err));
    println!("cleared {} caches", clear_cascading(&source));
    println!("sink still cached: {}", REPORT.is_cached(&sink, &()));

    unregister_friend(&source, &filter).unwrap_or_else(|err| eprintln!("{}", err));
    unregister_friend(&sink, &source).unwrap_or_else(|err| eprintln!("{}", err));
}
