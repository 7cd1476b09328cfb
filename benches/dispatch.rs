use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use fluxdispatch::{
    Action, ChangeEmitter, ChangeEvent, Dispatcher, DispatcherConfig, Handlers, HandlerResult, Listener,
    Store, ThreadMode,
};

#[derive(Debug)]
enum BenchAction {
    Bump,
}

impl Action for BenchAction {
    fn variant_name(&self) -> &'static str {
        "Bump"
    }
}

struct Bumped(u64);

impl ChangeEvent for Bumped {
    type Error = std::convert::Infallible;
}

struct BenchStore {
    emitter: Option<ChangeEmitter>,
    value: AtomicU64,
}

impl Store for BenchStore {
    type Action = BenchAction;
    const ACTION_MODE: ThreadMode = ThreadMode::Sync;

    fn on_action(&self, _action: &BenchAction) -> HandlerResult {
        let now = self.value.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(emitter) = &self.emitter {
            emitter.emit_change(Bumped(now))?;
        }
        Ok(())
    }

    fn on_register(&self) {}
}

struct Observer(AtomicU64);

impl Listener for Observer {
    fn declare_handlers(handlers: &mut Handlers<Self>) {
        handlers.on::<Bumped, _>(ThreadMode::Sync, |obs, ev| {
            obs.0.store(ev.0, Ordering::Relaxed);
            Ok(())
        });
    }
}

fn dispatcher() -> Dispatcher {
    Dispatcher::with_config(&DispatcherConfig {
        async_workers: 1,
        ..DispatcherConfig::default()
    })
}

fn bench_sync_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/sync_fan_out");
    for stores in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(stores as u64));
        group.bench_function(format!("{stores}_stores"), |b| {
            let dispatcher = dispatcher();
            let _handles: Vec<_> = (0..stores)
                .map(|_| {
                    dispatcher.register_store(|_| BenchStore {
                        emitter: None,
                        value: AtomicU64::new(0),
                    })
                })
                .collect();
            b.iter(|| dispatcher.dispatch(BenchAction::Bump).unwrap());
        });
    }
    group.finish();
}

fn bench_dispatch_with_change(c: &mut Criterion) {
    c.bench_function("dispatch/action_then_change", |b| {
        b.iter_custom(|iters| {
            // Fresh dispatcher per sample so registrations do not accumulate.
            let dispatcher = dispatcher();
            let observer = Arc::new(Observer(AtomicU64::new(0)));
            dispatcher.register(Arc::clone(&observer));
            let _store = dispatcher.register_store(|emitter| BenchStore {
                emitter: Some(emitter),
                value: AtomicU64::new(0),
            });

            let start = Instant::now();
            for _ in 0..iters {
                dispatcher.dispatch(BenchAction::Bump).unwrap();
            }
            let elapsed = start.elapsed();
            assert_eq!(observer.0.load(Ordering::Relaxed), iters);
            elapsed
        });
    });
}

fn bench_async_round_trip(c: &mut Criterion) {
    struct AsyncStore(AtomicU64);

    impl Store for AsyncStore {
        type Action = BenchAction;

        fn on_action(&self, _action: &BenchAction) -> HandlerResult {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn on_register(&self) {}
    }

    c.bench_function("dispatch/async_round_trip", |b| {
        let dispatcher = dispatcher();
        let _store = dispatcher.register_store(|_| AsyncStore(AtomicU64::new(0)));
        b.iter(|| dispatcher.dispatch(BenchAction::Bump).unwrap().wait().unwrap());
    });
}

criterion_group!(
    benches,
    bench_sync_fan_out,
    bench_dispatch_with_change,
    bench_async_round_trip
);
criterion_main!(benches);
