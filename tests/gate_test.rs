use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::Notify;

use munin::{
    GenerateOptions, ModelLoader, ModelStatus, MuninError, ReadinessGate, Result, TextGenerator,
    WarmupConfig,
};

// ============================================================================
// Mocks
// ============================================================================

/// Generator that counts calls and optionally fails them.
struct CountingGenerator {
    calls: AtomicU32,
    fail: bool,
}

impl CountingGenerator {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            fail,
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    fn name(&self) -> &str {
        "counting"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(MuninError::Http("warmup refused".into()));
        }
        Ok(" there".into())
    }
}

/// Loader that fails N times, then hands out its generator.
struct FlakyLoader {
    failures: AtomicU32,
    loads: AtomicU32,
    delay: Duration,
    generator: Arc<CountingGenerator>,
}

impl FlakyLoader {
    fn new(failures: u32, delay: Duration, generator: Arc<CountingGenerator>) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicU32::new(failures),
            loads: AtomicU32::new(0),
            delay,
            generator,
        })
    }

    fn loads(&self) -> u32 {
        self.loads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModelLoader for FlakyLoader {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.delay).await;
        if self.failures.load(Ordering::Relaxed) > 0 {
            self.failures.fetch_sub(1, Ordering::Relaxed);
            return Err(MuninError::Http("model server unreachable".into()));
        }
        let generator: Arc<dyn TextGenerator> = self.generator.clone();
        Ok(generator)
    }
}

/// Loader that blocks until released.
struct HeldLoader {
    release: Notify,
    generator: Arc<CountingGenerator>,
}

#[async_trait]
impl ModelLoader for HeldLoader {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        self.release.notified().await;
        let generator: Arc<dyn TextGenerator> = self.generator.clone();
        Ok(generator)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn concurrent_callers_share_one_load() {
    let loader = FlakyLoader::new(0, Duration::from_millis(50), CountingGenerator::new(false));
    let gate = ReadinessGate::new(loader.clone());

    let results = join_all((0..10).map(|_| gate.ensure_ready())).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(loader.loads(), 1);
    assert_eq!(gate.status(), ModelStatus::Ready);
}

#[tokio::test]
async fn concurrent_callers_observe_same_failure() {
    let loader = FlakyLoader::new(1, Duration::from_millis(50), CountingGenerator::new(false));
    let gate = ReadinessGate::new(loader.clone());

    let results = join_all((0..5).map(|_| gate.ensure_ready())).await;

    let messages: Vec<String> = results
        .into_iter()
        .map(|r| match r {
            Err(MuninError::ModelLoad(msg)) => msg,
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("load should have failed"),
        })
        .collect();
    assert!(messages.iter().all(|m| m == &messages[0]));
    assert!(messages[0].contains("model server unreachable"));
    assert_eq!(loader.loads(), 1);
    assert_eq!(gate.status(), ModelStatus::NotLoaded);
    assert!(gate.last_error().is_some());
}

#[tokio::test]
async fn failed_load_is_retried_by_next_caller() {
    let loader = FlakyLoader::new(1, Duration::ZERO, CountingGenerator::new(false));
    let gate = ReadinessGate::new(loader.clone());

    assert!(gate.ensure_ready().await.is_err());
    assert_eq!(gate.status(), ModelStatus::NotLoaded);

    let generator = gate.ensure_ready().await.unwrap();
    assert_eq!(generator.name(), "counting");
    assert_eq!(loader.loads(), 2);
    assert_eq!(gate.status(), ModelStatus::Ready);
    assert!(gate.last_error().is_none());
}

#[tokio::test]
async fn ready_gate_does_not_reload() {
    let loader = FlakyLoader::new(0, Duration::ZERO, CountingGenerator::new(false));
    let gate = ReadinessGate::new(loader.clone());

    for _ in 0..3 {
        gate.ensure_ready().await.unwrap();
    }
    assert_eq!(loader.loads(), 1);
}

#[tokio::test]
async fn warmup_runs_once_after_load() {
    let generator = CountingGenerator::new(false);
    let loader = FlakyLoader::new(0, Duration::ZERO, generator.clone());
    let gate = ReadinessGate::new(loader).with_warmup(WarmupConfig::default());

    gate.ensure_ready().await.unwrap();
    gate.ensure_ready().await.unwrap();

    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn warmup_failure_is_not_fatal() {
    let generator = CountingGenerator::new(true);
    let loader = FlakyLoader::new(0, Duration::ZERO, generator.clone());
    let gate = ReadinessGate::new(loader).with_warmup(WarmupConfig::default());

    assert!(gate.ensure_ready().await.is_ok());
    assert_eq!(generator.calls(), 1);
    assert_eq!(gate.status(), ModelStatus::Ready);
}

#[tokio::test]
async fn status_reports_loading_while_in_flight() {
    let loader = Arc::new(HeldLoader {
        release: Notify::new(),
        generator: CountingGenerator::new(false),
    });
    let gate = Arc::new(ReadinessGate::new(loader.clone()));
    assert_eq!(gate.status(), ModelStatus::NotLoaded);

    let waiter = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move { gate.ensure_ready().await.map(|_| ()) })
    };
    while gate.status() != ModelStatus::Loading {
        tokio::task::yield_now().await;
    }

    loader.release.notify_one();
    waiter.await.unwrap().unwrap();
    assert_eq!(gate.status(), ModelStatus::Ready);
}

#[tokio::test]
async fn preload_loads_in_background() {
    let loader = FlakyLoader::new(0, Duration::from_millis(10), CountingGenerator::new(false));
    let gate = Arc::new(ReadinessGate::new(loader.clone()));

    gate.spawn_preload();

    tokio::time::timeout(Duration::from_secs(5), async {
        while gate.status() != ModelStatus::Ready {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("preload should complete");

    // A request after preload reuses the loaded generator.
    gate.ensure_ready().await.unwrap();
    assert_eq!(loader.loads(), 1);
}
