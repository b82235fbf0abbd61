//! Integration tests for the cache-first resolution flow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cellfix::{
    CellLocator, Connectivity, RemoteError, RemoteFix, Resolution, Source, TcpProbe, TowerCache,
    TowerId, TowerLocation, TowerResolver, UnwiredClient,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tower() -> TowerId {
    TowerId {
        mcc: 724,
        mnc: 5,
        lac: 1234,
        cid: 5678,
    }
}

#[derive(Clone, Copy)]
enum Reply {
    Fix(f64, f64),
    NoMatch,
    Reject(&'static str),
}

/// Scripted locator that counts how often it is asked.
struct StubLocator {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubLocator {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CellLocator for StubLocator {
    async fn locate(&self, _tower: TowerId) -> Result<Option<RemoteFix>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.reply {
            Reply::Fix(lat, lon) => Ok(Some(RemoteFix { lat, lon })),
            Reply::NoMatch => Ok(None),
            Reply::Reject(message) => Err(RemoteError::Rejected(message.to_string())),
        }
    }
}

struct StubConnectivity(bool);

#[async_trait]
impl Connectivity for StubConnectivity {
    async fn is_online(&self) -> bool {
        self.0
    }
}

fn resolver(cache: TowerCache, locator: Arc<StubLocator>, online: bool) -> TowerResolver {
    TowerResolver::new(cache, locator, Arc::new(StubConnectivity(online)))
}

/// A cached tower is answered locally; the service is never asked.
#[tokio::test]
async fn cached_answer_skips_the_network() {
    let cache = TowerCache::in_memory().await.unwrap();
    cache
        .insert(&TowerLocation {
            tower: tower(),
            lat: -23.5,
            lon: -46.6,
        })
        .await
        .unwrap();

    let locator = StubLocator::new(Reply::Fix(0.0, 0.0));
    let resolver = resolver(cache, locator.clone(), true);

    let resolution = resolver.resolve(tower()).await;
    assert_eq!(
        resolution,
        Resolution::Found {
            lat: -23.5,
            lon: -46.6,
            source: Source::Cache,
        }
    );
    assert_eq!(locator.calls(), 0);
}

/// A miss while offline reports unavailability without asking the service.
#[tokio::test]
async fn offline_miss_reports_network_unavailable() {
    let cache = TowerCache::in_memory().await.unwrap();
    let locator = StubLocator::new(Reply::Fix(0.0, 0.0));
    let resolver = resolver(cache, locator.clone(), false);

    assert_eq!(
        resolver.resolve(tower()).await,
        Resolution::NetworkUnavailable
    );
    assert_eq!(locator.calls(), 0);
}

/// A remote answer is written back, so the next resolution is served from
/// the cache without another remote call.
#[tokio::test]
async fn remote_answer_is_cached_for_next_time() {
    let cache = TowerCache::in_memory().await.unwrap();
    let locator = StubLocator::new(Reply::Fix(-23.5, -46.6));
    let resolver = resolver(cache.clone(), locator.clone(), true);

    let first = resolver.resolve(tower()).await;
    assert_eq!(
        first,
        Resolution::Found {
            lat: -23.5,
            lon: -46.6,
            source: Source::Remote,
        }
    );

    let cached = cache.lookup(tower()).await.unwrap().unwrap();
    assert_eq!(cached.lat, -23.5);
    assert_eq!(cached.lon, -46.6);

    let second = resolver.resolve(tower()).await;
    assert_eq!(
        second,
        Resolution::Found {
            lat: -23.5,
            lon: -46.6,
            source: Source::Cache,
        }
    );
    assert_eq!(locator.calls(), 1);
}

/// No-coverage answers are reported but never cached; asking again asks
/// the service again.
#[tokio::test]
async fn negative_answers_are_not_cached() {
    let cache = TowerCache::in_memory().await.unwrap();
    let locator = StubLocator::new(Reply::NoMatch);
    let resolver = resolver(cache.clone(), locator.clone(), true);

    assert_eq!(resolver.resolve(tower()).await, Resolution::NotFound);
    assert_eq!(resolver.resolve(tower()).await, Resolution::NotFound);

    assert_eq!(locator.calls(), 2);
    assert_eq!(cache.count().await.unwrap(), 0);
}

/// Service rejections surface their message and leave the cache untouched.
#[tokio::test]
async fn rejections_surface_detail_and_are_not_cached() {
    let cache = TowerCache::in_memory().await.unwrap();
    let locator = StubLocator::new(Reply::Reject("Invalid token"));
    let resolver = resolver(cache.clone(), locator.clone(), true);

    match resolver.resolve(tower()).await {
        Resolution::RemoteError { detail } => assert!(detail.contains("Invalid token")),
        other => panic!("expected RemoteError, got {other:?}"),
    }
    assert_eq!(cache.count().await.unwrap(), 0);
}

/// Two concurrent misses for the same tower both reach the service; the
/// duplicate write-back is a no-op and both callers get the fix.
#[tokio::test]
async fn concurrent_misses_both_query_the_service() {
    let cache = TowerCache::in_memory().await.unwrap();
    let locator = StubLocator::slow(Reply::Fix(-23.5, -46.6), Duration::from_millis(100));
    let resolver = resolver(cache.clone(), locator.clone(), true);

    let (a, b) = futures::future::join(resolver.resolve(tower()), resolver.resolve(tower())).await;

    let expected = Resolution::Found {
        lat: -23.5,
        lon: -46.6,
        source: Source::Remote,
    };
    assert_eq!(a, expected);
    assert_eq!(b, expected);
    assert_eq!(locator.calls(), 2);
    assert_eq!(cache.count().await.unwrap(), 1);
}

/// Whole stack against a mock service: real client, real probe, on-disk
/// cache. The second resolution must come from the cache; the mock
/// verifies the service was hit exactly once.
#[tokio::test]
async fn full_stack_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/process.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "balance": 99,
            "lat": -23.5,
            "lon": -46.6,
            "accuracy": 800,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = TowerCache::open(&dir.path().join("towers.db")).await.unwrap();
    let locator = UnwiredClient::new(&server.uri(), "test-token");
    let probe = TcpProbe::new(server.address().to_string());
    let resolver = TowerResolver::new(cache, Arc::new(locator), Arc::new(probe));

    let first = resolver.resolve(tower()).await;
    assert_eq!(
        first,
        Resolution::Found {
            lat: -23.5,
            lon: -46.6,
            source: Source::Remote,
        }
    );

    let second = resolver.resolve(tower()).await;
    assert_eq!(
        second,
        Resolution::Found {
            lat: -23.5,
            lon: -46.6,
            source: Source::Cache,
        }
    );
}
