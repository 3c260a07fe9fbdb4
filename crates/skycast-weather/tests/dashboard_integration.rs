//! Integration tests for Dashboard and CitySearch using wiremock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use skycast_core::{LocationConfig, SearchConfig};
use skycast_weather::location::{FixedPositionSource, UnsupportedPositionSource};
use skycast_weather::{
    Backdrop, Dashboard, GeolocationResolver, Location, LocationError, MemoryStore, Position,
    PositionOptions, PositionSource, PreferencesStore, ResolverStatus, UnitSystem, WeatherClient,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Counts requests and delegates to an inner source.
struct CountingSource<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S> CountingSource<S> {
    fn new(inner: S) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: PositionSource> PositionSource for CountingSource<S> {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.current_position(options).await
    }
}

fn client_for(server: &MockServer) -> WeatherClient {
    WeatherClient::with_base_urls("test-key", &server.uri(), &server.uri()).unwrap()
}

fn dashboard(
    server: &MockServer,
    source: Arc<dyn PositionSource>,
) -> (Dashboard, PreferencesStore) {
    let prefs = PreferencesStore::new(Arc::new(MemoryStore::new()));
    let resolver = GeolocationResolver::from_config(source, &LocationConfig::default());
    (
        Dashboard::new(client_for(server), prefs.clone(), resolver),
        prefs,
    )
}

fn snapshot(main: &str) -> serde_json::Value {
    serde_json::json!({
        "current": {"temp": 15.0, "weather": [{"main": main}]}
    })
}

async fn mount_any_weather(server: &MockServer, main: &str) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(main)))
        .mount(server)
        .await;
}

fn tokyo() -> Location {
    Location::named(35.6762, 139.6503, "Tokyo", Some("JP".into()))
}

#[tokio::test]
async fn test_start_prefers_last_location_over_geolocation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "35.6762"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("Clear")))
        .expect(1)
        .mount(&server)
        .await;

    let source = CountingSource::new(FixedPositionSource::new(1.0, 2.0));
    let (dashboard, prefs) = dashboard(&server, source.clone());
    prefs.set_last_location(&tokyo());

    let shown = dashboard.start().await;

    assert_eq!(shown, tokyo());
    assert_eq!(source.calls(), 0);
    assert!(dashboard.orchestrator().snapshot().is_some());
}

#[tokio::test]
async fn test_start_uses_device_position() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "52.52"))
        .and(query_param("lon", "13.405"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("Clear")))
        .expect(1)
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(FixedPositionSource::new(52.52, 13.405)));

    let shown = dashboard.start().await;

    assert_eq!(shown.coordinates(), (52.52, 13.405));
    assert_eq!(dashboard.resolver().status(), ResolverStatus::Resolved);
}

#[tokio::test]
async fn test_start_without_geolocation_shows_fallback_city() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "40.7128"))
        .and(query_param("lon", "-74.006"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("Clear")))
        .expect(1)
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));

    let shown = dashboard.start().await;

    assert_eq!(shown.coordinates(), (40.7128, -74.0060));
    assert_eq!(shown.accuracy, None);
    assert_eq!(dashboard.resolver().status(), ResolverStatus::FailedWithFallback);
    assert!(dashboard.resolver().error().is_some());
}

#[tokio::test]
async fn test_select_city_persists_and_fetches() {
    let server = MockServer::start().await;
    mount_any_weather(&server, "Rain").await;

    let (dashboard, prefs) = dashboard(&server, Arc::new(UnsupportedPositionSource));

    assert!(dashboard.select_city(tokyo()).await);

    assert_eq!(prefs.last_location(), Some(tokyo()));
    assert_eq!(dashboard.orchestrator().location(), Some(tokyo()));
    assert_eq!(dashboard.backdrop(12), Some(Backdrop::Rainy));
    assert_eq!(dashboard.backdrop(22), Some(Backdrop::Night));
}

#[tokio::test]
async fn test_toggle_units_persists_and_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("Clear")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("Clear")))
        .expect(1)
        .mount(&server)
        .await;

    let (dashboard, prefs) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    dashboard.select_city(tokyo()).await;

    assert_eq!(dashboard.toggle_units().await, UnitSystem::Imperial);
    assert_eq!(prefs.preferred_units(), UnitSystem::Imperial);
}

#[tokio::test]
async fn test_toggle_favorite() {
    let server = MockServer::start().await;
    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));

    assert_eq!(dashboard.toggle_favorite(&tokyo()), vec![tokyo()]);
    assert_eq!(dashboard.favorites(), vec![tokyo()]);
    assert!(dashboard.toggle_favorite(&tokyo()).is_empty());
}

#[tokio::test]
async fn test_refresh_location_failure_keeps_current_weather() {
    let server = MockServer::start().await;
    mount_any_weather(&server, "Snow").await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    let shown = dashboard.start().await;

    let result = dashboard.refresh_location().await;

    assert_eq!(result, Err(LocationError::Unsupported));
    assert_eq!(dashboard.resolver().status(), ResolverStatus::Failed);
    assert_eq!(dashboard.resolver().location(), Some(shown.clone()));
    assert_eq!(dashboard.orchestrator().location(), Some(shown));
    assert!(dashboard.orchestrator().snapshot().is_some());
}

#[tokio::test]
async fn test_refresh_location_success_follows_device() {
    let server = MockServer::start().await;
    mount_any_weather(&server, "Clear").await;

    let (dashboard, _) = dashboard(&server, Arc::new(FixedPositionSource::new(59.3293, 18.0686)));
    dashboard.select_city(tokyo()).await;

    let location = dashboard.refresh_location().await.unwrap();

    assert_eq!(location.coordinates(), (59.3293, 18.0686));
    assert_eq!(
        dashboard.orchestrator().location().map(|l| l.coordinates()),
        Some((59.3293, 18.0686))
    );
}

fn fast_search() -> SearchConfig {
    SearchConfig {
        debounce_ms: 50,
        min_query_len: 2,
    }
}

#[tokio::test]
async fn test_city_search_debounces_typing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Paris", "country": "FR", "lat": 48.8566, "lon": 2.3522},
            {"name": "Paris", "country": "US", "lat": 33.6609, "lon": -95.5555}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    let search = dashboard.city_search(&fast_search());

    for query in ["Pa", "Par", "Pari", "Paris"] {
        search.input(query);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(search.state().loading);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = search.state();
    assert!(!state.loading);
    assert_eq!(state.query, "Paris");
    assert_eq!(state.suggestions.len(), 2);
    assert_eq!(state.suggestions[1].country.as_deref(), Some("US"));
}

#[tokio::test]
async fn test_city_search_short_query_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    let search = dashboard.city_search(&fast_search());

    search.input("P");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!search.state().loading);

    search.input("   ");
    let state = search.state();
    assert!(state.query.is_empty());
    assert!(state.suggestions.is_empty());
}

#[tokio::test]
async fn test_city_search_failure_yields_no_suggestions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    let search = dashboard.city_search(&fast_search());
    let mut updates = search.subscribe();

    search.input("Lyon");
    tokio::time::timeout(Duration::from_secs(2), updates.wait_for(|s| !s.loading))
        .await
        .unwrap()
        .unwrap();

    assert!(search.state().suggestions.is_empty());
}

#[tokio::test]
async fn test_city_search_clearing_discards_in_flight_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([
                    {"name": "Paris", "country": "FR", "lat": 48.8566, "lon": 2.3522}
                ]))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    let search = dashboard.city_search(&fast_search());

    search.input("Paris");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.input("");
    tokio::time::sleep(Duration::from_millis(500)).await;

    let state = search.state();
    assert!(state.query.is_empty());
    assert!(state.suggestions.is_empty());
    assert!(!state.loading);
}

#[tokio::test]
async fn test_city_search_slow_earlier_query_does_not_overwrite_later() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Paris"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([
                    {"name": "Paris", "country": "FR", "lat": 48.8566, "lon": 2.3522}
                ]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Berlin", "country": "DE", "lat": 52.52, "lon": 13.405}
        ])))
        .mount(&server)
        .await;

    let (dashboard, _) = dashboard(&server, Arc::new(UnsupportedPositionSource));
    let search = dashboard.city_search(&fast_search());

    search.input("Paris");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.input("Berlin");
    tokio::time::sleep(Duration::from_millis(600)).await;

    let state = search.state();
    assert_eq!(state.query, "Berlin");
    assert_eq!(state.suggestions.len(), 1);
    assert_eq!(state.suggestions[0].name.as_deref(), Some("Berlin"));
}
