use std::time::Duration;

use candlefetch::api::PolygonClient;
use candlefetch::config::{ApiKey, ProviderConfig};
use candlefetch::export::{export_csv, import_csv};
use candlefetch::models::{RangeRequest, Timespan};
use candlefetch::FetchError;
use serde_json::json;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

const MINUTE: i64 = 60_000;
/// 2024-01-02 15:00:00 UTC
const START: i64 = 1_704_207_600_000;

/// Helper : serveur mock + client sans pause, avec `max_retries` tentatives
async fn setup(max_retries: u32) -> (MockServer, PolygonClient) {
    let mock_server = MockServer::start().await;
    let config = ProviderConfig {
        cooldown: Duration::ZERO,
        max_retries,
        retry_backoff: Duration::from_millis(1),
        ..ProviderConfig::with_base_url(mock_server.uri())
    };
    let client = PolygonClient::new(config, ApiKey::new("TESTKEY").unwrap()).unwrap();
    (mock_server, client)
}

fn aggs_page(stamps: &[i64]) -> serde_json::Value {
    let results: Vec<serde_json::Value> = stamps
        .iter()
        .map(|&t| json!({"o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5, "v": 100, "t": t}))
        .collect();
    json!({
        "ticker": "SPY",
        "queryCount": results.len(),
        "resultsCount": results.len(),
        "status": "OK",
        "results": results,
    })
}

/// Monte un mock pour une sous-fenêtre exacte
async fn mount_window(server: &MockServer, from: i64, to: i64, stamps: &[i64]) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/aggs/ticker/SPY/range/1/minute/{from}/{to}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggs_page(stamps)))
        .expect(1)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Test 1 : une période de 2 pas exactement => 2 requêtes
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_two_step_window_issues_two_requests() {
    let (mock_server, client) = setup(0).await;
    let step = 10 * MINUTE;

    mount_window(&mock_server, START, START + step, &[START, START + MINUTE]).await;
    mount_window(
        &mock_server,
        START + step,
        START + 2 * step,
        &[START + step + MINUTE, START + step + 2 * MINUTE],
    )
    .await;

    let candles = client
        .fetch_historical("SPY", START, START + 2 * step, 1, Timespan::Minute, 10)
        .await
        .unwrap();

    let stamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    assert_eq!(
        stamps,
        vec![START, START + MINUTE, START + step + MINUTE, START + step + 2 * MINUTE]
    );
}

// ---------------------------------------------------------------------------
// Test 2 : la dernière fenêtre, partielle, est tronquée à `end`
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_last_window_is_clipped() {
    let (mock_server, client) = setup(0).await;
    let step = 10 * MINUTE;
    let end = START + step + 3 * MINUTE;

    mount_window(&mock_server, START, START + step, &[START]).await;
    mount_window(&mock_server, START + step, end, &[START + step]).await;

    let candles = client
        .fetch_historical("SPY", START, end, 1, Timespan::Minute, 10)
        .await
        .unwrap();
    assert_eq!(candles.len(), 2);
}

// ---------------------------------------------------------------------------
// Test 3 : start == end n'envoie rien
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_empty_range_issues_no_request() {
    let (mock_server, client) = setup(0).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/aggs/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggs_page(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let candles = client
        .fetch_historical("SPY", START, START, 1, Timespan::Minute, 10)
        .await
        .unwrap();
    assert!(candles.is_empty());
}

// ---------------------------------------------------------------------------
// Test 4 : une chandelle répétée sur la frontière n'est gardée qu'une fois
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_boundary_duplicate_is_dropped() {
    let (mock_server, client) = setup(0).await;
    let step = 10 * MINUTE;

    mount_window(&mock_server, START, START + step, &[START, START + step]).await;
    mount_window(
        &mock_server,
        START + step,
        START + 2 * step,
        &[START + step, START + step + MINUTE],
    )
    .await;

    let candles = client
        .fetch_historical("SPY", START, START + 2 * step, 1, Timespan::Minute, 10)
        .await
        .unwrap();

    let stamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    assert_eq!(stamps, vec![START, START + step, START + step + MINUTE]);
}

// ---------------------------------------------------------------------------
// Test 5 : une fenêtre mal formée arrête tout et n'est jamais retentée
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_malformed_window_aborts_without_retry() {
    let (mock_server, client) = setup(3).await;
    let step = 10 * MINUTE;

    mount_window(&mock_server, START, START + step, &[START]).await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/v2/aggs/ticker/SPY/range/1/minute/{}/{}",
            START + step,
            START + 2 * step
        )))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client
        .fetch_historical("SPY", START, START + 3 * step, 1, Timespan::Minute, 10)
        .await;
    assert!(matches!(result, Err(FetchError::Malformed { .. })));
}

// ---------------------------------------------------------------------------
// Test 6 : l'erreur réseau remonte, clé API expurgée
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_transport_error_propagates_after_retries() {
    let config = ProviderConfig {
        cooldown: Duration::ZERO,
        max_retries: 1,
        retry_backoff: Duration::from_millis(1),
        ..ProviderConfig::with_base_url("http://127.0.0.1:9")
    };
    let client = PolygonClient::new(config, ApiKey::new("TESTKEY").unwrap()).unwrap();

    let err = client
        .fetch_historical("SPY", START, START + MINUTE, 1, Timespan::Minute, 10)
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(!err.to_string().contains("TESTKEY"));
    assert!(err.to_string().contains("REDACTED"));
}

// ---------------------------------------------------------------------------
// Test 7 : une requête invalide échoue avant tout appel réseau
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_invalid_range_request() {
    let (_mock_server, client) = setup(0).await;

    let reversed = RangeRequest::new("SPY", START + MINUTE, START, 1, Timespan::Minute);
    assert!(matches!(
        client.fetch_range(&reversed).await,
        Err(FetchError::InvalidFormat { .. })
    ));

    let zero_mult = RangeRequest::new("SPY", START, START + MINUTE, 0, Timespan::Minute);
    assert!(matches!(
        client.fetch_range(&zero_mult).await,
        Err(FetchError::InvalidFormat { .. })
    ));
}

// ---------------------------------------------------------------------------
// Test 8 : la série téléchargée survit à un aller-retour CSV
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_fetch_then_export_import() {
    let (mock_server, client) = setup(0).await;
    let step = 10 * MINUTE;

    mount_window(&mock_server, START, START + step, &[START, START + 5 * MINUTE]).await;

    let request = RangeRequest::new("SPY", START, START + step, 1, Timespan::Minute);
    let config_cap = client.config().item_cap;
    assert_eq!(config_cap, 1150);

    // item_cap de la config (1150) : une seule fenêtre couvre tout
    let candles = client.fetch_range(&request).await.unwrap();
    assert_eq!(candles.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("spy.csv");
    export_csv(&candles, &file).unwrap();
    assert_eq!(import_csv(&file).unwrap(), candles);
}
