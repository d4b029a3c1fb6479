use async_trait::async_trait;
use chrono::NaiveDate;
use fmp_datahub::services::collection_service::{
    COMPANY_PROFILES_FILE, CURRENT_QUOTES_FILE, HISTORICAL_PRICES_FILE, MARKET_INDEXES_FILE,
};
use fmp_datahub::util::csv_utils;
use fmp_datahub::{CollectionService, Config, DataHubError, FetchOutcome, JsonFetcher, TableOutcome};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned responses keyed by endpoint; anything unknown answers with `[]`.
struct FakeFetcher {
    responses: HashMap<String, FetchOutcome>,
    fallback: FetchOutcome,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeFetcher {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: FetchOutcome::Json(json!([])),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with(mut self, endpoint: &str, outcome: FetchOutcome) -> Self {
        self.responses.insert(endpoint.to_string(), outcome);
        self
    }

    fn with_json(self, endpoint: &str, body: Value) -> Self {
        self.with(endpoint, FetchOutcome::Json(body))
    }

    fn with_fallback(mut self, outcome: FetchOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    fn endpoints(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }
}

#[async_trait]
impl JsonFetcher for FakeFetcher {
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> FetchOutcome {
        self.calls.lock().unwrap().push((
            endpoint.to_string(),
            params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ));
        self.responses
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

fn config_for(dir: &Path) -> Config {
    Config::new("test-key")
        .with_data_dir(dir)
        .with_request_delay(Duration::ZERO)
        .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
}

const ALL_FILES: [&str; 4] = [
    MARKET_INDEXES_FILE,
    COMPANY_PROFILES_FILE,
    CURRENT_QUOTES_FILE,
    HISTORICAL_PRICES_FILE,
];

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn history(dates: &[&str]) -> Value {
    let rows: Vec<Value> = dates
        .iter()
        .map(|d| json!({"date": d, "open": 100.0, "close": 101.5, "volume": 1000}))
        .collect();
    json!({ "historical": rows })
}

fn aapl_fetcher() -> FakeFetcher {
    FakeFetcher::new()
        .with_json(
            "profile/AAPL",
            json!([{"symbol": "AAPL", "companyName": "Apple Inc.", "sector": "Technology"}]),
        )
        .with_json("quote/AAPL", json!([{"symbol": "AAPL", "price": 150.25, "volume": 52000000}]))
        .with_json(
            "historical-price-full/AAPL",
            json!({
                "symbol": "AAPL",
                "historical": [
                    {"date": "2024-06-28", "open": 215.77, "close": 210.62},
                    {"date": "2024-06-27", "open": 214.69, "close": 214.10}
                ]
            }),
        )
        .with_json("quote/^GSPC", json!([{"symbol": "^GSPC", "price": 5460.48}]))
        .with_json("quote/^DJI", json!([{"symbol": "^DJI", "price": 39118.86}]))
}

#[tokio::test]
async fn single_symbol_run_writes_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(aapl_fetcher());
    let service = CollectionService::new(config_for(dir.path()), fake.clone()).unwrap();

    let summary = service
        .fetch_all_data(Some(symbols(&["AAPL"]).as_slice()))
        .await
        .unwrap();

    assert_eq!(
        summary.categories(),
        vec![("profiles", 1), ("quotes", 1), ("historical_records", 2)]
    );
    assert_eq!(summary.market_indexes, 2);
    assert_eq!(summary.forbidden_responses, 0);
    assert_eq!(summary.failed_calls, 0);

    let historical = csv_utils::read_table_csv(service.raw_file(HISTORICAL_PRICES_FILE)).unwrap();
    assert_eq!(historical.len(), 2);
    assert!(historical.records().iter().all(|r| r["symbol"] == json!("AAPL")));

    let quotes = csv_utils::read_table_csv(service.raw_file(CURRENT_QUOTES_FILE)).unwrap();
    assert_eq!(quotes.value(0, "price"), Some(&json!("150.25")));

    assert!(service.raw_file(COMPANY_PROFILES_FILE).exists());
    assert!(service.raw_file(MARKET_INDEXES_FILE).exists());
    assert!(dir.path().join("processed").is_dir());

    assert_eq!(
        fake.endpoints(),
        vec![
            "profile/AAPL",
            "quote/AAPL",
            "historical-price-full/AAPL",
            "quote/^GSPC",
            "quote/^DJI",
            "quote/^IXIC",
        ]
    );
}

#[tokio::test]
async fn historical_request_uses_lookback_window() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeFetcher::new());
    let service = CollectionService::new(config_for(dir.path()), fake.clone()).unwrap();

    service
        .fetch_all_data(Some(symbols(&["MSFT"]).as_slice()))
        .await
        .unwrap();

    let calls = fake.calls.lock().unwrap();
    let (_, params) = calls
        .iter()
        .find(|(endpoint, _)| endpoint == "historical-price-full/MSFT")
        .unwrap();
    assert_eq!(
        params,
        &vec![
            ("from".to_string(), "2023-07-01".to_string()),
            ("to".to_string(), "2024-06-30".to_string()),
        ]
    );
}

#[tokio::test]
async fn forbidden_everywhere_yields_nothing_and_no_error() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeFetcher::new().with_fallback(FetchOutcome::Forbidden));
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    let summary = service
        .fetch_all_data(Some(symbols(&["XYZ"]).as_slice()))
        .await
        .unwrap();

    assert_eq!(
        summary.categories(),
        vec![("profiles", 0), ("quotes", 0), ("historical_records", 0)]
    );
    assert_eq!(summary.forbidden_responses, 6);
    assert_eq!(summary.failed_calls, 0);
    for file in ALL_FILES {
        assert!(!service.raw_file(file).exists(), "{} should not exist", file);
    }
}

#[tokio::test]
async fn forbidden_adapter_returns_forbidden_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeFetcher::new().with("profile/XYZ", FetchOutcome::Forbidden));
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    assert!(matches!(service.get_company_profile("XYZ").await, TableOutcome::Forbidden));
    assert!(service.get_company_profile("XYZ").await.into_table().is_empty());
}

#[tokio::test]
async fn combined_historical_keeps_symbol_order() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(
        FakeFetcher::new()
            .with("historical-price-full/A", FetchOutcome::Forbidden)
            .with_json("historical-price-full/B", history(&["2024-06-28", "2024-06-27"]))
            .with_json(
                "historical-price-full/C",
                history(&["2024-06-28", "2024-06-27", "2024-06-26"]),
            ),
    );
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    let summary = service
        .fetch_all_data(Some(symbols(&["A", "B", "C"]).as_slice()))
        .await
        .unwrap();
    assert_eq!(summary.historical_records, 5);
    assert_eq!(summary.profiles, 0);

    let table = csv_utils::read_table_csv(service.raw_file(HISTORICAL_PRICES_FILE)).unwrap();
    let tags: Vec<&str> = table
        .records()
        .iter()
        .map(|r| r["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["B", "B", "C", "C", "C"]);
}

#[tokio::test]
async fn one_bad_symbol_does_not_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(
        FakeFetcher::new()
            .with_json("profile/BAD", json!("not a table"))
            .with_json("quote/BAD", json!({"Error Message": "Limit Reach"}))
            .with("historical-price-full/BAD", FetchOutcome::Failed("connection reset".into()))
            .with_json("profile/GOOD", json!([{"symbol": "GOOD"}]))
            .with_json("quote/GOOD", json!([{"symbol": "GOOD", "price": 10.0}]))
            .with_json("historical-price-full/GOOD", history(&["2024-06-28"])),
    );
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    let summary = service
        .fetch_all_data(Some(symbols(&["BAD", "GOOD"]).as_slice()))
        .await
        .unwrap();

    assert_eq!(
        summary.categories(),
        vec![("profiles", 1), ("quotes", 1), ("historical_records", 1)]
    );
    assert_eq!(summary.failed_calls, 3);
}

#[tokio::test]
async fn failed_quote_surfaces_as_tagged_error() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(
        FakeFetcher::new().with_json("quote/BAD", json!({"Error Message": "Limit Reach"})),
    );
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    match service.get_quote("BAD").await {
        TableOutcome::Failed(DataHubError::ApiError(msg)) => assert_eq!(msg, "Limit Reach"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn empty_symbol_list_only_fetches_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeFetcher::new());
    let service = CollectionService::new(config_for(dir.path()), fake.clone()).unwrap();

    let summary = service.fetch_all_data(Some(&[][..])).await.unwrap();

    assert_eq!(summary, Default::default());
    assert_eq!(fake.endpoints(), vec!["quote/^GSPC", "quote/^DJI", "quote/^IXIC"]);
}

#[tokio::test]
async fn configured_companies_are_used_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeFetcher::new());
    let config = config_for(dir.path()).with_companies(symbols(&["NVDA", "TSLA"]));
    let service = CollectionService::new(config, fake.clone()).unwrap();

    service.fetch_all_data(None).await.unwrap();

    let endpoints = fake.endpoints();
    assert_eq!(
        &endpoints[..6],
        &[
            "profile/NVDA",
            "quote/NVDA",
            "historical-price-full/NVDA",
            "profile/TSLA",
            "quote/TSLA",
            "historical-price-full/TSLA",
        ]
    );
}

#[tokio::test]
async fn repeated_runs_write_identical_files() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for dir in [&first, &second] {
        let service =
            CollectionService::new(config_for(dir.path()), Arc::new(aapl_fetcher())).unwrap();
        service
            .fetch_all_data(Some(symbols(&["AAPL"]).as_slice()))
            .await
            .unwrap();
    }

    for file in ALL_FILES {
        let a = std::fs::read(first.path().join("raw").join(file)).unwrap();
        let b = std::fs::read(second.path().join("raw").join(file)).unwrap();
        assert_eq!(a, b, "{} differs between runs", file);
    }
}

#[tokio::test]
async fn written_tables_match_summary_counts() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(
        aapl_fetcher()
            .with_json(
                "profile/MSFT",
                json!([{"symbol": "MSFT", "companyName": "Microsoft", "ceo": "Satya Nadella"}]),
            )
            .with_json(
                "historical-price-full/MSFT",
                history(&["2024-06-28", "2024-06-27", "2024-06-26"]),
            ),
    );
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    let summary = service
        .fetch_all_data(Some(symbols(&["AAPL", "MSFT"]).as_slice()))
        .await
        .unwrap();

    let files = [
        (COMPANY_PROFILES_FILE, summary.profiles),
        (CURRENT_QUOTES_FILE, summary.quotes),
        (HISTORICAL_PRICES_FILE, summary.historical_records),
    ];
    for (file, expected) in files {
        let table = csv_utils::read_table_csv(service.raw_file(file)).unwrap();
        assert_eq!(table.len(), expected, "{}", file);
    }
    assert_eq!(summary.profiles, 2);
    assert_eq!(summary.historical_records, 5);

    // MSFT 多出的列在 AAPL 行中留空
    let profiles = csv_utils::read_table_csv(service.raw_file(COMPANY_PROFILES_FILE)).unwrap();
    assert_eq!(profiles.columns(), vec!["symbol", "companyName", "sector", "ceo"]);
    assert_eq!(profiles.value(0, "ceo"), Some(&json!("")));
}

#[tokio::test]
async fn index_quotes_are_flattened_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(
        FakeFetcher::new()
            .with_json(
                "quote/^GSPC",
                json!([
                    {"symbol": "^GSPC", "price": 5460.48},
                    {"symbol": "^GSPC", "price": 5475.09, "exchange": "INDEX"}
                ]),
            )
            .with("quote/^DJI", FetchOutcome::Forbidden)
            .with_json("quote/^IXIC", json!([{"symbol": "^IXIC", "price": 17732.6}])),
    );
    let service = CollectionService::new(config_for(dir.path()), fake).unwrap();

    let direct = service.get_market_indexes().await;
    assert_eq!(direct.len(), 3);

    let summary = service.fetch_all_data(Some(&[][..])).await.unwrap();
    assert_eq!(summary.market_indexes, 3);
    assert_eq!(summary.forbidden_responses, 1);

    let table = csv_utils::read_table_csv(service.raw_file(MARKET_INDEXES_FILE)).unwrap();
    let tags: Vec<&str> = table
        .records()
        .iter()
        .map(|r| r["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["^GSPC", "^GSPC", "^IXIC"]);
    assert_eq!(table.columns(), vec!["symbol", "price", "exchange"]);
    assert_eq!(table.value(2, "exchange"), Some(&json!("")));
}

#[tokio::test]
async fn out_of_range_window_only_drops_historical_prices() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(aapl_fetcher());
    let config = config_for(dir.path()).with_historical_days(100_000_000);
    let service = CollectionService::new(config, fake.clone()).unwrap();

    let summary = service
        .fetch_all_data(Some(symbols(&["AAPL"]).as_slice()))
        .await
        .unwrap();

    assert_eq!(
        summary.categories(),
        vec![("profiles", 1), ("quotes", 1), ("historical_records", 0)]
    );
    assert_eq!(summary.failed_calls, 1);
    assert!(!service.raw_file(HISTORICAL_PRICES_FILE).exists());
    assert!(!fake.endpoints().iter().any(|e| e.starts_with("historical-price-full/")));
}

#[test]
fn missing_credential_fails_before_any_client_exists() {
    let result = Config::from_lookup(|key| match key {
        "COMPANIES" => Some("AAPL".to_string()),
        _ => None,
    });
    assert!(matches!(result, Err(DataHubError::ConfigError(_))));
}
