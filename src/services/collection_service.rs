use crate::clients::base::JsonFetcher;
use crate::config::Config;
use crate::errors::{DataHubError, Result};
use crate::models::outcome::{FetchOutcome, TableOutcome};
use crate::models::summary::CollectionSummary;
use crate::models::table::{Record, Table};
use crate::util::{self, csv_utils};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// S&P 500, Dow Jones, NASDAQ
pub const MARKET_INDEXES: [&str; 3] = ["^GSPC", "^DJI", "^IXIC"];

pub const MARKET_INDEXES_FILE: &str = "market_indexes.csv";
pub const COMPANY_PROFILES_FILE: &str = "company_profiles.csv";
pub const CURRENT_QUOTES_FILE: &str = "current_quotes.csv";
pub const HISTORICAL_PRICES_FILE: &str = "historical_prices.csv";

const ERROR_MESSAGE_KEY: &str = "Error Message";

/// 单个股票三个接口的抓取结果
#[derive(Debug)]
pub struct SymbolData {
    pub profile: TableOutcome,
    pub quote: TableOutcome,
    pub historical: TableOutcome,
}

#[derive(Debug, Default)]
struct CallTally {
    forbidden: usize,
    failed: usize,
}

impl CallTally {
    fn record(&mut self, outcome: &TableOutcome) {
        match outcome {
            TableOutcome::Forbidden => self.forbidden += 1,
            TableOutcome::Failed(_) => self.failed += 1,
            _ => {}
        }
    }
}

/// 数据采集服务，处理数据的获取、合并和存储
pub struct CollectionService {
    config: Config,
    fetcher: Arc<dyn JsonFetcher + Send + Sync>,
}

impl CollectionService {
    /// 创建新的采集服务实例，同时创建数据目录
    pub fn new(config: Config, fetcher: Arc<dyn JsonFetcher + Send + Sync>) -> Result<Self> {
        fs::create_dir_all(config.raw_data_path())?;
        fs::create_dir_all(config.processed_data_path())?;

        Ok(Self { config, fetcher })
    }

    /// Path of an output file inside the raw data directory.
    pub fn raw_file(&self, name: &str) -> PathBuf {
        self.config.raw_data_path().join(name)
    }

    fn today(&self) -> NaiveDate {
        self.config.as_of().unwrap_or_else(util::today)
    }

    /// GET `profile/{symbol}`
    pub async fn get_company_profile(&self, symbol: &str) -> TableOutcome {
        let endpoint = format!("profile/{}", symbol);
        let outcome = self.fetcher.get(&endpoint, &[]).await;
        lift(&endpoint, outcome, rows_from_response)
    }

    /// GET `quote/{symbol}`
    pub async fn get_quote(&self, symbol: &str) -> TableOutcome {
        let endpoint = format!("quote/{}", symbol);
        let outcome = self.fetcher.get(&endpoint, &[]).await;
        lift(&endpoint, outcome, rows_from_response)
    }

    /// Daily prices for `[today - days, today]`, every row tagged with `symbol`.
    pub async fn get_historical_prices(&self, symbol: &str, days: u32) -> TableOutcome {
        let endpoint = format!("historical-price-full/{}", symbol);
        let (from, to) = match util::lookback_range(self.today(), days) {
            Ok(range) => range,
            Err(e) => return TableOutcome::Failed(e),
        };
        let params = [("from", from), ("to", to)];

        let outcome = self.fetcher.get(&endpoint, &params).await;
        lift(&endpoint, outcome, |endpoint, json| {
            historical_from_response(endpoint, symbol, json)
        })
    }

    /// Quotes for the fixed index list, flattened into one table.
    pub async fn get_market_indexes(&self) -> Table {
        self.collect_market_indexes(&mut CallTally::default()).await
    }

    async fn collect_market_indexes(&self, tally: &mut CallTally) -> Table {
        let mut all_data = Table::new();
        for index in MARKET_INDEXES {
            let outcome = self.get_quote(index).await;
            tally.record(&outcome);
            if let TableOutcome::Failed(e) = &outcome {
                warn!("Failed to fetch index {}: {}", index, e);
            }
            all_data.append(outcome.into_table());
        }
        all_data
    }

    /// Profile, quote and historical prices for one symbol.
    pub async fn fetch_symbol(&self, symbol: &str) -> SymbolData {
        SymbolData {
            profile: self.get_company_profile(symbol).await,
            quote: self.get_quote(symbol).await,
            historical: self.get_historical_prices(symbol, self.config.historical_days()).await,
        }
    }

    /// Collect every category for `symbols` (the configured companies when `None`)
    /// and write the combined tables into the raw data directory.
    ///
    /// Per-call and per-symbol failures never abort the run; only writing the
    /// output files can fail.
    pub async fn fetch_all_data(&self, symbols: Option<&[String]>) -> Result<CollectionSummary> {
        let symbols = symbols.unwrap_or_else(|| self.config.companies());

        info!("Starting data collection for {} companies", symbols.len());
        info!("Available data: Company profiles, quotes, and historical prices");

        let mut all_profiles = Vec::new();
        let mut all_quotes = Vec::new();
        let mut all_historical = Vec::new();
        let mut tally = CallTally::default();

        for (i, symbol) in symbols.iter().enumerate() {
            info!("[{}/{}] Fetching data for {}...", i + 1, symbols.len(), symbol);

            let data = self.fetch_symbol(symbol).await;
            tally.record(&data.profile);
            tally.record(&data.quote);
            tally.record(&data.historical);

            match data.profile {
                TableOutcome::Rows(profile) => {
                    info!("  Company profile fetched");
                    all_profiles.push(profile);
                }
                TableOutcome::Failed(e) => warn!("  Error fetching profile for {}: {}", symbol, e),
                TableOutcome::Empty | TableOutcome::Forbidden => {
                    debug!("  No profile for {}", symbol)
                }
            }

            match data.quote {
                TableOutcome::Rows(quote) => {
                    match quote.value(0, "price").and_then(Value::as_f64) {
                        Some(price) => info!("  Current quote: ${:.2}", price),
                        None => info!("  Current quote fetched (no price field)"),
                    }
                    all_quotes.push(quote);
                }
                TableOutcome::Failed(e) => warn!("  Error fetching quote for {}: {}", symbol, e),
                TableOutcome::Empty | TableOutcome::Forbidden => {
                    debug!("  No quote for {}", symbol)
                }
            }

            match data.historical {
                TableOutcome::Rows(historical) => {
                    info!("  Historical prices: {} days", historical.len());
                    all_historical.push(historical);
                }
                TableOutcome::Failed(e) => {
                    warn!("  Error fetching historical prices for {}: {}", symbol, e)
                }
                TableOutcome::Empty | TableOutcome::Forbidden => {
                    debug!("  No historical prices for {}", symbol)
                }
            }
        }

        info!("Fetching market indexes...");
        let market_indexes = self.collect_market_indexes(&mut tally).await;

        let mut summary = CollectionSummary::default();
        if !market_indexes.is_empty() {
            summary.market_indexes =
                csv_utils::write_table_csv(&market_indexes, self.raw_file(MARKET_INDEXES_FILE))?;
            info!("Market indexes saved");
        }

        info!("Saving data...");
        summary.profiles = self.save_category(all_profiles, COMPANY_PROFILES_FILE)?;
        summary.quotes = self.save_category(all_quotes, CURRENT_QUOTES_FILE)?;
        summary.historical_records = self.save_category(all_historical, HISTORICAL_PRICES_FILE)?;
        summary.forbidden_responses = tally.forbidden;
        summary.failed_calls = tally.failed;

        if tally.forbidden > 0 {
            warn!(
                "{} requests were answered with 403; check the API key and plan",
                tally.forbidden
            );
        }

        info!("Data collection complete!");
        Ok(summary)
    }

    // 无数据时不生成文件，返回 0
    fn save_category(&self, tables: Vec<Table>, file_name: &str) -> Result<usize> {
        if tables.is_empty() {
            return Ok(0);
        }
        let combined = Table::concat(tables);
        csv_utils::write_table_csv(&combined, self.raw_file(file_name))
    }
}

fn lift<F>(endpoint: &str, outcome: FetchOutcome, normalize: F) -> TableOutcome
where
    F: FnOnce(&str, Value) -> TableOutcome,
{
    match outcome {
        FetchOutcome::Json(json) => normalize(endpoint, json),
        FetchOutcome::Forbidden => TableOutcome::Forbidden,
        FetchOutcome::Failed(msg) => TableOutcome::Failed(DataHubError::DataError(msg)),
    }
}

fn api_error(json: &Value) -> Option<DataHubError> {
    json.get(ERROR_MESSAGE_KEY)
        .map(|msg| DataHubError::ApiError(msg.as_str().unwrap_or_default().to_string()))
}

fn as_record(endpoint: &str, item: Value) -> Result<Record> {
    match item {
        Value::Object(record) => Ok(record),
        other => Err(DataHubError::unexpected_shape(
            endpoint,
            format!("expected object row, got {}", other),
        )),
    }
}

/// Profile/quote bodies: an array of rows or a single object row.
pub fn rows_from_response(endpoint: &str, json: Value) -> TableOutcome {
    if let Some(e) = api_error(&json) {
        return TableOutcome::Failed(e);
    }

    match json {
        Value::Null => TableOutcome::Empty,
        Value::Object(record) if record.is_empty() => TableOutcome::Empty,
        Value::Object(record) => TableOutcome::from_table(Table::from_records(vec![record])),
        Value::Array(items) => {
            let records: Result<Vec<Record>> =
                items.into_iter().map(|item| as_record(endpoint, item)).collect();
            match records {
                Ok(records) => TableOutcome::from_table(Table::from_records(records)),
                Err(e) => TableOutcome::Failed(e),
            }
        }
        other => {
            TableOutcome::Failed(DataHubError::unexpected_shape(endpoint, format!("got {}", other)))
        }
    }
}

/// Historical bodies: rows live under `historical`; each row is stamped with `symbol`.
pub fn historical_from_response(endpoint: &str, symbol: &str, json: Value) -> TableOutcome {
    if let Some(e) = api_error(&json) {
        return TableOutcome::Failed(e);
    }

    let historical = match json {
        Value::Object(mut body) => match body.remove("historical") {
            Some(historical) => historical,
            None => return TableOutcome::Empty,
        },
        _ => return TableOutcome::Empty,
    };

    let items = match historical {
        Value::Array(items) => items,
        other => {
            return TableOutcome::Failed(DataHubError::unexpected_shape(
                endpoint,
                format!("'historical' is not an array: {}", other),
            ))
        }
    };

    let records: Result<Vec<Record>> =
        items.into_iter().map(|item| as_record(endpoint, item)).collect();
    match records {
        Ok(records) => {
            let mut table = Table::from_records(records);
            table.stamp("symbol", symbol);
            TableOutcome::from_table(table)
        }
        Err(e) => TableOutcome::Failed(e),
    }
}
