//! Runtime settings resolved once at startup.

use crate::errors::{DataHubError, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
pub const DEFAULT_COMPANIES: &str = "AAPL,MSFT,GOOGL";
pub const DEFAULT_YEARS_TO_FETCH: u32 = 3;
pub const DEFAULT_HISTORICAL_DAYS: u32 = 365;
pub const REQUEST_DELAY: Duration = Duration::from_millis(300);

const API_KEY_VAR: &str = "FMP_API_KEY";
const COMPANIES_VAR: &str = "COMPANIES";
const YEARS_VAR: &str = "YEARS_TO_FETCH";

#[derive(Debug, Clone)]
pub struct Config {
    api_key: String,
    base_url: String,
    companies: Vec<String>,
    years_to_fetch: u32,
    historical_days: u32,
    raw_data_path: PathBuf,
    processed_data_path: PathBuf,
    request_delay: Duration,
    as_of: Option<NaiveDate>,
}

impl Config {
    /// 从环境变量（以及 .env 文件）加载配置
    ///
    /// Fails with [`DataHubError::ConfigError`] when `FMP_API_KEY` is unset or blank.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DataHubError::ConfigError(format!(
                    "{} not found! Please add it to your .env file",
                    API_KEY_VAR
                ))
            })?;

        let companies = parse_symbols(
            &lookup(COMPANIES_VAR).unwrap_or_else(|| DEFAULT_COMPANIES.to_string()),
        );

        let years_to_fetch = match lookup(YEARS_VAR) {
            Some(raw) => {
                let years = raw.trim().parse::<u32>().map_err(|e| {
                    DataHubError::ConfigError(format!("invalid {} '{}': {}", YEARS_VAR, raw, e))
                })?;
                if years == 0 {
                    return Err(DataHubError::ConfigError(format!(
                        "{} must be positive",
                        YEARS_VAR
                    )));
                }
                years
            }
            None => DEFAULT_YEARS_TO_FETCH,
        };

        Ok(Self::new(api_key)
            .with_companies(companies)
            .with_years_to_fetch(years_to_fetch))
    }

    /// 使用默认值创建配置
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: FMP_BASE_URL.to_string(),
            companies: parse_symbols(DEFAULT_COMPANIES),
            years_to_fetch: DEFAULT_YEARS_TO_FETCH,
            historical_days: DEFAULT_HISTORICAL_DAYS,
            raw_data_path: PathBuf::from("data/raw"),
            processed_data_path: PathBuf::from("data/processed"),
            request_delay: REQUEST_DELAY,
            as_of: None,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_companies(mut self, companies: Vec<String>) -> Self {
        self.companies = companies;
        self
    }

    pub fn with_years_to_fetch(mut self, years: u32) -> Self {
        self.years_to_fetch = years;
        self
    }

    pub fn with_historical_days(mut self, days: u32) -> Self {
        self.historical_days = days;
        self
    }

    /// Place raw and processed data under `dir` (`dir/raw`, `dir/processed`).
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.raw_data_path = dir.join("raw");
        self.processed_data_path = dir.join("processed");
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    // 固定"今天"，便于重复运行得到相同的日期区间
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    pub fn years_to_fetch(&self) -> u32 {
        self.years_to_fetch
    }

    pub fn historical_days(&self) -> u32 {
        self.historical_days
    }

    pub fn raw_data_path(&self) -> &Path {
        &self.raw_data_path
    }

    pub fn processed_data_path(&self) -> &Path {
        &self.processed_data_path
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }
}

/// Parse a historical window length; it must be a positive number of days.
pub fn parse_days(raw: &str) -> Result<u32> {
    let days = raw.trim().parse::<u32>().map_err(|e| {
        DataHubError::ConfigError(format!("invalid historical window '{}': {}", raw, e))
    })?;
    if days == 0 {
        return Err(DataHubError::ConfigError(
            "historical window must be at least one day".to_string(),
        ));
    }
    Ok(days)
}

/// Split a comma separated ticker list, dropping blanks.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
