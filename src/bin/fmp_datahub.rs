use fmp_datahub::clients::fmp::FmpClient;
use fmp_datahub::config::{self, Config};
use fmp_datahub::services::collection_service::{
    CollectionService, COMPANY_PROFILES_FILE, CURRENT_QUOTES_FILE, HISTORICAL_PRICES_FILE,
    MARKET_INDEXES_FILE,
};
use fmp_datahub::util::{self, csv_utils};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Arg, Command};
use log::{error, info};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

// 单线程顺序执行
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Command::new("FMP DataHub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Collect profiles, quotes, historical prices and market indexes from FMP")
        .subcommand(
            Command::new("collect")
                .about("Fetch all available data and write CSV tables")
                .arg(
                    Arg::new("symbols")
                        .short('s')
                        .long("symbols")
                        .value_name("SYMBOLS")
                        .help("Comma separated symbols (defaults to COMPANIES)")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("days")
                        .long("days")
                        .value_name("DAYS")
                        .help("Historical price window in days")
                        .takes_value(true)
                        .default_value("365"),
                )
                .arg(
                    Arg::new("date")
                        .short('d')
                        .long("date")
                        .value_name("DATE")
                        .help("End date of the historical window (YYYY-MM-DD), defaults to today")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_name("DIR")
                        .help("Root data directory; CSV files go to DIR/raw")
                        .takes_value(true)
                        .default_value("data"),
                ),
        )
        .subcommand(
            Command::new("explore")
                .about("Print rows from a collected CSV table")
                .arg(
                    Arg::new("table")
                        .short('t')
                        .long("table")
                        .value_name("TABLE")
                        .help("Table to show (profiles, quotes, historical, indexes)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::new("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("SYMBOL")
                        .help("Only show rows for this symbol")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("limit")
                        .short('l')
                        .long("limit")
                        .value_name("LIMIT")
                        .help("Limit the number of rows to display")
                        .takes_value(true)
                        .default_value("10"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_name("DIR")
                        .takes_value(true)
                        .default_value("data"),
                ),
        );

    let matches = app.get_matches();

    if let Some(matches) = matches.subcommand_matches("collect") {
        // 缺少 API key 时在任何网络请求之前退出
        let mut config = Config::from_env()?
            .with_data_dir(matches.value_of("data-dir").unwrap_or("data"))
            .with_historical_days(config::parse_days(matches.value_of("days").unwrap_or("365"))?);

        if let Some(date_str) = matches.value_of("date") {
            config = config.with_as_of(NaiveDate::parse_from_str(date_str, util::DATE_FORMAT)?);
        }

        let symbols = matches.value_of("symbols").map(config::parse_symbols);

        info!("Config loaded successfully. Analyzing {} companies.", config.companies().len());
        info!("Lookback horizon: {} years, historical window: {} days",
              config.years_to_fetch(), config.historical_days());

        let client = FmpClient::new(&config)?;
        let service = CollectionService::new(config, Arc::new(client))?;
        let summary = service.fetch_all_data(symbols.as_deref()).await?;

        println!("\nSummary: {}", serde_json::to_string(&summary)?);
    } else if let Some(matches) = matches.subcommand_matches("explore") {
        let table_name = matches.value_of("table").unwrap_or_default();
        let file_name = match table_name.to_lowercase().as_str() {
            "profiles" => COMPANY_PROFILES_FILE,
            "quotes" => CURRENT_QUOTES_FILE,
            "historical" => HISTORICAL_PRICES_FILE,
            "indexes" => MARKET_INDEXES_FILE,
            other => {
                error!("Unknown table: {}", other);
                return Err(format!("Unknown table: {}", other).into());
            }
        };
        let limit = matches.value_of("limit")
            .unwrap_or("10")
            .parse::<usize>()
            .unwrap_or(10);
        let symbol_filter = matches.value_of("symbol");

        let path = Path::new(matches.value_of("data-dir").unwrap_or("data"))
            .join("raw")
            .join(file_name);
        let table = csv_utils::read_table_csv(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        info!("Found {} rows in {}", table.len(), path.display());

        let columns = table.columns();
        info!("{}", columns.join(" | "));
        info!("{:-<60}", "");

        let rows = table.records().iter().filter(|r| match symbol_filter {
            Some(symbol) => r.get("symbol").and_then(|v| v.as_str()) == Some(symbol),
            None => true,
        });

        for record in rows.take(limit) {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| csv_utils::cell_text(record.get(c)))
                .collect();
            info!("{}", cells.join(" | "));
        }
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
