// 公开导出的模块，供外部使用
pub mod clients;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod util;

// 重新导出常用类型，方便使用
pub use clients::base::JsonFetcher;
pub use clients::fmp::FmpClient;
pub use config::Config;
pub use errors::{DataHubError, Result};
pub use models::outcome::{FetchOutcome, TableOutcome};
pub use models::summary::CollectionSummary;
pub use models::table::{Record, Table};
pub use services::collection_service::CollectionService;
