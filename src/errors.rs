use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataHubError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Unexpected response shape for {endpoint}: {detail}")]
    UnexpectedShape { endpoint: String, detail: String },

    #[error("Data error: {0}")]
    DataError(String),
}

pub type Result<T> = std::result::Result<T, DataHubError>;

impl DataHubError {
    /// 响应结构不符合预期
    pub fn unexpected_shape(endpoint: &str, detail: impl Into<String>) -> Self {
        DataHubError::UnexpectedShape {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }
}
