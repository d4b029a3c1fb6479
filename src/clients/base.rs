use crate::models::outcome::FetchOutcome;
use async_trait::async_trait;

/// Base trait for the JSON fetch primitive behind every endpoint adapter
#[async_trait]
pub trait JsonFetcher {
    /// GET `{base_url}/{endpoint}` with `params`; credential injection is up to the implementor.
    ///
    /// Never fails: errors are reported through [`FetchOutcome`].
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> FetchOutcome;
}
