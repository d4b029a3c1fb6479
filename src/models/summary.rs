use serde::Serialize;

pub const PROFILES: &str = "profiles";
pub const QUOTES: &str = "quotes";
pub const HISTORICAL_RECORDS: &str = "historical_records";

/// Row counts written by one collection run, plus call diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub profiles: usize,
    pub quotes: usize,
    pub historical_records: usize,
    pub market_indexes: usize,
    /// Calls answered with HTTP 403.
    pub forbidden_responses: usize,
    /// Calls or symbol units that failed for any other reason.
    pub failed_calls: usize,
}

impl CollectionSummary {
    /// The per-category row counts, in collection order.
    pub fn categories(&self) -> Vec<(&'static str, usize)> {
        vec![
            (PROFILES, self.profiles),
            (QUOTES, self.quotes),
            (HISTORICAL_RECORDS, self.historical_records),
        ]
    }
}
