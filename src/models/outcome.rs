use crate::errors::DataHubError;
use crate::models::table::Table;
use serde_json::Value;

/// Result of one call through the fetch primitive.
///
/// Transport and status failures are already logged by the time a
/// `Failed` reaches the caller; nothing here is meant to be propagated.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Json(Value),
    /// HTTP 403: the endpoint is not available on the current plan.
    Forbidden,
    Failed(String),
}

/// Result of one endpoint adapter for one symbol.
#[derive(Debug)]
pub enum TableOutcome {
    Rows(Table),
    Empty,
    Forbidden,
    Failed(DataHubError),
}

impl TableOutcome {
    /// Non-empty tables become `Rows`, everything else `Empty`.
    pub fn from_table(table: Table) -> Self {
        if table.is_empty() {
            TableOutcome::Empty
        } else {
            TableOutcome::Rows(table)
        }
    }

    /// 将结果降级为表，无数据时返回空表
    pub fn into_table(self) -> Table {
        match self {
            TableOutcome::Rows(table) => table,
            _ => Table::new(),
        }
    }
}
