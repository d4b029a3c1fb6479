use crate::errors::{DataHubError, Result};
use chrono::{Duration, NaiveDate};

// 日期转换工具
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `[end - days, end]` as ISO `YYYY-MM-DD` strings.
pub fn lookback_range(end: NaiveDate, days: u32) -> Result<(String, String)> {
    let start = end
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            DataHubError::DataError(format!("{} days before {} is out of range", days, end))
        })?;
    Ok((format_date(&start), format_date(&end)))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().naive_local().date()
}

// CSV 表格导出工具
pub mod csv_utils {
    use crate::errors::Result;
    use crate::models::table::{Record, Table};
    use log::info;
    use serde_json::Value;
    use std::fs::{self, File};
    use std::path::Path;

    /// Render one cell the way the exported tables expect.
    pub fn cell_text(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(true)) => "True".to_string(),
            Some(Value::Bool(false)) => "False".to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// 将表写入 CSV（含表头，无行号列），返回写入的行数
    pub fn write_table_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let columns = table.columns();
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer.write_record(&columns)?;

        for record in table.records() {
            let row: Vec<String> = columns.iter().map(|c| cell_text(record.get(c))).collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;

        info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(table.len())
    }

    /// Read a table written by [`write_table_csv`]; every cell comes back as a string.
    pub fn read_table_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut table = Table::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Record::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                record.insert(header.to_string(), Value::String(cell.to_string()));
            }
            table.push(record);
        }
        Ok(table)
    }
}
