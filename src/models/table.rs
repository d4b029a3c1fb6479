use serde_json::{Map, Value};

/// One normalized row: field name to scalar (or nested) JSON value.
/// Field order follows the response, `serde_json` is built with `preserve_order`.
pub type Record = Map<String, Value>;

/// Ordered, row-wise record set for one endpoint call or one combined category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// 按顺序拼接多个表
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        let mut combined = Table::new();
        for table in tables {
            combined.append(table);
        }
        combined
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn append(&mut self, other: Table) {
        self.records.extend(other.records);
    }

    /// Set `field` on every row, overwriting any existing value.
    pub fn stamp(&mut self, field: &str, value: &str) {
        for record in &mut self.records {
            record.insert(field.to_string(), Value::String(value.to_string()));
        }
    }

    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        self.records.get(row).and_then(|r| r.get(field))
    }

    /// Union of field names across all rows, in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for record in &self.records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }
}
