use std::collections::{BTreeMap, HashMap};

use arrow::array::{Array, ArrayRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use async_trait::async_trait;
use hexstats_operators::processing::{CELL_COLUMN, END_TIME_COLUMN, START_TIME_COLUMN};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// A stored row is identified by its cell and, for temporal sources, its window
pub type RowKey = (String, Option<String>, Option<String>);

/// The non-null values of a stored row by column name
pub type StoredRow = BTreeMap<String, String>;

/// Persists result tables
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Writes the rows of `table` into `target`, replacing rows with the same cell and window.
    ///
    /// Returns the number of rows written.
    async fn upsert(&self, target: &str, table: &RecordBatch) -> Result<usize>;
}

/// A sink that keeps every target in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    targets: RwLock<HashMap<String, BTreeMap<RowKey, StoredRow>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, target: &str) -> usize {
        self.targets.read().await.get(target).map_or(0, BTreeMap::len)
    }

    pub async fn row(&self, target: &str, key: &RowKey) -> Option<StoredRow> {
        self.targets.read().await.get(target)?.get(key).cloned()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn upsert(&self, target: &str, table: &RecordBatch) -> Result<usize> {
        let rows = table_rows(table)?;
        let written = rows.len();

        let mut targets = self.targets.write().await;
        let stored = targets.entry(target.to_string()).or_default();
        stored.extend(rows);

        debug!(target_table = target, rows = written, total = stored.len(), "upserted rows");

        Ok(written)
    }
}

fn table_rows(table: &RecordBatch) -> Result<Vec<(RowKey, StoredRow)>> {
    let cell = table
        .column_by_name(CELL_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            column: CELL_COLUMN.to_string(),
        })?;
    let start = table.column_by_name(START_TIME_COLUMN);
    let end = table.column_by_name(END_TIME_COLUMN);

    let schema = table.schema();
    let value_columns: Vec<(&str, &ArrayRef)> = schema
        .fields()
        .iter()
        .zip(table.columns())
        .map(|(field, column)| (field.name().as_str(), column))
        .filter(|(name, _)| ![CELL_COLUMN, START_TIME_COLUMN, END_TIME_COLUMN].contains(name))
        .collect();

    let mut rows = Vec::with_capacity(table.num_rows());

    for row in 0..table.num_rows() {
        let key = (
            array_value_to_string(cell, row)?,
            optional_value(start, row)?,
            optional_value(end, row)?,
        );

        let mut values = StoredRow::new();
        for (name, column) in &value_columns {
            if let Some(value) = optional_value(Some(*column), row)? {
                values.insert((*name).to_string(), value);
            }
        }

        rows.push((key, values));
    }

    Ok(rows)
}

fn optional_value(column: Option<&ArrayRef>, row: usize) -> Result<Option<String>> {
    match column {
        Some(column) if !column.is_null(row) => Ok(Some(array_value_to_string(column, row)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn table(median: &[Option<f64>]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new(CELL_COLUMN, DataType::Utf8, false),
            Field::new(START_TIME_COLUMN, DataType::Date32, false),
            Field::new(END_TIME_COLUMN, DataType::Date32, false),
            Field::new("ndvi_p50", DataType::Float64, true),
        ]);

        let cells: Vec<String> = (0..median.len())
            .map(|i| format!("8928308280fffff{i}"))
            .collect();

        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(cells)),
                Arc::new(Date32Array::from(vec![18444; median.len()])),
                Arc::new(Date32Array::from(vec![18475; median.len()])),
                Arc::new(Float64Array::from(median.to_vec())),
            ],
        )
        .unwrap()
    }

    fn key(i: usize) -> RowKey {
        (
            format!("8928308280fffff{i}"),
            Some("2020-07-01".to_string()),
            Some("2020-08-01".to_string()),
        )
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let sink = MemorySink::new();
        let rows = table(&[Some(0.5), Some(0.25)]);

        assert_eq!(sink.upsert("ndvi", &rows).await.unwrap(), 2);
        assert_eq!(sink.upsert("ndvi", &rows).await.unwrap(), 2);

        assert_eq!(sink.row_count("ndvi").await, 2);
        assert_eq!(sink.row_count("elevation").await, 0);
    }

    #[tokio::test]
    async fn upsert_replaces_rows() {
        let sink = MemorySink::new();

        sink.upsert("ndvi", &table(&[Some(0.5)])).await.unwrap();
        sink.upsert("ndvi", &table(&[None])).await.unwrap();

        let row = sink.row("ndvi", &key(0)).await.unwrap();
        assert!(row.is_empty());

        sink.upsert("ndvi", &table(&[Some(0.75)])).await.unwrap();
        let row = sink.row("ndvi", &key(0)).await.unwrap();
        assert_eq!(row.get("ndvi_p50").map(String::as_str), Some("0.75"));
    }

    #[tokio::test]
    async fn cell_column_is_required() {
        let schema = Schema::new(vec![Field::new("value", DataType::Float64, false)]);
        let table = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Float64Array::from(vec![1.0]))],
        )
        .unwrap();

        let result = MemorySink::new().upsert("broken", &table).await;

        assert!(matches!(result, Err(Error::MissingColumn { .. })));
    }
}
