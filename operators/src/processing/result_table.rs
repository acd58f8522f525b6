use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::source::{ColumnNaming, SourceConfig};
use crate::util::Result;

use super::zonal::{ResultRow, SliceReduction, StatSpec, Statistics};

pub const CELL_COLUMN: &str = "cell";
pub const START_TIME_COLUMN: &str = "start_time";
pub const END_TIME_COLUMN: &str = "end_time";

#[derive(Debug, Clone, PartialEq)]
enum ColumnValue {
    Statistic { index: usize },
    Majority,
    Unique,
    Fraction { class: i64, dense: bool },
    Attribute { index: usize },
}

/// One statistic column of the result table
#[derive(Debug, Clone, PartialEq)]
pub struct StatColumn {
    name: String,
    group: usize,
    value: ColumnValue,
}

impl StatColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        match self.value {
            ColumnValue::Majority | ColumnValue::Unique => DataType::Int64,
            ColumnValue::Statistic { .. }
            | ColumnValue::Fraction { .. }
            | ColumnValue::Attribute { .. } => DataType::Float64,
        }
    }

    fn statistics<'r>(&self, row: &'r ResultRow) -> Option<&'r Statistics> {
        row.groups.get(self.group)?.as_ref()
    }

    fn float_value(&self, row: &ResultRow) -> Option<f64> {
        match (self.statistics(row)?, &self.value) {
            (Statistics::Continuous(values), ColumnValue::Statistic { index }) => {
                values.get(*index).copied()
            }
            (Statistics::Categorical(summary), ColumnValue::Fraction { class, dense }) => summary
                .fractions
                .get(class)
                .copied()
                .or(dense.then_some(0.0)),
            (Statistics::Categorical(summary), ColumnValue::Attribute { index }) => {
                summary.attributes.as_ref()?.get(*index).copied()
            }
            _ => None,
        }
    }

    fn int_value(&self, row: &ResultRow) -> Option<i64> {
        match (self.statistics(row)?, &self.value) {
            (Statistics::Categorical(summary), ColumnValue::Majority) => Some(summary.majority),
            (Statistics::Categorical(summary), ColumnValue::Unique) => Some(summary.unique as i64),
            _ => None,
        }
    }

    fn to_array(&self, rows: &[ResultRow]) -> ArrayRef {
        match self.data_type() {
            DataType::Int64 => Arc::new(
                rows.iter()
                    .map(|row| self.int_value(row))
                    .collect::<Int64Array>(),
            ),
            _ => Arc::new(
                rows.iter()
                    .map(|row| self.float_value(row))
                    .collect::<Float64Array>(),
            ),
        }
    }
}

/// The column layout of a result table.
///
/// The table starts with `cell`, temporal sources add `start_time` and `end_time`,
/// then follow the statistic columns of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSchema {
    temporal: bool,
    columns: Vec<StatColumn>,
}

impl ResultSchema {
    /// Derives the columns from the source.
    ///
    /// Bands and declared slices fix the column groups, so an empty table has the
    /// same columns as a full one. The rows only contribute the histogram classes of
    /// a source without a fixed class list.
    pub fn new(source: &SourceConfig, rows: &[ResultRow]) -> Self {
        let groups_per_band = source.groups_per_band();

        let suffix = |group: usize| match source.slice_reduction {
            SliceReduction::Mean => String::new(),
            SliceReduction::PerSlice => format!("_{}", group + 1),
        };

        let mut columns = Vec::new();

        for (band, prefix) in source.column_prefixes().into_iter().enumerate() {
            for slice in 0..groups_per_band {
                let suffix = suffix(slice);
                let group = band * groups_per_band + slice;

                match &source.stat_spec {
                    StatSpec::Continuous { statistics } => {
                        for (index, statistic) in statistics.iter().enumerate() {
                            let name = match source.column_naming {
                                ColumnNaming::Statistic => format!("{prefix}_{statistic}{suffix}"),
                                ColumnNaming::Prefix => format!("{prefix}{suffix}"),
                            };
                            columns.push(StatColumn {
                                name,
                                group,
                                value: ColumnValue::Statistic { index },
                            });
                        }
                    }
                    StatSpec::Categorical(spec) => {
                        if spec.majority {
                            columns.push(StatColumn {
                                name: format!("{prefix}_majority{suffix}"),
                                group,
                                value: ColumnValue::Majority,
                            });
                        }
                        if spec.unique {
                            columns.push(StatColumn {
                                name: format!("{prefix}_unique{suffix}"),
                                group,
                                value: ColumnValue::Unique,
                            });
                        }
                        if spec.histogram {
                            let (classes, dense) = match &spec.classes {
                                Some(classes) => (classes.clone(), true),
                                None => (observed_classes(rows), false),
                            };
                            for class in classes {
                                columns.push(StatColumn {
                                    name: format!("{prefix}_{class}{suffix}"),
                                    group,
                                    value: ColumnValue::Fraction { class, dense },
                                });
                            }
                        }
                        if let Some(table) = &source.class_attributes {
                            for (index, attribute) in table.attributes().iter().enumerate() {
                                columns.push(StatColumn {
                                    name: format!("{attribute}{suffix}"),
                                    group,
                                    value: ColumnValue::Attribute { index },
                                });
                            }
                        }
                    }
                }
            }
        }

        Self {
            temporal: source.is_temporal(),
            columns,
        }
    }

    pub fn is_temporal(&self) -> bool {
        self.temporal
    }

    pub fn stat_columns(&self) -> &[StatColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![CELL_COLUMN];
        if self.temporal {
            names.extend([START_TIME_COLUMN, END_TIME_COLUMN]);
        }
        names.extend(self.columns.iter().map(StatColumn::name));
        names
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        let mut fields = vec![Field::new(CELL_COLUMN, DataType::Utf8, false)];

        if self.temporal {
            fields.push(Field::new(START_TIME_COLUMN, DataType::Date32, true));
            fields.push(Field::new(END_TIME_COLUMN, DataType::Date32, true));
        }

        fields.extend(
            self.columns
                .iter()
                .map(|column| Field::new(column.name(), column.data_type(), true)),
        );

        Arc::new(Schema::new(fields))
    }
}

fn observed_classes(rows: &[ResultRow]) -> Vec<i64> {
    rows.iter()
        .flat_map(|row| row.groups.iter().flatten())
        .filter_map(|statistics| match statistics {
            Statistics::Categorical(summary) => Some(summary.fractions.keys().copied()),
            Statistics::Continuous(_) => None,
        })
        .flatten()
        .collect::<BTreeSet<i64>>()
        .into_iter()
        .collect()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Builds the result table: exactly the schema's columns and one row per input row,
/// in input order. Missing statistics become nulls.
pub fn assemble(rows: &[ResultRow], schema: &ResultSchema) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.columns.len() + 3);

    columns.push(Arc::new(
        rows.iter()
            .map(|row| Some(row.cell.to_string()))
            .collect::<StringArray>(),
    ));

    if schema.temporal {
        columns.push(Arc::new(
            rows.iter()
                .map(|row| row.window.as_ref().map(|w| days_since_epoch(w.start())))
                .collect::<Date32Array>(),
        ));
        columns.push(Arc::new(
            rows.iter()
                .map(|row| row.window.as_ref().map(|w| days_since_epoch(w.end())))
                .collect::<Date32Array>(),
        ));
    }

    columns.extend(schema.columns.iter().map(|column| column.to_array(rows)));

    Ok(RecordBatch::try_new(schema.arrow_schema(), columns)?)
}
