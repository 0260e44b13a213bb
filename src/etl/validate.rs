//! Pre- and post-transform table validation
//!
//! Fatal checks fail fast with a typed error; everything else is collected
//! as ordered warning strings for the pipeline result. Warnings never stop
//! the run.

use crate::error::{StructuralError, TypeError};
use crate::table::{SemanticType, Table, Value};

use std::collections::HashSet;

/// Columns that must be present in the freshly parsed table, by raw header.
pub const REQUIRED_RAW_COLUMNS: [&str; 1] = ["G3"];

/// Checks structural pre-conditions before any transformation runs.
pub struct RawValidator;

impl RawValidator {
    /// Validate the freshly parsed table.
    ///
    /// Fatal: zero rows, or a missing required column. Non-fatal
    /// observations (fully-null columns, duplicate rows, missing values in
    /// a required column) come back as warnings.
    pub fn check_raw(table: &Table) -> Result<Vec<String>, StructuralError> {
        if table.row_count() == 0 {
            return Err(StructuralError::EmptyTable);
        }

        let missing: Vec<String> = REQUIRED_RAW_COLUMNS
            .iter()
            .filter(|name| !table.has_column(name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StructuralError::MissingColumns { missing });
        }

        let mut warnings = Vec::new();

        for column in table.columns() {
            if column.is_fully_null() {
                warnings.push(format!("column '{}' is fully null", column.name));
            }
        }

        for name in REQUIRED_RAW_COLUMNS {
            let nulls = table
                .column(name)
                .map_or(0, |c| c.values.iter().filter(|v| v.is_null()).count());
            if nulls > 0 {
                warnings.push(format!(
                    "column '{}' has {} missing value(s)",
                    name, nulls
                ));
            }
        }

        let duplicates = duplicate_row_count(table);
        if duplicates > 0 {
            warnings.push(format!("found {} duplicate row(s)", duplicates));
        }

        log::debug!(
            "Raw validation passed: {} rows, {} columns, {} warning(s)",
            table.row_count(),
            table.column_count(),
            warnings.len()
        );
        Ok(warnings)
    }
}

/// Checks post-transformation invariants.
pub struct OutputValidator;

impl OutputValidator {
    /// Validate the transformed table against the expected row count.
    ///
    /// Fatal: the measurement column exists but is not uniformly float —
    /// that means the transformer's type contract was broken. A row-count
    /// shortfall is only a warning; the source may simply have fewer rows
    /// than the requested limit.
    pub fn check_output(table: &Table, expected_rows: usize) -> Result<Vec<String>, TypeError> {
        if let Some(column) = table.column(super::transform::MEASUREMENT_COLUMN) {
            if column.dtype != SemanticType::Float64 || !column.is_uniform() {
                return Err(TypeError::NotUniform {
                    column: column.name.clone(),
                    expected: SemanticType::Float64,
                });
            }
        }

        let mut warnings = Vec::new();

        if table.row_count() != expected_rows {
            warnings.push(format!(
                "row count mismatch: expected {}, got {}",
                expected_rows,
                table.row_count()
            ));
        }

        for column in table.columns() {
            let infinite = column
                .values
                .iter()
                .filter(|v| matches!(v, Value::Float(f) if f.is_infinite()))
                .count();
            if infinite > 0 {
                warnings.push(format!(
                    "column '{}' has {} infinite value(s)",
                    column.name, infinite
                ));
            }

            let whitespace_only = column
                .values
                .iter()
                .filter(|v| matches!(v, Value::Text(s) if !s.is_empty() && s.trim().is_empty()))
                .count();
            if whitespace_only > 0 {
                warnings.push(format!(
                    "column '{}' has {} whitespace-only value(s)",
                    column.name, whitespace_only
                ));
            }
        }

        let null_rows = (0..table.row_count())
            .filter(|&index| table.row(index).iter().all(|v| v.is_null()))
            .count();
        if null_rows > 0 {
            warnings.push(format!("found {} fully-null row(s)", null_rows));
        }

        Ok(warnings)
    }
}

fn duplicate_row_count(table: &Table) -> usize {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    for index in 0..table.row_count() {
        let key = table
            .row(index)
            .iter()
            .map(|v| match v {
                Value::Null => "\u{0}".to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\u{1f}");
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn raw(name: &str, values: &[&str]) -> Column {
        Column::text(
            name,
            values
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        Value::Null
                    } else {
                        Value::Text((*v).to_string())
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn test_empty_table_is_fatal() {
        let table = Table::new(vec![raw("G3", &[])]).unwrap();
        assert!(matches!(
            RawValidator::check_raw(&table),
            Err(StructuralError::EmptyTable)
        ));
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let table = Table::new(vec![raw("ID", &["1"])]).unwrap();
        let error = RawValidator::check_raw(&table).unwrap_err();
        assert!(matches!(
            error,
            StructuralError::MissingColumns { ref missing } if missing == &["G3".to_string()]
        ));
    }

    #[test]
    fn test_raw_observations_are_warnings() {
        let table = Table::new(vec![
            raw("G3", &["1", "1", ""]),
            raw("Empty", &["", "", ""]),
        ])
        .unwrap();
        let warnings = RawValidator::check_raw(&table).unwrap();
        assert!(warnings.iter().any(|w| w.contains("'Empty' is fully null")));
        assert!(warnings.iter().any(|w| w.contains("missing value")));
        // Rows 1 and 2 are identical across both columns
        assert!(warnings.iter().any(|w| w.contains("duplicate row")));
    }

    #[test]
    fn test_measurement_type_is_enforced() {
        let table = Table::new(vec![raw("g3", &["not-coerced"])]).unwrap();
        assert!(matches!(
            OutputValidator::check_output(&table, 1),
            Err(TypeError::NotUniform { .. })
        ));
    }

    #[test]
    fn test_row_count_shortfall_is_a_warning() {
        let mut column = raw("g3", &["1", "2"]);
        column.dtype = SemanticType::Float64;
        column.values = vec![Value::Float(1.0), Value::Float(2.0)];
        let table = Table::new(vec![column]).unwrap();

        let warnings = OutputValidator::check_output(&table, 100).unwrap();
        assert!(warnings.iter().any(|w| w == "row count mismatch: expected 100, got 2"));
    }

    #[test]
    fn test_infinite_and_whitespace_warnings() {
        let mut g3 = raw("g3", &[]);
        g3.dtype = SemanticType::Float64;
        g3.values = vec![Value::Float(f64::INFINITY), Value::Float(1.0)];
        let authors = Column::text(
            "authors",
            vec![Value::Text("   ".into()), Value::Text("Smith".into())],
        );
        let table = Table::new(vec![g3, authors]).unwrap();

        let warnings = OutputValidator::check_output(&table, 2).unwrap();
        assert!(warnings.iter().any(|w| w.contains("infinite")));
        assert!(warnings.iter().any(|w| w.contains("whitespace-only")));
    }

    #[test]
    fn test_fully_null_rows_warning() {
        let table = Table::new(vec![
            Column::text("a", vec![Value::Null, Value::Text("x".into())]),
            Column::text("b", vec![Value::Null, Value::Null]),
        ])
        .unwrap();
        let warnings = OutputValidator::check_output(&table, 2).unwrap();
        assert!(warnings.iter().any(|w| w.contains("1 fully-null row")));
    }
}
