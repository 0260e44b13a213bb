//! Column-name cleanup, type coercion, and row limiting
//!
//! Coercion is deliberately lossy but total: a value that refuses to parse
//! becomes the type's zero value (or empty string for text) and leaves an
//! informational note behind, so a single bad cell never fails the run.

use crate::table::{SemanticType, Table, Value};

/// Columns coerced to 64-bit integers, by cleaned name.
pub const INTEGER_COLUMNS: [&str; 3] = ["number", "id", "number_of_atoms"];

/// The primary measurement column, coerced to 64-bit float.
pub const MEASUREMENT_COLUMN: &str = "g3";

/// Descriptive columns coerced to text, by cleaned name.
pub const TEXT_COLUMNS: [&str; 7] = [
    "chemical_compound",
    "name_of_compound",
    "authors",
    "literature",
    "symmetry",
    "type",
    "topology",
];

/// Clean a column name for database use.
///
/// Trims, lowercases, maps spaces/hyphens/dots to underscores and strips
/// parentheses. Total and idempotent: applying it twice equals applying it
/// once.
pub fn clean_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' | '.' => Some('_'),
            '(' | ')' => None,
            other => Some(other),
        })
        .collect()
}

/// A normalized table plus the informational notes coercion produced.
#[derive(Debug)]
pub struct TransformOutput {
    pub table: Table,
    pub notes: Vec<String>,
}

/// Normalizes column names, coerces column types, and truncates rows.
pub struct Transformer {
    row_limit: usize,
}

impl Transformer {
    pub fn new(row_limit: usize) -> Self {
        Self { row_limit }
    }

    /// Normalize the table in place and return it with coercion notes.
    ///
    /// Steps, in order: name cleanup, integer coercion, measurement (float)
    /// coercion, text coercion, prefix truncation to the row limit. Columns
    /// outside the fixed coercion sets pass through untouched, so the
    /// column count never changes.
    pub fn normalize(&self, mut table: Table) -> TransformOutput {
        let mut notes = Vec::new();

        for column in table.columns_mut() {
            column.name = clean_column_name(&column.name);
        }

        for column in table.columns_mut() {
            if INTEGER_COLUMNS.contains(&column.name.as_str()) {
                coerce_integer(column, &mut notes);
            } else if column.name == MEASUREMENT_COLUMN {
                coerce_float(column, &mut notes);
            } else if TEXT_COLUMNS.contains(&column.name.as_str()) {
                coerce_text(column);
            }
        }

        table.truncate(self.row_limit);
        log::debug!(
            "Transformed table: {} rows, {} columns, {} coercion note(s)",
            table.row_count(),
            table.column_count(),
            notes.len()
        );

        TransformOutput { table, notes }
    }
}

/// Repair a locale-specific decimal separator before numeric parsing.
fn repair_decimal_separator(text: &str) -> String {
    text.replace(',', ".")
}

fn coerce_integer(column: &mut crate::table::Column, notes: &mut Vec<String>) {
    for (index, value) in column.values.iter_mut().enumerate() {
        let coerced = match &*value {
            Value::Int(i) => *i,
            Value::Float(f) => *f as i64,
            Value::Text(text) => {
                let repaired = repair_decimal_separator(text.trim());
                match repaired.parse::<i64>() {
                    Ok(i) => i,
                    // Decimal text in an integer column truncates toward zero
                    Err(_) => match repaired.parse::<f64>() {
                        Ok(f) if f.is_finite() => f as i64,
                        _ => {
                            notes.push(substitution_note(&column.name, index, text, "0"));
                            0
                        }
                    },
                }
            }
            Value::Null => {
                notes.push(missing_note(&column.name, index, "0"));
                0
            }
        };
        *value = Value::Int(coerced);
    }
    column.dtype = SemanticType::Integer64;
}

fn coerce_float(column: &mut crate::table::Column, notes: &mut Vec<String>) {
    for (index, value) in column.values.iter_mut().enumerate() {
        let coerced = match &*value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::Text(text) => {
                match repair_decimal_separator(text.trim()).parse::<f64>() {
                    Ok(f) => f,
                    Err(_) => {
                        notes.push(substitution_note(&column.name, index, text, "0"));
                        0.0
                    }
                }
            }
            Value::Null => {
                notes.push(missing_note(&column.name, index, "0"));
                0.0
            }
        };
        *value = Value::Float(coerced);
    }
    column.dtype = SemanticType::Float64;
}

fn coerce_text(column: &mut crate::table::Column) {
    for value in column.values.iter_mut() {
        let coerced = match &*value {
            // Upstream stringification artifacts collapse to empty
            Value::Text(text) if text == "nan" || text == "None" => String::new(),
            Value::Text(text) => text.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Null => String::new(),
        };
        *value = Value::Text(coerced);
    }
    column.dtype = SemanticType::Text;
}

fn substitution_note(column: &str, index: usize, original: &str, sentinel: &str) -> String {
    format!(
        "column '{}' row {}: unparseable value '{}' replaced with {}",
        column,
        index + 1,
        original,
        sentinel
    )
}

fn missing_note(column: &str, index: usize, sentinel: &str) -> String {
    format!(
        "column '{}' row {}: missing value replaced with {}",
        column,
        index + 1,
        sentinel
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn text_column(name: &str, values: &[&str]) -> Column {
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
    fn test_clean_column_name() {
        assert_eq!(clean_column_name("Number of atoms"), "number_of_atoms");
        assert_eq!(clean_column_name("  G3 "), "g3");
        assert_eq!(clean_column_name("Weight (g)"), "weight_g");
        assert_eq!(clean_column_name("a-b.c"), "a_b_c");
    }

    #[test]
    fn test_clean_column_name_is_idempotent() {
        for name in ["Number of atoms", "  G3 ", "Weight (g)", "a-b.c", "", "уже_чисто"] {
            let once = clean_column_name(name);
            assert_eq!(clean_column_name(&once), once);
        }
    }

    #[test]
    fn test_float_coercion_with_decimal_repair() {
        let table = Table::new(vec![text_column("G3", &["3,14", "2.5", "abc", ""])]).unwrap();
        let output = Transformer::new(100).normalize(table);

        let column = output.table.column("g3").unwrap();
        assert_eq!(column.dtype, SemanticType::Float64);
        assert_eq!(
            column.values,
            vec![
                Value::Float(3.14),
                Value::Float(2.5),
                Value::Float(0.0),
                Value::Float(0.0),
            ]
        );
        // One unparseable, one missing
        assert_eq!(output.notes.len(), 2);
        assert!(output.notes[0].contains("'abc'"));
    }

    #[test]
    fn test_integer_coercion_is_total() {
        let table =
            Table::new(vec![text_column("ID", &["7", "3.9", "-2", "junk", ""])]).unwrap();
        let output = Transformer::new(100).normalize(table);

        let column = output.table.column("id").unwrap();
        assert_eq!(column.dtype, SemanticType::Integer64);
        assert_eq!(
            column.values,
            vec![
                Value::Int(7),
                Value::Int(3),
                Value::Int(-2),
                Value::Int(0),
                Value::Int(0),
            ]
        );
    }

    #[test]
    fn test_text_coercion_collapses_stringified_missing() {
        let table = Table::new(vec![text_column("Authors", &["Smith", "nan", "None", ""])])
            .unwrap();
        let output = Transformer::new(100).normalize(table);

        let column = output.table.column("authors").unwrap();
        assert_eq!(
            column.values,
            vec![
                Value::Text("Smith".into()),
                Value::Text("".into()),
                Value::Text("".into()),
                Value::Text("".into()),
            ]
        );
    }

    #[test]
    fn test_row_limit_is_prefix_truncation() {
        let table = Table::new(vec![text_column("ID", &["1", "2", "3", "4", "5"])]).unwrap();
        let output = Transformer::new(2).normalize(table);
        assert_eq!(
            output.table.column("id").unwrap().values,
            vec![Value::Int(1), Value::Int(2)]
        );

        // Limit past the end keeps everything
        let table = Table::new(vec![text_column("ID", &["1", "2"])]).unwrap();
        let output = Transformer::new(100).normalize(table);
        assert_eq!(output.table.row_count(), 2);
    }

    #[test]
    fn test_unlisted_columns_pass_through() {
        let table = Table::new(vec![text_column("Some Extra", &["x", ""])]).unwrap();
        let output = Transformer::new(100).normalize(table);

        let column = output.table.column("some_extra").unwrap();
        assert_eq!(column.dtype, SemanticType::Text);
        assert_eq!(column.values, vec![Value::Text("x".into()), Value::Null]);
        assert_eq!(output.table.column_count(), 1);
    }

    #[test]
    fn test_declared_numeric_columns_are_uniform() {
        let table = Table::new(vec![
            text_column("ID", &["1", "x", ""]),
            text_column("G3", &["1,5", "y", ""]),
        ])
        .unwrap();
        let output = Transformer::new(100).normalize(table);
        for column in output.table.columns() {
            assert!(column.is_uniform(), "column '{}' not uniform", column.name);
        }
    }
}
