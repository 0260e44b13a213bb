//! In-memory tabular data model
//!
//! A [`Table`] is an ordered sequence of named, typed columns of equal
//! length. Freshly parsed tables are all-[`SemanticType::Text`]; the
//! transformer decides each column's final semantic type exactly once and
//! the tag travels with the table from then on, so downstream stages never
//! re-derive "is this numeric?" from column names.

use crate::error::StructuralError;

/// Semantic type tag for a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticType {
    Integer64,
    Float64,
    Text,
}

impl SemanticType {
    /// PostgreSQL column type for this semantic type.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer64 => "BIGINT",
            Self::Float64 => "DOUBLE PRECISION",
            Self::Text => "TEXT",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer64 => write!(f, "integer64"),
            Self::Float64 => write!(f, "float64"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A single cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value matches the declared type of its column.
    ///
    /// `Null` conforms to `Text` only; coerced numeric columns carry no
    /// nulls (missing values become the sentinel zero instead).
    pub fn conforms_to(&self, dtype: SemanticType) -> bool {
        matches!(
            (self, dtype),
            (Self::Int(_), SemanticType::Integer64)
                | (Self::Float(_), SemanticType::Float64)
                | (Self::Text(_), SemanticType::Text)
                | (Self::Null, SemanticType::Text)
        )
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
            Self::Null => write!(f, ""),
        }
    }
}

/// A named column with a declared semantic type.
#[derive(Clone, Debug)]
pub struct Column {
    pub name: String,
    pub dtype: SemanticType,
    pub values: Vec<Value>,
}

impl Column {
    /// Create an all-text column, as produced by the CSV parser.
    pub fn text(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype: SemanticType::Text,
            values,
        }
    }

    /// Whether every value conforms to the declared type.
    pub fn is_uniform(&self) -> bool {
        self.values.iter().all(|v| v.conforms_to(self.dtype))
    }

    /// Whether every value is null.
    pub fn is_fully_null(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(Value::is_null)
    }
}

/// An ordered collection of equal-length columns.
#[derive(Clone, Debug, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, enforcing the equal-length invariant.
    pub fn new(columns: Vec<Column>) -> Result<Self, StructuralError> {
        if let Some(first) = columns.first() {
            let expected = first.values.len();
            for column in &columns {
                if column.values.len() != expected {
                    return Err(StructuralError::RaggedColumns {
                        column: column.name.clone(),
                        expected,
                        actual: column.values.len(),
                    });
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// One row of cell references, in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Keep only the first `limit` rows, in original order.
    pub fn truncate(&mut self, limit: usize) {
        for column in &mut self.columns {
            column.values.truncate(limit);
        }
    }
}
