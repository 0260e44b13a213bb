//! Persistence to PostgreSQL and Parquet
//!
//! The destination table is replaced wholesale on every run: drop, recreate
//! from the table's semantic types, bulk-insert in chunks. The columnar file
//! is a pure overwrite at a fixed filename. Read-back verification is a
//! separate, explicitly invoked step whose failure never fails the run.

use crate::error::{LoadError, VerificationError};
use crate::settings::ConnectionSettings;
use crate::table::{SemanticType, Table, Value};

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::ValueEnum;
use parquet::arrow::ArrowWriter;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default directory for the columnar output file.
pub const OUTPUT_DIR: &str = "data/processed";

/// Fixed columnar output filename.
pub const PARQUET_FILENAME: &str = "grebennikov_processed.parquet";

/// Rows per INSERT statement during bulk load.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Number of rows fetched by the read-back sample query.
const SAMPLE_ROWS: usize = 5;

/// Requested persistence destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Database,
    File,
    Both,
}

impl OutputMode {
    pub fn includes_database(self) -> bool {
        matches!(self, Self::Database | Self::Both)
    }

    pub fn includes_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::File => write!(f, "file"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Outcome of a persist call.
#[derive(Debug)]
pub struct LoadResult {
    pub rows_loaded: usize,
    /// Human-readable description of each destination written.
    pub destinations: Vec<String>,
}

/// Result of the read-back verification queries.
#[derive(Debug)]
pub struct VerificationReport {
    pub row_count: i64,
    /// Up to five sample rows rendered as text.
    pub sample: Vec<String>,
}

/// Persists a transformed table to the requested destinations.
pub struct Loader {
    database: String,
    table_name: String,
    mode: OutputMode,
    output_dir: PathBuf,
}

impl Loader {
    pub fn new(
        database: impl Into<String>,
        table_name: impl Into<String>,
        mode: OutputMode,
    ) -> Self {
        Self {
            database: database.into(),
            table_name: table_name.into(),
            mode,
            output_dir: PathBuf::from(OUTPUT_DIR),
        }
    }

    /// Override the columnar output directory (the filename stays fixed).
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Write the table to every requested destination, sequentially.
    ///
    /// Settings are required only when the mode includes the database.
    pub async fn persist(
        &self,
        table: &Table,
        settings: Option<&ConnectionSettings>,
    ) -> Result<LoadResult, LoadError> {
        let mut destinations = Vec::new();

        if self.mode.includes_file() {
            let path = self.write_parquet(table)?;
            log::info!("Saved columnar file: {}", path.display());
            destinations.push(format!("file: {}", path.display()));
        }

        if self.mode.includes_database() {
            let settings = settings.ok_or_else(|| LoadError::Settings {
                reason: "database output requested but no connection settings provided"
                    .to_string(),
            })?;
            self.write_database(table, settings).await?;
            log::info!(
                "Replaced table '{}' in database '{}'",
                self.table_name,
                self.database
            );
            destinations.push(format!(
                "database: {}/{}",
                self.database, self.table_name
            ));
        }

        Ok(LoadResult {
            rows_loaded: table.row_count(),
            destinations,
        })
    }

    /// Read back a row count and a small sample for human-facing
    /// confirmation. Not a correctness gate.
    pub async fn verify(
        &self,
        table: &Table,
        settings: &ConnectionSettings,
    ) -> Result<VerificationReport, VerificationError> {
        let query_error = |source| VerificationError::Query {
            table: self.table_name.clone(),
            source,
        };
        let pool = self.connect(settings).await.map_err(query_error)?;

        let count_row =
            sqlx::query(&format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table_name)))
                .fetch_one(&pool)
                .await
                .map_err(query_error)?;
        let row_count: i64 = count_row.get(0);

        // Cast every column to text so the sample renders without knowing
        // the server-side types.
        let projection = table
            .columns()
            .iter()
            .map(|c| format!("{}::text", quote_ident(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} LIMIT {}",
            projection,
            quote_ident(&self.table_name),
            SAMPLE_ROWS
        ))
        .fetch_all(&pool)
        .await
        .map_err(query_error)?;

        let sample = rows
            .iter()
            .map(|row| {
                (0..table.column_count())
                    .map(|i| row.get::<Option<String>, _>(i).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect();

        Ok(VerificationReport { row_count, sample })
    }

    async fn connect(&self, settings: &ConnectionSettings) -> Result<PgPool, sqlx::Error> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&self.database);
        PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
    }

    async fn write_database(
        &self,
        table: &Table,
        settings: &ConnectionSettings,
    ) -> Result<(), LoadError> {
        let pool = self
            .connect(settings)
            .await
            .map_err(|source| LoadError::Connect {
                database: self.database.clone(),
                source,
            })?;
        let write_error = |source| LoadError::Write {
            table: self.table_name.clone(),
            source,
        };

        sqlx::query(&format!(
            "DROP TABLE IF EXISTS {}",
            quote_ident(&self.table_name)
        ))
        .execute(&pool)
        .await
        .map_err(write_error)?;

        sqlx::query(&create_table_sql(table, &self.table_name))
            .execute(&pool)
            .await
            .map_err(write_error)?;

        let column_list = table
            .columns()
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let total = table.row_count();
        let mut start = 0;
        while start < total {
            let end = total.min(start + INSERT_CHUNK_ROWS);
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                quote_ident(&self.table_name),
                column_list
            ));
            builder.push_values(start..end, |mut binder, row_index| {
                for column in table.columns() {
                    match &column.values[row_index] {
                        Value::Int(i) => {
                            binder.push_bind(*i);
                        }
                        Value::Float(f) => {
                            binder.push_bind(*f);
                        }
                        Value::Text(s) => {
                            binder.push_bind(s.clone());
                        }
                        Value::Null => {
                            binder.push_bind(None::<String>);
                        }
                    }
                }
            });
            builder.build().execute(&pool).await.map_err(write_error)?;
            log::debug!("Inserted rows {}..{}", start, end);
            start = end;
        }

        Ok(())
    }

    fn write_parquet(&self, table: &Table) -> Result<PathBuf, LoadError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| LoadError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        let path = self.output_dir.join(PARQUET_FILENAME);

        let batch = to_record_batch(table)?;
        let file = std::fs::File::create(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(path)
    }
}

/// Quote a cleaned column or table name as a SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// CREATE TABLE statement mapping each column's semantic type to SQL.
fn create_table_sql(table: &Table, table_name: &str) -> String {
    let columns = table
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.dtype.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table_name), columns)
}

/// Convert a table to an arrow record batch for parquet serialization.
fn to_record_batch(table: &Table) -> Result<RecordBatch, LoadError> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for column in table.columns() {
        let (datatype, array): (DataType, ArrayRef) = match column.dtype {
            SemanticType::Integer64 => {
                let values: Vec<Option<i64>> = column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                (DataType::Int64, Arc::new(Int64Array::from(values)))
            }
            SemanticType::Float64 => {
                let values: Vec<Option<f64>> = column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Float(f) => Some(*f),
                        _ => None,
                    })
                    .collect();
                (DataType::Float64, Arc::new(Float64Array::from(values)))
            }
            SemanticType::Text => {
                let values: Vec<Option<String>> = column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect();
                (DataType::Utf8, Arc::new(StringArray::from(values)))
            }
        };
        fields.push(Field::new(column.name.as_str(), datatype, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).map_err(LoadError::from)
}
