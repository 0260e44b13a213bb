//! Dataset fetch and delimited parsing with encoding fallback
//!
//! The source file is semicolon-delimited with a header row, but its text
//! encoding varies between exports. Candidate encodings are tried strictly
//! in order and the first successful decode wins. A decode failure moves on
//! to the next candidate; a malformed delimiter layout aborts immediately —
//! retrying a structural error under another encoding would only mangle it.

use crate::error::ExtractionError;
use crate::table::{Column, Table, Value};

use encoding_rs::{UTF_8, WINDOWS_1251, WINDOWS_1252};
use std::path::{Path, PathBuf};
use url::Url;

/// Field delimiter of the source dataset.
pub const DELIMITER: u8 = b';';

/// Encoding candidates, tried strictly in order. The default comes first,
/// then the three named fallbacks.
pub const ENCODING_CANDIDATES: [&str; 4] = ["utf-8-sig", "cp1251", "latin1", "utf-8"];

/// A freshly parsed table plus the encoding that decoded it.
#[derive(Debug)]
pub struct RawDataset {
    pub table: Table,
    pub encoding: &'static str,
}

/// Fetches the raw dataset to a local path and parses it into a [`Table`].
pub struct Extractor {
    source: Option<Url>,
    local_path: PathBuf,
}

impl Extractor {
    /// Extractor that downloads `source` to `local_path` before parsing.
    pub fn new(source: Url, local_path: impl AsRef<Path>) -> Self {
        Self {
            source: Some(source),
            local_path: local_path.as_ref().to_path_buf(),
        }
    }

    /// Extractor over an already-downloaded local file; the fetch is skipped.
    pub fn from_local(local_path: impl AsRef<Path>) -> Self {
        Self {
            source: None,
            local_path: local_path.as_ref().to_path_buf(),
        }
    }

    /// Fetch the source (if remote) and parse it into a table.
    pub async fn fetch_and_parse(&self) -> Result<RawDataset, ExtractionError> {
        if let Some(url) = &self.source {
            self.fetch(url).await?;
        }
        self.parse()
    }

    /// Download the payload and overwrite the local file with it.
    async fn fetch(&self, url: &Url) -> Result<(), ExtractionError> {
        log::info!("Downloading dataset to {}", self.local_path.display());

        let fetch_error = |source| ExtractionError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = reqwest::get(url.clone())
            .await
            .and_then(|response| response.error_for_status())
            .map_err(fetch_error)?;
        let payload = response.bytes().await.map_err(fetch_error)?;

        if let Some(parent) = self.local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ExtractionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.local_path, &payload).map_err(|source| ExtractionError::Io {
            path: self.local_path.clone(),
            source,
        })?;

        log::debug!("Fetched {} bytes", payload.len());
        Ok(())
    }

    /// Parse the local file, trying each candidate encoding in order.
    pub fn parse(&self) -> Result<RawDataset, ExtractionError> {
        let bytes = std::fs::read(&self.local_path).map_err(|source| ExtractionError::Io {
            path: self.local_path.clone(),
            source,
        })?;

        for name in ENCODING_CANDIDATES {
            let Some(text) = decode(name, &bytes) else {
                log::debug!("Encoding '{}' failed to decode, trying next", name);
                continue;
            };
            log::info!("Decoded dataset with '{}' encoding", name);
            let table = parse_delimited(&text).map_err(|message| ExtractionError::Malformed {
                encoding: name,
                message,
            })?;
            return Ok(RawDataset {
                table,
                encoding: name,
            });
        }

        Err(ExtractionError::EncodingExhausted {
            tried: ENCODING_CANDIDATES.to_vec(),
        })
    }
}

/// Strictly decode `bytes` with the named candidate, `None` on mismatch.
///
/// Candidate names resolve per the WHATWG label registry, so `latin1` is
/// windows-1252: bytes 0x80-0x9F decode to punctuation and letters rather
/// than ISO-8859-1 control characters. The windows-1251 and windows-1252
/// indexes map every byte, so input the UTF-8 candidates reject always
/// decodes at the `cp1251` fallback.
fn decode(name: &str, bytes: &[u8]) -> Option<String> {
    let (encoding, body) = match name {
        // UTF-8 with the BOM stripped when present
        "utf-8-sig" => (
            UTF_8,
            bytes
                .strip_prefix(b"\xef\xbb\xbf".as_slice())
                .unwrap_or(bytes),
        ),
        "cp1251" => (WINDOWS_1251, bytes),
        "latin1" => (WINDOWS_1252, bytes),
        "utf-8" => (UTF_8, bytes),
        _ => return None,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

/// Parse semicolon-delimited text with a header row into an all-text table.
///
/// Empty fields become [`Value::Null`]. A ragged record is a structural
/// failure, returned as a message for the caller to wrap.
fn parse_delimited(text: &str) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        for (index, field) in record.iter().enumerate() {
            values[index].push(match field {
                "" => Value::Null,
                text => Value::Text(text.to_string()),
            });
        }
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, values)| Column::text(name, values))
        .collect();
    Table::new(columns).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn extract_bytes(bytes: &[u8]) -> Result<RawDataset, ExtractionError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        Extractor::from_local(file.path()).parse()
    }

    #[test]
    fn test_parse_semicolon_delimited() {
        let dataset = extract_bytes(b"ID;G3;Authors\n1;3,14;Smith\n2;;\n").unwrap();
        assert_eq!(dataset.encoding, "utf-8-sig");
        let table = &dataset.table;
        assert_eq!(table.column_names(), vec!["ID", "G3", "Authors"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("G3").unwrap().values[1], Value::Null);
        assert_eq!(
            table.column("Authors").unwrap().values[0],
            Value::Text("Smith".into())
        );
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let dataset = extract_bytes(b"\xef\xbb\xbfID;G3\n1;2\n").unwrap();
        assert_eq!(dataset.encoding, "utf-8-sig");
        assert_eq!(dataset.table.column_names(), vec!["ID", "G3"]);
    }

    #[test]
    fn test_encoding_fallback_uses_second_candidate() {
        // "привет" in cp1251 is not valid UTF-8, so utf-8-sig must fail
        // and the second candidate must win.
        let dataset = extract_bytes(b"ID;Authors\n1;\xef\xf0\xe8\xe2\xe5\xf2\n").unwrap();
        assert_eq!(dataset.encoding, "cp1251");
        assert_eq!(
            dataset.table.column("Authors").unwrap().values[0],
            Value::Text("привет".into())
        );
    }

    #[test]
    fn test_fallback_decoder_accepts_arbitrary_bytes() {
        // windows-1251 maps every byte, 0x98 included, so input that is
        // not valid UTF-8 always decodes at the second candidate and the
        // candidate list is never exhausted.
        let dataset = extract_bytes(b"ID;G3\n1;\x98\x81\x8d\x90\n").unwrap();
        assert_eq!(dataset.encoding, "cp1251");
        assert_eq!(dataset.table.row_count(), 1);
    }

    #[test]
    fn test_ragged_record_is_structural_not_retried() {
        let error = extract_bytes(b"ID;G3\n1;2;3\n").unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Malformed {
                encoding: "utf-8-sig",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let error = Extractor::from_local("/nonexistent/dataset.csv")
            .parse()
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Io { .. }));
    }
}
