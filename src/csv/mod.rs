//! CSV transfer helpers
//!
//! Line-oriented comma-separated text, independent of the store:
//! - [`CsvWriter`] quotes fields containing commas, quotes or line breaks
//! - [`CsvReader`] accepts LF or CRLF line endings and quoted fields that
//!   span lines, and skips blank lines

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use crate::error::{CsvError, Result};

/// Writer for CSV records
pub struct CsvWriter {
    /// Buffered file writer
    writer: BufWriter<File>,
    /// Path to the output file
    path: String,
    /// Line terminator appended after each record
    terminator: &'static str,
    /// Number of records written
    written: usize,
}

impl CsvWriter {
    /// Create (or truncate) `path` for writing with `\n` line endings.
    pub async fn create(path: &str) -> Result<Self> {
        validate_path(path)?;
        let file = File::create(path).await?;
        debug!("Created CSV writer for: {}", path);

        Ok(Self {
            writer: BufWriter::with_capacity(64 * 1024, file),
            path: path.to_string(),
            terminator: "\n",
            written: 0,
        })
    }

    /// Terminate records with `\r\n` instead of `\n`.
    pub fn with_crlf(mut self) -> Self {
        self.terminator = "\r\n";
        self
    }

    /// Write one record.
    ///
    /// A record made of one empty field is written as `""` so the reader
    /// does not take it for a blank line.
    pub async fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let row = match fields {
            [only] if only.as_ref().is_empty() => "\"\"".to_string(),
            _ => fields
                .iter()
                .map(|field| escape_field(field.as_ref()))
                .collect::<Vec<_>>()
                .join(","),
        };

        self.writer.write_all(row.as_bytes()).await?;
        self.writer.write_all(self.terminator.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered output. Returns the number of records written.
    pub async fn finish(mut self) -> Result<usize> {
        self.writer.flush().await?;
        debug!("Finalized CSV file: {} ({} records)", self.path, self.written);
        Ok(self.written)
    }
}

/// Quote a field if it contains a comma, quote or line break.
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Check that the parent directory of `path` exists.
fn validate_path(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CsvError::MissingDirectory(parent.display().to_string()).into());
        }
    }
    Ok(())
}

/// Reader for CSV records
pub struct CsvReader {
    reader: BufReader<File>,
    path: String,
    /// Physical lines consumed so far
    line: usize,
}

impl CsvReader {
    /// Open `path` for reading.
    pub async fn open(path: &str) -> Result<Self> {
        let file = File::open(path).await?;
        debug!("Opened CSV reader for: {}", path);
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_string(),
            line: 0,
        })
    }

    /// Read the next record, `None` at end of input.
    pub async fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        let mut buf = String::new();

        // skip blank lines
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf).await? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if !buf.trim_end_matches(['\r', '\n']).is_empty() {
                break;
            }
        }

        let start = self.line;
        let mut parser = RecordParser::default();
        parser.feed(&buf);

        while parser.in_quotes {
            buf.clear();
            if self.reader.read_line(&mut buf).await? == 0 {
                return Err(CsvError::Unterminated { line: start }.into());
            }
            self.line += 1;
            parser.feed(&buf);
        }

        Ok(Some(parser.finish()))
    }

    /// Read every remaining record.
    pub async fn read_all(&mut self) -> Result<Vec<Vec<String>>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record().await? {
            records.push(record);
        }
        debug!("Read {} records from {}", records.len(), self.path);
        Ok(records)
    }

    /// Read the first record and require it to equal `expected`.
    pub async fn check_header<S: AsRef<str>>(&mut self, expected: &[S]) -> Result<()> {
        let found = self.read_record().await?.unwrap_or_default();
        let matches = found.len() == expected.len()
            && found.iter().zip(expected).all(|(f, e)| f == e.as_ref());
        if matches {
            Ok(())
        } else {
            Err(CsvError::HeaderMismatch {
                expected: expected.iter().map(|e| e.as_ref().to_string()).collect(),
                found,
            }
            .into())
        }
    }
}

/// Incremental parser for one record that may span several lines.
#[derive(Debug, Default)]
struct RecordParser {
    fields: Vec<String>,
    field: String,
    in_quotes: bool,
}

impl RecordParser {
    fn feed(&mut self, text: &str) {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if self.in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        self.field.push('"');
                    } else {
                        self.in_quotes = false;
                    }
                } else {
                    self.field.push(c);
                }
                continue;
            }

            match c {
                '"' if self.field.is_empty() => self.in_quotes = true,
                ',' => self.fields.push(std::mem::take(&mut self.field)),
                '\n' => {}
                '\r' if matches!(chars.peek(), None | Some('\n')) => {}
                _ => self.field.push(c),
            }
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.fields.push(self.field);
        self.fields
    }
}
