//! CSV transfer for the session
//!
//! One output file and one input file can be open at a time. They are
//! independent of the store and of each other.

use crate::csv::{CsvReader, CsvWriter};
use crate::error::{MogError, Result};
use crate::store::DocumentStore;

use super::Session;

impl<S: DocumentStore> Session<S> {
    /// Create `path` for CSV output, finishing any file already open.
    pub async fn csv_out_start(&mut self, path: &str) -> Result<()> {
        if let Some(previous) = self.csv_out.take() {
            previous.finish().await?;
        }
        self.csv_out = Some(CsvWriter::create(path).await?);
        Ok(())
    }

    /// Write one record to the open output file.
    pub async fn csv_write<F: AsRef<str>>(&mut self, fields: &[F]) -> Result<()> {
        let writer = self
            .csv_out
            .as_mut()
            .ok_or_else(|| MogError::State("csv_write called before csv_out_start".to_string()))?;
        writer.write_record(fields).await
    }

    /// Flush and close the output file.
    ///
    /// # Returns
    /// * `Result<usize>` - Records written (0 if nothing was open)
    pub async fn csv_out_done(&mut self) -> Result<usize> {
        match self.csv_out.take() {
            Some(writer) => writer.finish().await,
            None => Ok(0),
        }
    }

    /// Open `path` for CSV input.
    pub async fn csv_in_start(&mut self, path: &str) -> Result<()> {
        self.csv_in = Some(CsvReader::open(path).await?);
        Ok(())
    }

    /// Read the next record, `None` at end of file.
    pub async fn csv_read(&mut self) -> Result<Option<Vec<String>>> {
        self.open_reader()?.read_record().await
    }

    /// Read the first record of the open input and require it to equal `expected`.
    pub async fn csv_check_header<F: AsRef<str>>(&mut self, expected: &[F]) -> Result<()> {
        self.open_reader()?.check_header(expected).await
    }

    /// Close the input file.
    pub fn csv_in_done(&mut self) {
        self.csv_in = None;
    }

    /// Read every record of `path` at once. Does not touch the open input.
    pub async fn csv_read_all(&mut self, path: &str) -> Result<Vec<Vec<String>>> {
        let mut reader = CsvReader::open(path).await?;
        reader.read_all().await
    }

    fn open_reader(&mut self) -> Result<&mut CsvReader> {
        self.csv_in
            .as_mut()
            .ok_or_else(|| MogError::State("csv input not started".to_string()))
    }
}
