use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::splitter::{CsvSplitter, SplitterOptions};
use crate::{Error, Result};

/// Field map name whose column is consumed for alignment but left out of the mapping.
pub const NULL_FIELD: &str = "null";

/// One parsed line after selection and mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Fields(Vec<String>),
    Mapped(HashMap<String, String>),
}

impl Record {
    pub fn as_fields(&self) -> Option<&[String]> {
        match self {
            Record::Fields(fields) => Some(fields),
            Record::Mapped(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, String>> {
        match self {
            Record::Mapped(map) => Some(map),
            Record::Fields(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub splitter: SplitterOptions,
    /// Zero-based column indices to keep, in output order. Empty keeps all.
    pub wanted_fields: Vec<usize>,
    /// Output names aligned with the selected columns. Empty yields positional records.
    pub field_map: Vec<String>,
}

/// Called once per line that cannot be turned into a record.
///
/// Returning `Ok(())` skips the line and keeps reading; returning an error
/// aborts the whole read with that error.
pub trait FailureHook {
    fn on_parse_failure(&mut self, raw_input: &str, error: &Error) -> Result<()>;
}

impl<F> FailureHook for F
where
    F: FnMut(&str, &Error) -> Result<()>,
{
    fn on_parse_failure(&mut self, raw_input: &str, error: &Error) -> Result<()> {
        self(raw_input, error)
    }
}

/// Default hook: log a warning and carry on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAndContinue;

impl FailureHook for LogAndContinue {
    fn on_parse_failure(&mut self, raw_input: &str, error: &Error) -> Result<()> {
        warn!("Skipping unparseable input {:?}: {}", raw_input, error);
        Ok(())
    }
}

pub struct CsvReader {
    splitter: CsvSplitter,
    wanted_fields: Vec<usize>,
    field_map: Vec<String>,
    hook: Box<dyn FailureHook>,
    last_file: Option<PathBuf>,
}

impl CsvReader {
    pub fn new(options: SplitterOptions) -> Result<Self> {
        Self::with_config(ReaderConfig {
            splitter: options,
            ..Default::default()
        })
    }

    pub fn with_config(config: ReaderConfig) -> Result<Self> {
        Ok(Self {
            splitter: CsvSplitter::new(config.splitter)?,
            wanted_fields: config.wanted_fields,
            field_map: config.field_map,
            hook: Box::new(LogAndContinue),
            last_file: None,
        })
    }

    pub fn options(&self) -> &SplitterOptions {
        self.splitter.options()
    }

    pub fn wanted_fields(&self) -> &[usize] {
        &self.wanted_fields
    }

    pub fn set_wanted_fields(&mut self, indices: Vec<usize>) {
        self.wanted_fields = indices;
    }

    pub fn field_map(&self) -> &[String] {
        &self.field_map
    }

    pub fn set_field_map<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        self.field_map = names.into_iter().map(Into::into).collect();
    }

    pub fn set_failure_hook<H: FailureHook + 'static>(&mut self, hook: H) {
        self.hook = Box::new(hook);
    }

    /// Path passed to the most recent `read_file` call.
    pub fn last_file(&self) -> Option<&Path> {
        self.last_file.as_deref()
    }

    /// Read a whole file and return one record per parseable, non-empty line.
    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<Record>> {
        let path = path.as_ref();
        self.last_file = Some(path.to_path_buf());

        debug!("Reading CSV file: {}", path.display());
        let content =
            fs::read(path).map_err(|e| Error::file_access(path.display().to_string(), e))?;

        self.read_bytes(&content)
    }

    /// Same per-line pipeline as `read_file`, over text already in memory.
    pub fn read_str(&mut self, content: &str) -> Result<Vec<Record>> {
        self.read_bytes(content.as_bytes())
    }

    /// Lines end at `\n` with an optional preceding `\r`. Each line is
    /// decoded on its own so bad UTF-8 only costs that line.
    fn read_bytes(&mut self, content: &[u8]) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (idx, raw) in content.split(|&b| b == b'\n').enumerate() {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }

            let line_no = idx + 1;
            let parsed = std::str::from_utf8(raw)
                .map_err(|e| Error::line_parse(line_no, format!("invalid UTF-8: {e}"), None))
                .and_then(|line| self.parse_line(line, line_no));

            match parsed {
                Ok(record) => records.push(record),
                Err(e) if e.is_line_error() => {
                    skipped += 1;
                    self.hook
                        .on_parse_failure(&String::from_utf8_lossy(raw), &e)?;
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Parsed {} records, skipped {} lines", records.len(), skipped);
        Ok(records)
    }

    /// Split, select and map a single line.
    pub fn parse_line(&self, line: &str, line_no: usize) -> Result<Record> {
        let fields = self.splitter.split(line, line_no)?;
        let fields = self.select(fields, line_no)?;

        if self.field_map.is_empty() {
            return Ok(Record::Fields(fields));
        }

        let mapped = self
            .field_map
            .iter()
            .zip(fields)
            .filter(|(name, _)| name.as_str() != NULL_FIELD)
            .map(|(name, value)| (name.clone(), value))
            .collect();

        Ok(Record::Mapped(mapped))
    }

    fn select(&self, fields: Vec<String>, line_no: usize) -> Result<Vec<String>> {
        if self.wanted_fields.is_empty() {
            return Ok(fields);
        }

        self.wanted_fields
            .iter()
            .map(|&index| {
                fields
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::field_index(line_no, index, fields.len()))
            })
            .collect()
    }
}

impl fmt::Debug for CsvReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvReader")
            .field("splitter", &self.splitter)
            .field("wanted_fields", &self.wanted_fields)
            .field("field_map", &self.field_map)
            .field("last_file", &self.last_file)
            .finish_non_exhaustive()
    }
}
