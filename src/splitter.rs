//! Per-line field splitting backed by the `csv` crate.
//!
//! The reader hands this module one raw line at a time. Quoting, escaping
//! and delimiter handling are left to `csv::Reader`; this layer only
//! validates the dialect up front and turns a single line into its fields.

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dialect options forwarded to the underlying `csv` reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterOptions {
    pub delimiter: char,
    pub quote: char,
    /// Escape character inside quoted fields. `None` relies on doubled quotes.
    pub escape: Option<char>,
    pub double_quote: bool,
    /// When false, quote characters have no special meaning.
    pub quoting: bool,
    /// Strip leading and trailing whitespace from every field.
    pub trim: bool,
    /// Reject lines that leave a quoted field open.
    pub strict: bool,
}

impl Default for SplitterOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            escape: None,
            double_quote: true,
            quoting: true,
            trim: false,
            strict: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvSplitter {
    options: SplitterOptions,
    delimiter: u8,
    quote: u8,
    escape: Option<u8>,
}

impl CsvSplitter {
    pub fn new(options: SplitterOptions) -> Result<Self> {
        let delimiter = dialect_byte("delimiter", options.delimiter)?;
        let quote = dialect_byte("quote", options.quote)?;
        let escape = options
            .escape
            .map(|c| dialect_byte("escape", c))
            .transpose()?;

        if delimiter == quote {
            return Err(Error::configuration(format!(
                "delimiter and quote must differ (both {:?})",
                options.delimiter
            )));
        }
        if let Some(escape) = escape {
            if escape == delimiter || escape == quote {
                return Err(Error::configuration(format!(
                    "escape {:?} collides with the delimiter or quote",
                    escape as char
                )));
            }
        }

        Ok(Self {
            options,
            delimiter,
            quote,
            escape,
        })
    }

    pub fn options(&self) -> &SplitterOptions {
        &self.options
    }

    /// Split one raw line into its fields. `line_no` only labels errors.
    pub fn split(&self, line: &str, line_no: usize) -> Result<Vec<String>> {
        if self.options.strict && self.options.quoting && !self.quotes_balanced(line) {
            return Err(Error::line_parse(line_no, "unterminated quoted field", None));
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape)
            .double_quote(self.options.double_quote)
            .quoting(self.options.quoting)
            .trim(if self.options.trim { Trim::Fields } else { Trim::None })
            .from_reader(line.as_bytes());

        let mut records = rdr.records();
        let fields = match records.next() {
            Some(Ok(record)) => record.iter().map(str::to_owned).collect(),
            Some(Err(e)) => return Err(Error::line_parse(line_no, e.to_string(), Some(e))),
            None => return Err(Error::line_parse(line_no, "no fields found", None)),
        };

        // A bare CR outside quotes ends a csv record but not a line.
        if records.next().is_some() {
            return Err(Error::line_parse(
                line_no,
                "line contains an embedded record terminator",
                None,
            ));
        }

        Ok(fields)
    }

    fn quotes_balanced(&self, line: &str) -> bool {
        let mut in_quotes = false;
        let mut bytes = line.bytes();
        while let Some(b) = bytes.next() {
            if in_quotes && Some(b) == self.escape {
                bytes.next();
            } else if b == self.quote {
                in_quotes = !in_quotes;
            }
        }
        !in_quotes
    }
}

fn dialect_byte(name: &str, c: char) -> Result<u8> {
    if !c.is_ascii() {
        return Err(Error::configuration(format!(
            "{name} must be a single-byte ASCII character, got {c:?}"
        )));
    }
    if c == '\n' || c == '\r' {
        return Err(Error::configuration(format!(
            "{name} cannot be a line terminator"
        )));
    }
    Ok(c as u8)
}
